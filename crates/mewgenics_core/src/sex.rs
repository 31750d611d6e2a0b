use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    pub const MALE_RAW: u16 = 0;
    pub const FEMALE_RAW: u16 = 1;

    /// Maps a raw marker; anything other than the two known values is `None`.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            Self::MALE_RAW => Some(Self::Male),
            Self::FEMALE_RAW => Some(Self::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
