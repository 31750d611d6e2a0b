use serde::{Deserialize, Serialize};

use crate::house::HouseCatEntry;
use crate::record::{DecodedRecord, StatVector};
use crate::sex::Sex;

/// A roster row joined with its decoded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseCat {
    pub key: i64,
    pub name: String,
    pub sex: Sex,
    pub room: String,
    pub class_name: Option<String>,
    pub dead: bool,
    pub retired: bool,
    pub donated: bool,
    pub birthday_day: Option<i64>,
    pub age: Option<i64>,
    pub stats: Option<StatVector>,
}

impl HouseCat {
    pub fn join(entry: &HouseCatEntry, record: &DecodedRecord, current_day: Option<i64>) -> Self {
        Self {
            key: record.key,
            name: record.identity.name.clone(),
            sex: record.identity.sex,
            room: entry.room.clone(),
            class_name: record.class_name().map(str::to_string),
            dead: record.flags.dead,
            retired: record.flags.retired,
            donated: record.flags.donated,
            birthday_day: record.birthday_day(),
            age: record.age(current_day),
            stats: record.stats.map(|s| s.base),
        }
    }
}
