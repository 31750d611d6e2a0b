pub mod abilities;
pub mod birthday;
pub mod equipment;
pub mod identity;
pub mod mutations;
pub mod stats;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::decompress::{DecodedBuffer, DecompressionVariant};
use crate::layout::{ByteRange, RecordLayout, RegionId, RegionLayout};
use crate::reader::LeView;

pub use abilities::{AbilityKind, AbilitySlot, locate_abilities};
pub use birthday::{BirthdayRecord, locate_birthday};
pub use equipment::{EquipSlot, locate_equipment};
pub use identity::{Flags, Identity, locate_identity, read_flags};
pub use mutations::{MutationCategory, MutationSlot, MutationTable, locate_mutations};
pub use stats::{
    CombatState, STAT_NAMES, StatVector, StatsLocation, has_combat_state, locate_stats, read_combat_state,
};

/// Smallest decompressed buffer worth decoding.
pub const MIN_RECORD_LEN: usize = 12;
const ID64_OFFSET: usize = 4;

/// Stored record before decompression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub key: i64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub key: i64,
    pub id64: u64,
    pub identity: Identity,
    pub flags: Flags,
    pub stats: Option<StatsLocation>,
    pub combat: Option<CombatState>,
    pub birthday: Option<BirthdayRecord>,
    pub mutations: Option<MutationTable>,
    pub equipment: Vec<EquipSlot>,
    pub abilities: Vec<AbilitySlot>,
    #[serde(skip)]
    pub decoded_bytes: Vec<u8>,
    pub variant: DecompressionVariant,
}

impl DecodedRecord {
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn class_name(&self) -> Option<&str> {
        self.birthday.as_ref().map(|b| b.class_name.as_str())
    }

    pub fn birthday_day(&self) -> Option<i64> {
        self.birthday.as_ref().map(|b| b.birthday_day)
    }

    /// Age in days relative to `current_day`, when both ends are known.
    pub fn age(&self, current_day: Option<i64>) -> Option<i64> {
        current_day?.checked_sub(self.birthday_day()?)
    }

    /// Byte ranges claimed by each locator that found something.
    pub fn regions(&self) -> RecordLayout {
        let mut regions = Vec::new();
        let mut push = |id: RegionId, range: ByteRange| regions.push(RegionLayout { id, range });

        if self.identity.name_end > identity::NAME_START {
            push(
                RegionId::Name,
                ByteRange::new(identity::NAME_START, self.identity.name_end),
            );
        }
        if self.flags.raw >= 0 {
            push(RegionId::Flags, ByteRange::with_len(self.flags.offset, 2));
        }
        if let Some(stats) = &self.stats {
            push(RegionId::Stats, ByteRange::with_len(stats.offset, 28));
            if stats.bonus.is_some() {
                push(RegionId::Bonus, ByteRange::with_len(stats.offset + 28, 28));
            }
        }
        if let Some(combat) = &self.combat {
            push(
                RegionId::Combat,
                ByteRange::new(combat.status_offset, combat.hp_offset + 4),
            );
        }
        if let Some(birthday) = &self.birthday {
            let start = birthday
                .offset
                .saturating_sub(birthday.class_name.len() + 20);
            push(RegionId::Birthday, ByteRange::new(start, birthday.offset + 16));
        }
        if let Some(table) = &self.mutations {
            push(
                RegionId::Mutations,
                ByteRange::with_len(table.base_offset, mutations::TABLE_LEN),
            );
        }
        if let (Some(first), Some(last)) = (self.equipment.first(), self.equipment.last()) {
            push(
                RegionId::Equipment,
                ByteRange::new(first.start.saturating_sub(8), last.end),
            );
        }
        if let Some(range) = ability_span(&self.abilities) {
            push(RegionId::Abilities, range);
        }

        RecordLayout::new(self.decoded_bytes.len(), regions)
    }
}

fn ability_span(slots: &[AbilitySlot]) -> Option<ByteRange> {
    let start = slots.iter().find_map(|s| s.run_start)?;
    let end = slots
        .iter()
        .filter_map(|s| match (s.record_offset, s.byte_length) {
            (Some(off), Some(len)) => Some(off + 8 + len + 4),
            _ => s.run_end,
        })
        .max()?;
    Some(ByteRange::new(start, end))
}

/// Runs every locator over one decompressed buffer.
pub fn decode_buffer(key: i64, buffer: DecodedBuffer, current_day: Option<i64>) -> DecodedRecord {
    let DecodedBuffer { bytes, variant } = buffer;
    let view = LeView::new(&bytes);

    let identity = locate_identity(&view);
    let flags = read_flags(&view, identity.name_end);
    let stats = locate_stats(&view, has_combat_state);
    let combat = stats
        .as_ref()
        .and_then(|s| read_combat_state(&view, s.offset));
    let birthday = locate_birthday(&view, current_day);
    let mutations = locate_mutations(&view);
    let equipment = locate_equipment(&view).unwrap_or_default();
    let abilities = locate_abilities(&view);
    let id64 = view.u64_at(ID64_OFFSET);

    trace!(
        key,
        name = %identity.name,
        stats = stats.is_some(),
        combat = combat.is_some(),
        birthday = birthday.is_some(),
        mutations = mutations.is_some(),
        equipment = equipment.len(),
        abilities = abilities.len(),
        "record decoded"
    );

    DecodedRecord {
        key,
        id64,
        identity,
        flags,
        stats,
        combat,
        birthday,
        mutations,
        equipment,
        abilities,
        decoded_bytes: bytes,
        variant,
    }
}
