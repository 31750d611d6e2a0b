use std::fmt::Write as _;

use mewgenics_core::core_api::HouseCat;
use mewgenics_core::layout::RecordLayout;
use mewgenics_core::record::{
    AbilityKind, AbilitySlot, CombatState, DecodedRecord, EquipSlot, Flags, MutationTable,
    STAT_NAMES, StatVector, StatsLocation,
};
use serde_json::{Map as JsonMap, Value as JsonValue};

const SHEET_WIDTH: usize = 64;
const LABEL_WIDTH: usize = 24;
const ROSTER_NAME_WIDTH: usize = 16;
const ROSTER_ROOM_WIDTH: usize = 14;
const ROSTER_CLASS_WIDTH: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextStyle {
    #[default]
    PlainSheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    /// Adds byte offsets and the decompression variant.
    pub verbose: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelection {
    pub name: bool,
    pub sex: bool,
    pub class: bool,
    pub age: bool,
    pub flags: bool,
    pub stats: bool,
    pub combat: bool,
    pub mutations: bool,
    pub equipment: bool,
    pub abilities: bool,
}

impl FieldSelection {
    pub const fn all() -> Self {
        Self {
            name: true,
            sex: true,
            class: true,
            age: true,
            flags: true,
            stats: true,
            combat: true,
            mutations: true,
            equipment: true,
            abilities: true,
        }
    }

    pub fn is_any_selected(&self) -> bool {
        self.name
            || self.sex
            || self.class
            || self.age
            || self.flags
            || self.stats
            || self.combat
            || self.mutations
            || self.equipment
            || self.abilities
    }
}

pub fn render_json_full(
    record: &DecodedRecord,
    current_day: Option<i64>,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(default_json(record, current_day)),
    }
}

pub fn render_json_selected(
    record: &DecodedRecord,
    current_day: Option<i64>,
    fields: &FieldSelection,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(selected_json(fields, record, current_day)),
    }
}

/// Array of canonical records, in the order given.
pub fn render_json_collection(
    records: &[DecodedRecord],
    current_day: Option<i64>,
    fields: Option<&FieldSelection>,
    style: JsonStyle,
) -> JsonValue {
    JsonValue::Array(
        records
            .iter()
            .map(|record| match fields {
                Some(fields) if fields.is_any_selected() => {
                    render_json_selected(record, current_day, fields, style)
                }
                _ => render_json_full(record, current_day, style),
            })
            .collect(),
    )
}

pub fn render_roster_json(cats: &[HouseCat], style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Array(cats.iter().map(house_cat_to_json).collect()),
    }
}

pub fn render_regions_json(layout: &RecordLayout) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("buffer_len".to_string(), JsonValue::from(layout.buffer_len));
    out.insert(
        "regions".to_string(),
        JsonValue::Array(
            layout
                .regions
                .iter()
                .map(|region| {
                    let mut entry = JsonMap::new();
                    entry.insert(
                        "id".to_string(),
                        JsonValue::String(region.id.as_str().to_string()),
                    );
                    entry.insert("start".to_string(), JsonValue::from(region.range.start));
                    entry.insert("end".to_string(), JsonValue::from(region.range.end));
                    JsonValue::Object(entry)
                })
                .collect(),
        ),
    );
    JsonValue::Object(out)
}

pub fn render_record_sheet(record: &DecodedRecord, current_day: Option<i64>) -> String {
    render_record_sheet_with_options(record, current_day, TextRenderOptions::default())
}

pub fn render_text(record: &DecodedRecord, current_day: Option<i64>, style: TextStyle) -> String {
    render_text_with_options(record, current_day, style, TextRenderOptions::default())
}

pub fn render_record_sheet_with_options(
    record: &DecodedRecord,
    current_day: Option<i64>,
    options: TextRenderOptions,
) -> String {
    render_record_sheet_impl(record, current_day, None, options)
}

pub fn render_text_with_options(
    record: &DecodedRecord,
    current_day: Option<i64>,
    style: TextStyle,
    options: TextRenderOptions,
) -> String {
    match style {
        TextStyle::PlainSheet => render_record_sheet_impl(record, current_day, None, options),
    }
}

/// Sheet limited to the selected sections. An empty selection renders everything.
pub fn render_selected_sheet(
    record: &DecodedRecord,
    current_day: Option<i64>,
    fields: &FieldSelection,
    options: TextRenderOptions,
) -> String {
    let fields = fields.is_any_selected().then_some(fields);
    render_record_sheet_impl(record, current_day, fields, options)
}

pub fn render_roster_text(cats: &[HouseCat]) -> String {
    let mut out = String::new();
    if cats.is_empty() {
        writeln!(&mut out, "No cats in the house.").expect("writing to String cannot fail");
        return out;
    }

    let header = format!(
        "{:<name$} {:<7} {:<room$} {:<class$} {:>5}  {}",
        "Name",
        "Sex",
        "Room",
        "Class",
        "Age",
        "Status",
        name = ROSTER_NAME_WIDTH,
        room = ROSTER_ROOM_WIDTH,
        class = ROSTER_CLASS_WIDTH,
    );
    writeln!(&mut out, "{}", header.trim_end()).expect("writing to String cannot fail");
    writeln!(&mut out, "{}", "-".repeat(header.trim_end().len()))
        .expect("writing to String cannot fail");

    for cat in cats {
        let age = cat.age.map(|a| a.to_string()).unwrap_or_else(|| "?".to_string());
        let status = status_words(cat.retired, cat.dead, cat.donated);
        let line = format!(
            "{:<name$} {:<7} {:<room$} {:<class$} {:>5}  {}",
            fit_column(&cat.name, ROSTER_NAME_WIDTH),
            cat.sex.as_str(),
            fit_column(&cat.room, ROSTER_ROOM_WIDTH),
            fit_column(cat.class_name.as_deref().unwrap_or("-"), ROSTER_CLASS_WIDTH),
            age,
            status,
            name = ROSTER_NAME_WIDTH,
            room = ROSTER_ROOM_WIDTH,
            class = ROSTER_CLASS_WIDTH,
        );
        writeln!(&mut out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }
    out
}

pub fn render_regions_text(layout: &RecordLayout) -> String {
    let mut out = String::new();
    writeln!(&mut out, "Regions ({} bytes)", layout.buffer_len)
        .expect("writing to String cannot fail");
    for region in &layout.regions {
        writeln!(
            &mut out,
            "  {:<12}{:#06x}..{:#06x}  {:>5} bytes",
            region.id.as_str(),
            region.range.start,
            region.range.end,
            region.range.len(),
        )
        .expect("writing to String cannot fail");
    }
    for (a, b) in layout.overlapping() {
        writeln!(&mut out, "  overlap: {a} / {b}").expect("writing to String cannot fail");
    }
    if let Err(err) = layout.validate() {
        writeln!(&mut out, "  invalid: {err}").expect("writing to String cannot fail");
    }
    out
}

fn selected_json(
    fields: &FieldSelection,
    record: &DecodedRecord,
    current_day: Option<i64>,
) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();

    out.insert("key".to_string(), JsonValue::from(record.key));
    if fields.name {
        out.insert(
            "name".to_string(),
            JsonValue::String(record.name().to_string()),
        );
    }
    if fields.sex {
        out.insert(
            "sex".to_string(),
            JsonValue::String(record.identity.sex.to_string()),
        );
    }
    if fields.class {
        out.insert("class".to_string(), optional_str(record.class_name()));
    }
    if fields.age {
        out.insert(
            "birthday_day".to_string(),
            optional_i64(record.birthday_day()),
        );
        out.insert("age".to_string(), optional_i64(record.age(current_day)));
    }
    if fields.flags {
        out.insert("flags".to_string(), flags_to_json(&record.flags));
    }
    if fields.stats {
        out.insert("stats".to_string(), stats_location_to_json(record.stats.as_ref()));
    }
    if fields.combat {
        out.insert("combat".to_string(), combat_to_json(record.combat.as_ref()));
    }
    if fields.mutations {
        out.insert(
            "mutations".to_string(),
            mutations_to_json(record.mutations.as_ref()),
        );
    }
    if fields.equipment {
        out.insert(
            "equipment".to_string(),
            equipment_to_json(&record.equipment),
        );
    }
    if fields.abilities {
        out.insert(
            "abilities".to_string(),
            abilities_to_json(&record.abilities),
        );
    }

    out
}

fn default_json(record: &DecodedRecord, current_day: Option<i64>) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();

    out.insert("key".to_string(), JsonValue::from(record.key));
    out.insert(
        "id64".to_string(),
        JsonValue::String(format!("{:#018x}", record.id64)),
    );
    out.insert(
        "variant".to_string(),
        JsonValue::String(record.variant.to_string()),
    );
    out.insert(
        "name".to_string(),
        JsonValue::String(record.name().to_string()),
    );
    out.insert(
        "sex".to_string(),
        JsonValue::String(record.identity.sex.to_string()),
    );
    out.insert("class".to_string(), optional_str(record.class_name()));
    out.insert(
        "birthday_day".to_string(),
        optional_i64(record.birthday_day()),
    );
    out.insert("age".to_string(), optional_i64(record.age(current_day)));
    out.insert("flags".to_string(), flags_to_json(&record.flags));
    out.insert("stats".to_string(), stats_location_to_json(record.stats.as_ref()));
    out.insert("combat".to_string(), combat_to_json(record.combat.as_ref()));
    out.insert(
        "mutations".to_string(),
        mutations_to_json(record.mutations.as_ref()),
    );
    out.insert(
        "equipment".to_string(),
        equipment_to_json(&record.equipment),
    );
    out.insert(
        "abilities".to_string(),
        abilities_to_json(&record.abilities),
    );

    out
}

fn optional_str(value: Option<&str>) -> JsonValue {
    match value {
        Some(v) => JsonValue::String(v.to_string()),
        None => JsonValue::Null,
    }
}

fn optional_i64(value: Option<i64>) -> JsonValue {
    match value {
        Some(v) => JsonValue::from(v),
        None => JsonValue::Null,
    }
}

fn flags_to_json(flags: &Flags) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("raw".to_string(), JsonValue::from(flags.raw));
    out.insert("retired".to_string(), JsonValue::Bool(flags.retired));
    out.insert("dead".to_string(), JsonValue::Bool(flags.dead));
    out.insert("donated".to_string(), JsonValue::Bool(flags.donated));
    JsonValue::Object(out)
}

fn stat_vector_to_json(stats: &StatVector) -> JsonValue {
    let mut out = JsonMap::new();
    for (name, value) in STAT_NAMES.iter().zip(stats.to_array()) {
        out.insert((*name).to_string(), JsonValue::from(value));
    }
    JsonValue::Object(out)
}

fn stats_location_to_json(stats: Option<&StatsLocation>) -> JsonValue {
    let Some(stats) = stats else {
        return JsonValue::Null;
    };
    let mut out = JsonMap::new();
    out.insert("offset".to_string(), JsonValue::from(stats.offset));
    out.insert("base".to_string(), stat_vector_to_json(&stats.base));
    out.insert(
        "bonus".to_string(),
        match &stats.bonus {
            Some(bonus) => stat_vector_to_json(bonus),
            None => JsonValue::Null,
        },
    );
    JsonValue::Object(out)
}

fn combat_to_json(combat: Option<&CombatState>) -> JsonValue {
    let Some(combat) = combat else {
        return JsonValue::Null;
    };
    let mut out = JsonMap::new();
    out.insert(
        "status_effect".to_string(),
        JsonValue::String(combat.status_effect.clone()),
    );
    out.insert("hp".to_string(), JsonValue::from(combat.hp));
    JsonValue::Object(out)
}

fn mutations_to_json(table: Option<&MutationTable>) -> JsonValue {
    let Some(table) = table else {
        return JsonValue::Null;
    };
    let mut out = JsonMap::new();
    out.insert("offset".to_string(), JsonValue::from(table.base_offset));
    out.insert("coat_id".to_string(), JsonValue::from(table.coat_id));
    out.insert(
        "slots".to_string(),
        JsonValue::Array(
            table
                .slots
                .iter()
                .map(|slot| {
                    let mut entry = JsonMap::new();
                    entry.insert("slot".to_string(), JsonValue::from(slot.slot_index));
                    entry.insert("label".to_string(), JsonValue::String(slot.label.clone()));
                    entry.insert(
                        "category".to_string(),
                        JsonValue::String(slot.category.as_str().to_string()),
                    );
                    entry.insert("id".to_string(), JsonValue::from(slot.slot_id));
                    JsonValue::Object(entry)
                })
                .collect(),
        ),
    );
    JsonValue::Object(out)
}

fn equipment_to_json(slots: &[EquipSlot]) -> JsonValue {
    JsonValue::Array(
        slots
            .iter()
            .map(|slot| {
                let mut entry = JsonMap::new();
                entry.insert("slot".to_string(), JsonValue::from(slot.blob_slot));
                entry.insert("item".to_string(), optional_str(slot.item_id.as_deref()));
                if slot.implicit_empty {
                    entry.insert("implicit_empty".to_string(), JsonValue::Bool(true));
                }
                JsonValue::Object(entry)
            })
            .collect(),
    )
}

fn abilities_to_json(slots: &[AbilitySlot]) -> JsonValue {
    JsonValue::Array(
        slots
            .iter()
            .map(|slot| {
                let mut entry = JsonMap::new();
                entry.insert("label".to_string(), JsonValue::String(slot.label.clone()));
                entry.insert("id".to_string(), JsonValue::String(slot.ability_id.clone()));
                entry.insert(
                    "tier".to_string(),
                    match slot.tier {
                        Some(t) => JsonValue::from(t),
                        None => JsonValue::Null,
                    },
                );
                JsonValue::Object(entry)
            })
            .collect(),
    )
}

fn house_cat_to_json(cat: &HouseCat) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("key".to_string(), JsonValue::from(cat.key));
    out.insert("name".to_string(), JsonValue::String(cat.name.clone()));
    out.insert("sex".to_string(), JsonValue::String(cat.sex.to_string()));
    out.insert("room".to_string(), JsonValue::String(cat.room.clone()));
    out.insert("class".to_string(), optional_str(cat.class_name.as_deref()));
    out.insert("birthday_day".to_string(), optional_i64(cat.birthday_day));
    out.insert("age".to_string(), optional_i64(cat.age));
    out.insert("retired".to_string(), JsonValue::Bool(cat.retired));
    out.insert("dead".to_string(), JsonValue::Bool(cat.dead));
    out.insert("donated".to_string(), JsonValue::Bool(cat.donated));
    out.insert(
        "stats".to_string(),
        match &cat.stats {
            Some(stats) => stat_vector_to_json(stats),
            None => JsonValue::Null,
        },
    );
    JsonValue::Object(out)
}

fn render_record_sheet_impl(
    record: &DecodedRecord,
    current_day: Option<i64>,
    fields: Option<&FieldSelection>,
    options: TextRenderOptions,
) -> String {
    let fields = fields.copied().unwrap_or(FieldSelection::all());

    let mut out = String::new();
    let title = format!("{} (#{})", display_name(record.name()), record.key);
    writeln!(&mut out, "{title}").expect("writing to String cannot fail");
    writeln!(&mut out, "{}", "=".repeat(title.chars().count().min(SHEET_WIDTH)))
        .expect("writing to String cannot fail");
    if options.verbose {
        write_row(&mut out, "Id", &format!("{:#018x}", record.id64));
        write_row(&mut out, "Decompression", &record.variant.to_string());
        write_row(&mut out, "Buffer", &format!("{} bytes", record.decoded_bytes.len()));
    }

    if fields.sex {
        write_row(&mut out, "Sex", record.identity.sex.as_str());
    }
    if fields.class {
        write_row(&mut out, "Class", record.class_name().unwrap_or("unknown"));
    }
    if fields.age {
        let age = match (record.age(current_day), record.birthday_day()) {
            (Some(age), Some(born)) => format!("{age} days (born day {born})"),
            (None, Some(born)) => format!("born day {born}"),
            _ => "unknown".to_string(),
        };
        write_row(&mut out, "Age", &age);
    }
    if fields.flags {
        let words = status_words(
            record.flags.retired,
            record.flags.dead,
            record.flags.donated,
        );
        let value = if options.verbose {
            format!("{words} (raw {:#06x} @ {:#x})", record.flags.raw, record.flags.offset)
        } else {
            words
        };
        write_row(&mut out, "Status", &value);
    }
    if fields.combat {
        let value = match &record.combat {
            Some(combat) => format!("{} HP, {}", combat.hp, combat.status_effect),
            None => "unknown".to_string(),
        };
        write_row(&mut out, "Combat", &value);
    }

    if fields.stats {
        writeln!(&mut out).expect("writing to String cannot fail");
        write_stats_section(&mut out, record.stats.as_ref(), options);
    }
    if fields.mutations {
        writeln!(&mut out).expect("writing to String cannot fail");
        write_mutations_section(&mut out, record.mutations.as_ref(), options);
    }
    if fields.equipment {
        writeln!(&mut out).expect("writing to String cannot fail");
        write_equipment_section(&mut out, &record.equipment, options);
    }
    if fields.abilities {
        writeln!(&mut out).expect("writing to String cannot fail");
        write_abilities_section(&mut out, &record.abilities, options);
    }

    out
}

fn write_row(out: &mut String, label: &str, value: &str) {
    let label = format!("{label}:");
    writeln!(out, "  {label:<width$}{value}", width = LABEL_WIDTH - 2)
        .expect("writing to String cannot fail");
}

fn write_stats_section(out: &mut String, stats: Option<&StatsLocation>, options: TextRenderOptions) {
    let Some(stats) = stats else {
        writeln!(out, "Stats: not found").expect("writing to String cannot fail");
        return;
    };
    if options.verbose {
        writeln!(out, "Stats @ {:#x}", stats.offset).expect("writing to String cannot fail");
    } else {
        writeln!(out, "Stats").expect("writing to String cannot fail");
    }

    let mut header = format!("  {:<8}", "");
    for name in STAT_NAMES {
        header.push_str(&format!("{name:>5}"));
    }
    header.push_str(&format!("{:>7}", "Total"));
    writeln!(out, "{header}").expect("writing to String cannot fail");

    write_stat_line(out, "Base", &stats.base);
    if let Some(bonus) = &stats.bonus {
        write_stat_line(out, "Bonus", bonus);
    }
}

fn write_stat_line(out: &mut String, label: &str, stats: &StatVector) {
    let mut line = format!("  {label:<8}");
    for value in stats.to_array() {
        line.push_str(&format!("{value:>5}"));
    }
    line.push_str(&format!("{:>7}", stats.sum()));
    writeln!(out, "{line}").expect("writing to String cannot fail");
}

fn write_mutations_section(
    out: &mut String,
    table: Option<&MutationTable>,
    options: TextRenderOptions,
) {
    let Some(table) = table else {
        writeln!(out, "Mutations: not found").expect("writing to String cannot fail");
        return;
    };
    if options.verbose {
        writeln!(out, "Mutations @ {:#x} (coat {})", table.base_offset, table.coat_id)
            .expect("writing to String cannot fail");
    } else {
        writeln!(out, "Mutations (coat {})", table.coat_id)
            .expect("writing to String cannot fail");
    }
    for slot in &table.slots {
        let mut line = format!("  {:<12}{:<12}{:>6}", slot.label, slot.category.as_str(), slot.slot_id);
        if options.verbose {
            line.push_str(&format!("  @ {:#x}", slot.offset));
        }
        writeln!(out, "{line}").expect("writing to String cannot fail");
    }
}

fn write_equipment_section(out: &mut String, slots: &[EquipSlot], options: TextRenderOptions) {
    if slots.is_empty() {
        writeln!(out, "Equipment: not found").expect("writing to String cannot fail");
        return;
    }
    writeln!(out, "Equipment").expect("writing to String cannot fail");
    for slot in slots {
        let item = slot.item_id.as_deref().unwrap_or("(empty)");
        let mut line = format!("  Slot {}  {}", slot.blob_slot, item);
        if options.verbose {
            line.push_str(&format!("  [{:#x}..{:#x}]", slot.start, slot.end));
            if slot.implicit_empty {
                line.push_str(" implicit");
            }
        }
        writeln!(out, "{line}").expect("writing to String cannot fail");
    }
}

fn write_abilities_section(out: &mut String, slots: &[AbilitySlot], options: TextRenderOptions) {
    if slots.is_empty() {
        writeln!(out, "Abilities: not found").expect("writing to String cannot fail");
        return;
    }
    writeln!(out, "Abilities").expect("writing to String cannot fail");
    for slot in slots {
        let mut line = format!("  {:<width$}{}", slot.label, slot.ability_id, width = LABEL_WIDTH);
        if let Some(tier) = slot.tier {
            line.push_str(&format!(" (tier {tier})"));
        }
        if options.verbose {
            let offset = match slot.kind {
                AbilityKind::RunEntry => slot.run_start,
                AbilityKind::TierEntry => slot.record_offset,
            };
            if let Some(offset) = offset {
                line.push_str(&format!("  @ {offset:#x}"));
            }
        }
        writeln!(out, "{line}").expect("writing to String cannot fail");
    }
}

fn status_words(retired: bool, dead: bool, donated: bool) -> String {
    let words: Vec<&str> = [(retired, "retired"), (dead, "dead"), (donated, "donated")]
        .into_iter()
        .filter_map(|(set, word)| set.then_some(word))
        .collect();
    if words.is_empty() {
        "active".to_string()
    } else {
        words.join(", ")
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { "(unnamed)" } else { name }
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }

    let mut out = String::with_capacity(width);
    for ch in value.chars().take(width - 3) {
        out.push(ch);
    }
    out.push_str("...");
    out
}
