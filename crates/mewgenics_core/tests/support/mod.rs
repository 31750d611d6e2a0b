#![allow(dead_code)]

//! Synthetic record buffers with every field at a known offset.

pub const RECORD_LEN: usize = 0x1000;
pub const MAGIC: u32 = 0xCA7F_00D5;
pub const ID64: u64 = 0x0123_4567_89AB_CDEF;

pub const NAME: &str = "Mochi";
pub const NAME_END: usize = 0x14 + 2 * 5;
pub const FLAGS_OFFSET: usize = NAME_END + 0x10;
pub const FLAGS_RAW: u16 = 0x4002;

pub const STATS_OFFSET: usize = 0x1CC;
pub const BASE_STATS: [i32; 7] = [7, 5, 6, 4, 8, 3, 9];
pub const BONUS_STATS: [i32; 7] = [0, 2, -1, 3, 0, 1, 0];

pub const STATUS_OFFSET: usize = STATS_OFFSET + 84;
pub const STATUS: &str = "Poisoned";
pub const HP: u32 = 42;

pub const EQUIP_HEADER_OFFSET: usize = 0x400;
pub const ABILITY_RUN_OFFSET: usize = 0x600;
pub const ABILITY_RUN: [&str; 11] = [
    "DefaultMove",
    "BasicAttack",
    "Pounce",
    "Hiss",
    "Scratch",
    "Nap",
    "Item7",
    "Item8",
    "Item9",
    "Item10",
    "Purr",
];
pub const PASSIVE_TIER: u32 = 2;
pub const ABILITY_TAILS: [(&str, u32); 3] = [("Lucky", 1), ("Fear_Of_Dogs", 1), ("Insomnia", 3)];

pub const MUTATION_OFFSET: usize = 0x800;
pub const MUTATION_TABLE_LEN: usize = 16 + 14 * 20;
pub const COAT_ID: u32 = 1234;

pub const BIRTHDAY_RECORD_OFFSET: usize = 0xF00;
pub const CLASS_NAME: &str = "Fighter";
pub const BIRTHDAY_DAY: i64 = 120;
pub const BIRTHDAY_DAY_OFFSET: usize = BIRTHDAY_RECORD_OFFSET + 8 + 7 + 12;
pub const CURRENT_DAY: i64 = 500;

pub const EQUIP_HEADER: [u8; 8] = [0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00];
pub const EMPTY_SLOT: [u8; 5] = [0x00, 0x05, 0x00, 0x00, 0x00];

pub fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}

pub fn put_i32s(buf: &mut [u8], offset: usize, values: &[i32]) {
    for (i, v) in values.iter().enumerate() {
        put(buf, offset + i * 4, &v.to_le_bytes());
    }
}

pub fn len_prefixed(text: &str) -> Vec<u8> {
    let mut out = (text.len() as u64).to_le_bytes().to_vec();
    out.extend_from_slice(text.as_bytes());
    out
}

pub fn equipment_block() -> Vec<u8> {
    let mut out = EQUIP_HEADER.to_vec();
    out.push(0x01);
    out.extend(len_prefixed("Sword_001"));
    out.extend_from_slice(&[0, 0, 0, 0, 0xFF, 0x00, 0x05, 0x00, 0x00, 0x00]);
    out.extend_from_slice(&EMPTY_SLOT);
    out.extend_from_slice(&EMPTY_SLOT);
    out.push(0x01);
    out.extend(len_prefixed("Hat_07"));
    out.extend_from_slice(&[0xFF, 0x01, 0x05, 0x00, 0x00, 0x00]);
    out.push(0x01);
    out.extend(len_prefixed("Collar_2"));
    out.extend_from_slice(&[0, 0, 0, 0, 0xFF, 0x02]);
    out.extend(len_prefixed("Next"));
    out
}

pub fn ability_block() -> Vec<u8> {
    let mut out = Vec::new();
    for id in ABILITY_RUN {
        out.extend(len_prefixed(id));
    }
    out.extend_from_slice(&PASSIVE_TIER.to_le_bytes());
    for (id, tier) in ABILITY_TAILS {
        out.extend(len_prefixed(id));
        out.extend_from_slice(&tier.to_le_bytes());
    }
    out
}

/// Writes the mutation table with `agreeing` slots repeating the coat id.
pub fn put_mutation_table(buf: &mut [u8], agreeing: usize) {
    let base = MUTATION_OFFSET;
    put(buf, base, &1.0f32.to_le_bytes());
    put(buf, base + 4, &COAT_ID.to_le_bytes());
    put(buf, base + 8, &10u32.to_le_bytes());
    put(buf, base + 12, &u32::MAX.to_le_bytes());
    for i in 0..14 {
        let slot = base + 16 + i * 20;
        put(buf, slot, &(100 + i as u32).to_le_bytes());
        let second = if i < agreeing { COAT_ID } else { 777 };
        put(buf, slot + 4, &second.to_le_bytes());
    }
}

pub fn decoded_record_bytes() -> Vec<u8> {
    decoded_record_bytes_with_len(RECORD_LEN)
}

/// The full fixture, zero-padded to `len` bytes (at least [`RECORD_LEN`]).
pub fn decoded_record_bytes_with_len(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len.max(RECORD_LEN)];
    put(&mut buf, 0, &MAGIC.to_le_bytes());
    put(&mut buf, 4, &ID64.to_le_bytes());
    put(&mut buf, 0x0C, &(NAME.len() as u32).to_le_bytes());
    let name: Vec<u8> = NAME.encode_utf16().flat_map(u16::to_le_bytes).collect();
    put(&mut buf, 0x14, &name);
    put(&mut buf, NAME_END + 8, &1u16.to_le_bytes());
    put(&mut buf, NAME_END + 12, &1u16.to_le_bytes());
    put(&mut buf, FLAGS_OFFSET, &FLAGS_RAW.to_le_bytes());

    put_i32s(&mut buf, STATS_OFFSET, &BASE_STATS);
    put_i32s(&mut buf, STATS_OFFSET + 28, &BONUS_STATS);
    put(&mut buf, STATUS_OFFSET, &len_prefixed(STATUS));
    put(&mut buf, STATUS_OFFSET + 8 + STATUS.len(), &HP.to_le_bytes());

    put(&mut buf, EQUIP_HEADER_OFFSET, &equipment_block());
    put(&mut buf, ABILITY_RUN_OFFSET, &ability_block());
    put_mutation_table(&mut buf, 14);

    put(&mut buf, BIRTHDAY_RECORD_OFFSET, &len_prefixed(CLASS_NAME));
    put(&mut buf, BIRTHDAY_DAY_OFFSET, &BIRTHDAY_DAY.to_le_bytes());
    put(&mut buf, BIRTHDAY_DAY_OFFSET + 8, &(-1i64).to_le_bytes());
    buf
}

pub fn zero_mutation_table(buf: &mut [u8]) {
    buf[MUTATION_OFFSET..MUTATION_OFFSET + MUTATION_TABLE_LEN].fill(0);
}

/// Same record under another five-letter name, for collections.
pub fn named_record_bytes(name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    assert_eq!(units.len(), NAME.len(), "fixture names must fill the name slot");
    let mut buf = decoded_record_bytes();
    let encoded: Vec<u8> = units.into_iter().flat_map(u16::to_le_bytes).collect();
    put(&mut buf, 0x14, &encoded);
    buf
}

pub fn compress_with_header(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress_prepend_size(bytes)
}

pub fn compress_headerless(bytes: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(bytes)
}

pub fn house_state_blob(entries: &[(u32, &str)]) -> Vec<u8> {
    let mut out = 0u32.to_le_bytes().to_vec();
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (key, room) in entries {
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend(len_prefixed(room));
        for v in [1.0f64, 2.0, 3.0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}
