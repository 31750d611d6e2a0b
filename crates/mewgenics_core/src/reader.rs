/// Little-endian view over a decompressed record buffer.
///
/// Every read is soft: an access that would run past the end of the buffer
/// yields zero, an empty string or `false` instead of an error. Locators try
/// speculative offsets and rely on their validity predicates to reject the
/// defaults.
#[derive(Debug, Clone, Copy)]
pub struct LeView<'a> {
    bytes: &'a [u8],
}

impl<'a> LeView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bounds-checked slice; `None` when `offset + len` overflows or runs past the end.
    pub fn slice(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        self.bytes.get(offset..end)
    }

    fn array<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.slice(offset, N)?.try_into().ok()
    }

    pub fn u8_at(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(0)
    }

    pub fn u16_at(&self, offset: usize) -> u16 {
        self.array(offset).map(u16::from_le_bytes).unwrap_or(0)
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        self.array(offset).map(u32::from_le_bytes).unwrap_or(0)
    }

    pub fn i32_at(&self, offset: usize) -> i32 {
        self.array(offset).map(i32::from_le_bytes).unwrap_or(0)
    }

    pub fn u64_at(&self, offset: usize) -> u64 {
        self.array(offset).map(u64::from_le_bytes).unwrap_or(0)
    }

    pub fn i64_at(&self, offset: usize) -> i64 {
        self.array(offset).map(i64::from_le_bytes).unwrap_or(0)
    }

    pub fn f32_at(&self, offset: usize) -> f32 {
        self.array(offset).map(f32::from_le_bytes).unwrap_or(0.0)
    }

    pub fn f64_at(&self, offset: usize) -> f64 {
        self.array(offset).map(f64::from_le_bytes).unwrap_or(0.0)
    }

    /// Reads `units` UTF-16LE code units. Unpaired surrogates become U+FFFD.
    pub fn utf16_at(&self, offset: usize, units: usize) -> String {
        let Some(raw) = units.checked_mul(2).and_then(|n| self.slice(offset, n)) else {
            return String::new();
        };
        let code_units = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
        char::decode_utf16(code_units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }

    /// Reads `len` bytes as ASCII; bytes above 0x7F become `?`.
    pub fn ascii_at(&self, offset: usize, len: usize) -> String {
        let Some(raw) = self.slice(offset, len) else {
            return String::new();
        };
        raw.iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect()
    }

    /// True when `len` bytes at `offset` exist and all lie in `0x20..0x7F`.
    pub fn is_printable(&self, offset: usize, len: usize) -> bool {
        self.slice(offset, len)
            .is_some_and(|raw| raw.iter().all(|&b| is_printable_byte(b)))
    }

    /// Length of the printable run starting at `offset`, scanning at most `max` bytes.
    pub fn printable_run(&self, offset: usize, max: usize) -> usize {
        self.bytes
            .get(offset..)
            .map(|rest| {
                rest.iter()
                    .take(max)
                    .take_while(|&&b| is_printable_byte(b))
                    .count()
            })
            .unwrap_or(0)
    }

    /// First exact occurrence of `pattern` at or after `from`.
    pub fn find(&self, pattern: &[u8], from: usize) -> Option<usize> {
        let rest = self.bytes.get(from..)?;
        if pattern.is_empty() {
            return Some(from);
        }
        rest.windows(pattern.len())
            .position(|window| window == pattern)
            .map(|pos| pos + from)
    }

    pub fn matches_at(&self, offset: usize, pattern: &[u8]) -> bool {
        self.slice(offset, pattern.len()) == Some(pattern)
    }
}

pub fn is_printable_byte(b: u8) -> bool {
    (0x20..0x7F).contains(&b)
}
