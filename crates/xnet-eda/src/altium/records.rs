//! Decoding of the `FileHeader` record stream.
//!
//! The stream is a sequence of length-prefixed `KEY=VALUE|KEY=VALUE|…`
//! text segments. The Altium binary format is undocumented; the layout
//! handled here is the one observed in the wild: five bytes of prefix
//! before the first segment, one trailing byte after the last, and a
//! six-byte separator between segments (three length-indicator bytes, two
//! null bytes, one ASCII pipe). Inputs shorter than the fixed skips fail
//! loudly rather than guess.

use std::collections::HashMap;

use crate::DecodeError;

pub const TAG_COMPONENT: u32 = 1;
pub const TAG_PIN: u32 = 2;
pub const TAG_POWER_PORT: u32 = 17;
pub const TAG_NET_LABEL: u32 = 25;
pub const TAG_WIRE: u32 = 27;
pub const TAG_DESIGNATOR: u32 = 34;
pub const TAG_PARAMETER: u32 = 41;

/// One decoded record: its position in the body list plus its raw
/// attributes. Keys keep the casing the file used; lookups are
/// case-insensitive because writers emit both `Text` and `TEXT`.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub index: usize,
    pub attrs: HashMap<String, String>,
}

impl Record {
    /// Case-insensitive attribute lookup.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attr(key)?.trim().parse().ok()
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attr(key)?.trim().parse().ok()
    }

    /// The record's `RECORD` tag, when present and numeric.
    pub fn tag(&self) -> Option<u32> {
        self.attr("RECORD")?.trim().parse().ok()
    }

    /// The record's `OwnerIndex` link to its parent in the flat body list.
    pub fn owner_index(&self) -> Option<usize> {
        self.attr("OwnerIndex")?.trim().parse().ok()
    }
}

/// The record stream split into schematic-header records and body records.
#[derive(Debug, Default)]
pub struct RecordStream {
    pub header: Vec<Record>,
    pub body: Vec<Record>,
}

/// Split the raw `FileHeader` bytes into records.
pub fn parse_records(data: &[u8]) -> Result<RecordStream, DecodeError> {
    if data.len() < 6 {
        return Err(DecodeError::TruncatedStream("shorter than fixed prefix"));
    }
    let payload = &data[5..data.len() - 1];

    let mut segments: Vec<&[u8]> = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i + 6 <= payload.len() {
        if payload[i + 3] == 0 && payload[i + 4] == 0 && payload[i + 5] == b'|' {
            segments.push(&payload[start..i]);
            start = i + 6;
            i = start;
        } else {
            i += 1;
        }
    }
    segments.push(&payload[start..]);

    let mut stream = RecordStream::default();
    for segment in segments {
        let text = String::from_utf8_lossy(segment);
        let mut attrs = HashMap::new();
        for token in text.split('|') {
            let token = token.trim_matches('\0');
            if token.is_empty() {
                continue;
            }
            if let Some((key, value)) = token.split_once('=') {
                attrs.insert(key.to_string(), value.to_string());
            }
        }
        if attrs.is_empty() {
            continue;
        }

        let record = Record { index: 0, attrs };
        if record.attr("HEADER").is_some() {
            stream.header.push(record);
        } else if record.attr("RECORD").is_some() {
            let index = stream.body.len();
            stream.body.push(Record { index, ..record });
        }
    }

    Ok(stream)
}
