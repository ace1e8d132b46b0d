// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::types::DataType;
use std::sync::OnceLock;

const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;
const DEFAULT_MAX_STRING_LEN: u64 = 256 * 1024 * 1024;

/// Every file carries the column type names, so no limit may fall below the longest one.
fn min_string_len() -> u64 {
    DataType::ALL
        .iter()
        .map(|dt| dt.name().len() as u64)
        .max()
        .unwrap_or(0)
}

fn parse_max_string_len(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_MAX_STRING_LEN)
        .max(min_string_len())
}

fn default_max_string_len() -> u64 {
    static LIMIT: OnceLock<u64> = OnceLock::new();
    *LIMIT.get_or_init(|| {
        parse_max_string_len(std::env::var("SEGFILE_MAX_STRING_LEN").ok().as_deref())
    })
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Capacity of the buffered writer wrapped around the destination file.
    pub buffer_capacity: usize,
    /// Write into a sibling temporary file and rename it over the destination once complete.
    pub atomic: bool,
    /// Longest string the writer accepts; matches the reader default so written files read back.
    pub max_string_len: u64,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            atomic: false,
            max_string_len: default_max_string_len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Upper bound for a single decoded string; longer length prefixes are treated as corruption.
    pub max_string_len: u64,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_string_len: default_max_string_len(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub writer: WriterOptions,
    pub reader: ReaderOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let w = WriterOptions::default();
        assert_eq!(w.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert!(!w.atomic);
        assert_eq!(w.max_string_len, ReaderOptions::default().max_string_len);
    }

    #[test]
    fn test_max_string_len_parsing() {
        assert_eq!(parse_max_string_len(None), DEFAULT_MAX_STRING_LEN);
        assert_eq!(parse_max_string_len(Some("1024")), 1024);
        assert_eq!(parse_max_string_len(Some("0")), DEFAULT_MAX_STRING_LEN);
        assert_eq!(parse_max_string_len(Some("lots")), DEFAULT_MAX_STRING_LEN);
        // "double" and "string" must stay writable.
        assert_eq!(parse_max_string_len(Some("4")), 6);
    }
}
