// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Tbl,
    Binary,
}

impl FileType {
    /// Classifies by extension: `.csv`, `.tbl` and `.bin`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Ok(Self::Csv),
            Some("tbl") => Ok(Self::Tbl),
            Some("bin") => Ok(Self::Binary),
            _ => Err(Error::UnknownFileExtension(path.display().to_string())),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Tbl => "tbl",
            Self::Binary => "bin",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(FileType::from_path("a/b.csv").unwrap(), FileType::Csv);
        assert_eq!(FileType::from_path("x.tbl").unwrap(), FileType::Tbl);
        assert_eq!(FileType::from_path("/tmp/t.bin").unwrap(), FileType::Binary);
        for bad in ["t.json", "t", "t.BIN", ".bin.gz"] {
            assert!(matches!(
                FileType::from_path(bad),
                Err(Error::UnknownFileExtension(_))
            ));
        }
    }
}
