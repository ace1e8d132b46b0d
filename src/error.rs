// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::file_type::FileType;
use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The underlying stream failed: disk full, permission denied, missing path or truncated input.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A structural invariant of the table or the file does not hold. Never retried.
    #[error("format invariant violated: {0}")]
    Format(String),

    #[error("unknown file extension {0:?}")]
    UnknownFileExtension(String),

    #[error("file type {0} is not supported here")]
    UnsupportedFileType(FileType),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn eof(msg: &'static str) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::UnexpectedEof, msg))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}
