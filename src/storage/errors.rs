//! Row file format errors
//!
//! Raised while decoding `records.dat`. At the reader boundary every
//! variant becomes a `TABLELOAD_IO_ERROR`, failing only the partition that
//! hit it.

use thiserror::Error;

use crate::errors::LoaderError;

#[derive(Debug, Error)]
pub enum RecordFormatError {
    #[error("Frame too short: {0} bytes")]
    TooShort(usize),

    #[error("Frame length {declared} exceeds {available} available bytes")]
    Truncated { declared: usize, available: usize },

    #[error("Checksum mismatch: computed {computed:#010x}, stored {stored:#010x}")]
    ChecksumMismatch { computed: u32, stored: u32 },

    #[error("Invalid row payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl RecordFormatError {
    /// Converts into a loader error, tagging the file and byte offset
    pub fn at(self, file: &std::path::Path, offset: u64) -> LoaderError {
        LoaderError::io_no_source(self.to_string())
            .with_details(format!("{} at offset {}", file.display(), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LoaderErrorCode;
    use std::path::Path;

    #[test]
    fn test_maps_to_io_error_with_location() {
        let err = RecordFormatError::ChecksumMismatch {
            computed: 1,
            stored: 2,
        }
        .at(Path::new("/t/records.dat"), 42);
        assert_eq!(err.code(), LoaderErrorCode::IoError);
        assert!(err.message().contains("Checksum mismatch"));
        assert_eq!(err.details(), Some("/t/records.dat at offset 42"));
    }
}
