//! Sequential row file reader
//!
//! Every frame is checksum-verified before it is returned. A clean end of
//! file ends the scan; a frame cut short by end of file or an interrupted
//! read is an I/O error for the owning partition.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use super::record::{decode_frame, frame_length, FRAME_OVERHEAD};
use crate::errors::{LoaderError, LoaderResult};

/// Buffered reader over one `records.dat` file
pub struct TableFileReader {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
}

impl TableFileReader {
    /// Opens a row file for reading
    pub fn open(path: &Path) -> LoaderResult<Self> {
        let file = File::open(path).map_err(|e| {
            LoaderError::io(format!("Failed to open row file: {}", path.display()), e)
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the byte offset of the next frame
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next row payload, `None` at a clean end of file
    pub fn read_next(&mut self) -> LoaderResult<Option<Json>> {
        let mut header = [0u8; 4];
        match read_header(&mut self.reader, &mut header) {
            Ok(false) => return Ok(None),
            Ok(true) => {}
            Err(e) => {
                return Err(LoaderError::io(
                    format!("Failed to read frame header at offset {}", self.offset),
                    e,
                )
                .with_details(self.path.display().to_string()))
            }
        }

        let declared = frame_length(header);
        if declared < FRAME_OVERHEAD {
            return Err(LoaderError::io_no_source(format!("Invalid frame length {}", declared))
                .with_details(format!("{} at offset {}", self.path.display(), self.offset)));
        }

        let mut frame = vec![0u8; declared];
        frame[..4].copy_from_slice(&header);
        self.reader.read_exact(&mut frame[4..]).map_err(|e| {
            LoaderError::io(format!("Failed to read frame at offset {}", self.offset), e)
                .with_details(self.path.display().to_string())
        })?;

        let (payload, consumed) =
            decode_frame(&frame).map_err(|e| e.at(&self.path, self.offset))?;
        self.offset += consumed as u64;

        Ok(Some(payload))
    }
}

/// Fills `header`; returns false if the reader was already at end of file.
fn read_header(reader: &mut impl Read, header: &mut [u8; 4]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "end of file inside frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
