//! Firmware image checks, Intel HEX only.
use std::{fs, io::ErrorKind, ops::Range, path::Path};

use crate::{
    constants::hex::{MIN_RECORD_LEN, RECORD_MARK},
    error::{Error, FileInvalidReason, Result},
};

/// Fast structural check before IPECMD is started.
///
/// Every non-empty line must start with `:` and be at least as long as an
/// empty record. Checksums are left to IPECMD.
pub fn validate_hex_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let invalid = |reason| Error::FileInvalid {
        path: path.to_path_buf(),
        reason,
    };

    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(invalid(FileInvalidReason::NotFound));
        }
        Err(err) => return Err(invalid(FileInvalidReason::Unreadable(err.to_string()))),
    };
    let text = String::from_utf8_lossy(&raw);

    let mut records = 0;
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(RECORD_MARK) {
            return Err(invalid(FileInvalidReason::Malformed {
                line: idx + 1,
                detail: format!("record does not start with '{}'", RECORD_MARK),
            }));
        }
        if line.len() < MIN_RECORD_LEN {
            return Err(invalid(FileInvalidReason::Malformed {
                line: idx + 1,
                detail: format!(
                    "record too short ({} < {} chars)",
                    line.len(),
                    MIN_RECORD_LEN
                ),
            }));
        }
        records += 1;
    }

    if records == 0 {
        return Err(invalid(FileInvalidReason::Empty));
    }
    log::debug!("HEX file {} has {} records", path.display(), records);
    Ok(())
}

/// What a HEX image contains, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexSummary {
    pub records: usize,
    pub data_bytes: usize,
    /// Lowest to one-past-highest data address
    pub address_range: Option<Range<u32>>,
}

/// Full parse with the `ihex` crate, including record checksums.
pub fn summarize<P: AsRef<Path>>(path: P) -> anyhow::Result<HexSummary> {
    let data = fs::read_to_string(path)?;
    read_ihex(&data)
}

pub fn read_ihex(data: &str) -> anyhow::Result<HexSummary> {
    use ihex::Record;

    let mut base_address = 0u32;
    let mut records = 0;
    let mut data_bytes = 0;
    let mut range: Option<Range<u32>> = None;

    for record in ihex::Reader::new(data) {
        let record = record?;
        records += 1;
        use Record::*;
        match record {
            Data { offset, value } => {
                let start = base_address.wrapping_add(offset as u32);
                let end = start.saturating_add(value.len() as u32);
                data_bytes += value.len();
                range = Some(match range {
                    Some(r) => r.start.min(start)..r.end.max(end),
                    None => start..end,
                });
            }
            EndOfFile => (),
            ExtendedSegmentAddress(address) => {
                base_address = (address as u32) * 16;
            }
            StartSegmentAddress { .. } => (),
            ExtendedLinearAddress(address) => {
                base_address = (address as u32) << 16;
            }
            StartLinearAddress(_) => (),
        };
    }
    anyhow::ensure!(records > 0, "no records in HEX image");

    Ok(HexSummary {
        records,
        data_bytes,
        address_range: range,
    })
}
