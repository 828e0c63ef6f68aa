use std::io;

use thiserror::Error;

use super::lump::LumpKind;
use super::LumpType;

#[derive(Debug, Error)]
pub enum BspError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("file is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("corrupt header: {0}")]
    CorruptHeader(String),
    #[error("{} bytes {from}..{to} overrun buffer of {size} bytes", describe(lump))]
    TruncatedFile {
        lump: Option<LumpKind>,
        from: usize,
        to: usize,
        size: usize,
    },
    #[error("{lump:?} lump is {length} bytes, not a multiple of its {record_size} byte record")]
    LumpSizeMismatch {
        lump: LumpType,
        length: usize,
        record_size: usize,
    },
    #[error("{lump:?} lump version {version} is not supported")]
    UnsupportedLumpVersion { lump: LumpType, version: i32 },
    #[error("malformed entity block at byte {offset}: {reason}")]
    MalformedEntityBlock { offset: usize, reason: &'static str },
    #[error("{what} index {index} out of range ({len} records)")]
    IndexOutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },
    #[error("model {index} out of range ({len} models)")]
    ModelOutOfRange { index: usize, len: usize },
}

pub type BspResult<T> = Result<T, BspError>;

fn describe(lump: &Option<LumpKind>) -> String {
    match lump {
        Some(LumpKind::Known(ty)) => format!("{ty:?} lump"),
        Some(LumpKind::Unknown(index)) => format!("lump {index}"),
        None => "read of".to_owned(),
    }
}

/// Bounds checked lookup into a lump's records.
pub(crate) fn lookup<'a, T>(records: &'a [T], index: i64, what: &'static str) -> BspResult<&'a T> {
    usize::try_from(index)
        .ok()
        .and_then(|i| records.get(i))
        .ok_or(BspError::IndexOutOfRange {
            what,
            index,
            len: records.len(),
        })
}
