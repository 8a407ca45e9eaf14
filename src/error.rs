use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal source errors.
///
/// Per-frame corruption never surfaces here: a frame that cannot be fully
/// decapsulated is silently dropped and the source moves on.  These variants
/// cover the conditions that end a source entirely (bad capture-file header)
/// or force the caller to reconnect (stream desync, I/O).
#[derive(Debug, Error)]
pub enum Error {
    #[error("didn't understand magic number {0:x?}")]
    BadMagic([u8; 4]),
    #[error("unsupported link type {0}")]
    UnsupportedLinkType(u32),
    #[error("truncated capture file header")]
    TruncatedHeader,
    #[error("lost sync with the drone stream")]
    LostSync,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
