//! Status codes for the recoverable error class.
//!
//! Every variant here is an ordinary outcome the caller can act on; no
//! on-disk state is damaged when one is returned. Conditions that are
//! structurally impossible on a healthy volume (device I/O failure, bitmap
//! exhaustion, a dangling directory reference, an undecodable record) are
//! not represented: those panic at the point of detection and are never
//! caught inside the engine.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    NotDirectory,
    NotRegular,
    NotSymlink,
    /// Operation not applicable to this node kind (e.g. removing the root).
    InvalidKind,
    /// Empty name, or longer than the fixed name field.
    InvalidName,
    DirectoryFull,
    FileTooLarge,
    TargetTooLong,
    StaleHandle,
    BadSuperblock,
    VolumeTooSmall,
}

pub type Result<T> = core::result::Result<T, FsError>;
