//! Quark is a compact block-oriented filesystem engine: classic Unix-style
//! inodes with four-level block indirection, bitmap free-space tracking,
//! and flat directory entry arrays, addressed through a byte-oriented
//! block device the mounter provides.
//!
//! Quark's linear on-disk layout (1,024-byte blocks):
//! - Superblock
//! - Inode Bitmap
//! - Block Bitmap
//! - Inode Table
//! - Data Blocks
//!
//! Quark's layers (from bottom to top):
//! 1. Block Device: byte-addressed storage abstraction.   | User implemented (hardware-specific)
//! 2. Bitmaps: free/used tracking of inodes and blocks.   | Fs implemented
//! 3. Inode: metadata, growth, and address translation.   | Fs implemented
//! 4. Directory: packed entry arrays with compaction.     | Fs implemented
//! 5. File: byte-granularity reads and writes.            | Fs implemented
//! 6. FileSystem: locked per-volume operation table.      | Consumed by a path-resolution layer
//!
//! Operations address nodes by inode number; resolving multi-component
//! paths to nodes is the caller's job. Recoverable conditions come back as
//! [`FsError`] statuses, consistency violations halt by panicking.

mod addr;
mod bitmap;
mod block_dev;
mod config;
mod directory;
mod error;
mod file;
mod fs;
mod inode;
mod registry;
mod structs;
mod superblock;

pub use block_dev::{BlockDevice, DeviceError};
pub use config::*;
pub use error::FsError as Error;
pub use error::{FsError, Result};
pub use fs::{FileSystem, Handle};
pub use inode::{get_inode, write_inode};
pub use registry::{MountTable, VolumeId};
pub use structs::{DirEntry, Inode, NodeKind, SuperBlock};
pub use superblock::{read_superblock, write_superblock};
