//! On-disk record types and their codecs.
//!
//! Records are encoded and decoded explicitly at the block-I/O boundary
//! (little-endian, fixed-width integers via bincode); a raw block buffer is
//! never reinterpreted in place. Each record owns a fixed slot:
//! the superblock fills block 0, inodes occupy [`INODE_SIZE`] bytes in the
//! inode table, directory entries occupy [`DIR_ENTRY_SIZE`] bytes inside a
//! directory's direct blocks. Encoded records are shorter than their slot;
//! the remainder stays zero.

use serde::{Deserialize, Serialize};

use crate::config::*;
use crate::error::{FsError, Result};

/// Adapter for the fixed 128-byte name fields: encodes the array verbatim,
/// element by element, with no length prefix.
mod fixed_bytes {
    use core::fmt;
    use serde::de::{SeqAccess, Visitor};
    use serde::ser::SerializeTuple;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], ser: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = ser.serialize_tuple(N)?;
        for b in bytes {
            tup.serialize_element(b)?;
        }
        tup.end()
    }

    pub fn deserialize<'de, D, const N: usize>(de: D) -> core::result::Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ArrayVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for ArrayVisitor<N> {
            type Value = [u8; N];

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "an array of {N} bytes")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> core::result::Result<Self::Value, A::Error> {
                let mut out = [0u8; N];
                for (i, slot) in out.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                }
                Ok(out)
            }
        }

        de.deserialize_tuple(N, ArrayVisitor::<N>)
    }
}

/// Node type tag. `Free` (the zero tag) marks an unallocated inode slot, so
/// a zero-filled record decodes as free.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Free = 0,
    Directory = 1,
    Regular = 2,
    Symlink = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub magic: u32,
    pub version: u32,
    pub block_size: u32,
    pub total_blocks: u64,
    pub total_inodes: u32,
    pub disk_bytes: u64,
    pub inode_bitmap_blocks: u32,
    pub block_bitmap_blocks: u32,
    pub inode_bitmap_start: u64,
    pub block_bitmap_start: u64,
    pub inode_table_start: u64,
    pub data_start: u64,
}

impl SuperBlock {
    /// Number of blocks in the data region.
    pub fn data_blocks(&self) -> u64 {
        self.total_blocks - self.data_start
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8; BLOCK_SIZE]) {
        encode_record(self, buf, "superblock");
    }

    pub(crate) fn decode_from(buf: &[u8; BLOCK_SIZE]) -> Self {
        decode_record(buf, "superblock")
    }
}

/// On-disk inode. `block_count` counts data blocks only; the indirection
/// blocks backing them are tracked by the pointer chain itself. For
/// directories `size` is the number of entries, for files and symlinks the
/// byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    pub uid: u32,
    pub ino: u32,
    pub parent: u32,
    pub kind: NodeKind,
    pub refcount: u32,
    #[serde(with = "fixed_bytes")]
    pub name: [u8; NAME_LEN],
    pub size: u64,
    pub block_count: u64,
    pub direct: [u64; NUM_DIRECT],
    pub single: u64,
    pub double: u64,
    pub triple: u64,
}

impl Inode {
    /// A fully zeroed record carrying only its own number.
    pub(crate) fn zeroed(ino: u32) -> Self {
        Inode {
            uid: 0,
            ino,
            parent: 0,
            kind: NodeKind::Free,
            refcount: 0,
            name: [0; NAME_LEN],
            size: 0,
            block_count: 0,
            direct: [0; NUM_DIRECT],
            single: 0,
            double: 0,
            triple: 0,
        }
    }

    /// Name with trailing zero padding stripped.
    pub fn name_bytes(&self) -> &[u8] {
        trim_zeros(&self.name)
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8]) {
        encode_record(self, buf, "inode");
    }

    pub(crate) fn decode_from(buf: &[u8]) -> Self {
        decode_record(buf, "inode")
    }
}

/// Directory entry. `dev` is kept for layout compatibility with device-file
/// entries and is always zero here. `size` mirrors the child inode's size
/// at the time the child's data was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    #[serde(with = "fixed_bytes")]
    pub name: [u8; NAME_LEN],
    pub ino: u32,
    pub parent: u32,
    pub kind: NodeKind,
    pub dev: u32,
    pub size: u64,
}

impl DirEntry {
    pub fn new(ino: u32, parent: u32, kind: NodeKind, name: &str) -> Result<Self> {
        Ok(DirEntry {
            name: name_field(name)?,
            ino,
            parent,
            kind,
            dev: 0,
            size: 0,
        })
    }

    /// Name with trailing zero padding stripped.
    pub fn name_bytes(&self) -> &[u8] {
        trim_zeros(&self.name)
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8]) {
        encode_record(self, buf, "directory entry");
    }

    pub(crate) fn decode_from(buf: &[u8]) -> Self {
        decode_record(buf, "directory entry")
    }
}

/// Builds a fixed name field, rejecting empty and oversized names.
pub(crate) fn name_field(name: &str) -> Result<[u8; NAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > NAME_LEN {
        return Err(FsError::InvalidName);
    }
    let mut field = [0u8; NAME_LEN];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

pub(crate) fn trim_zeros(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

fn encode_record<T: Serialize>(record: &T, buf: &mut [u8], what: &str) {
    buf.fill(0);
    if let Err(e) = bincode::serialize_into(&mut buf[..], record) {
        panic!("{what} record does not fit its slot: {e}");
    }
}

fn decode_record<'de, T: Deserialize<'de>>(buf: &'de [u8], what: &str) -> T {
    match bincode::deserialize(buf) {
        Ok(record) => record,
        Err(e) => panic!("corrupt {what} record: {e}"),
    }
}
