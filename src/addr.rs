//! Logical-to-physical block address translation.
//!
//! A file-relative logical block index falls into one of four disjoint
//! ranges: the inode's direct array, or one of three indirection levels
//! whose chain blocks each hold [`PTRS_PER_BLOCK`] little-endian u64
//! pointers. [`classify`] derives the index tuple, [`locate`] walks the
//! chain top-down. Both operate on data-region-relative block numbers.

use crate::block_dev::{read_block, write_block, BlockDevice};
use crate::config::*;
use crate::structs::{Inode, SuperBlock};

/// Index tuple for one logical block: the indirection level plus the index
/// to take at each chain step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockPath {
    Direct(usize),
    Single(usize),
    Double(usize, usize),
    Triple(usize, usize, usize),
}

/// Derives the index tuple for `logical`. Indices past the structural file
/// limit cannot be produced by a well-formed inode and are fatal.
pub(crate) fn classify(logical: u64) -> BlockPath {
    let k = PTRS_PER_BLOCK as u64;
    if logical < DIRECT_BOUND {
        BlockPath::Direct(logical as usize)
    } else if logical < SINGLE_BOUND {
        BlockPath::Single((logical - DIRECT_BOUND) as usize)
    } else if logical < DOUBLE_BOUND {
        let inner = logical - SINGLE_BOUND;
        BlockPath::Double((inner / k) as usize, (inner % k) as usize)
    } else if logical < TRIPLE_BOUND {
        let inner = logical - DOUBLE_BOUND;
        BlockPath::Triple(
            (inner / (k * k)) as usize,
            ((inner / k) % k) as usize,
            (inner % k) as usize,
        )
    } else {
        panic!("logical block {logical} beyond the structural file limit");
    }
}

/// Reads one pointer slot out of an indirection block.
pub(crate) fn read_slot(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    table_block: u64,
    index: usize,
) -> u64 {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, superblock.data_start + table_block, &mut buf);
    let at = index * 8;
    u64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
}

/// Stores one pointer slot into an indirection block.
pub(crate) fn write_slot(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    table_block: u64,
    index: usize,
    value: u64,
) {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, superblock.data_start + table_block, &mut buf);
    let at = index * 8;
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
    write_block(device, superblock.data_start + table_block, &buf);
}

/// Resolves a logical block to its physical (data-region-relative) block
/// number. Read-only: every chain block on the path must already exist,
/// which callers guarantee by growing the file first.
pub(crate) fn locate(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode: &Inode,
    logical: u64,
) -> u64 {
    assert!(
        logical < inode.block_count,
        "logical block {logical} not backed by inode {} ({} blocks)",
        inode.ino,
        inode.block_count
    );
    match classify(logical) {
        BlockPath::Direct(i) => inode.direct[i],
        BlockPath::Single(i) => read_slot(device, superblock, inode.single, i),
        BlockPath::Double(i, j) => {
            let level1 = read_slot(device, superblock, inode.double, i);
            read_slot(device, superblock, level1, j)
        }
        BlockPath::Triple(i, j, l) => {
            let level2 = read_slot(device, superblock, inode.triple, i);
            let level1 = read_slot(device, superblock, level2, j);
            read_slot(device, superblock, level1, l)
        }
    }
}
