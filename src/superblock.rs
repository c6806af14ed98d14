//! Volume layout computation and superblock I/O.
//!
//! The region layout is computed once at format time and never changes
//! afterwards; every other module addresses the volume through the start
//! pointers recorded here. The superblock carries no mutable counters,
//! free state lives only in the bitmaps.

use log::{debug, info};

use crate::block_dev::{read_block, write_block, zero_block, BlockDevice};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::SuperBlock;

/// Lays out a volume of `total_blocks` blocks holding `total_inodes` inodes:
/// superblock, inode bitmap, block bitmap, inode table, data region.
pub(crate) fn compute_layout(total_blocks: u64, total_inodes: u32) -> SuperBlock {
    let bits_per_block = (BLOCK_SIZE * 8) as u64;
    let inode_bitmap_blocks = (total_inodes as u64).div_ceil(bits_per_block) as u32;
    let block_bitmap_blocks = total_blocks.div_ceil(bits_per_block) as u32;
    let inode_table_blocks = (total_inodes as u64).div_ceil(INODES_PER_BLOCK as u64);

    let inode_bitmap_start = SUPERBLOCK_BLOCK + 1;
    let block_bitmap_start = inode_bitmap_start + inode_bitmap_blocks as u64;
    let inode_table_start = block_bitmap_start + block_bitmap_blocks as u64;
    let data_start = inode_table_start + inode_table_blocks;

    SuperBlock {
        magic: MAGIC,
        version: VERSION,
        block_size: BLOCK_SIZE as u32,
        total_blocks,
        total_inodes,
        disk_bytes: total_blocks * BLOCK_SIZE as u64,
        inode_bitmap_blocks,
        block_bitmap_blocks,
        inode_bitmap_start,
        block_bitmap_start,
        inode_table_start,
        data_start,
    }
}

/// Writes a fresh volume skeleton: superblock, zeroed bitmaps, zeroed inode
/// table. Data blocks are zeroed lazily at allocation.
pub(crate) fn format_volume(
    device: &impl BlockDevice,
    total_blocks: u64,
    total_inodes: u32,
) -> Result<SuperBlock> {
    if total_inodes == 0 {
        return Err(FsError::VolumeTooSmall);
    }
    let superblock = compute_layout(total_blocks, total_inodes);
    if superblock.data_start >= total_blocks {
        return Err(FsError::VolumeTooSmall);
    }
    if device.total_bytes() < superblock.disk_bytes {
        return Err(FsError::VolumeTooSmall);
    }

    write_superblock(device, &superblock);
    for block in superblock.inode_bitmap_start..superblock.data_start {
        zero_block(device, block);
    }

    info!(
        "formatted volume: {} blocks, {} inodes, data region at block {} ({} data blocks)",
        total_blocks,
        total_inodes,
        superblock.data_start,
        superblock.data_blocks()
    );
    Ok(superblock)
}

/// Reads and validates the superblock of an existing volume.
pub fn read_superblock(device: &impl BlockDevice) -> Result<SuperBlock> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, SUPERBLOCK_BLOCK, &mut buf);
    let superblock = SuperBlock::decode_from(&buf);

    if superblock.magic != MAGIC
        || superblock.version != VERSION
        || superblock.block_size != BLOCK_SIZE as u32
        || superblock.data_start >= superblock.total_blocks
    {
        return Err(FsError::BadSuperblock);
    }
    debug!(
        "read superblock: {} blocks, {} inodes",
        superblock.total_blocks, superblock.total_inodes
    );
    Ok(superblock)
}

pub fn write_superblock(device: &impl BlockDevice, superblock: &SuperBlock) {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    superblock.encode_into(&mut buf);
    write_block(device, SUPERBLOCK_BLOCK, &buf);
}
