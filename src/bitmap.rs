//! Bitmap-based free-space tracking for inodes and data blocks.
//!
//! One bit per entity, packed into whole blocks. Allocation scans the
//! region byte by byte, skipping full bytes, and takes the lowest zero bit,
//! so entity numbers are handed out deterministically lowest-first.
//! Exhausting a region is a configuration error, not a recoverable one:
//! the scan panics rather than returning a status.

use log::trace;

use crate::block_dev::{read_block, write_block, zero_block, BlockDevice};
use crate::config::*;
use crate::structs::{Inode, SuperBlock};

/// Scans the bitmap region for the lowest zero bit, sets it, and returns
/// its index. `total` caps the usable bit range; the tail bits of the last
/// bitmap block are never handed out.
fn set_first_zero_bit(
    device: &impl BlockDevice,
    region_start: u64,
    region_blocks: u32,
    total: u64,
    what: &str,
) -> u64 {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for block in 0..region_blocks as u64 {
        read_block(device, region_start + block, &mut buf);
        for byte in 0..BLOCK_SIZE {
            if buf[byte] == 0xFF {
                continue;
            }
            for bit in 0..8 {
                let index = block * (8 * BLOCK_SIZE) as u64 + (byte * 8 + bit) as u64;
                if index >= total {
                    panic!("out of {what}: all {total} in use");
                }
                if buf[byte] & (1 << bit) == 0 {
                    buf[byte] |= 1 << bit;
                    write_block(device, region_start + block, &buf);
                    return index;
                }
            }
        }
    }
    panic!("out of {what}: all {total} in use");
}

/// Clears one bit. Clearing a bit that is not set means an entity was freed
/// twice, which is a corruption of the ownership invariant.
fn clear_bit(device: &impl BlockDevice, region_start: u64, index: u64, what: &str) {
    let bits_per_block = (8 * BLOCK_SIZE) as u64;
    let block = index / bits_per_block;
    let byte = (index % bits_per_block) as usize / 8;
    let bit = (index % 8) as u8;

    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, region_start + block, &mut buf);
    assert!(buf[byte] & (1 << bit) != 0, "double free of {what} {index}");
    buf[byte] &= !(1 << bit);
    write_block(device, region_start + block, &buf);
}

/// Allocates one data block and zero-fills it. The returned number is
/// relative to the data region start.
pub(crate) fn allocate_block(device: &impl BlockDevice, superblock: &SuperBlock) -> u64 {
    let block = set_first_zero_bit(
        device,
        superblock.block_bitmap_start,
        superblock.block_bitmap_blocks,
        superblock.data_blocks(),
        "data blocks",
    );
    zero_block(device, superblock.data_start + block);
    trace!("allocated data block {block}");
    block
}

/// Returns a data-region block to the bitmap.
pub(crate) fn free_block(device: &impl BlockDevice, superblock: &SuperBlock, block: u64) {
    assert!(block < superblock.data_blocks(), "freeing data block {block} out of range");
    clear_bit(device, superblock.block_bitmap_start, block, "data block");
    trace!("freed data block {block}");
}

/// Allocates an inode number and returns it with a zeroed record. The
/// caller populates and persists the record; the on-disk slot is already
/// zero because frees scrub it.
pub(crate) fn allocate_inode(device: &impl BlockDevice, superblock: &SuperBlock) -> (u32, Inode) {
    let ino = set_first_zero_bit(
        device,
        superblock.inode_bitmap_start,
        superblock.inode_bitmap_blocks,
        superblock.total_inodes as u64,
        "inodes",
    ) as u32;
    trace!("allocated inode {ino}");
    (ino, Inode::zeroed(ino))
}

/// Returns an inode number to the bitmap and zero-fills its record slot, so
/// a later allocation never observes stale metadata.
pub(crate) fn free_inode(device: &impl BlockDevice, superblock: &SuperBlock, ino: u32) {
    assert!(ino < superblock.total_inodes, "freeing inode {ino} out of range");
    clear_bit(device, superblock.inode_bitmap_start, ino as u64, "inode");

    let block = superblock.inode_table_start + (ino as usize / INODES_PER_BLOCK) as u64;
    let offset = (ino as usize % INODES_PER_BLOCK) * INODE_SIZE;
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, block, &mut buf);
    buf[offset..offset + INODE_SIZE].fill(0);
    write_block(device, block, &buf);
    trace!("freed inode {ino}");
}
