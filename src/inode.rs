//! Inode record I/O, file growth, and block release.

use log::trace;

use crate::addr::{classify, locate, read_slot, write_slot, BlockPath};
use crate::bitmap::{allocate_block, free_block};
use crate::block_dev::{read_block, write_block, BlockDevice};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{Inode, NodeKind, SuperBlock};

fn table_slot(superblock: &SuperBlock, ino: u32) -> (u64, usize) {
    assert!(ino < superblock.total_inodes, "inode {ino} out of range");
    let block = superblock.inode_table_start + (ino as usize / INODES_PER_BLOCK) as u64;
    let offset = (ino as usize % INODES_PER_BLOCK) * INODE_SIZE;
    (block, offset)
}

/// Reads an inode record from the table.
pub fn get_inode(device: &impl BlockDevice, superblock: &SuperBlock, ino: u32) -> Inode {
    let (block, offset) = table_slot(superblock, ino);
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, block, &mut buf);
    Inode::decode_from(&buf[offset..offset + INODE_SIZE])
}

/// Persists an inode record into the table.
pub fn write_inode(device: &impl BlockDevice, superblock: &SuperBlock, inode: &Inode) {
    let (block, offset) = table_slot(superblock, inode.ino);
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, block, &mut buf);
    inode.encode_into(&mut buf[offset..offset + INODE_SIZE]);
    write_block(device, block, &buf);
}

/// Ordered indirection levels, each entry the exclusive upper bound of the
/// logical-block range the level covers. Growth fills the remaining
/// capacity of the current level before advancing to the next.
const LEVEL_BOUNDS: [u64; 4] = [DIRECT_BOUND, SINGLE_BOUND, DOUBLE_BOUND, TRIPLE_BOUND];

/// Extends `inode` by exactly `additional` data blocks, allocating
/// indirection chain blocks lazily as each level is entered. All-or-nothing:
/// requests that cannot fit fail before anything is allocated. The updated
/// inode is persisted before returning.
pub(crate) fn grow(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode: &mut Inode,
    additional: u64,
) -> Result<()> {
    if additional == 0 {
        return Ok(());
    }
    let target = inode.block_count + additional;
    if inode.kind == NodeKind::Directory {
        // Directories never escalate past their direct blocks.
        if target > DIRECT_BOUND {
            return Err(FsError::DirectoryFull);
        }
    } else if target > MAX_FILE_BLOCKS {
        return Err(FsError::FileTooLarge);
    }

    for bound in LEVEL_BOUNDS {
        while inode.block_count < bound && inode.block_count < target {
            attach_next(device, superblock, inode);
        }
        if inode.block_count == target {
            break;
        }
    }
    write_inode(device, superblock, inode);
    trace!("grew inode {} to {} blocks", inode.ino, inode.block_count);
    Ok(())
}

/// Allocates and attaches the next logical block. Growth is strictly
/// sequential, so a chain block needs allocating exactly when every index
/// below it in the tuple is zero.
fn attach_next(device: &impl BlockDevice, superblock: &SuperBlock, inode: &mut Inode) {
    match classify(inode.block_count) {
        BlockPath::Direct(i) => {
            inode.direct[i] = allocate_block(device, superblock);
        }
        BlockPath::Single(i) => {
            if i == 0 {
                inode.single = allocate_block(device, superblock);
            }
            let block = allocate_block(device, superblock);
            write_slot(device, superblock, inode.single, i, block);
        }
        BlockPath::Double(i, j) => {
            if i == 0 && j == 0 {
                inode.double = allocate_block(device, superblock);
            }
            let level1 = if j == 0 {
                let fresh = allocate_block(device, superblock);
                write_slot(device, superblock, inode.double, i, fresh);
                fresh
            } else {
                read_slot(device, superblock, inode.double, i)
            };
            let block = allocate_block(device, superblock);
            write_slot(device, superblock, level1, j, block);
        }
        BlockPath::Triple(i, j, l) => {
            if i == 0 && j == 0 && l == 0 {
                inode.triple = allocate_block(device, superblock);
            }
            let level2 = if j == 0 && l == 0 {
                let fresh = allocate_block(device, superblock);
                write_slot(device, superblock, inode.triple, i, fresh);
                fresh
            } else {
                read_slot(device, superblock, inode.triple, i)
            };
            let level1 = if l == 0 {
                let fresh = allocate_block(device, superblock);
                write_slot(device, superblock, level2, j, fresh);
                fresh
            } else {
                read_slot(device, superblock, level2, j)
            };
            let block = allocate_block(device, superblock);
            write_slot(device, superblock, level1, l, block);
        }
    }
    inode.block_count += 1;
}

/// Returns every data block and every indirection chain block of `inode` to
/// the bitmap and clears the pointer fields. The record itself stays; the
/// caller usually frees it next.
pub(crate) fn release_blocks(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode: &mut Inode,
) {
    let k = PTRS_PER_BLOCK as u64;

    // Data blocks first; clearing bitmap bits leaves the chain contents
    // readable for the walk.
    for logical in 0..inode.block_count {
        let block = locate(device, superblock, inode, logical);
        free_block(device, superblock, block);
    }

    if inode.block_count > DIRECT_BOUND {
        free_block(device, superblock, inode.single);
    }
    if inode.block_count > SINGLE_BOUND {
        let spanned = inode.block_count - SINGLE_BOUND;
        for i in 0..spanned.div_ceil(k) {
            let level1 = read_slot(device, superblock, inode.double, i as usize);
            free_block(device, superblock, level1);
        }
        free_block(device, superblock, inode.double);
    }
    if inode.block_count > DOUBLE_BOUND {
        let spanned = inode.block_count - DOUBLE_BOUND;
        for i in 0..spanned.div_ceil(k * k) {
            let level2 = read_slot(device, superblock, inode.triple, i as usize);
            let within = (spanned - i * k * k).min(k * k);
            for j in 0..within.div_ceil(k) {
                let level1 = read_slot(device, superblock, level2, j as usize);
                free_block(device, superblock, level1);
            }
            free_block(device, superblock, level2);
        }
        free_block(device, superblock, inode.triple);
    }

    trace!("released {} blocks of inode {}", inode.block_count, inode.ino);
    inode.size = 0;
    inode.block_count = 0;
    inode.direct = [0; NUM_DIRECT];
    inode.single = 0;
    inode.double = 0;
    inode.triple = 0;
}
