//! The flat directory entry store.
//!
//! A directory's entries live packed inside its direct data blocks, four
//! per block, ordered only by insertion. `size` on a directory inode is the
//! entry count; removal keeps the array packed by moving the last entry
//! into the freed slot and returns a direct block to the bitmap once its
//! last occupant is gone.

use log::debug;

use crate::addr::locate;
use crate::bitmap::{free_block, free_inode};
use crate::block_dev::{read_block, write_block, BlockDevice};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::inode::{get_inode, grow, release_blocks, write_inode};
use crate::structs::{DirEntry, Inode, NodeKind, SuperBlock};

/// Reads the entry at `index`. The slot must exist.
pub(crate) fn entry_at(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    dir: &Inode,
    index: u64,
) -> DirEntry {
    assert!(index < dir.size, "entry {index} out of range in directory {}", dir.ino);
    let block = locate(device, superblock, dir, index / ENTRIES_PER_BLOCK as u64);
    let offset = (index as usize % ENTRIES_PER_BLOCK) * DIR_ENTRY_SIZE;
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, superblock.data_start + block, &mut buf);
    DirEntry::decode_from(&buf[offset..offset + DIR_ENTRY_SIZE])
}

/// Overwrites the slot at `index`. The backing block must exist; appends go
/// through [`append_entry`], which grows the directory first.
fn write_entry_at(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    dir: &Inode,
    index: u64,
    entry: &DirEntry,
) {
    let block_index = index / ENTRIES_PER_BLOCK as u64;
    assert!(
        block_index < dir.block_count,
        "entry {index} has no backing block in directory {}",
        dir.ino
    );
    let block = locate(device, superblock, dir, block_index);
    let offset = (index as usize % ENTRIES_PER_BLOCK) * DIR_ENTRY_SIZE;
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    read_block(device, superblock.data_start + block, &mut buf);
    entry.encode_into(&mut buf[offset..offset + DIR_ENTRY_SIZE]);
    write_block(device, superblock.data_start + block, &buf);
}

/// Linear scan, block by block, for the first entry matching `pred`.
pub(crate) fn find_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    dir: &Inode,
    pred: impl Fn(&DirEntry) -> bool,
) -> Option<(u64, DirEntry)> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    let mut index = 0u64;
    for block_index in 0..dir.size.div_ceil(ENTRIES_PER_BLOCK as u64) {
        let block = locate(device, superblock, dir, block_index);
        read_block(device, superblock.data_start + block, &mut buf);
        for slot in 0..ENTRIES_PER_BLOCK {
            if index >= dir.size {
                return None;
            }
            let at = slot * DIR_ENTRY_SIZE;
            let entry = DirEntry::decode_from(&buf[at..at + DIR_ENTRY_SIZE]);
            if pred(&entry) {
                return Some((index, entry));
            }
            index += 1;
        }
    }
    None
}

/// All entries in insertion order.
pub(crate) fn read_dir(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    dir: &Inode,
) -> Result<Vec<DirEntry>> {
    if dir.kind != NodeKind::Directory {
        return Err(FsError::NotDirectory);
    }
    let mut entries = Vec::with_capacity(dir.size as usize);
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for block_index in 0..dir.size.div_ceil(ENTRIES_PER_BLOCK as u64) {
        let block = locate(device, superblock, dir, block_index);
        read_block(device, superblock.data_start + block, &mut buf);
        for slot in 0..ENTRIES_PER_BLOCK {
            if entries.len() as u64 >= dir.size {
                break;
            }
            let at = slot * DIR_ENTRY_SIZE;
            entries.push(DirEntry::decode_from(&buf[at..at + DIR_ENTRY_SIZE]));
        }
    }
    Ok(entries)
}

/// Appends an entry at the tail of the packed array, growing the directory
/// by one direct block when the current tail block is full.
pub(crate) fn append_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    dir: &mut Inode,
    entry: &DirEntry,
) -> Result<()> {
    if dir.kind != NodeKind::Directory {
        return Err(FsError::NotDirectory);
    }
    if dir.size >= MAX_DIR_ENTRIES {
        return Err(FsError::DirectoryFull);
    }
    let index = dir.size;
    if index / ENTRIES_PER_BLOCK as u64 == dir.block_count {
        grow(device, superblock, dir, 1)?;
    }
    dir.size = index + 1;
    write_entry_at(device, superblock, dir, index, entry);
    write_inode(device, superblock, dir);
    Ok(())
}

/// Applies an in-place update to the entry naming `target_ino`. A resolved
/// inode whose parent has no entry for it is a dangling reference.
pub(crate) fn update_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    dir: &Inode,
    target_ino: u32,
    apply: impl FnOnce(&mut DirEntry),
) {
    let Some((index, mut entry)) = find_entry(device, superblock, dir, |e| e.ino == target_ino)
    else {
        panic!("directory {} has no entry for inode {target_ino}", dir.ino);
    };
    apply(&mut entry);
    write_entry_at(device, superblock, dir, index, &entry);
}

/// Removes the entry naming `target_ino` and reclaims what it referenced:
/// subdirectories take their entire subtree with them, regular files are
/// freed once their reference count allows it, symlinks always. The freed
/// slot is backfilled with the logically last entry to keep the array
/// packed, and a tail block left empty is returned to the bitmap.
pub(crate) fn remove_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    dir: &mut Inode,
    target_ino: u32,
) -> Result<()> {
    if dir.kind != NodeKind::Directory {
        return Err(FsError::NotDirectory);
    }
    let Some((index, entry)) = find_entry(device, superblock, dir, |e| e.ino == target_ino)
    else {
        panic!("directory {} has no entry for inode {target_ino}", dir.ino);
    };

    match entry.kind {
        NodeKind::Directory => release_tree(device, superblock, entry.ino),
        _ => release_node(device, superblock, entry.ino),
    }

    let last = dir.size - 1;
    if index != last {
        let tail = entry_at(device, superblock, dir, last);
        write_entry_at(device, superblock, dir, index, &tail);
    }
    dir.size = last;

    let needed_blocks = dir.size.div_ceil(ENTRIES_PER_BLOCK as u64);
    if needed_blocks < dir.block_count {
        let tail_block = (dir.block_count - 1) as usize;
        free_block(device, superblock, dir.direct[tail_block]);
        dir.direct[tail_block] = 0;
        dir.block_count -= 1;
    }
    write_inode(device, superblock, dir);
    Ok(())
}

/// Frees a regular file or symlink. Files with extra references only lose
/// one reference; the node survives until the count drops.
fn release_node(device: &impl BlockDevice, superblock: &SuperBlock, ino: u32) {
    let mut inode = get_inode(device, superblock, ino);
    if inode.kind == NodeKind::Regular && inode.refcount > 1 {
        inode.refcount -= 1;
        write_inode(device, superblock, &inode);
        return;
    }
    release_blocks(device, superblock, &mut inode);
    free_inode(device, superblock, ino);
}

/// Frees a whole directory subtree, the root of the subtree included. Uses
/// an explicit worklist so the walk is flat no matter how deep the tree is:
/// one pass discovers directories and frees plain files as it goes, then
/// the discovered directories are freed in reverse order, children before
/// parents.
pub(crate) fn release_tree(device: &impl BlockDevice, superblock: &SuperBlock, dir_ino: u32) {
    let mut dirs = vec![dir_ino];
    let mut next = 0;
    while next < dirs.len() {
        let dir = get_inode(device, superblock, dirs[next]);
        for index in 0..dir.size {
            let entry = entry_at(device, superblock, &dir, index);
            match entry.kind {
                NodeKind::Directory => dirs.push(entry.ino),
                _ => release_node(device, superblock, entry.ino),
            }
        }
        next += 1;
    }
    for &ino in dirs.iter().rev() {
        let mut dir = get_inode(device, superblock, ino);
        release_blocks(device, superblock, &mut dir);
        free_inode(device, superblock, ino);
    }
    debug!("released subtree at inode {dir_ino}: {} directories", dirs.len());
}
