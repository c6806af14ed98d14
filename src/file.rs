//! Byte-granularity reads and writes on top of block translation.
//!
//! Both directions walk the affected blocks in order, copying up to a block
//! per step; the in-block offset only matters for the first block and is
//! zero afterwards. The walk runs while bytes remain, so the last touched
//! block index is ceil((offset + len) / block_size) - 1 regardless of
//! alignment. Writes back every block in range before copying: there are
//! no holes, a logical block inside the range is always allocated.

use crate::addr::locate;
use crate::block_dev::{read_block, write_block, BlockDevice};
use crate::config::BLOCK_SIZE;
use crate::error::Result;
use crate::inode::{grow, write_inode};
use crate::structs::{Inode, SuperBlock};

/// Reads up to `buf.len()` bytes starting at `offset`, clamped to the end
/// of the node's data. Returns the number of bytes read.
pub(crate) fn read_at(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode: &Inode,
    offset: u64,
    buf: &mut [u8],
) -> usize {
    if offset >= inode.size {
        return 0;
    }
    let len = buf.len().min((inode.size - offset) as usize);
    let mut block_buf = Box::new([0u8; BLOCK_SIZE]);
    let mut done = 0;
    let mut pos = offset;
    while done < len {
        let in_block = (pos % BLOCK_SIZE as u64) as usize;
        let chunk = (BLOCK_SIZE - in_block).min(len - done);
        let block = locate(device, superblock, inode, pos / BLOCK_SIZE as u64);
        read_block(device, superblock.data_start + block, &mut block_buf);
        buf[done..done + chunk].copy_from_slice(&block_buf[in_block..in_block + chunk]);
        done += chunk;
        pos += chunk as u64;
    }
    len
}

/// Writes `buf` at `offset`, growing the node first so that every block in
/// the written range is backed, then extends `size` if the write passed the
/// old end and persists the inode. The caller owns mirroring the new size
/// into the parent directory's entry.
pub(crate) fn write_at(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    inode: &mut Inode,
    offset: u64,
    buf: &[u8],
) -> Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let end = offset + buf.len() as u64;
    let needed = end.div_ceil(BLOCK_SIZE as u64);
    if needed > inode.block_count {
        grow(device, superblock, inode, needed - inode.block_count)?;
    }

    let mut block_buf = Box::new([0u8; BLOCK_SIZE]);
    let mut done = 0;
    let mut pos = offset;
    while done < buf.len() {
        let in_block = (pos % BLOCK_SIZE as u64) as usize;
        let chunk = (BLOCK_SIZE - in_block).min(buf.len() - done);
        let block = locate(device, superblock, inode, pos / BLOCK_SIZE as u64);
        if chunk < BLOCK_SIZE {
            // Partial block: keep the surrounding bytes.
            read_block(device, superblock.data_start + block, &mut block_buf);
        }
        block_buf[in_block..in_block + chunk].copy_from_slice(&buf[done..done + chunk]);
        write_block(device, superblock.data_start + block, &block_buf);
        done += chunk;
        pos += chunk as u64;
    }

    if end > inode.size {
        inode.size = end;
    }
    write_inode(device, superblock, inode);
    Ok(buf.len())
}
