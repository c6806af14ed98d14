//! Shared test fixtures: an in-memory byte-addressed disk and helpers for
//! inspecting raw volume regions.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use quark::{BlockDevice, DeviceError, FileSystem, BLOCK_SIZE};

pub struct RamDisk {
    inner: Mutex<Vec<u8>>,
}

impl RamDisk {
    /// A zero-filled disk of `num_blocks` blocks.
    pub fn new(num_blocks: usize) -> Self {
        RamDisk {
            inner: Mutex::new(vec![0u8; num_blocks * BLOCK_SIZE]),
        }
    }
}

impl BlockDevice for RamDisk {
    fn total_bytes(&self) -> u64 {
        self.inner.lock().unwrap().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let data = self.inner.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(DeviceError::OutOfRange);
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let mut data = self.inner.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(DeviceError::OutOfRange);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Formats a fresh volume on a new RamDisk.
pub fn fresh_fs(total_blocks: u64, total_inodes: u32) -> FileSystem<RamDisk> {
    init();
    let disk = Arc::new(RamDisk::new(total_blocks as usize));
    FileSystem::format(disk, total_blocks, total_inodes).unwrap()
}

/// Raw bytes of a run of blocks, read straight off the device.
pub fn region_bytes(device: &RamDisk, start_block: u64, blocks: u64) -> Vec<u8> {
    let mut out = vec![0u8; (blocks as usize) * BLOCK_SIZE];
    device
        .read_at(start_block * BLOCK_SIZE as u64, &mut out)
        .unwrap();
    out
}

/// Both bitmap regions of a volume, for bit-for-bit comparisons.
pub fn bitmap_snapshot(fs: &FileSystem<RamDisk>) -> Vec<u8> {
    let sb = *fs.superblock();
    let device = fs.device();
    let mut snap = region_bytes(
        &device,
        sb.inode_bitmap_start,
        sb.inode_bitmap_blocks as u64,
    );
    snap.extend(region_bytes(
        &device,
        sb.block_bitmap_start,
        sb.block_bitmap_blocks as u64,
    ));
    snap
}

/// A patterned buffer whose content depends on position, so misplaced
/// blocks show up as mismatches.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
