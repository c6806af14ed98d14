//! Byte-addressed device interface and the whole-block shim on top of it.
//!
//! The engine never touches the storage medium directly; everything goes
//! through [`BlockDevice`], and always in whole-block units. A device
//! failure is fatal: the shim helpers panic instead of propagating, since
//! every status the engine can return promises that no on-disk state was
//! damaged.

use crate::config::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The requested range lies outside the medium.
    OutOfRange,
    /// The medium failed to complete the transfer.
    Io,
}

pub trait BlockDevice: Send + Sync {
    /// Total capacity of the medium in bytes.
    fn total_bytes(&self) -> u64;

    /// Reads `buf.len()` bytes starting at the absolute byte `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> core::result::Result<(), DeviceError>;

    /// Writes `buf` starting at the absolute byte `offset`.
    fn write_at(&self, offset: u64, buf: &[u8]) -> core::result::Result<(), DeviceError>;

    /// Persists any buffered writes to the medium.
    fn flush(&self) -> core::result::Result<(), DeviceError>;
}

/// Reads one whole block at the absolute block number `block`.
pub(crate) fn read_block(device: &impl BlockDevice, block: u64, buf: &mut [u8; BLOCK_SIZE]) {
    let offset = block * BLOCK_SIZE as u64;
    if let Err(e) = device.read_at(offset, buf) {
        panic!("device read failed at block {block}: {e:?}");
    }
}

/// Writes one whole block at the absolute block number `block`.
pub(crate) fn write_block(device: &impl BlockDevice, block: u64, buf: &[u8; BLOCK_SIZE]) {
    let offset = block * BLOCK_SIZE as u64;
    if let Err(e) = device.write_at(offset, buf) {
        panic!("device write failed at block {block}: {e:?}");
    }
}

/// Zero-fills one whole block.
pub(crate) fn zero_block(device: &impl BlockDevice, block: u64) {
    write_block(device, block, &[0u8; BLOCK_SIZE]);
}

#[cfg(test)]
pub(crate) mod testdev {
    use super::*;
    use std::sync::Mutex;

    /// In-memory device for unit tests of crate-internal items. The
    /// integration suite carries its own RamDisk under tests/.
    pub(crate) struct MemDisk {
        inner: Mutex<Vec<u8>>,
    }

    impl MemDisk {
        pub(crate) fn new(num_blocks: usize) -> Self {
            MemDisk {
                inner: Mutex::new(vec![0u8; num_blocks * BLOCK_SIZE]),
            }
        }
    }

    impl BlockDevice for MemDisk {
        fn total_bytes(&self) -> u64 {
            self.inner.lock().unwrap().len() as u64
        }

        fn read_at(&self, offset: u64, buf: &mut [u8]) -> core::result::Result<(), DeviceError> {
            let data = self.inner.lock().unwrap();
            let start = offset as usize;
            let end = start + buf.len();
            if end > data.len() {
                return Err(DeviceError::OutOfRange);
            }
            buf.copy_from_slice(&data[start..end]);
            Ok(())
        }

        fn write_at(&self, offset: u64, buf: &[u8]) -> core::result::Result<(), DeviceError> {
            let mut data = self.inner.lock().unwrap();
            let start = offset as usize;
            let end = start + buf.len();
            if end > data.len() {
                return Err(DeviceError::OutOfRange);
            }
            data[start..end].copy_from_slice(buf);
            Ok(())
        }

        fn flush(&self) -> core::result::Result<(), DeviceError> {
            Ok(())
        }
    }
}
