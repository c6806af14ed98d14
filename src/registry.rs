//! Registry of mounted volumes.
//!
//! Whoever mounts volumes holds a [`MountTable`] and addresses them by the
//! id assigned at mount time. The table is sized dynamically; nothing here
//! is process-global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::block_dev::BlockDevice;
use crate::error::Result;
use crate::fs::FileSystem;

pub type VolumeId = u64;

pub struct MountTable<D: BlockDevice> {
    inner: Mutex<TableInner<D>>,
}

struct TableInner<D: BlockDevice> {
    volumes: HashMap<VolumeId, Arc<FileSystem<D>>>,
    next_id: VolumeId,
}

impl<D: BlockDevice> MountTable<D> {
    pub fn new() -> Self {
        MountTable {
            inner: Mutex::new(TableInner {
                volumes: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Formats the device and registers the fresh volume.
    pub fn format(
        &self,
        device: Arc<D>,
        total_blocks: u64,
        total_inodes: u32,
    ) -> Result<(VolumeId, Arc<FileSystem<D>>)> {
        let volume = Arc::new(FileSystem::format(device, total_blocks, total_inodes)?);
        Ok(self.register(volume))
    }

    /// Mounts an existing volume and registers it.
    pub fn mount(&self, device: Arc<D>) -> Result<(VolumeId, Arc<FileSystem<D>>)> {
        let volume = Arc::new(FileSystem::mount(device)?);
        Ok(self.register(volume))
    }

    fn register(&self, volume: Arc<FileSystem<D>>) -> (VolumeId, Arc<FileSystem<D>>) {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.volumes.insert(id, Arc::clone(&volume));
        (id, volume)
    }

    pub fn get(&self, id: VolumeId) -> Option<Arc<FileSystem<D>>> {
        self.inner.lock().unwrap().volumes.get(&id).cloned()
    }

    /// Drops the registration. Callers still holding the Arc keep a usable
    /// volume; the table just stops answering for the id.
    pub fn unmount(&self, id: VolumeId) -> Option<Arc<FileSystem<D>>> {
        self.inner.lock().unwrap().volumes.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: BlockDevice> Default for MountTable<D> {
    fn default() -> Self {
        Self::new()
    }
}
