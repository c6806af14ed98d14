//! The per-volume context and the lifecycle operation table.
//!
//! A [`FileSystem`] owns its device handle, its immutable superblock, and
//! one coarse lock; every operation acquires that lock for its full
//! duration, so all effects on a volume are observable in strict call
//! order. Operations address nodes by inode number: name resolution of
//! multi-component paths is the caller's job, the engine never parses
//! paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::bitmap::allocate_inode;
use crate::block_dev::BlockDevice;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{name_field, DirEntry, Inode, NodeKind, SuperBlock};
use crate::{directory, file, inode, superblock};

/// An open-node handle, valid until passed back to [`FileSystem::close`].
pub type Handle = u64;

struct VolumeState {
    handles: HashMap<Handle, u32>,
    next_handle: Handle,
}

pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    superblock: SuperBlock,
    state: Mutex<VolumeState>,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Formats the device and mounts the fresh volume. The root directory
    /// is created as inode 0 with itself as parent.
    pub fn format(device: Arc<D>, total_blocks: u64, total_inodes: u32) -> Result<Self> {
        let sb = superblock::format_volume(&*device, total_blocks, total_inodes)?;

        let (ino, mut root) = allocate_inode(&*device, &sb);
        assert_eq!(ino, ROOT_INO, "fresh volume did not hand out inode 0 first");
        root.kind = NodeKind::Directory;
        root.parent = ROOT_INO;
        root.refcount = 1;
        root.name = name_field("/")?;
        inode::write_inode(&*device, &sb, &root);

        Ok(Self::assemble(device, sb))
    }

    /// Mounts an existing volume, validating its superblock.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        let sb = superblock::read_superblock(&*device)?;
        info!("mounted volume: {} blocks, {} inodes", sb.total_blocks, sb.total_inodes);
        Ok(Self::assemble(device, sb))
    }

    fn assemble(device: Arc<D>, sb: SuperBlock) -> Self {
        FileSystem {
            device,
            superblock: sb,
            state: Mutex::new(VolumeState {
                handles: HashMap::new(),
                next_handle: 1,
            }),
        }
    }

    /// Loads a live inode; a number outside the table or naming a free slot
    /// is `NotFound`.
    fn load(&self, ino: u32) -> Result<Inode> {
        if ino >= self.superblock.total_inodes {
            return Err(FsError::NotFound);
        }
        let node = inode::get_inode(&*self.device, &self.superblock, ino);
        if node.kind == NodeKind::Free {
            return Err(FsError::NotFound);
        }
        Ok(node)
    }

    fn load_dir(&self, ino: u32) -> Result<Inode> {
        let dir = self.load(ino)?;
        if dir.kind != NodeKind::Directory {
            return Err(FsError::NotDirectory);
        }
        Ok(dir)
    }

    /// Loads the parent directory of a live node. The parent pointer of a
    /// live node must name a live directory; anything else is corruption.
    fn load_parent(&self, node: &Inode) -> Inode {
        let parent = inode::get_inode(&*self.device, &self.superblock, node.parent);
        assert!(
            parent.kind == NodeKind::Directory,
            "inode {} has parent {} which is not a directory",
            node.ino,
            node.parent
        );
        parent
    }

    /// Finds `name` in `parent`. Absence is an ordinary outcome, not an
    /// error.
    pub fn lookup(&self, parent: u32, name: &str) -> Result<Option<u32>> {
        let _vol = self.state.lock().unwrap();
        let dir = self.load_dir(parent)?;
        let found = directory::find_entry(&*self.device, &self.superblock, &dir, |e| {
            e.name_matches(name)
        });
        Ok(found.map(|(_, entry)| entry.ino))
    }

    /// Creates a directory or regular file under `parent`.
    pub fn create(&self, parent: u32, name: &str, kind: NodeKind) -> Result<u32> {
        let _vol = self.state.lock().unwrap();
        if !matches!(kind, NodeKind::Directory | NodeKind::Regular) {
            return Err(FsError::InvalidKind);
        }
        let name_bytes = name_field(name)?;
        let mut dir = self.load_dir(parent)?;
        if directory::find_entry(&*self.device, &self.superblock, &dir, |e| e.name_matches(name))
            .is_some()
        {
            return Err(FsError::AlreadyExists);
        }
        // Capacity is checked before the inode is allocated so a full
        // directory leaves nothing behind.
        if dir.size >= MAX_DIR_ENTRIES {
            return Err(FsError::DirectoryFull);
        }

        let (ino, mut node) = allocate_inode(&*self.device, &self.superblock);
        node.kind = kind;
        node.parent = parent;
        node.refcount = 1;
        node.name = name_bytes;
        inode::write_inode(&*self.device, &self.superblock, &node);

        let entry = DirEntry::new(ino, parent, kind, name)?;
        directory::append_entry(&*self.device, &self.superblock, &mut dir, &entry)?;
        debug!("created {kind:?} '{name}' as inode {ino} under {parent}");
        Ok(ino)
    }

    /// Reads from a regular file. Returns the number of bytes read, which
    /// is short when the range passes the end of the file.
    pub fn read(&self, node: u32, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let _vol = self.state.lock().unwrap();
        let inode = self.load(node)?;
        if inode.kind != NodeKind::Regular {
            return Err(FsError::NotRegular);
        }
        Ok(file::read_at(&*self.device, &self.superblock, &inode, offset, buf))
    }

    /// Writes to a regular file, growing it as needed, and mirrors the new
    /// size into the parent directory's entry.
    pub fn write(&self, node: u32, offset: u64, buf: &[u8]) -> Result<usize> {
        let _vol = self.state.lock().unwrap();
        let mut inode = self.load(node)?;
        if inode.kind != NodeKind::Regular {
            return Err(FsError::NotRegular);
        }
        let written = file::write_at(&*self.device, &self.superblock, &mut inode, offset, buf)?;
        let parent = self.load_parent(&inode);
        directory::update_entry(&*self.device, &self.superblock, &parent, node, |e| {
            e.name = inode.name;
            e.size = inode.size;
        });
        Ok(written)
    }

    /// Removes a node. Directories take their whole subtree with them;
    /// regular files honor the reference count. The root cannot be removed.
    pub fn remove(&self, node: u32) -> Result<()> {
        let _vol = self.state.lock().unwrap();
        if node == ROOT_INO {
            return Err(FsError::InvalidKind);
        }
        let inode = self.load(node)?;
        let mut parent = self.load_parent(&inode);
        directory::remove_entry(&*self.device, &self.superblock, &mut parent, node)?;
        debug!("removed inode {node} from directory {}", inode.parent);
        Ok(())
    }

    /// Renames a node in place, rewriting the inode name and the matching
    /// entry in its parent.
    pub fn rename(&self, node: u32, new_name: &str) -> Result<()> {
        let _vol = self.state.lock().unwrap();
        if node == ROOT_INO {
            return Err(FsError::InvalidKind);
        }
        let mut inode = self.load(node)?;
        let parent = self.load_parent(&inode);
        if directory::find_entry(&*self.device, &self.superblock, &parent, |e| {
            e.ino != node && e.name_matches(new_name)
        })
        .is_some()
        {
            return Err(FsError::AlreadyExists);
        }
        inode.name = name_field(new_name)?;
        inode::write_inode(&*self.device, &self.superblock, &inode);
        directory::update_entry(&*self.device, &self.superblock, &parent, node, |e| {
            e.name = inode.name;
        });
        debug!("renamed inode {node} to '{new_name}'");
        Ok(())
    }

    /// Creates a symbolic link named `name` under `parent`. The target text
    /// is stored in the link's single data block; the link inode's size is
    /// the target's byte length. Only symbolic links are supported.
    pub fn link(&self, parent: u32, name: &str, target: &str, kind: NodeKind) -> Result<u32> {
        let _vol = self.state.lock().unwrap();
        if kind != NodeKind::Symlink {
            return Err(FsError::InvalidKind);
        }
        if target.is_empty() {
            return Err(FsError::InvalidName);
        }
        if target.len() > MAX_LINK_TARGET {
            return Err(FsError::TargetTooLong);
        }
        let name_bytes = name_field(name)?;
        let mut dir = self.load_dir(parent)?;
        if directory::find_entry(&*self.device, &self.superblock, &dir, |e| e.name_matches(name))
            .is_some()
        {
            return Err(FsError::AlreadyExists);
        }
        if dir.size >= MAX_DIR_ENTRIES {
            return Err(FsError::DirectoryFull);
        }

        let (ino, mut node) = allocate_inode(&*self.device, &self.superblock);
        node.kind = NodeKind::Symlink;
        node.parent = parent;
        node.refcount = 1;
        node.name = name_bytes;
        file::write_at(&*self.device, &self.superblock, &mut node, 0, target.as_bytes())?;

        let mut entry = DirEntry::new(ino, parent, NodeKind::Symlink, name)?;
        entry.size = node.size;
        directory::append_entry(&*self.device, &self.superblock, &mut dir, &entry)?;
        debug!("linked '{name}' -> '{target}' as inode {ino} under {parent}");
        Ok(ino)
    }

    /// Returns a symlink's stored target text. The inode's size is the
    /// authoritative length; no terminator is stored.
    pub fn link_target(&self, node: u32) -> Result<Vec<u8>> {
        let _vol = self.state.lock().unwrap();
        let inode = self.load(node)?;
        if inode.kind != NodeKind::Symlink {
            return Err(FsError::NotSymlink);
        }
        let mut target = vec![0u8; inode.size as usize];
        file::read_at(&*self.device, &self.superblock, &inode, 0, &mut target);
        Ok(target)
    }

    /// Unlinks a regular file or symlink: the parent entry goes away, the
    /// node is freed once its reference count allows it. Directories go
    /// through [`FileSystem::remove`].
    pub fn unlink(&self, node: u32) -> Result<()> {
        let _vol = self.state.lock().unwrap();
        if node == ROOT_INO {
            return Err(FsError::InvalidKind);
        }
        let inode = self.load(node)?;
        if inode.kind == NodeKind::Directory {
            return Err(FsError::InvalidKind);
        }
        let mut parent = self.load_parent(&inode);
        directory::remove_entry(&*self.device, &self.superblock, &mut parent, node)?;
        debug!("unlinked inode {node} from directory {}", inode.parent);
        Ok(())
    }

    /// Opens a node and returns a handle for it.
    pub fn open(&self, node: u32) -> Result<Handle> {
        let mut vol = self.state.lock().unwrap();
        self.load(node)?;
        let handle = vol.next_handle;
        vol.next_handle += 1;
        vol.handles.insert(handle, node);
        Ok(handle)
    }

    /// Closes a handle previously returned by [`FileSystem::open`] for the
    /// same node.
    pub fn close(&self, node: u32, handle: Handle) -> Result<()> {
        let mut vol = self.state.lock().unwrap();
        match vol.handles.get(&handle) {
            Some(&open_ino) if open_ino == node => {
                vol.handles.remove(&handle);
                Ok(())
            }
            _ => Err(FsError::StaleHandle),
        }
    }

    /// A copy of the node's inode record.
    pub fn stat(&self, node: u32) -> Result<Inode> {
        let _vol = self.state.lock().unwrap();
        self.load(node)
    }

    /// All entries of a directory, in insertion order.
    pub fn read_dir(&self, node: u32) -> Result<Vec<DirEntry>> {
        let _vol = self.state.lock().unwrap();
        let dir = self.load_dir(node)?;
        directory::read_dir(&*self.device, &self.superblock, &dir)
    }

    /// Flushes buffered writes on the underlying device.
    pub fn flush(&self) {
        let _vol = self.state.lock().unwrap();
        if let Err(e) = self.device.flush() {
            panic!("device flush failed: {e:?}");
        }
    }

    pub fn root_ino(&self) -> u32 {
        ROOT_INO
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}
