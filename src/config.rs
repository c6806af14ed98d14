pub const MAGIC: u32 = 0x5155_4152; // "QUAR" in ASCII
pub const VERSION: u32 = 1;

pub const BLOCK_SIZE: usize = 1024;
pub const SUPERBLOCK_BLOCK: u64 = 0; // Absolute block number of the superblock
pub const ROOT_INO: u32 = 0; // Inode number of the root directory

pub const NAME_LEN: usize = 128; // Fixed name field length, shared by inodes and directory entries
pub const INODE_SIZE: usize = 512;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

pub const DIR_ENTRY_SIZE: usize = 256;
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;
/// Directories use their direct blocks only, which caps the entry count.
pub const MAX_DIR_ENTRIES: u64 = NUM_DIRECT as u64 * ENTRIES_PER_BLOCK as u64;

pub const NUM_DIRECT: usize = 10; // Number of direct block pointers in an inode
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / 8; // u64 slots per indirection block

/// Cumulative upper bounds (exclusive) of the logical-block range covered by
/// each indirection level.
pub const DIRECT_BOUND: u64 = NUM_DIRECT as u64;
pub const SINGLE_BOUND: u64 = DIRECT_BOUND + PTRS_PER_BLOCK as u64;
pub const DOUBLE_BOUND: u64 = SINGLE_BOUND + (PTRS_PER_BLOCK * PTRS_PER_BLOCK) as u64;
pub const TRIPLE_BOUND: u64 =
    DOUBLE_BOUND + (PTRS_PER_BLOCK * PTRS_PER_BLOCK * PTRS_PER_BLOCK) as u64;

/// Structural maximum of data blocks a single file can address.
pub const MAX_FILE_BLOCKS: u64 = TRIPLE_BOUND;

/// A symlink stores its target text inside a single data block.
pub const MAX_LINK_TARGET: usize = BLOCK_SIZE;
