mod common;

use quark::{NodeKind, BLOCK_SIZE, ROOT_INO};

#[test]
fn bitmaps_return_to_their_prior_state() {
    let fs = common::fresh_fs(128, 16);
    let before = common::bitmap_snapshot(&fs);

    // Allocate a mix of inodes and data blocks.
    let a = fs.create(ROOT_INO, "a.bin", NodeKind::Regular).unwrap();
    let b = fs.create(ROOT_INO, "b.bin", NodeKind::Regular).unwrap();
    let c = fs.create(ROOT_INO, "c.bin", NodeKind::Regular).unwrap();
    fs.write(a, 0, &common::pattern(3 * BLOCK_SIZE, 1)).unwrap();
    fs.write(b, 0, &common::pattern(BLOCK_SIZE / 2, 2)).unwrap();
    fs.write(c, 0, &common::pattern(12 * BLOCK_SIZE, 3)).unwrap();
    assert_ne!(common::bitmap_snapshot(&fs), before);

    // Free in a different order than allocated.
    fs.remove(b).unwrap();
    fs.remove(c).unwrap();
    fs.remove(a).unwrap();
    assert_eq!(common::bitmap_snapshot(&fs), before);
}

#[test]
fn inode_numbers_come_lowest_first() {
    let fs = common::fresh_fs(64, 16);
    // Root holds inode 0, so user nodes start at 1.
    let a = fs.create(ROOT_INO, "a", NodeKind::Regular).unwrap();
    let b = fs.create(ROOT_INO, "b", NodeKind::Regular).unwrap();
    let c = fs.create(ROOT_INO, "c", NodeKind::Regular).unwrap();
    assert_eq!((a, b, c), (1, 2, 3));

    fs.remove(b).unwrap();
    let d = fs.create(ROOT_INO, "d", NodeKind::Regular).unwrap();
    assert_eq!(d, 2);
    let e = fs.create(ROOT_INO, "e", NodeKind::Regular).unwrap();
    assert_eq!(e, 4);
}

#[test]
fn freed_data_blocks_are_reused() {
    let fs = common::fresh_fs(64, 16);
    let a = fs.create(ROOT_INO, "a", NodeKind::Regular).unwrap();
    fs.write(a, 0, &common::pattern(BLOCK_SIZE, 7)).unwrap();
    let first_block = fs.stat(a).unwrap().direct[0];
    fs.remove(a).unwrap();

    let b = fs.create(ROOT_INO, "b", NodeKind::Regular).unwrap();
    fs.write(b, 0, &common::pattern(BLOCK_SIZE, 9)).unwrap();
    assert_eq!(fs.stat(b).unwrap().direct[0], first_block);
}

#[test]
fn recycled_blocks_read_as_zero() {
    let fs = common::fresh_fs(64, 16);
    let a = fs.create(ROOT_INO, "a", NodeKind::Regular).unwrap();
    fs.write(a, 0, &[0xAA; BLOCK_SIZE]).unwrap();
    fs.remove(a).unwrap();

    // The recycled block is zeroed at allocation: a write that leaves a
    // leading gap in the block exposes zeros, not stale bytes.
    let b = fs.create(ROOT_INO, "b", NodeKind::Regular).unwrap();
    fs.write(b, 100, &[0xBB]).unwrap();
    let mut back = [0u8; 101];
    assert_eq!(fs.read(b, 0, &mut back).unwrap(), 101);
    assert_eq!(&back[..100], &[0u8; 100]);
    assert_eq!(back[100], 0xBB);
}
