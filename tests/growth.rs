mod common;

use quark::{
    FsError, NodeKind, BLOCK_SIZE, DIRECT_BOUND, DOUBLE_BOUND, MAX_DIR_ENTRIES, SINGLE_BOUND,
    TRIPLE_BOUND, ROOT_INO,
};

const B: u64 = BLOCK_SIZE as u64;

#[test]
fn growth_crosses_the_direct_single_boundary() {
    let fs = common::fresh_fs(256, 16);
    let f = fs.create(ROOT_INO, "f", NodeKind::Regular).unwrap();

    // Exactly the direct capacity first.
    let data = common::pattern((DIRECT_BOUND * B) as usize, 11);
    fs.write(f, 0, &data).unwrap();
    let node = fs.stat(f).unwrap();
    assert_eq!(node.block_count, DIRECT_BOUND);
    assert_eq!(node.single, 0);

    // One more byte escalates into single indirection.
    fs.write(f, DIRECT_BOUND * B, &[0x5A]).unwrap();
    let node = fs.stat(f).unwrap();
    assert_eq!(node.block_count, DIRECT_BOUND + 1);
    assert_ne!(node.single, 0);

    let mut back = vec![0u8; data.len() + 1];
    assert_eq!(fs.read(f, 0, &mut back).unwrap(), back.len());
    assert_eq!(&back[..data.len()], &data[..]);
    assert_eq!(back[data.len()], 0x5A);
}

#[test]
fn growth_crosses_the_single_double_boundary() {
    let fs = common::fresh_fs(400, 16);
    let f = fs.create(ROOT_INO, "f", NodeKind::Regular).unwrap();

    // Distinct markers on both sides of every boundary the file reaches.
    let len = ((SINGLE_BOUND + 2) * B) as usize;
    let data = common::pattern(len, 23);
    fs.write(f, 0, &data).unwrap();

    let node = fs.stat(f).unwrap();
    assert_eq!(node.block_count, SINGLE_BOUND + 2);
    assert_ne!(node.single, 0);
    assert_ne!(node.double, 0);
    assert_eq!(node.triple, 0);

    for boundary in [DIRECT_BOUND, SINGLE_BOUND] {
        let at = (boundary * B - 2) as usize;
        let mut window = [0u8; 4];
        assert_eq!(fs.read(f, at as u64, &mut window).unwrap(), 4);
        assert_eq!(&window[..], &data[at..at + 4]);
    }
}

#[test]
fn growth_reaches_triple_indirection() {
    let fs = common::fresh_fs(20_000, 16);
    let before = common::bitmap_snapshot(&fs);
    let f = fs.create(ROOT_INO, "f", NodeKind::Regular).unwrap();

    // A one-byte write just past the double bound backs the whole range.
    fs.write(f, DOUBLE_BOUND * B, &[0x77]).unwrap();
    let node = fs.stat(f).unwrap();
    assert_eq!(node.block_count, DOUBLE_BOUND + 1);
    assert_ne!(node.triple, 0);
    assert_eq!(node.size, DOUBLE_BOUND * B + 1);

    let mut byte = [0u8; 1];
    assert_eq!(fs.read(f, DOUBLE_BOUND * B, &mut byte).unwrap(), 1);
    assert_eq!(byte[0], 0x77);
    // The backed gap reads as zeros.
    assert_eq!(fs.read(f, DOUBLE_BOUND * B - 1, &mut byte).unwrap(), 1);
    assert_eq!(byte[0], 0);

    // Every data and chain block comes back on removal.
    fs.remove(f).unwrap();
    assert_eq!(common::bitmap_snapshot(&fs), before);
}

#[test]
fn structural_limit_fails_without_partial_growth() {
    let fs = common::fresh_fs(64, 16);
    let f = fs.create(ROOT_INO, "f", NodeKind::Regular).unwrap();
    assert_eq!(
        fs.write(f, TRIPLE_BOUND * B, &[1]),
        Err(FsError::FileTooLarge)
    );
    let node = fs.stat(f).unwrap();
    assert_eq!(node.block_count, 0);
    assert_eq!(node.size, 0);
}

#[test]
fn directories_never_escalate_to_indirection() {
    let fs = common::fresh_fs(128, 64);
    let d = fs.create(ROOT_INO, "d", NodeKind::Directory).unwrap();
    for i in 0..MAX_DIR_ENTRIES {
        fs.create(d, &format!("child{i}"), NodeKind::Regular).unwrap();
    }
    let dir = fs.stat(d).unwrap();
    assert_eq!(dir.size, MAX_DIR_ENTRIES);
    assert_eq!(dir.block_count, DIRECT_BOUND);
    assert_eq!(dir.single, 0);

    assert_eq!(
        fs.create(d, "overflow", NodeKind::Regular),
        Err(FsError::DirectoryFull)
    );
}
