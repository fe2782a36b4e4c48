mod common;

use common::{PART_START, RamDisk, SMALL_PART};
use dskfs::*;

fn small_fs() -> (RamDisk, FileSystem<RamDisk>) {
    let rd = RamDisk::new(3 * 1024);
    let fs = FileSystem::format(rd.clone(), PART_START, SMALL_PART, Config::default()).unwrap();
    (rd, fs)
}

#[test]
fn test_layout() {
    let (_, fs) = small_fs();
    let sb = fs.superblock();
    assert_eq!(sb.filesystem_type, 2);
    assert_eq!(sb.magic, 0xEF53);
    assert_eq!(sb.inodes_count, 6);
    assert_eq!(sb.blocks_count, 18);
    assert_eq!(sb.bm_inode_start, 251);
    assert_eq!(sb.bm_block_start, 257);
    assert_eq!(sb.inode_start, 275);
    assert_eq!(sb.block_start, 1019);
    assert_eq!(sb.block_start + sb.blocks_count * 64, PART_START + SMALL_PART);
    assert_eq!(sb.partition_start(), PART_START as u64);
}

#[test]
fn test_bootstrap() {
    let (rd, fs) = small_fs();
    let sb = *fs.superblock();
    assert_eq!(sb.free_inodes_count, 4);
    assert_eq!(sb.free_blocks_count, 16);
    assert_eq!((sb.first_ino, sb.first_blo), (2, 2));
    assert_eq!(sb.mnt_count, 1);

    assert_eq!(rd.bytes(251, 6), [1, 1, 0, 0, 0, 0]);
    assert_eq!(&rd.bytes(257, 18)[..3], [1, 1, 0]);

    let root = fs.inode(ROOT_INODE_ID).unwrap();
    assert!(root.is_dir());
    assert_eq!(root.block[0], 0);
    assert!(root.block[1..].iter().all(|&b| b == -1));
    assert_eq!(&root.perm, b"664");

    let entries = fs.read_dir("/").unwrap();
    let names: Vec<String> = entries.iter().map(Content::name_str).collect();
    assert_eq!(names, [".", "..", "users.txt"]);
    assert_eq!(fs.folder_block(0).unwrap().content[3], Content::FREE);

    let users = fs.inode(USERS_INODE_ID).unwrap();
    assert!(users.is_file());
    assert_eq!(users.size, 27);
}

#[test]
fn test_users_file() {
    let (_, fs) = small_fs();
    assert_eq!(fs.resolve("/users.txt").unwrap(), (0, 1));
    assert_eq!(fs.resolve("/").unwrap(), (0, 0));
    assert_eq!(fs.read_file("/users.txt").unwrap(), USERS_SEED.as_bytes());
}

#[test]
fn test_remount() {
    let (rd, fs) = small_fs();
    let formatted = *fs.superblock();
    drop(fs);

    let fs = FileSystem::mount(rd, PART_START as u64, Config::default()).unwrap();
    assert_eq!(*fs.superblock(), formatted);
    assert_eq!(fs.read_file("/users.txt").unwrap(), USERS_SEED.as_bytes());
}

#[test]
fn test_unformatted() {
    let rd = RamDisk::new(3 * 1024);
    assert!(matches!(
        FileSystem::mount(rd.clone(), PART_START as u64, Config::default()),
        Err(Error::Corrupt { .. })
    ));
    assert!(matches!(
        FileSystem::format(rd.clone(), PART_START, 600, Config::default()),
        Err(Error::NoSpace(_))
    ));
    // a partition running past the end of the image
    assert!(matches!(
        FileSystem::format(rd, PART_START, 4096, Config::default()),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn test_counters_follow_bitmaps() {
    let (_, mut fs) = small_fs();
    assert_eq!(fs.find_free_inode().unwrap(), 2);
    assert_eq!(fs.find_free_blocks(3).unwrap(), [2, 3, 4]);

    fs.mark_block(3, true).unwrap();
    assert_eq!(fs.find_free_blocks(2).unwrap(), [2, 4]);
    assert_eq!(fs.superblock().free_blocks_count, 15);
    assert_eq!(fs.superblock().first_blo, 2);

    // marking twice changes nothing
    fs.mark_block(3, true).unwrap();
    assert_eq!(fs.superblock().free_blocks_count, 15);

    fs.mark_block(3, false).unwrap();
    assert_eq!(fs.superblock().free_blocks_count, 16);
    assert!(matches!(fs.find_free_blocks(17), Err(Error::ResourceExhausted(_))));
    assert!(matches!(fs.mark_inode(6, true), Err(Error::OutOfBounds { .. })));
}
