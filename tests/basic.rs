mod common;

use common::{PART_START, RamDisk, SMALL_PART};
use dskfs::*;

fn format(size: i32, config: Config) -> FileSystem<RamDisk> {
    let rd = RamDisk::new(3 * 1024);
    FileSystem::format(rd, PART_START, size, config).unwrap()
}

/// 8 inodes, 24 blocks.
const ROOMY_PART: i32 = 92 + 8 * 320;

#[test]
fn test_mkdir_p_idempotent() {
    let mut fs = format(SMALL_PART, Config::default());
    let b = fs.create_directory("/a/b").unwrap();
    let after_first = *fs.superblock();
    assert_eq!(after_first.free_inodes_count, 2);

    assert_eq!(fs.create_directory("/a/b").unwrap(), b);
    assert_eq!(fs.create_directory("/a").unwrap(), fs.resolve("/a").unwrap().1);
    assert_eq!(*fs.superblock(), after_first);

    let (parent, inode) = fs.resolve("/a/b").unwrap();
    assert_eq!(inode, b);
    assert_eq!(parent, fs.resolve("/a").unwrap().1);

    let names: Vec<String> = fs.read_dir("/a/b").unwrap().iter().map(Content::name_str).collect();
    assert_eq!(names, [".", ".."]);
    let dot = fs.read_dir("/a/b").unwrap();
    assert_eq!((dot[0].inode, dot[1].inode), (b, parent));
}

#[test]
fn test_inode_exhaustion() {
    let mut fs = format(SMALL_PART, Config::default());
    for i in 1..=4 {
        fs.create_directory(&format!("/d{i}")).unwrap();
    }
    assert_eq!(fs.superblock().free_inodes_count, 0);
    assert_eq!(fs.superblock().first_ino, -1);

    let before = *fs.superblock();
    let err = fs.create_directory("/d5");
    assert!(matches!(err, Err(Error::ResourceExhausted("inode"))));
    // nothing was marked on the way out
    assert_eq!(*fs.superblock(), before);
    assert!(matches!(fs.resolve("/d5"), Err(Error::NotFound(_))));
}

#[test]
fn test_parent_grows_new_block() {
    let mut fs = format(SMALL_PART, Config::default());
    fs.create_directory("/d1").unwrap();
    fs.create_directory("/d2").unwrap();

    let root = fs.inode(ROOT_INODE_ID).unwrap();
    // d2 takes block 3 before the root grows into block 4
    assert_eq!(&root.block[..3], [0, 4, -1]);
    assert_eq!(root.size, 128);
    assert_eq!(fs.resolve("/d2").unwrap(), (0, 3));
    assert_eq!(fs.inode(3).unwrap().block[0], 3);

    let second = fs.folder_block(4).unwrap();
    assert_eq!(second.content[0].name_str(), "d2");
    assert!(second.content[1..].iter().all(|c| c.inode == -1));
}

#[test]
fn test_create_file() {
    let mut fs = format(ROOMY_PART, Config::default());
    let id = fs.create_file("/docs/a.txt", 20, None).unwrap();
    assert_eq!(fs.read_file("/docs/a.txt").unwrap(), b"01234567890123456789");
    assert_eq!(fs.resolve("/docs").unwrap(), (0, 2));
    assert_eq!(fs.resolve("/docs/a.txt").unwrap(), (2, id));
    assert_eq!(id, 3);
    assert_eq!(fs.inode(id).unwrap().block[0], 3);

    // explicit content wins over the size
    let id = fs.create_file("/docs/b.txt", 5, Some(&b"hello world"[..])).unwrap();
    let inode = fs.inode(id).unwrap();
    assert_eq!(inode.size, 11);
    assert!(inode.is_file());
    assert_eq!(fs.read_file_inode(id).unwrap(), b"hello world");
}

#[test]
fn test_create_file_blocks() {
    let mut fs = format(ROOMY_PART, Config::default());
    let content: Vec<u8> = (0..MAX_FILE_SIZE).map(|i| b'a' + (i % 26) as u8).collect();
    let id = fs.create_file("/full", 0, Some(content.as_slice())).unwrap();
    let inode = fs.inode(id).unwrap();
    assert!(inode.direct_ptrs().iter().all(|&b| b >= 0));
    assert!(!inode.has_indirect());
    assert_eq!(fs.read_file("/full").unwrap(), content);

    let free = fs.superblock().free_blocks_count;
    let err = fs.create_file("/too_big", MAX_FILE_SIZE + 1, None);
    assert!(matches!(err, Err(Error::Unsupported(_))));
    assert_eq!(fs.superblock().free_blocks_count, free);

    // an empty file still owns one block
    let id = fs.create_file("/empty", 0, None).unwrap();
    let inode = fs.inode(id).unwrap();
    assert_ne!(inode.block[0], -1);
    assert_eq!(inode.block[1], -1);
    assert!(fs.read_file("/empty").unwrap().is_empty());
}

#[test]
fn test_create_file_errors() {
    let mut fs = format(ROOMY_PART, Config::default());
    fs.create_file("/a.txt", 3, None).unwrap();
    assert!(matches!(fs.create_file("/a.txt", 3, None), Err(Error::AlreadyExists(_))));
    assert!(matches!(fs.create_file("/", 3, None), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        fs.create_file("/name_too_long.txt", 3, None),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(fs.create_file("/a.txt/b", 3, None), Err(Error::NotDirectory(_))));
    assert!(matches!(fs.read_file("/"), Err(Error::NotFile(_))));
    assert!(matches!(fs.read_dir("/a.txt"), Err(Error::NotDirectory(_))));
    assert!(matches!(fs.resolve("/a.txt/b"), Err(Error::NotDirectory(_))));
    assert!(matches!(fs.read_file("/missing"), Err(Error::NotFound(_))));
}

#[test]
fn test_rollback_when_parent_is_full() {
    let mut fs = format(ROOMY_PART, Config::default());
    fs.create_directory("/d1").unwrap();
    fs.create_file("/d1/x", 1, None).unwrap();
    fs.create_file("/d1/y", 1, None).unwrap();
    fs.create_file("/big", 11 * 64, None).unwrap();
    fs.create_file("/pad", 6 * 64, None).unwrap();
    assert_eq!(fs.superblock().free_inodes_count, 1);
    assert_eq!(fs.superblock().free_blocks_count, 1);

    // z gets the last inode and block, but /d1 has no block left to grow into
    let err = fs.create_file("/d1/z", 1, None);
    assert!(matches!(err, Err(Error::ResourceExhausted("block"))));
    assert_eq!(fs.superblock().free_inodes_count, 1);
    assert_eq!(fs.superblock().free_blocks_count, 1);
    assert!(matches!(fs.resolve("/d1/z"), Err(Error::NotFound(_))));
    assert_eq!(fs.inode(7).unwrap(), Inode::EMPTY);
}

#[test]
fn test_name_matching() {
    let mut legacy = format(ROOMY_PART, Config::default());
    let abc = legacy.create_directory("/abc").unwrap();
    // a fragment resolves to the first entry containing it
    assert_eq!(legacy.resolve("/b").unwrap(), (0, abc));
    // creation compares whole names
    let ab = legacy.create_directory("/ab").unwrap();
    assert_ne!(ab, abc);
    assert_eq!(legacy.resolve("/abc").unwrap(), (0, abc));

    let exact = Config {
        name_match: MatchPolicy::Exact,
        ..Config::default()
    };
    let mut strict = format(ROOMY_PART, exact);
    strict.create_directory("/abc").unwrap();
    assert!(matches!(strict.resolve("/b"), Err(Error::NotFound(_))));
    let ab = strict.create_directory("/ab").unwrap();
    assert_ne!(ab, strict.resolve("/abc").unwrap().1);
}

#[test]
fn test_create_names_inside_existing_ones() {
    let mut fs = format(ROOMY_PART, Config::default());
    // both are fragments of users.txt
    let s = fs.create_file("/s.txt", 3, None).unwrap();
    let user = fs.create_directory("/user").unwrap();
    assert_ne!(s, USERS_INODE_ID);
    assert_ne!(user, USERS_INODE_ID);
    assert!(fs.inode(user).unwrap().is_dir());
    assert_eq!(fs.read_file_inode(s).unwrap(), b"012");

    let docs = fs.create_directory("/docs").unwrap();
    let doc = fs.create_directory("/doc").unwrap();
    assert_ne!(doc, docs);
    let names: Vec<String> = fs.read_dir("/").unwrap().iter().map(Content::name_str).collect();
    assert_eq!(names, [".", "..", "users.txt", "s.txt", "user", "docs", "doc"]);

    // an exact name still collides
    assert!(matches!(fs.create_file("/s.txt", 1, None), Err(Error::AlreadyExists(_))));
}

#[test]
fn test_oversized_file_is_rejected_up_front() {
    let mut fs = format(ROOMY_PART, Config::default());
    let before = *fs.superblock();
    assert!(matches!(fs.create_file("/huge", usize::MAX, None), Err(Error::Unsupported(_))));
    assert!(matches!(
        fs.create_file("/a/huge", MAX_FILE_SIZE + 1, None),
        Err(Error::Unsupported(_))
    ));
    // not even the parent directory was created
    assert_eq!(*fs.superblock(), before);
    assert!(matches!(fs.resolve("/a"), Err(Error::NotFound(_))));
}
