mod common;

use common::TempImage;
use dskfs::*;

fn disk_with_partitions(tag: &str, names: &[&str]) -> TempImage {
    let img = TempImage::new(tag);
    create_disk(img.path(), 8, Unit::Kilo, Fit::First).unwrap();
    for name in names {
        create_partition(img.path(), 1, Unit::Kilo, name, PartitionType::Primary, Fit::First).unwrap();
    }
    img
}

#[test]
fn test_mount_ids() {
    let first = disk_with_partitions("mount_ids_a", &["Part1", "Part2"]);
    let second = disk_with_partitions("mount_ids_b", &["Part1"]);
    let mut registry = MountRegistry::new();

    let a1 = registry.mount(first.path(), "Part1", DEFAULT_ID_PREFIX).unwrap();
    let b1 = registry.mount(second.path(), "Part1", DEFAULT_ID_PREFIX).unwrap();
    let a2 = registry.mount(first.path(), "Part2", DEFAULT_ID_PREFIX).unwrap();
    assert_eq!(a1.id, "091a");
    assert_eq!(b1.id, "091b");
    assert_eq!(a2.id, "092a");

    assert_eq!(registry.list().len(), 3);
    assert_eq!(registry.lookup("092a").unwrap().name, "Part2");
    assert!(matches!(registry.lookup("093a"), Err(Error::NotFound(_))));
    assert!(registry.active().is_none());
}

#[test]
fn test_mount_persists_status() {
    let img = disk_with_partitions("mount_persist", &["Part1"]);
    let mut registry = MountRegistry::new();
    registry.mount(img.path(), "Part1", "42").unwrap();

    let disk = FileDisk::open(img.path()).unwrap();
    let part = read_mbr(&disk).unwrap().partitions[0];
    assert!(part.is_mounted());
    assert_eq!(part.id_str(), "421a");

    let (_, found) = registry.lookup("421a").unwrap().open().unwrap();
    assert_eq!(found, part);
}

#[test]
fn test_mount_errors() {
    let img = TempImage::new("mount_errors");
    create_disk(img.path(), 8, Unit::Kilo, Fit::First).unwrap();
    create_partition(img.path(), 1, Unit::Kilo, "Part1", PartitionType::Primary, Fit::First).unwrap();
    create_partition(img.path(), 2, Unit::Kilo, "Ext", PartitionType::Extended, Fit::First).unwrap();
    let mut registry = MountRegistry::new();

    assert!(matches!(
        registry.mount(img.path(), "Nope", DEFAULT_ID_PREFIX),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        registry.mount(img.path(), "Ext", DEFAULT_ID_PREFIX),
        Err(Error::InvalidArgument(_))
    ));
    registry.mount(img.path(), "Part1", DEFAULT_ID_PREFIX).unwrap();
    assert!(matches!(
        registry.mount(img.path(), "Part1", DEFAULT_ID_PREFIX),
        Err(Error::AlreadyMounted(_))
    ));

    // the flag lives on disk, so a fresh registry sees it too
    let mut fresh = MountRegistry::new();
    assert!(matches!(
        fresh.mount(img.path(), "Part1", DEFAULT_ID_PREFIX),
        Err(Error::AlreadyMounted(_))
    ));

    let missing = TempImage::new("mount_missing");
    assert!(matches!(
        registry.mount(missing.path(), "Part1", DEFAULT_ID_PREFIX),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_id_prefix_must_fit() {
    let img = disk_with_partitions("mount_prefix", &["Part1"]);
    let mut registry = MountRegistry::new();
    assert!(matches!(
        registry.mount(img.path(), "Part1", "123"),
        Err(Error::InvalidArgument(_))
    ));
    // nothing was stamped on the way out
    let part = read_mbr(&FileDisk::open(img.path()).unwrap()).unwrap().partitions[0];
    assert!(!part.is_mounted());
    assert!(registry.list().is_empty());
}

#[test]
fn test_disk_letters() {
    let images: Vec<TempImage> = (0..27)
        .map(|i| disk_with_partitions(&format!("letters_{i}"), &["Part1", "Part2"]))
        .collect();
    let mut registry = MountRegistry::new();
    for (i, img) in images.iter().take(26).enumerate() {
        let record = registry.mount(img.path(), "Part1", DEFAULT_ID_PREFIX).unwrap();
        assert_eq!(record.id, format!("091{}", (b'a' + i as u8) as char));
    }
    assert!(matches!(
        registry.mount(images[26].path(), "Part1", DEFAULT_ID_PREFIX),
        Err(Error::InvalidArgument(_))
    ));
    assert!(!read_mbr(&FileDisk::open(images[26].path()).unwrap()).unwrap().partitions[0].is_mounted());

    // known disks keep their letter
    let record = registry.mount(images[25].path(), "Part2", DEFAULT_ID_PREFIX).unwrap();
    assert_eq!(record.id, "092z");
}

#[test]
fn test_disk_letter_ignores_case() {
    let lower = disk_with_partitions("casedisk", &["Part1"]);
    let upper = disk_with_partitions("CASEDISK", &["Other", "Part2"]);
    let mut registry = MountRegistry::new();
    assert_eq!(registry.mount(lower.path(), "Part1", DEFAULT_ID_PREFIX).unwrap().id, "091a");
    // paths differing only in case share a letter
    assert_eq!(registry.mount(upper.path(), "Part2", DEFAULT_ID_PREFIX).unwrap().id, "092a");
}
