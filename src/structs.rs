//! Packed on-disk records. Every record is encoded field by field, little-endian,
//! with fixed-size NUL-padded text fields and no padding between fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use crate::block_dev::OnDisk;
use crate::config::*;
use crate::error::FsError;

pub fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

/// Decodes a NUL-padded field.
pub fn field_str(field: &[u8]) -> String {
    String::from_utf8_lossy(trim_zero(field)).into_owned()
}

/// Copies `s` into a NUL-padded field, truncating it when longer than `N`.
pub fn fixed<const N: usize>(s: &str) -> [u8; N] {
    let mut arr = [0u8; N];
    let len = s.len().min(N);
    arr[..len].copy_from_slice(&s.as_bytes()[..len]);
    arr
}

/// `YYYY-MM-DD`, as stored in the MBR.
pub fn today() -> [u8; DATE_LEN] {
    fixed(&chrono::Local::now().format("%Y-%m-%d").to_string())
}

/// `DD/MM/YYYY HH:MM`, as stored in inodes and the superblock.
pub fn now_stamp() -> [u8; TIME_LEN] {
    fixed(&chrono::Local::now().format("%d/%m/%Y %H:%M").to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Best,
    First,
    Worst,
}

impl Fit {
    pub fn as_byte(self) -> u8 {
        match self {
            Fit::Best => b'b',
            Fit::First => b'f',
            Fit::Worst => b'w',
        }
    }
}

impl FromStr for Fit {
    type Err = FsError;

    /// Accepts both the disk spelling (`bf`, `ff`, `wf`) and the partition one (`b`, `f`, `w`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bf" | "b" => Ok(Fit::Best),
            "ff" | "f" => Ok(Fit::First),
            "wf" | "w" => Ok(Fit::Worst),
            _ => Err(FsError::InvalidArgument(format!("fit must be bf, ff or wf, got {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Bytes,
    Kilo,
    Mega,
}

impl Unit {
    pub fn multiplier(self) -> i64 {
        match self {
            Unit::Bytes => 1,
            Unit::Kilo => 1024,
            Unit::Mega => 1024 * 1024,
        }
    }
}

impl FromStr for Unit {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "b" => Ok(Unit::Bytes),
            "k" => Ok(Unit::Kilo),
            "m" => Ok(Unit::Mega),
            _ => Err(FsError::InvalidArgument(format!("unit must be b, k or m, got {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionType {
    Primary,
    Extended,
    /// Lives in the EBR chain of the extended partition, never in the MBR table.
    Logical,
}

impl PartitionType {
    pub fn as_byte(self) -> u8 {
        match self {
            PartitionType::Primary => b'p',
            PartitionType::Extended => b'e',
            PartitionType::Logical => b'l',
        }
    }
}

impl FromStr for PartitionType {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "p" => Ok(PartitionType::Primary),
            "e" => Ok(PartitionType::Extended),
            "l" => Ok(PartitionType::Logical),
            _ => Err(FsError::InvalidArgument(format!("type must be p, e or l, got {s:?}"))),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    Directory = 0,
    File = 1,
}

pub const STATUS_UNMOUNTED: u8 = b'0';
pub const STATUS_MOUNTED: u8 = b'1';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub status: u8,
    pub part_type: u8,
    pub fit: u8,
    pub start: i32,
    pub size: i32,
    pub name: [u8; PARTITION_NAME_LEN],
    pub correlative: i32,
    pub id: [u8; PARTITION_ID_LEN],
}

impl Partition {
    pub fn is_used(&self) -> bool {
        self.size != 0
    }

    pub fn is_type(&self, ptype: PartitionType) -> bool {
        self.is_used() && self.part_type == ptype.as_byte()
    }

    pub fn is_mounted(&self) -> bool {
        self.status == STATUS_MOUNTED
    }

    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }

    pub fn id_str(&self) -> String {
        field_str(&self.id)
    }

    pub fn end(&self) -> i64 {
        self.start as i64 + self.size as i64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mbr {
    pub size: i32,
    pub creation_date: [u8; DATE_LEN],
    pub signature: i32,
    pub fit: u8,
    pub partitions: [Partition; MAX_PARTITIONS],
}

impl Mbr {
    pub fn used_partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(|p| p.is_used())
    }

    pub fn used_space(&self) -> i64 {
        self.used_partitions().map(|p| p.size as i64).sum()
    }

    pub fn extended(&self) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.is_type(PartitionType::Extended))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ebr {
    pub fit: u8,
    /// Start of the logical partition's data, right after this header.
    pub start: i32,
    pub size: i32,
    /// Offset of the next header, or `-1`.
    pub next: i32,
    pub name: [u8; PARTITION_NAME_LEN],
}

impl Ebr {
    /// Empty node written at the start of every extended partition.
    pub fn head(offset: i32, fit: u8) -> Self {
        Self {
            fit,
            start: offset + EBR_SIZE as i32,
            size: 0,
            next: NULL_PTR,
            name: [0; PARTITION_NAME_LEN],
        }
    }

    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub filesystem_type: i32,
    pub inodes_count: i32,
    pub blocks_count: i32,
    pub free_blocks_count: i32,
    pub free_inodes_count: i32,
    pub mtime: [u8; TIME_LEN],
    pub umtime: [u8; TIME_LEN],
    pub mnt_count: i32,
    pub magic: i32,
    pub inode_size: i32,
    pub block_size: i32,
    pub first_ino: i32,
    pub first_blo: i32,
    pub bm_inode_start: i32,
    pub bm_block_start: i32,
    pub inode_start: i32,
    pub block_start: i32,
}

impl SuperBlock {
    /// The superblock sits right before the inode bitmap.
    pub fn partition_start(&self) -> u64 {
        (self.bm_inode_start as i64 - SUPERBLOCK_SIZE as i64) as u64
    }

    pub fn inode_offset(&self, inode_id: i32) -> u64 {
        self.inode_start as u64 + inode_id as u64 * INODE_SIZE as u64
    }

    pub fn block_offset(&self, block_id: i32) -> u64 {
        self.block_start as u64 + block_id as u64 * BLOCK_SIZE as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    pub uid: i32,
    pub gid: i32,
    pub size: i32,
    pub atime: [u8; TIME_LEN],
    pub ctime: [u8; TIME_LEN],
    pub mtime: [u8; TIME_LEN],
    pub block: [i32; NUM_BLOCK_PTRS],
    pub itype: u8,
    pub perm: [u8; 3],
}

impl Inode {
    /// Unused inode-table slot.
    pub const EMPTY: Self = Self {
        uid: 0,
        gid: 0,
        size: 0,
        atime: [0; TIME_LEN],
        ctime: [0; TIME_LEN],
        mtime: [0; TIME_LEN],
        block: [NULL_PTR; NUM_BLOCK_PTRS],
        itype: 0,
        perm: [0; 3],
    };

    pub fn new(itype: InodeType) -> Self {
        let now = now_stamp();
        Self {
            uid: DEFAULT_OWNER,
            gid: DEFAULT_OWNER,
            size: 0,
            atime: now,
            ctime: now,
            mtime: now,
            block: [NULL_PTR; NUM_BLOCK_PTRS],
            itype: itype as u8,
            perm: *DEFAULT_PERM,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.itype == InodeType::Directory as u8
    }

    pub fn is_file(&self) -> bool {
        self.itype == InodeType::File as u8
    }

    pub fn direct_ptrs(&self) -> &[i32] {
        &self.block[..NUM_DIRECT_PTRS]
    }

    pub fn has_indirect(&self) -> bool {
        self.block[NUM_DIRECT_PTRS..].iter().any(|&b| b != NULL_PTR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub name: [u8; MAX_FILE_NAME_LEN],
    pub inode: i32,
}

impl Content {
    pub const FREE: Self = Self {
        name: [0; MAX_FILE_NAME_LEN],
        inode: NULL_PTR,
    };

    pub fn new(inode: i32, name: &str) -> Result<Self, FsError> {
        if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
            return Err(FsError::InvalidArgument(format!(
                "name {name:?} must be 1..={MAX_FILE_NAME_LEN} bytes"
            )));
        }
        Ok(Self {
            name: fixed(name),
            inode,
        })
    }

    /// Zeroed slots of a freshly formatted block count as free too.
    pub fn is_free(&self) -> bool {
        self.inode < 0 || trim_zero(&self.name).is_empty()
    }

    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderBlock {
    pub content: [Content; NUM_ENTRY_PER_BLOCK],
}

impl FolderBlock {
    pub const EMPTY: Self = Self {
        content: [Content::FREE; NUM_ENTRY_PER_BLOCK],
    };

    /// First block of a new directory: `.` and `..` followed by free slots.
    pub fn new_dir(self_id: i32, parent_id: i32) -> Self {
        let mut block = Self::EMPTY;
        block.content[0] = Content {
            name: fixed(DOT_NAME),
            inode: self_id,
        };
        block.content[1] = Content {
            name: fixed(DOTDOT_NAME),
            inode: parent_id,
        };
        block
    }

    pub fn free_slot(&self) -> Option<usize> {
        self.content.iter().position(Content::is_free)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlock {
    #[serde(with = "BigArray")]
    pub content: [u8; BLOCK_SIZE],
}

impl FileBlock {
    pub fn from_chunk(chunk: &[u8]) -> Self {
        let mut content = [0u8; BLOCK_SIZE];
        let len = chunk.len().min(BLOCK_SIZE);
        content[..len].copy_from_slice(&chunk[..len]);
        Self { content }
    }
}

impl fmt::Debug for FileBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBlock")
            .field("content", &String::from_utf8_lossy(trim_zero(&self.content)))
            .finish()
    }
}

impl OnDisk for Mbr {
    const SIZE: usize = MBR_SIZE;
    const NAME: &'static str = "MBR";
}

impl OnDisk for Ebr {
    const SIZE: usize = EBR_SIZE;
    const NAME: &'static str = "EBR";
}

impl OnDisk for SuperBlock {
    const SIZE: usize = SUPERBLOCK_SIZE;
    const NAME: &'static str = "superblock";
}

impl OnDisk for Inode {
    const SIZE: usize = INODE_SIZE;
    const NAME: &'static str = "inode";
}

impl OnDisk for FolderBlock {
    const SIZE: usize = BLOCK_SIZE;
    const NAME: &'static str = "folder block";
}

impl OnDisk for FileBlock {
    const SIZE: usize = BLOCK_SIZE;
    const NAME: &'static str = "file block";
}
