//! dskfs manages partitioned disk images holding a small EXT2-style file system.
//!
//! A disk image is a flat file with this layout:
//! - MBR (four partition entries)
//! - Partitions, each formatted as:
//!   - Superblock
//!   - Inode bitmap (one byte per inode)
//!   - Block bitmap (one byte per block)
//!   - Inode table
//!   - Block table
//! - Logical partitions chained by EBRs inside the extended partition
//!
//! Layers (from bottom to top):
//! 1. Disk: byte-addressable image with bounds checking.
//! 2. Partition/Mount: MBR, EBR chain and the registry of mounted partitions.
//! 3. Bitmap/Inode: allocation and inode/block access.
//! 4. Directory/Path: entries and resolution.
//! 5. File: content of regular files.
//! 6. FileSystem/Engine: the user-facing interface, sessions and reports.

mod bitmap;
mod block_dev;
mod config;
mod directory;
mod engine;
mod error;
mod file;
mod fs;
mod inode;
mod mount;
mod partition;
mod path;
pub mod report;
mod session;
mod structs;
mod superblock;

pub use block_dev::{Disk, FileDisk, OnDisk, read_struct, write_struct};
pub use config::*;
pub use directory::{dir_lookup, read_dir};
pub use engine::{CommandOutput, Engine};
pub use error::FsError as Error;
pub use error::Result;
pub use file::generate_content;
pub use fs::*;
pub use mount::{MountRecord, MountRegistry};
pub use partition::{create_disk, create_partition, delete_disk, ebr_chain, logical_partitions, read_mbr};
pub use path::{resolve, split};
pub use session::{login, logout};
pub use structs::*;
pub use superblock::{format_fs, inode_capacity, read_superblock};
