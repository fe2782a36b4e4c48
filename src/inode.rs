//! Reading and writing inodes and the blocks they point to.
//! Every id coming off the disk is checked against the table extents before use.

use crate::block_dev::{Disk, read_struct, write_struct};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::*;

fn check_inode_id(superblock: &SuperBlock, inode_id: i32) -> Result<u64> {
    if inode_id < 0 || inode_id >= superblock.inodes_count {
        return Err(FsError::Corrupt {
            what: "inode",
            offset: superblock.inode_start as u64,
            reason: format!("id {inode_id} outside 0..{}", superblock.inodes_count),
        });
    }
    Ok(superblock.inode_offset(inode_id))
}

fn check_block_id(superblock: &SuperBlock, block_id: i32) -> Result<u64> {
    if block_id < 0 || block_id >= superblock.blocks_count {
        return Err(FsError::Corrupt {
            what: "block",
            offset: superblock.block_start as u64,
            reason: format!("id {block_id} outside 0..{}", superblock.blocks_count),
        });
    }
    Ok(superblock.block_offset(block_id))
}

pub fn get_inode(disk: &impl Disk, superblock: &SuperBlock, inode_id: i32) -> Result<Inode> {
    let offset = check_inode_id(superblock, inode_id)?;
    read_struct(disk, offset)
}

pub fn write_inode(disk: &impl Disk, superblock: &SuperBlock, inode_id: i32, inode: &Inode) -> Result<()> {
    let offset = check_inode_id(superblock, inode_id)?;
    write_struct(disk, offset, inode)
}

pub fn read_folder_block(disk: &impl Disk, superblock: &SuperBlock, block_id: i32) -> Result<FolderBlock> {
    let offset = check_block_id(superblock, block_id)?;
    read_struct(disk, offset)
}

pub fn write_folder_block(
    disk: &impl Disk,
    superblock: &SuperBlock,
    block_id: i32,
    block: &FolderBlock,
) -> Result<()> {
    let offset = check_block_id(superblock, block_id)?;
    write_struct(disk, offset, block)
}

pub fn read_file_block(disk: &impl Disk, superblock: &SuperBlock, block_id: i32) -> Result<FileBlock> {
    let offset = check_block_id(superblock, block_id)?;
    read_struct(disk, offset)
}

pub fn write_file_block(
    disk: &impl Disk,
    superblock: &SuperBlock,
    block_id: i32,
    block: &FileBlock,
) -> Result<()> {
    let offset = check_block_id(superblock, block_id)?;
    write_struct(disk, offset, block)
}

/// Ids of the used direct blocks, in pointer order.
pub fn direct_blocks(inode: &Inode) -> impl Iterator<Item = i32> + '_ {
    inode.direct_ptrs().iter().copied().filter(|&b| b != NULL_PTR)
}
