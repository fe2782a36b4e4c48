//! Inode and block bitmaps. One byte per item: `0` free, `1` used.
//! Every change is mirrored into the superblock counters, which are persisted right away.

use crate::block_dev::Disk;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::SuperBlock;
use crate::superblock::write_superblock;

const FREE: u8 = 0;
const USED: u8 = 1;

#[derive(Debug, Clone, Copy)]
enum Bitmap {
    Inode,
    Block,
}

impl Bitmap {
    fn name(self) -> &'static str {
        match self {
            Bitmap::Inode => "inode",
            Bitmap::Block => "block",
        }
    }

    fn region(self, superblock: &SuperBlock) -> (u64, usize) {
        match self {
            Bitmap::Inode => (superblock.bm_inode_start as u64, superblock.inodes_count as usize),
            Bitmap::Block => (superblock.bm_block_start as u64, superblock.blocks_count as usize),
        }
    }
}

fn load(disk: &impl Disk, superblock: &SuperBlock, bitmap: Bitmap) -> Result<Vec<u8>> {
    let (start, len) = bitmap.region(superblock);
    let mut buf = vec![0u8; len];
    disk.read_at(start, &mut buf)?;
    Ok(buf)
}

/// Returns the first `count` free indices, scanning from 0.
fn first_free(disk: &impl Disk, superblock: &SuperBlock, bitmap: Bitmap, count: usize) -> Result<Vec<i32>> {
    let found: Vec<i32> = load(disk, superblock, bitmap)?
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == FREE)
        .map(|(i, _)| i as i32)
        .take(count)
        .collect();
    if found.len() < count {
        return Err(FsError::ResourceExhausted(bitmap.name()));
    }
    Ok(found)
}

fn set(
    disk: &impl Disk,
    superblock: &mut SuperBlock,
    bitmap: Bitmap,
    index: i32,
    used: bool,
) -> Result<()> {
    let (start, len) = bitmap.region(superblock);
    if index < 0 || index as usize >= len {
        return Err(FsError::OutOfBounds {
            what: bitmap.name(),
            offset: start + index.max(0) as u64,
            len: 1,
            disk_size: start + len as u64,
        });
    }

    let offset = start + index as u64;
    let mut byte = [0u8; 1];
    disk.read_at(offset, &mut byte)?;
    let value = if used { USED } else { FREE };
    if byte[0] == value {
        return Ok(());
    }
    disk.write_at(offset, &[value])?;

    let delta = if used { -1 } else { 1 };
    let next_free = load(disk, superblock, bitmap)?
        .iter()
        .position(|&b| b == FREE)
        .map_or(NULL_PTR, |i| i as i32);
    match bitmap {
        Bitmap::Inode => {
            superblock.free_inodes_count += delta;
            superblock.first_ino = next_free;
        }
        Bitmap::Block => {
            superblock.free_blocks_count += delta;
            superblock.first_blo = next_free;
        }
    }
    write_superblock(disk, superblock)
}

pub fn find_free_inode(disk: &impl Disk, superblock: &SuperBlock) -> Result<i32> {
    Ok(first_free(disk, superblock, Bitmap::Inode, 1)?[0])
}

pub fn find_free_block(disk: &impl Disk, superblock: &SuperBlock) -> Result<i32> {
    Ok(first_free(disk, superblock, Bitmap::Block, 1)?[0])
}

/// The first `count` free blocks, all or nothing.
pub fn find_free_blocks(disk: &impl Disk, superblock: &SuperBlock, count: usize) -> Result<Vec<i32>> {
    first_free(disk, superblock, Bitmap::Block, count)
}

pub fn mark_inode(disk: &impl Disk, superblock: &mut SuperBlock, inode_id: i32, used: bool) -> Result<()> {
    set(disk, superblock, Bitmap::Inode, inode_id, used)
}

pub fn mark_block(disk: &impl Disk, superblock: &mut SuperBlock, block_id: i32, used: bool) -> Result<()> {
    set(disk, superblock, Bitmap::Block, block_id, used)
}

/// Finds and marks a free inode.
pub fn alloc_inode_id(disk: &impl Disk, superblock: &mut SuperBlock) -> Result<i32> {
    let inode_id = find_free_inode(disk, superblock)?;
    mark_inode(disk, superblock, inode_id, true)?;
    log::debug!("[alloc_inode_id] {inode_id}");
    Ok(inode_id)
}

/// Finds and marks a free block.
pub fn alloc_block(disk: &impl Disk, superblock: &mut SuperBlock) -> Result<i32> {
    let block_id = find_free_block(disk, superblock)?;
    mark_block(disk, superblock, block_id, true)?;
    log::debug!("[alloc_block] {block_id}");
    Ok(block_id)
}

pub fn read_inode_bitmap(disk: &impl Disk, superblock: &SuperBlock) -> Result<Vec<u8>> {
    load(disk, superblock, Bitmap::Inode)
}

pub fn read_block_bitmap(disk: &impl Disk, superblock: &SuperBlock) -> Result<Vec<u8>> {
    load(disk, superblock, Bitmap::Block)
}
