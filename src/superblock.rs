use crate::block_dev::{Disk, encode_struct, read_struct, write_struct};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::*;

/// Bytes one inode costs: its bitmap byte, its table entry, and three blocks with their bitmap bytes.
const BYTES_PER_INODE: i64 = 1 + BLOCKS_PER_INODE as i64 + INODE_SIZE as i64 + BLOCKS_PER_INODE as i64 * BLOCK_SIZE as i64;

pub fn read_superblock(disk: &impl Disk, partition_start: u64) -> Result<SuperBlock> {
    let superblock: SuperBlock = read_struct(disk, partition_start)?;

    if superblock.magic != MAGIC {
        return Err(FsError::Corrupt {
            what: "superblock",
            offset: partition_start,
            reason: format!("bad magic {:#x}, partition is not formatted", superblock.magic),
        });
    }
    if superblock.block_size != BLOCK_SIZE as i32 || superblock.inode_size != INODE_SIZE as i32 {
        return Err(FsError::Corrupt {
            what: "superblock",
            offset: partition_start,
            reason: "unexpected inode or block size".to_string(),
        });
    }

    Ok(superblock)
}

pub fn write_superblock(disk: &impl Disk, superblock: &SuperBlock) -> Result<()> {
    write_struct(disk, superblock.partition_start(), superblock)
}

/// Number of inodes a partition of `size` bytes holds. Blocks are three times that.
pub fn inode_capacity(size: i32) -> i32 {
    ((size as i64 - SUPERBLOCK_SIZE as i64).max(0) / BYTES_PER_INODE) as i32
}

/// Lays out an empty file system over `[start, start + size)`: zeroed bitmaps, a table of
/// unused inodes and zeroed blocks. Nothing is allocated yet.
pub fn format_fs(disk: &impl Disk, start: i32, size: i32) -> Result<SuperBlock> {
    let n = inode_capacity(size);
    if n < 2 {
        return Err(FsError::NoSpace(format!(
            "partition of {size} bytes holds {n} inodes, at least 2 are needed"
        )));
    }
    disk.check_bounds("partition", start as u64, size as usize)?;

    let now = now_stamp();
    let bm_inode_start = start + SUPERBLOCK_SIZE as i32;
    let bm_block_start = bm_inode_start + n;
    let inode_start = bm_block_start + BLOCKS_PER_INODE * n;
    let block_start = inode_start + n * INODE_SIZE as i32;
    let superblock = SuperBlock {
        filesystem_type: FILESYSTEM_TYPE_EXT2,
        inodes_count: n,
        blocks_count: BLOCKS_PER_INODE * n,
        free_blocks_count: BLOCKS_PER_INODE * n,
        free_inodes_count: n,
        mtime: now,
        umtime: now,
        mnt_count: 1,
        magic: MAGIC,
        inode_size: INODE_SIZE as i32,
        block_size: BLOCK_SIZE as i32,
        first_ino: 0,
        first_blo: 0,
        bm_inode_start,
        bm_block_start,
        inode_start,
        block_start,
    };

    disk.write_at(bm_inode_start as u64, &vec![0u8; n as usize])?;
    disk.write_at(bm_block_start as u64, &vec![0u8; (BLOCKS_PER_INODE * n) as usize])?;

    let empty = encode_struct(&Inode::EMPTY, inode_start as u64)?;
    disk.write_at(inode_start as u64, &empty.repeat(n as usize))?;
    disk.write_at(
        block_start as u64,
        &vec![0u8; (BLOCKS_PER_INODE * n) as usize * BLOCK_SIZE],
    )?;

    write_superblock(disk, &superblock)?;
    log::debug!(
        "[format_fs] {} inodes, {} blocks, block table at {}",
        superblock.inodes_count,
        superblock.blocks_count,
        superblock.block_start
    );
    Ok(superblock)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_inode_capacity() {
        assert_eq!(BYTES_PER_INODE, 320);
        assert_eq!(inode_capacity(2012), 6);
        assert_eq!(inode_capacity(1024 * 1000), (1024 * 1000 - 92) / 320);
        assert_eq!(inode_capacity(50), 0);
    }
}
