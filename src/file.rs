//! Regular files: contiguous payload spread over the direct blocks of an inode.

use crate::bitmap::{find_free_blocks, find_free_inode, mark_block, mark_inode};
use crate::block_dev::Disk;
use crate::config::*;
use crate::directory::{dir_add_entry, ensure_absent, release};
use crate::error::{FsError, Result};
use crate::inode::*;
use crate::structs::*;

/// The `0123456789` cycle truncated to `size` bytes.
pub fn generate_content(size: usize) -> Vec<u8> {
    b"0123456789".iter().copied().cycle().take(size).collect()
}

/// Number of blocks a payload of `len` bytes occupies. Empty files still get one.
pub fn blocks_needed(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE).max(1)
}

/// Rejects payloads that would need indirect blocks.
pub fn check_len(len: usize) -> Result<()> {
    if len > MAX_FILE_SIZE {
        return Err(FsError::Unsupported(format!(
            "{len} bytes need indirect blocks, at most {MAX_FILE_SIZE} bytes fit in direct blocks"
        )));
    }
    Ok(())
}

/// Creates a file named `name` under `parent_id` holding `content`.
/// Returns the inode id of the new file.
pub fn create_file(
    disk: &impl Disk,
    superblock: &mut SuperBlock,
    parent_id: i32,
    name: &str,
    content: &[u8],
) -> Result<i32> {
    let link = Content::new(0, name)?;
    check_len(content.len())?;
    let num_blocks = blocks_needed(content.len());

    let mut parent_inode = get_inode(disk, superblock, parent_id)?;
    ensure_absent(disk, superblock, &parent_inode, name)?;

    let inode_id = find_free_inode(disk, superblock)?;
    let blocks = find_free_blocks(disk, superblock, num_blocks)?;
    mark_inode(disk, superblock, inode_id, true)?;
    let mut marked = Vec::with_capacity(blocks.len());
    for &block_id in &blocks {
        if let Err(e) = mark_block(disk, superblock, block_id, true) {
            release(disk, superblock, inode_id, &marked);
            return Err(e);
        }
        marked.push(block_id);
    }

    let mut inode = Inode::new(InodeType::File);
    inode.size = content.len() as i32;
    inode.block[..num_blocks].copy_from_slice(&blocks);

    let written = blocks
        .iter()
        .zip(content.chunks(BLOCK_SIZE).chain(std::iter::once(&[][..])))
        .try_for_each(|(&block_id, chunk)| {
            write_file_block(disk, superblock, block_id, &FileBlock::from_chunk(chunk))
        })
        .and_then(|_| write_inode(disk, superblock, inode_id, &inode))
        .and_then(|_| {
            dir_add_entry(
                disk,
                superblock,
                parent_id,
                &mut parent_inode,
                Content { inode: inode_id, name: link.name },
            )
        });
    if let Err(e) = written {
        release(disk, superblock, inode_id, &blocks);
        return Err(e);
    }

    log::debug!("[create_file] {name} -> inode {inode_id}, blocks {blocks:?}");
    Ok(inode_id)
}

/// Content of a file: its direct blocks in pointer order, cut to the inode size.
pub fn read_file(disk: &impl Disk, superblock: &SuperBlock, inode: &Inode) -> Result<Vec<u8>> {
    if !inode.is_file() {
        return Err(FsError::NotFile("inode".to_string()));
    }
    if inode.has_indirect() {
        return Err(FsError::Unsupported("reading indirect blocks".to_string()));
    }

    let mut data = Vec::with_capacity(inode.size.max(0) as usize);
    for block_id in direct_blocks(inode) {
        data.extend_from_slice(&read_file_block(disk, superblock, block_id)?.content);
    }
    data.truncate(inode.size.max(0) as usize);
    Ok(data)
}
