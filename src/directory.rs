use crate::bitmap::{alloc_block, alloc_inode_id, find_free_block, find_free_inode, mark_block, mark_inode};
use crate::block_dev::Disk;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::inode::*;
use crate::structs::*;

fn entry_matches(entry: &Content, name: &str, policy: MatchPolicy) -> bool {
    !entry.is_free() && policy.matches(&entry.name_str(), name)
}

/// Query inode id of an entry by name in a directory.
/// Only the direct blocks are scanned.
pub fn dir_lookup(
    disk: &impl Disk,
    superblock: &SuperBlock,
    dir_inode: &Inode,
    name: &str,
    policy: MatchPolicy,
) -> Result<i32> {
    if !dir_inode.is_dir() {
        return Err(FsError::NotDirectory(format!("parent of {name}")));
    }

    for block_id in direct_blocks(dir_inode) {
        let block = read_folder_block(disk, superblock, block_id)?;
        if let Some(entry) = block.content.iter().find(|e| entry_matches(e, name, policy)) {
            log::debug!("[dir_lookup] {name} -> inode {} (block {block_id})", entry.inode);
            return Ok(entry.inode);
        }
    }

    Err(FsError::NotFound(name.to_string()))
}

/// Links `entry` into the first free slot of the directory. When every used block is full
/// a new folder block is allocated in the first unused direct pointer.
/// The child inode must already be written.
pub fn dir_add_entry(
    disk: &impl Disk,
    superblock: &mut SuperBlock,
    parent_id: i32,
    parent_inode: &mut Inode,
    entry: Content,
) -> Result<()> {
    if !parent_inode.is_dir() {
        return Err(FsError::NotDirectory(format!("inode {parent_id}")));
    }

    for block_id in direct_blocks(parent_inode) {
        let mut block = read_folder_block(disk, superblock, block_id)?;
        if let Some(slot) = block.free_slot() {
            block.content[slot] = entry;
            write_folder_block(disk, superblock, block_id, &block)?;
            log::debug!("[dir_add_entry] {} in block {block_id} slot {slot}", entry.name_str());
            return Ok(());
        }
    }

    let ptr = parent_inode
        .direct_ptrs()
        .iter()
        .position(|&b| b == NULL_PTR)
        .ok_or_else(|| {
            FsError::NoSpace(format!("directory inode {parent_id} has no free entry left"))
        })?;
    let block_id = alloc_block(disk, superblock)?;
    let mut block = FolderBlock::EMPTY;
    block.content[0] = entry;
    write_folder_block(disk, superblock, block_id, &block)?;

    parent_inode.block[ptr] = block_id;
    parent_inode.size += BLOCK_SIZE as i32;
    parent_inode.mtime = now_stamp();
    write_inode(disk, superblock, parent_id, parent_inode)?;
    log::debug!("[dir_add_entry] {} in new block {block_id}", entry.name_str());
    Ok(())
}

/// Used entries of a directory, `.` and `..` included.
pub fn read_dir(disk: &impl Disk, superblock: &SuperBlock, dir_inode: &Inode) -> Result<Vec<Content>> {
    if !dir_inode.is_dir() {
        return Err(FsError::NotDirectory("inode".to_string()));
    }

    let mut entries = vec![];
    for block_id in direct_blocks(dir_inode) {
        let block = read_folder_block(disk, superblock, block_id)?;
        entries.extend(block.content.iter().filter(|e| !e.is_free()).copied());
    }
    Ok(entries)
}

/// Gives back an inode and its blocks after a failed creation. Failures are only logged.
pub(crate) fn release(disk: &impl Disk, superblock: &mut SuperBlock, inode_id: i32, blocks: &[i32]) {
    if let Err(e) = write_inode(disk, superblock, inode_id, &Inode::EMPTY) {
        log::warn!("[release] clearing inode {inode_id}: {e}");
    }
    if let Err(e) = mark_inode(disk, superblock, inode_id, false) {
        log::warn!("[release] inode {inode_id}: {e}");
    }
    for &block_id in blocks {
        if let Err(e) = mark_block(disk, superblock, block_id, false) {
            log::warn!("[release] block {block_id}: {e}");
        }
    }
}

/// Fails with `AlreadyExists` when `name` is linked in the directory.
/// Always compares whole names, whatever policy lookups use.
pub(crate) fn ensure_absent(
    disk: &impl Disk,
    superblock: &SuperBlock,
    dir_inode: &Inode,
    name: &str,
) -> Result<()> {
    match dir_lookup(disk, superblock, dir_inode, name, MatchPolicy::Exact) {
        Ok(_) => Err(FsError::AlreadyExists(name.to_string())),
        Err(FsError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Creates a directory named `dir_name` under `parent_id`, with `.` and `..` entries.
/// Returns the inode id of the new directory.
pub fn mkdir(disk: &impl Disk, superblock: &mut SuperBlock, parent_id: i32, dir_name: &str) -> Result<i32> {
    let link = Content::new(0, dir_name)?;
    let mut parent_inode = get_inode(disk, superblock, parent_id)?;
    ensure_absent(disk, superblock, &parent_inode, dir_name)?;

    // Both must be available before anything is marked.
    find_free_inode(disk, superblock)?;
    find_free_block(disk, superblock)?;
    let inode_id = alloc_inode_id(disk, superblock)?;
    let block_id = match alloc_block(disk, superblock) {
        Ok(id) => id,
        Err(e) => {
            release(disk, superblock, inode_id, &[]);
            return Err(e);
        }
    };

    let mut dir_inode = Inode::new(InodeType::Directory);
    dir_inode.block[0] = block_id;
    dir_inode.size = BLOCK_SIZE as i32;
    let linked = write_inode(disk, superblock, inode_id, &dir_inode)
        .and_then(|_| {
            write_folder_block(disk, superblock, block_id, &FolderBlock::new_dir(inode_id, parent_id))
        })
        .and_then(|_| {
            dir_add_entry(
                disk,
                superblock,
                parent_id,
                &mut parent_inode,
                Content { inode: inode_id, name: link.name },
            )
        });
    if let Err(e) = linked {
        release(disk, superblock, inode_id, &[block_id]);
        return Err(e);
    }

    log::debug!("[mkdir] {dir_name} -> inode {inode_id}, block {block_id}");
    Ok(inode_id)
}
