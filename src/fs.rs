use crate::bitmap::{self, mark_block, mark_inode};
use crate::block_dev::Disk;
use crate::config::*;
use crate::directory::{dir_lookup, mkdir, read_dir};
use crate::error::{FsError, Result};
use crate::file::{self, generate_content};
use crate::inode::*;
use crate::path::{components, resolve, split};
use crate::structs::*;
use crate::superblock::{self, read_superblock, write_superblock};

/// An EXT2-style file system living inside one partition of a disk image.
#[derive(Debug)]
pub struct FileSystem<D: Disk> {
    disk: D,
    superblock: SuperBlock,
    config: Config,
}

impl<D: Disk> FileSystem<D> {
    /// Formats `[start, start + size)` and bootstraps the root directory with `/users.txt`.
    pub fn format(disk: D, start: i32, size: i32, config: Config) -> Result<Self> {
        let mut superblock = superblock::format_fs(&disk, start, size)?;

        let mut root = Inode::new(InodeType::Directory);
        root.block[0] = 0;
        root.size = BLOCK_SIZE as i32;
        let mut root_block = FolderBlock::new_dir(ROOT_INODE_ID, ROOT_INODE_ID);
        root_block.content[2] = Content::new(USERS_INODE_ID, USERS_FILE)?;

        let mut users = Inode::new(InodeType::File);
        users.block[0] = 1;
        users.size = USERS_SEED.len() as i32;

        write_inode(&disk, &superblock, ROOT_INODE_ID, &root)?;
        write_folder_block(&disk, &superblock, 0, &root_block)?;
        write_inode(&disk, &superblock, USERS_INODE_ID, &users)?;
        write_file_block(&disk, &superblock, 1, &FileBlock::from_chunk(USERS_SEED.as_bytes()))?;

        mark_inode(&disk, &mut superblock, ROOT_INODE_ID, true)?;
        mark_inode(&disk, &mut superblock, USERS_INODE_ID, true)?;
        mark_block(&disk, &mut superblock, 0, true)?;
        mark_block(&disk, &mut superblock, 1, true)?;
        write_superblock(&disk, &superblock)?;
        disk.flush()?;

        log::info!(
            "[format] {} inodes, {} blocks at {}",
            superblock.inodes_count,
            superblock.blocks_count,
            start
        );
        Ok(Self {
            disk,
            superblock,
            config,
        })
    }

    /// Opens the file system whose superblock sits at `partition_start`.
    pub fn mount(disk: D, partition_start: u64, config: Config) -> Result<Self> {
        let superblock = read_superblock(&disk, partition_start)?;
        Ok(Self {
            disk,
            superblock,
            config,
        })
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn inode(&self, inode_id: i32) -> Result<Inode> {
        get_inode(&self.disk, &self.superblock, inode_id)
    }

    pub fn folder_block(&self, block_id: i32) -> Result<FolderBlock> {
        read_folder_block(&self.disk, &self.superblock, block_id)
    }

    pub fn file_block(&self, block_id: i32) -> Result<FileBlock> {
        read_file_block(&self.disk, &self.superblock, block_id)
    }

    pub fn find_free_inode(&self) -> Result<i32> {
        bitmap::find_free_inode(&self.disk, &self.superblock)
    }

    pub fn find_free_block(&self) -> Result<i32> {
        bitmap::find_free_block(&self.disk, &self.superblock)
    }

    pub fn find_free_blocks(&self, count: usize) -> Result<Vec<i32>> {
        bitmap::find_free_blocks(&self.disk, &self.superblock, count)
    }

    pub fn mark_inode(&mut self, inode_id: i32, used: bool) -> Result<()> {
        mark_inode(&self.disk, &mut self.superblock, inode_id, used)
    }

    pub fn mark_block(&mut self, block_id: i32, used: bool) -> Result<()> {
        mark_block(&self.disk, &mut self.superblock, block_id, used)
    }

    pub fn inode_bitmap(&self) -> Result<Vec<u8>> {
        bitmap::read_inode_bitmap(&self.disk, &self.superblock)
    }

    pub fn block_bitmap(&self) -> Result<Vec<u8>> {
        bitmap::read_block_bitmap(&self.disk, &self.superblock)
    }

    /// Returns (parent inode id, inode id) of `path`.
    pub fn resolve(&self, path: &str) -> Result<(i32, i32)> {
        resolve(&self.disk, &self.superblock, path, self.config.name_match)
    }

    /// `mkdir -p`: existing components are reused, missing ones created.
    /// Components are matched by whole name, so `/doc` never reuses `/docs`.
    /// Returns the inode id of the last component.
    pub fn create_directory(&mut self, path: &str) -> Result<i32> {
        let mut current_id = ROOT_INODE_ID;
        for component in components(path) {
            let current = self.inode(current_id)?;
            let found = dir_lookup(&self.disk, &self.superblock, &current, component, MatchPolicy::Exact);
            current_id = match found {
                Ok(id) => {
                    if !self.inode(id)?.is_dir() {
                        return Err(FsError::NotDirectory(component.to_string()));
                    }
                    id
                }
                Err(FsError::NotFound(_)) => {
                    mkdir(&self.disk, &mut self.superblock, current_id, component)?
                }
                Err(e) => return Err(e),
            };
        }
        self.disk.flush()?;
        Ok(current_id)
    }

    /// Creates a file, and any missing parent directories. Without `content` the file holds
    /// `size` bytes of the digit cycle; with it, the content's length wins.
    pub fn create_file(&mut self, path: &str, size: usize, content: Option<&[u8]>) -> Result<i32> {
        let (parent_path, name) = split(path);
        if name.is_empty() {
            return Err(FsError::InvalidArgument(format!("{path:?} names no file")));
        }
        file::check_len(content.map_or(size, <[u8]>::len))?;
        let content = content.map_or_else(|| generate_content(size), <[u8]>::to_vec);
        let parent_id = self.create_directory(&parent_path)?;
        let inode_id = file::create_file(
            &self.disk,
            &mut self.superblock,
            parent_id,
            &name,
            &content,
        )?;
        self.disk.flush()?;
        Ok(inode_id)
    }

    pub fn read_file_inode(&self, inode_id: i32) -> Result<Vec<u8>> {
        let inode = self.inode(inode_id)?;
        file::read_file(&self.disk, &self.superblock, &inode)
            .map_err(|e| match e {
                FsError::NotFile(_) => FsError::NotFile(format!("inode {inode_id}")),
                e => e,
            })
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let (_, inode_id) = self.resolve(path)?;
        self.read_file_inode(inode_id).map_err(|e| match e {
            FsError::NotFile(_) => FsError::NotFile(path.to_string()),
            e => e,
        })
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<Content>> {
        let (_, inode_id) = self.resolve(path)?;
        let inode = self.inode(inode_id)?;
        read_dir(&self.disk, &self.superblock, &inode).map_err(|e| match e {
            FsError::NotDirectory(_) => FsError::NotDirectory(path.to_string()),
            e => e,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.disk.flush()
    }
}
