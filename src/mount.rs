//! In-memory registry of mounted partitions. Records live as long as the registry:
//! there is no unmount.

use std::path::{Path, PathBuf};

use crate::block_dev::FileDisk;
use crate::config::PARTITION_ID_LEN;
use crate::error::{FsError, Result};
use crate::partition::{read_mbr, write_mbr};
use crate::structs::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    pub path: PathBuf,
    pub name: String,
    pub id: String,
    pub mounted: bool,
    pub logged_in: bool,
}

impl MountRecord {
    /// Opens the image and finds the partition entry this record refers to.
    pub fn open(&self) -> Result<(FileDisk, Partition)> {
        let disk = FileDisk::open(&self.path)?;
        let mbr = read_mbr(&disk)?;
        let partition = mbr
            .used_partitions()
            .find(|p| p.name_str() == self.name)
            .copied()
            .ok_or_else(|| {
                FsError::NotFound(format!("partition {} on {}", self.name, self.path.display()))
            })?;
        Ok((disk, partition))
    }
}

#[derive(Debug, Default)]
pub struct MountRegistry {
    /// Distinct disk paths, lowercased, in first-mount order; the position gives the disk letter.
    disks: Vec<String>,
    records: Vec<MountRecord>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn disk_key(path: &Path) -> String {
        path.to_string_lossy().to_lowercase()
    }

    /// Letter of the disk at `path`. A new disk is not recorded here.
    fn disk_letter(&self, path: &Path) -> Result<char> {
        let key = Self::disk_key(path);
        let index = self.disks.iter().position(|d| *d == key).unwrap_or(self.disks.len());
        u8::try_from(index)
            .ok()
            .filter(|&i| i < 26)
            .map(|i| (b'a' + i) as char)
            .ok_or_else(|| FsError::InvalidArgument("more than 26 disks mounted".to_string()))
    }

    /// Mounts the primary partition `name` of the image at `path` and stamps its ID
    /// `<id_prefix><partition index><disk letter>` into the partition table.
    pub fn mount(&mut self, path: impl AsRef<Path>, name: &str, id_prefix: &str) -> Result<MountRecord> {
        let path = path.as_ref();
        if id_prefix.len() + 2 > PARTITION_ID_LEN {
            return Err(FsError::InvalidArgument(format!(
                "id prefix {id_prefix:?} leaves no room in a {PARTITION_ID_LEN}-byte id"
            )));
        }
        let disk = FileDisk::open(path)?;
        let mut mbr = read_mbr(&disk)?;

        let index = mbr
            .partitions
            .iter()
            .position(|p| p.is_used() && p.name_str() == name)
            .ok_or_else(|| FsError::NotFound(format!("partition {name} on {}", path.display())))?;
        let partition = &mbr.partitions[index];
        if !partition.is_type(PartitionType::Primary) {
            return Err(FsError::InvalidArgument(format!("{name} is not a primary partition")));
        }
        let key = Self::disk_key(path);
        if partition.is_mounted()
            || self
                .records
                .iter()
                .any(|r| Self::disk_key(&r.path) == key && r.name == name)
        {
            return Err(FsError::AlreadyMounted(name.to_string()));
        }

        let letter = self.disk_letter(path)?;
        let id = format!("{id_prefix}{}{letter}", index + 1);
        let partition = &mut mbr.partitions[index];
        partition.status = STATUS_MOUNTED;
        partition.id = fixed(&id);
        write_mbr(&disk, &mbr)?;
        if !self.disks.contains(&key) {
            self.disks.push(key);
        }

        let record = MountRecord {
            path: path.to_path_buf(),
            name: name.to_string(),
            id,
            mounted: true,
            logged_in: false,
        };
        log::info!("[mount] {} on {} as {}", name, path.display(), record.id);
        self.records.push(record.clone());
        Ok(record)
    }

    pub fn lookup(&self, id: &str) -> Result<&MountRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| FsError::NotFound(format!("mount {id}")))
    }

    pub fn lookup_mut(&mut self, id: &str) -> Result<&mut MountRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| FsError::NotFound(format!("mount {id}")))
    }

    pub fn list(&self) -> &[MountRecord] {
        &self.records
    }

    /// The record holding the current session, if any.
    pub fn active(&self) -> Option<&MountRecord> {
        self.records.iter().find(|r| r.logged_in)
    }

    pub fn active_mut(&mut self) -> Option<&mut MountRecord> {
        self.records.iter_mut().find(|r| r.logged_in)
    }
}
