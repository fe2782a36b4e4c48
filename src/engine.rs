//! Command surface. Every command returns its human-readable trace together with its result,
//! so partial progress is visible even when the command fails.

use std::fmt::Display;
use std::path::Path;

use crate::block_dev::FileDisk;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::fs::FileSystem;
use crate::mount::{MountRecord, MountRegistry};
use crate::partition;
use crate::report::{self, ReportKind};
use crate::session;
use crate::structs::*;

#[derive(Debug)]
pub struct CommandOutput<T> {
    pub log: String,
    pub result: Result<T>,
}

impl<T> CommandOutput<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

struct Trace {
    name: &'static str,
    log: String,
}

impl Trace {
    fn start(name: &'static str) -> Self {
        Self {
            name,
            log: format!("========== {name} ==========\n"),
        }
    }

    fn param(&mut self, key: &str, value: impl Display) {
        self.log.push_str(&format!("  {key}: {value}\n"));
    }

    fn line(&mut self, msg: impl Display) {
        self.log.push_str(&format!("{msg}\n"));
    }

    fn finish<T>(mut self, result: Result<T>) -> CommandOutput<T> {
        match &result {
            Ok(_) => self.line(format!("{} completed", self.name)),
            Err(e) => self.line(format!("ERROR: {e}")),
        }
        self.line(format!("======== END {} ========", self.name));
        CommandOutput {
            log: self.log,
            result,
        }
    }
}

/// Owns the mount registry and the configuration. Commands take `&mut self`; hosts that
/// share an engine between threads wrap it in a mutex.
#[derive(Debug, Default)]
pub struct Engine {
    registry: MountRegistry,
    config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            registry: MountRegistry::new(),
            config,
        }
    }

    pub fn registry(&self) -> &MountRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn open_fs(&self, record: &MountRecord) -> Result<FileSystem<FileDisk>> {
        let (disk, partition) = record.open()?;
        FileSystem::mount(disk, partition.start as u64, self.config.clone())
    }

    /// File system of the partition holding the active session.
    fn active_fs(&self) -> Result<FileSystem<FileDisk>> {
        let record = self.registry.active().ok_or(FsError::NoActiveSession)?;
        self.open_fs(record)
    }

    pub fn create_disk(&mut self, size: i64, unit: Unit, fit: Fit, path: impl AsRef<Path>) -> CommandOutput<Mbr> {
        let path = path.as_ref();
        let mut trace = Trace::start("CREATE_DISK");
        trace.param("size", size);
        trace.param("unit", format!("{unit:?}"));
        trace.param("fit", format!("{fit:?}"));
        trace.param("path", path.display());
        let result = partition::create_disk(path, size, unit, fit);
        if let Ok(mbr) = &result {
            trace.line(format!("disk of {} bytes created, signature {}", mbr.size, mbr.signature));
        }
        trace.finish(result)
    }

    pub fn delete_disk(&mut self, path: impl AsRef<Path>) -> CommandOutput<()> {
        let path = path.as_ref();
        let mut trace = Trace::start("DELETE_DISK");
        trace.param("path", path.display());
        trace.finish(partition::delete_disk(path))
    }

    pub fn create_partition(
        &mut self,
        size: i64,
        unit: Unit,
        name: &str,
        ptype: PartitionType,
        fit: Fit,
        path: impl AsRef<Path>,
    ) -> CommandOutput<Mbr> {
        let path = path.as_ref();
        let mut trace = Trace::start("CREATE_PARTITION");
        trace.param("size", size);
        trace.param("unit", format!("{unit:?}"));
        trace.param("name", name);
        trace.param("type", format!("{ptype:?}"));
        trace.param("fit", format!("{fit:?}"));
        trace.param("path", path.display());
        let result = partition::create_partition(path, size, unit, name, ptype, fit);
        if let Ok(mbr) = &result {
            for p in mbr.used_partitions() {
                trace.line(format!(
                    "  [{}] {} {} start={} size={}",
                    p.correlative,
                    p.part_type as char,
                    p.name_str(),
                    p.start,
                    p.size
                ));
            }
        }
        trace.finish(result)
    }

    pub fn mount(&mut self, path: impl AsRef<Path>, name: &str) -> CommandOutput<String> {
        let path = path.as_ref();
        let mut trace = Trace::start("MOUNT");
        trace.param("path", path.display());
        trace.param("name", name);
        let result = self
            .registry
            .mount(path, name, &self.config.id_prefix)
            .map(|record| record.id);
        if let Ok(id) = &result {
            trace.line(format!("partition {name} mounted with id {id}"));
        }
        trace.finish(result)
    }

    pub fn mounted(&self) -> CommandOutput<Vec<MountRecord>> {
        let mut trace = Trace::start("MOUNTED");
        let records = self.registry.list().to_vec();
        if records.is_empty() {
            trace.line("no mounted partitions");
        }
        for r in &records {
            trace.line(format!("  {} -> {} ({})", r.id, r.name, r.path.display()));
        }
        trace.finish(Ok(records))
    }

    /// Only a full format of the ext2 variant is supported. Empty `kind`/`variant` mean `full`/`2fs`.
    pub fn format(&mut self, id: &str, kind: &str, variant: &str) -> CommandOutput<SuperBlock> {
        let mut trace = Trace::start("FORMAT");
        trace.param("id", id);
        trace.param("type", kind);
        trace.param("fs", variant);
        let result: Result<SuperBlock> = (|| {
            if !kind.is_empty() && !kind.eq_ignore_ascii_case("full") {
                return Err(FsError::InvalidArgument(format!("format type must be full, got {kind:?}")));
            }
            if !variant.is_empty() && !variant.eq_ignore_ascii_case("2fs") {
                return Err(FsError::Unsupported(format!("file system {variant:?}")));
            }
            let record = self.registry.lookup(id)?;
            if !record.mounted {
                return Err(FsError::NotMounted(id.to_string()));
            }
            let (disk, partition) = record.open()?;
            trace.line(format!(
                "formatting {} ({} bytes at {})",
                partition.name_str(),
                partition.size,
                partition.start
            ));
            let fs = FileSystem::format(disk, partition.start, partition.size, self.config.clone())?;
            let sb = *fs.superblock();
            trace.line(format!("{} inodes, {} blocks", sb.inodes_count, sb.blocks_count));
            Ok(sb)
        })();
        trace.finish(result)
    }

    pub fn login(&mut self, user: &str, pass: &str, id: &str) -> CommandOutput<()> {
        let mut trace = Trace::start("LOGIN");
        trace.param("user", user);
        trace.param("id", id);
        let result = session::login(&mut self.registry, &self.config, user, pass, id);
        if result.is_ok() {
            trace.line(format!("welcome {user}"));
        }
        trace.finish(result)
    }

    pub fn logout(&mut self) -> CommandOutput<String> {
        let mut trace = Trace::start("LOGOUT");
        let result = session::logout(&mut self.registry);
        if let Ok(id) = &result {
            trace.line(format!("session on {id} closed"));
        }
        trace.finish(result)
    }

    pub fn create_directory(&mut self, path: &str) -> CommandOutput<i32> {
        let mut trace = Trace::start("CREATE_DIRECTORY");
        trace.param("path", path);
        let result: Result<i32> = (|| {
            let mut fs = self.active_fs()?;
            let inode_id = fs.create_directory(path)?;
            trace.line(format!("{path} is inode {inode_id}"));
            Ok(inode_id)
        })();
        trace.finish(result)
    }

    /// Without `content`, the file is filled with `size` bytes of the digit cycle.
    pub fn create_file(&mut self, path: &str, size: i64, content: Option<&[u8]>) -> CommandOutput<i32> {
        let mut trace = Trace::start("CREATE_FILE");
        trace.param("path", path);
        trace.param("size", size);
        let result: Result<i32> = (|| {
            if size < 0 {
                return Err(FsError::InvalidArgument(format!("size must not be negative, got {size}")));
            }
            let mut fs = self.active_fs()?;
            let inode_id = fs.create_file(path, size as usize, content)?;
            trace.line(format!("{path} is inode {inode_id}"));
            Ok(inode_id)
        })();
        trace.finish(result)
    }

    pub fn cat(&self, path: &str) -> CommandOutput<String> {
        let mut trace = Trace::start("CAT");
        trace.param("path", path);
        let result: Result<String> = (|| {
            let fs = self.active_fs()?;
            let content = String::from_utf8_lossy(&fs.read_file(path)?).into_owned();
            trace.line(&content);
            Ok(content)
        })();
        trace.finish(result)
    }

    pub fn report(&self, id: &str, kind: ReportKind, path: Option<&str>) -> CommandOutput<String> {
        let mut trace = Trace::start("REPORT");
        trace.param("id", id);
        trace.param("name", format!("{kind:?}"));
        if let Some(path) = path {
            trace.param("path", path);
        }
        let result: Result<String> = (|| {
            let record = self.registry.lookup(id)?;
            let path = match (kind.needs_path(), path) {
                (true, None) => {
                    return Err(FsError::InvalidArgument(format!("report {kind:?} needs a path")));
                }
                (_, path) => path.unwrap_or("/"),
            };
            match kind {
                ReportKind::Mbr => report::mbr(&record.open()?.0),
                ReportKind::Disk => report::disk(&record.open()?.0),
                ReportKind::SuperBlock => Ok(report::superblock(&self.open_fs(record)?)),
                ReportKind::Inode => report::inodes(&self.open_fs(record)?),
                ReportKind::Block => report::blocks(&self.open_fs(record)?),
                ReportKind::BmInode => Ok(report::bitmap(&self.open_fs(record)?.inode_bitmap()?)),
                ReportKind::BmBlock => Ok(report::bitmap(&self.open_fs(record)?.block_bitmap()?)),
                ReportKind::Ls => report::ls(&self.open_fs(record)?, path),
                ReportKind::File => report::file(&self.open_fs(record)?, path),
            }
        })();
        if let Ok(text) = &result {
            trace.line(format!("{} bytes of report", text.len()));
        }
        trace.finish(result)
    }
}
