//! Common utilities for tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dskfs::{Disk, Result};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// In-memory image. Clones share the same bytes, so a file system can be reopened.
#[derive(Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl RamDisk {
    pub fn new(size: usize) -> Self {
        RamDisk {
            inner: Arc::new(Mutex::new(vec![0u8; size])),
        }
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        self.inner.lock().unwrap()[offset..offset + len].to_vec()
    }
}

impl Disk for RamDisk {
    fn size(&self) -> u64 {
        self.inner.lock().unwrap().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.check_bounds("read", offset, buf.len())?;
        let data = self.inner.lock().unwrap();
        let start = offset as usize;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        self.check_bounds("write", offset, buf.len())?;
        let mut data = self.inner.lock().unwrap();
        let start = offset as usize;
        data[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Nothing to persist, data is already in memory.
        Ok(())
    }
}

/// Host path for a disk image, unique per test and process. The file is removed on drop.
pub struct TempImage {
    path: PathBuf,
}

impl TempImage {
    pub fn new(tag: &str) -> Self {
        let path = std::env::temp_dir()
            .join(format!("dskfs-tests-{}", std::process::id()))
            .join(format!("{tag}.dsk"));
        let _ = std::fs::remove_file(&path);
        TempImage { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Partition start used by the in-memory tests: right after the MBR.
pub const PART_START: i32 = 159;
/// 2012 bytes hold 6 inodes and 18 blocks.
pub const SMALL_PART: i32 = 2012;
