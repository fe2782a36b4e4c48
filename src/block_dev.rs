use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::FsError;
use crate::Result;

/// A flat, fixed-size byte array. Every structure of the image lives at a byte offset of it.
pub trait Disk {
    /// Returns the size of the image in bytes.
    fn size(&self) -> u64;

    /// Fills `buf` with the bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes `buf` starting at `offset`.
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Persists pending writes.
    fn flush(&self) -> Result<()>;

    /// Rejects any access that does not lie completely inside the image.
    fn check_bounds(&self, what: &'static str, offset: u64, len: usize) -> Result<()> {
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= self.size() => Ok(()),
            _ => Err(FsError::OutOfBounds {
                what,
                offset,
                len,
                disk_size: self.size(),
            }),
        }
    }
}

/// A fixed-size on-disk record with a known encoded length.
pub trait OnDisk: Serialize + DeserializeOwned {
    const SIZE: usize;
    const NAME: &'static str;
}

pub fn read_struct<T: OnDisk>(disk: &impl Disk, offset: u64) -> Result<T> {
    disk.check_bounds(T::NAME, offset, T::SIZE)?;
    let mut buf = vec![0u8; T::SIZE];
    disk.read_at(offset, &mut buf)?;
    bincode::deserialize(&buf).map_err(|e| FsError::Corrupt {
        what: T::NAME,
        offset,
        reason: e.to_string(),
    })
}

/// Encodes `value` as it will be laid out at `offset`.
pub fn encode_struct<T: OnDisk>(value: &T, offset: u64) -> Result<Vec<u8>> {
    let buf = bincode::serialize(value).map_err(|e| FsError::Corrupt {
        what: T::NAME,
        offset,
        reason: e.to_string(),
    })?;
    debug_assert_eq!(buf.len(), T::SIZE);
    Ok(buf)
}

pub fn write_struct<T: OnDisk>(disk: &impl Disk, offset: u64, value: &T) -> Result<()> {
    let buf = encode_struct(value, offset)?;
    disk.check_bounds(T::NAME, offset, buf.len())?;
    disk.write_at(offset, &buf)
}

/// Disk image backed by a host file. The file is closed when the value is dropped.
#[derive(Debug)]
pub struct FileDisk {
    path: PathBuf,
    inner: Mutex<File>,
    size: u64,
}

impl FileDisk {
    /// Opens an existing image for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FsError::NotFound(format!("disk {}", path.display())));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| FsError::io(format!("opening {}", path.display()), e))?;
        let size = file
            .metadata()
            .map_err(|e| FsError::io(format!("reading metadata of {}", path.display()), e))?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(file),
            size,
        })
    }

    /// Creates (or truncates) an image of exactly `size` zero bytes.
    pub fn create(path: impl AsRef<Path>, size: u64) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| FsError::io(format!("creating {}", parent.display()), e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| FsError::io(format!("creating {}", path.display()), e))?;
        file.set_len(size)
            .map_err(|e| FsError::io(format!("zero-filling {}", path.display()), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(file),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, File>> {
        self.inner.lock().map_err(|_| {
            FsError::io(
                format!("locking {}", self.path.display()),
                std::io::Error::other("poisoned lock"),
            )
        })
    }
}

impl Disk for FileDisk {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.check_bounds("read", offset, buf.len())?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(buf))
            .map_err(|e| FsError::io(format!("reading {} bytes at {}", buf.len(), offset), e))
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        self.check_bounds("write", offset, buf.len())?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(buf))
            .map_err(|e| FsError::io(format!("writing {} bytes at {}", buf.len(), offset), e))
    }

    fn flush(&self) -> Result<()> {
        let mut file = self.lock()?;
        file.flush()
            .map_err(|e| FsError::io(format!("flushing {}", self.path.display()), e))
    }
}
