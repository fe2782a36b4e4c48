//! Disk images and their partition table: the MBR with its four entries, and the
//! EBR chain threading logical partitions through the extended one.

use std::path::Path;

use rand::Rng;

use crate::block_dev::{Disk, FileDisk, read_struct, write_struct};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::*;

pub fn read_mbr(disk: &impl Disk) -> Result<Mbr> {
    read_struct(disk, 0)
}

pub fn write_mbr(disk: &impl Disk, mbr: &Mbr) -> Result<()> {
    write_struct(disk, 0, mbr)
}

/// Creates a zero-filled image of `size * unit` bytes and writes its MBR.
/// Returns the MBR as read back from the image.
pub fn create_disk(path: impl AsRef<Path>, size: i64, unit: Unit, fit: Fit) -> Result<Mbr> {
    if size <= 0 {
        return Err(FsError::InvalidArgument(format!("size must be greater than 0, got {size}")));
    }
    if unit == Unit::Bytes {
        return Err(FsError::InvalidArgument("disk unit must be k or m".to_string()));
    }
    let bytes = size
        .checked_mul(unit.multiplier())
        .filter(|&b| b <= i32::MAX as i64 && b >= MBR_SIZE as i64)
        .ok_or_else(|| FsError::InvalidArgument(format!("disk size {size}{unit:?} out of range")))?;

    let disk = FileDisk::create(path.as_ref(), bytes as u64)?;
    let mbr = Mbr {
        size: bytes as i32,
        creation_date: today(),
        signature: rand::rng().random_range(0..i32::MAX),
        fit: fit.as_byte(),
        partitions: [Partition::default(); MAX_PARTITIONS],
    };
    write_mbr(&disk, &mbr)?;
    disk.flush()?;
    log::info!("[create_disk] {} bytes at {}", bytes, path.as_ref().display());
    read_mbr(&disk)
}

pub fn delete_disk(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FsError::NotFound(format!("disk {}", path.display())));
    }
    std::fs::remove_file(path).map_err(|e| FsError::io(format!("removing {}", path.display()), e))
}

/// Walks the EBR chain of an extended partition, head included.
/// Every `next` must stay inside the extended partition and move forward.
pub fn ebr_chain(disk: &impl Disk, extended: &Partition) -> Result<Vec<(u64, Ebr)>> {
    let mut chain = Vec::new();
    let mut pos = extended.start as i64;
    loop {
        if pos < extended.start as i64 || pos + EBR_SIZE as i64 > extended.end() {
            return Err(FsError::Corrupt {
                what: "EBR",
                offset: pos.max(0) as u64,
                reason: format!("outside extended partition {}", extended.name_str()),
            });
        }
        let ebr: Ebr = read_struct(disk, pos as u64)?;
        let next = ebr.next as i64;
        chain.push((pos as u64, ebr));
        if ebr.next == NULL_PTR {
            return Ok(chain);
        }
        if next <= pos {
            return Err(FsError::Corrupt {
                what: "EBR",
                offset: pos as u64,
                reason: format!("next pointer {next} does not move forward"),
            });
        }
        pos = next;
    }
}

/// Logical partitions of the extended one, without the empty head.
pub fn logical_partitions(disk: &impl Disk, extended: &Partition) -> Result<Vec<Ebr>> {
    Ok(ebr_chain(disk, extended)?
        .into_iter()
        .map(|(_, ebr)| ebr)
        .filter(|ebr| ebr.size > 0)
        .collect())
}

/// Adds a partition to the image at `path`. Placement is append-only: the fit is
/// recorded but never consulted.
pub fn create_partition(
    path: impl AsRef<Path>,
    size: i64,
    unit: Unit,
    name: &str,
    ptype: PartitionType,
    fit: Fit,
) -> Result<Mbr> {
    if size <= 0 {
        return Err(FsError::InvalidArgument(format!("size must be greater than 0, got {size}")));
    }
    if name.is_empty() || name.len() > PARTITION_NAME_LEN {
        return Err(FsError::InvalidArgument(format!(
            "partition name {name:?} must be 1..={PARTITION_NAME_LEN} bytes"
        )));
    }
    let bytes = size
        .checked_mul(unit.multiplier())
        .filter(|&b| b <= i32::MAX as i64)
        .ok_or_else(|| FsError::InvalidArgument(format!("partition size {size} out of range")))?;

    let disk = FileDisk::open(path.as_ref())?;
    let mut mbr = read_mbr(&disk)?;

    let used = mbr.used_partitions().count();
    if used >= MAX_PARTITIONS {
        return Err(FsError::InvalidArgument(
            "a disk holds at most 4 primary or extended partitions".to_string(),
        ));
    }
    let extended = mbr.extended().copied();
    match (ptype, extended) {
        (PartitionType::Extended, Some(_)) => {
            return Err(FsError::InvalidArgument(
                "only one extended partition is allowed per disk".to_string(),
            ));
        }
        (PartitionType::Logical, None) => {
            return Err(FsError::InvalidArgument(
                "a logical partition needs an extended partition".to_string(),
            ));
        }
        _ => {}
    }
    if mbr.used_partitions().any(|p| p.name_str() == name) {
        return Err(FsError::AlreadyExists(format!("partition {name}")));
    }
    if mbr.used_space() + bytes > mbr.size as i64 {
        return Err(FsError::NoSpace(format!(
            "{} bytes requested, {} unallocated",
            bytes,
            mbr.size as i64 - mbr.used_space()
        )));
    }

    match (ptype, extended) {
        (PartitionType::Logical, Some(ext)) => {
            append_logical(&disk, &ext, bytes as i32, name, fit)?;
        }
        _ => {
            let start = match used {
                0 => MBR_SIZE as i32,
                n => {
                    let last = &mbr.partitions[n - 1];
                    last.start + last.size
                }
            };
            let slot = mbr
                .partitions
                .iter()
                .position(|p| !p.is_used())
                .ok_or_else(|| FsError::InvalidArgument("partition table is full".to_string()))?;
            mbr.partitions[slot] = Partition {
                status: STATUS_UNMOUNTED,
                part_type: ptype.as_byte(),
                fit: fit.as_byte(),
                start,
                size: bytes as i32,
                name: fixed(name),
                correlative: used as i32 + 1,
                id: [0; PARTITION_ID_LEN],
            };
            if ptype == PartitionType::Extended {
                write_struct(&disk, start as u64, &Ebr::head(start, fit.as_byte()))?;
            }
            write_mbr(&disk, &mbr)?;
        }
    }
    disk.flush()?;
    log::info!("[create_partition] {name} ({ptype:?}, {bytes} bytes)");
    read_mbr(&disk)
}

fn append_logical(disk: &impl Disk, ext: &Partition, size: i32, name: &str, fit: Fit) -> Result<Ebr> {
    let chain = ebr_chain(disk, ext)?;
    if chain
        .iter()
        .any(|(_, ebr)| ebr.size > 0 && ebr.name_str() == name)
    {
        return Err(FsError::AlreadyExists(format!("logical partition {name}")));
    }
    let (tail_pos, mut tail) = chain.last().copied().ok_or(FsError::Corrupt {
        what: "EBR",
        offset: ext.start as u64,
        reason: "empty chain".to_string(),
    })?;

    let new_pos = tail.start as i64 + tail.size as i64;
    let data_start = new_pos + EBR_SIZE as i64;
    if data_start + size as i64 > ext.end() {
        return Err(FsError::NoSpace(format!(
            "{} bytes requested, {} left in extended partition {}",
            size,
            (ext.end() - data_start).max(0),
            ext.name_str()
        )));
    }

    let node = Ebr {
        fit: fit.as_byte(),
        start: data_start as i32,
        size,
        next: NULL_PTR,
        name: fixed(name),
    };
    write_struct(disk, new_pos as u64, &node)?;
    tail.next = new_pos as i32;
    write_struct(disk, tail_pos, &tail)?;
    log::debug!("[append_logical] EBR at {new_pos}, data at {data_start}");
    Ok(node)
}
