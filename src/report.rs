//! Read-only renderings of a disk and its file system. Graphs are Graphviz DOT sources;
//! bitmaps and file contents are plain text.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::block_dev::Disk;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::fs::FileSystem;
use crate::partition::{logical_partitions, read_mbr};
use crate::structs::*;

const BITMAP_PER_LINE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Mbr,
    Disk,
    SuperBlock,
    Inode,
    Block,
    BmInode,
    BmBlock,
    Ls,
    File,
}

impl ReportKind {
    /// `ls` and `file` render a path inside the file system.
    pub fn needs_path(self) -> bool {
        matches!(self, ReportKind::Ls | ReportKind::File)
    }
}

impl FromStr for ReportKind {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mbr" => Ok(ReportKind::Mbr),
            "disk" => Ok(ReportKind::Disk),
            "sb" => Ok(ReportKind::SuperBlock),
            "inode" => Ok(ReportKind::Inode),
            "block" => Ok(ReportKind::Block),
            "bm_inode" => Ok(ReportKind::BmInode),
            "bm_block" => Ok(ReportKind::BmBlock),
            "ls" => Ok(ReportKind::Ls),
            "file" => Ok(ReportKind::File),
            _ => Err(FsError::InvalidArgument(format!("unknown report {s:?}"))),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A DOT node rendered as an HTML-like table.
struct Table {
    id: String,
    title: String,
    color: &'static str,
    rows: Vec<(String, String)>,
}

impl Table {
    fn new(id: impl Into<String>, title: impl Into<String>, color: &'static str) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            color,
            rows: vec![],
        }
    }

    fn row(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.rows.push((key.into(), value.to_string()));
        self
    }

    fn render(&self) -> String {
        let mut out = format!(
            "  {} [label=<<table border=\"0\" cellborder=\"1\" cellspacing=\"0\">\n    <tr><td colspan=\"2\" bgcolor=\"{}\"><b>{}</b></td></tr>\n",
            self.id,
            self.color,
            escape(&self.title)
        );
        for (key, value) in &self.rows {
            out.push_str(&format!(
                "    <tr><td>{}</td><td>{}</td></tr>\n",
                escape(key),
                escape(value)
            ));
        }
        out.push_str("  </table>>];\n");
        out
    }
}

fn graph(name: &str, body: &str) -> String {
    format!("digraph {name} {{\n  node [shape=plaintext];\n  rankdir=LR;\n{body}}}\n")
}

fn partition_table(index: usize, p: &Partition) -> Table {
    Table::new(format!("part{index}"), format!("Partition {}", p.name_str()), "#a4c8f0")
        .row("status", p.status as char)
        .row("type", p.part_type as char)
        .row("fit", p.fit as char)
        .row("start", p.start)
        .row("size", p.size)
        .row("name", p.name_str())
        .row("correlative", p.correlative)
        .row("id", p.id_str())
}

/// The MBR, its partition entries and the EBR of every logical partition.
pub fn mbr(disk: &impl Disk) -> Result<String> {
    let mbr = read_mbr(disk)?;
    let mut body = Table::new("mbr", "MBR", "#5b8bd4")
        .row("size", mbr.size)
        .row("creation_date", field_str(&mbr.creation_date))
        .row("signature", mbr.signature)
        .row("fit", mbr.fit as char)
        .render();

    for (i, p) in mbr.partitions.iter().enumerate().filter(|(_, p)| p.is_used()) {
        body.push_str(&partition_table(i, p).render());
        if p.is_type(PartitionType::Extended) {
            for (j, ebr) in logical_partitions(disk, p)?.iter().enumerate() {
                body.push_str(
                    &Table::new(format!("ebr{j}"), format!("EBR {}", ebr.name_str()), "#f0c27b")
                        .row("fit", ebr.fit as char)
                        .row("start", ebr.start)
                        .row("size", ebr.size)
                        .row("next", ebr.next)
                        .row("name", ebr.name_str())
                        .render(),
                );
            }
        }
    }
    Ok(graph("MBR", &body))
}

fn percent(part: i64, total: i64) -> String {
    format!("{:.2}%", part as f64 * 100.0 / total.max(1) as f64)
}

fn record_escape(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '|' | '{' | '}' | '<' | '>' | '"' => vec!['\\', c],
            c => vec![c],
        })
        .collect()
}

/// Usage of the whole image: MBR, partitions, EBRs and unallocated gaps, in disk order.
pub fn disk(disk: &impl Disk) -> Result<String> {
    let mbr = read_mbr(disk)?;
    let total = mbr.size as i64;
    let mut cells = vec!["MBR".to_string()];

    let mut used: Vec<&Partition> = mbr.used_partitions().collect();
    used.sort_by_key(|p| p.start);
    let mut cursor = MBR_SIZE as i64;
    for p in used {
        if p.start as i64 > cursor {
            cells.push(format!("Free\\n{}", percent(p.start as i64 - cursor, total)));
        }
        let name = record_escape(&p.name_str());
        if p.is_type(PartitionType::Extended) {
            let mut inner = vec![];
            let mut inner_cursor = p.start as i64 + EBR_SIZE as i64;
            for ebr in logical_partitions(disk, p)? {
                let header = ebr.start as i64 - EBR_SIZE as i64;
                if header > inner_cursor {
                    inner.push(format!("Free\\n{}", percent(header - inner_cursor, total)));
                }
                inner.push("EBR".to_string());
                inner.push(format!(
                    "Logical\\n{}\\n{}",
                    record_escape(&ebr.name_str()),
                    percent(ebr.size as i64, total)
                ));
                inner_cursor = ebr.start as i64 + ebr.size as i64;
            }
            if p.end() > inner_cursor {
                inner.push(format!("Free\\n{}", percent(p.end() - inner_cursor, total)));
            }
            cells.push(format!("{{Extended {name}|{{EBR|{}}}}}", inner.join("|")));
        } else {
            cells.push(format!("Primary\\n{name}\\n{}", percent(p.size as i64, total)));
        }
        cursor = p.end();
    }
    if total > cursor {
        cells.push(format!("Free\\n{}", percent(total - cursor, total)));
    }

    Ok(format!(
        "digraph DISK {{\n  node [shape=record];\n  disk [label=\"{}\"];\n}}\n",
        cells.join("|")
    ))
}

pub fn superblock<D: Disk>(fs: &FileSystem<D>) -> String {
    let sb = fs.superblock();
    let table = Table::new("sb", "Superblock", "#6aa84f")
        .row("filesystem_type", sb.filesystem_type)
        .row("inodes_count", sb.inodes_count)
        .row("blocks_count", sb.blocks_count)
        .row("free_blocks_count", sb.free_blocks_count)
        .row("free_inodes_count", sb.free_inodes_count)
        .row("mtime", field_str(&sb.mtime))
        .row("umtime", field_str(&sb.umtime))
        .row("mnt_count", sb.mnt_count)
        .row("magic", format!("{:#X}", sb.magic))
        .row("inode_size", sb.inode_size)
        .row("block_size", sb.block_size)
        .row("first_ino", sb.first_ino)
        .row("first_blo", sb.first_blo)
        .row("bm_inode_start", sb.bm_inode_start)
        .row("bm_block_start", sb.bm_block_start)
        .row("inode_start", sb.inode_start)
        .row("block_start", sb.block_start);
    graph("SB", &table.render())
}

fn used_inodes<D: Disk>(fs: &FileSystem<D>) -> Result<Vec<(i32, Inode)>> {
    fs.inode_bitmap()?
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b != 0)
        .map(|(i, _)| fs.inode(i as i32).map(|inode| (i as i32, inode)))
        .collect()
}

fn chain(prefix: &str, ids: &[i32]) -> String {
    ids.windows(2)
        .map(|w| format!("  {prefix}{} -> {prefix}{};\n", w[0], w[1]))
        .collect()
}

/// Every used inode, in table order.
pub fn inodes<D: Disk>(fs: &FileSystem<D>) -> Result<String> {
    let used = used_inodes(fs)?;
    let mut body = String::new();
    for (id, inode) in &used {
        let mut table = Table::new(format!("inode{id}"), format!("Inode {id}"), "#e06666")
            .row("uid", inode.uid)
            .row("gid", inode.gid)
            .row("size", inode.size)
            .row("atime", field_str(&inode.atime))
            .row("ctime", field_str(&inode.ctime))
            .row("mtime", field_str(&inode.mtime));
        for (i, ptr) in inode.block.iter().enumerate() {
            table = table.row(format!("block_{}", i + 1), ptr);
        }
        table = table
            .row("type", inode.itype)
            .row("perm", String::from_utf8_lossy(&inode.perm));
        body.push_str(&table.render());
    }
    let ids: Vec<i32> = used.iter().map(|(id, _)| *id).collect();
    body.push_str(&chain("inode", &ids));
    Ok(graph("INODES", &body))
}

/// Every block referenced by a used inode, rendered as a folder or a file block.
pub fn blocks<D: Disk>(fs: &FileSystem<D>) -> Result<String> {
    let mut owners = BTreeMap::new();
    for (_, inode) in used_inodes(fs)? {
        for &ptr in inode.direct_ptrs().iter().filter(|&&b| b != NULL_PTR) {
            owners.insert(ptr, inode.is_dir());
        }
    }

    let mut body = String::new();
    for (&id, &is_dir) in &owners {
        let table = if is_dir {
            let block = fs.folder_block(id)?;
            block.content.iter().fold(
                Table::new(format!("block{id}"), format!("Folder block {id}"), "#8e7cc3"),
                |t, c| t.row(c.name_str(), c.inode),
            )
        } else {
            let block = fs.file_block(id)?;
            Table::new(format!("block{id}"), format!("File block {id}"), "#ffd966")
                .row("content", String::from_utf8_lossy(trim_zero(&block.content)))
        };
        body.push_str(&table.render());
    }
    let ids: Vec<i32> = owners.keys().copied().collect();
    body.push_str(&chain("block", &ids));
    Ok(graph("BLOCKS", &body))
}

/// Bitmap bytes as `0`/`1`, twenty per line.
pub fn bitmap(bytes: &[u8]) -> String {
    bytes
        .chunks(BITMAP_PER_LINE)
        .map(|line| {
            let cells: Vec<String> = line.iter().map(|b| b.to_string()).collect();
            cells.join(" ") + "\n"
        })
        .collect()
}

/// Entries of the directory at `path`, with the inode behind each one.
pub fn ls<D: Disk>(fs: &FileSystem<D>, path: &str) -> Result<String> {
    let mut table = Table::new("ls", format!("ls {path}"), "#76a5af");
    for entry in fs.read_dir(path)? {
        let inode = fs.inode(entry.inode)?;
        let kind = if inode.is_dir() { "dir" } else { "file" };
        table = table.row(
            entry.name_str(),
            format!(
                "{} {} uid={} gid={} size={} {}",
                kind,
                String::from_utf8_lossy(&inode.perm),
                inode.uid,
                inode.gid,
                inode.size,
                field_str(&inode.mtime)
            ),
        );
    }
    Ok(graph("LS", &table.render()))
}

/// The file's name followed by its content.
pub fn file<D: Disk>(fs: &FileSystem<D>, path: &str) -> Result<String> {
    let content = fs.read_file(path)?;
    Ok(format!("{}\n{}", path, String::from_utf8_lossy(&content)))
}
