//! Path resolution and manipulation utilities.

use crate::block_dev::Disk;
use crate::config::*;
use crate::directory::dir_lookup;
use crate::error::{FsError, Result};
use crate::inode::get_inode;
use crate::structs::SuperBlock;

/// Non-empty components of a `/`-separated path.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Splits a path into its parent path and last component.
/// `split("/a/b.txt")` is `("/a", "b.txt")`, `split("/")` is `("/", "")`.
pub fn split(path: &str) -> (String, String) {
    let mut parts = components(path);
    let name = parts.pop().unwrap_or_default().to_string();
    (format!("/{}", parts.join("/")), name)
}

/// Resolves a path to inode ids.
/// Returns a tuple of (parent inode id, inode id); `/` is its own parent.
pub fn resolve(
    disk: &impl Disk,
    superblock: &SuperBlock,
    path: &str,
    policy: MatchPolicy,
) -> Result<(i32, i32)> {
    let mut parent_id = ROOT_INODE_ID;
    let mut current_id = ROOT_INODE_ID;

    for component in components(path) {
        let current = get_inode(disk, superblock, current_id)?;
        if !current.is_dir() {
            return Err(FsError::NotDirectory(format!("a component of {path}")));
        }
        parent_id = current_id;
        current_id = dir_lookup(disk, superblock, &current, component, policy)?;
    }

    log::debug!("[resolve] {path} -> ({parent_id}, {current_id})");
    Ok((parent_id, current_id))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split() {
        assert_eq!(split("/a/b.txt"), ("/a".to_string(), "b.txt".to_string()));
        assert_eq!(split("/docs"), ("/".to_string(), "docs".to_string()));
        assert_eq!(split("//x//y/"), ("/x".to_string(), "y".to_string()));
        assert_eq!(split("/"), ("/".to_string(), String::new()));
    }
}
