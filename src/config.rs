pub const MAGIC: i32 = 0xEF53;
pub const FILESYSTEM_TYPE_EXT2: i32 = 2;

pub const MBR_SIZE: usize = 159; // 4 + 10 + 4 + 1 + 4 * PARTITION_SIZE
pub const PARTITION_SIZE: usize = 35;
pub const EBR_SIZE: usize = 29;
pub const SUPERBLOCK_SIZE: usize = 92;
pub const INODE_SIZE: usize = 124;
pub const BLOCK_SIZE: usize = 64; // FolderBlock and FileBlock share it
pub const CONTENT_SIZE: usize = 16;

pub const MAX_PARTITIONS: usize = 4;
pub const PARTITION_NAME_LEN: usize = 16;
pub const PARTITION_ID_LEN: usize = 4;
pub const DATE_LEN: usize = 10;
pub const TIME_LEN: usize = 16;

pub const BLOCKS_PER_INODE: i32 = 3;
pub const NUM_BLOCK_PTRS: usize = 15;
pub const NUM_DIRECT_PTRS: usize = 12;
pub const NUM_ENTRY_PER_BLOCK: usize = 4;
pub const MAX_FILE_NAME_LEN: usize = 12;
pub const MAX_FILE_SIZE: usize = NUM_DIRECT_PTRS * BLOCK_SIZE;

pub const ROOT_INODE_ID: i32 = 0;
pub const USERS_INODE_ID: i32 = 1;
pub const NULL_PTR: i32 = -1;
pub const DOT_NAME: &str = ".";
pub const DOTDOT_NAME: &str = "..";
pub const USERS_FILE: &str = "users.txt";
pub const USERS_SEED: &str = "1,G,root\n1,U,root,root,123\n";
pub const DEFAULT_PERM: &[u8; 3] = b"664";
pub const DEFAULT_OWNER: i32 = 1;

pub const DEFAULT_ID_PREFIX: &str = "09";

/// How a stored name is compared against a requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The stored name only has to contain the requested one.
    Contains,
    Exact,
}

impl MatchPolicy {
    pub fn matches(self, stored: &str, wanted: &str) -> bool {
        match self {
            MatchPolicy::Contains => stored.contains(wanted),
            MatchPolicy::Exact => stored == wanted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Leading digits of every mount ID.
    pub id_prefix: String,
    /// Directory entry comparison used by path resolution.
    pub name_match: MatchPolicy,
    /// Comparison of user/password fields in `users.txt`.
    pub credential_match: MatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            name_match: MatchPolicy::Contains,
            credential_match: MatchPolicy::Contains,
        }
    }
}
