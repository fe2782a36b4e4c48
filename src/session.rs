//! Login sessions, checked against `/users.txt` of the mounted partition.
//! At most one session is active at a time.

use crate::config::*;
use crate::error::{FsError, Result};
use crate::fs::FileSystem;
use crate::mount::MountRegistry;

/// `users.txt` holds `id,G,group` and `id,U,group,user,password` lines.
/// Only user lines take part in the check.
pub fn check_credentials(users: &str, user: &str, pass: &str, policy: MatchPolicy) -> bool {
    users
        .lines()
        .map(|line| line.split(',').map(str::trim).collect::<Vec<_>>())
        .any(|fields| fields.len() == 5 && policy.matches(fields[3], user) && policy.matches(fields[4], pass))
}

pub fn login(registry: &mut MountRegistry, config: &Config, user: &str, pass: &str, id: &str) -> Result<()> {
    if user.is_empty() || pass.is_empty() {
        return Err(FsError::InvalidArgument("user and password are required".to_string()));
    }
    if let Some(active) = registry.active() {
        return Err(FsError::AlreadyLoggedIn(active.id.clone()));
    }

    let record = registry.lookup(id)?;
    if !record.mounted {
        return Err(FsError::NotMounted(id.to_string()));
    }
    let (disk, partition) = record.open()?;
    let fs = FileSystem::mount(disk, partition.start as u64, config.clone())?;
    let users = fs.read_file(&format!("/{USERS_FILE}"))?;
    if !check_credentials(&String::from_utf8_lossy(&users), user, pass, config.credential_match) {
        return Err(FsError::InvalidCredentials(user.to_string()));
    }

    registry.lookup_mut(id)?.logged_in = true;
    log::info!("[login] {user} on {id}");
    Ok(())
}

/// Ends the active session and returns the ID it was bound to.
pub fn logout(registry: &mut MountRegistry) -> Result<String> {
    let record = registry.active_mut().ok_or(FsError::NoActiveSession)?;
    record.logged_in = false;
    log::info!("[logout] {}", record.id);
    Ok(record.id.clone())
}
