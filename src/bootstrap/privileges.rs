//! Privilege drop to the service account.
//!
//! The UID/GID switch is irreversible and must be the last bootstrap step
//! before serving: certificate generation, ownership assignment, and port
//! binding all need the elevated rights the drop gives up.

use nix::unistd::{setgid, setuid, Gid, Group, Uid, User};

/// Error type for service account resolution and the privilege drop.
#[derive(Debug, thiserror::Error)]
pub enum PrivilegeError {
    #[error("service user '{0}' does not exist")]
    UnknownUser(String),

    #[error("service group '{0}' does not exist")]
    UnknownGroup(String),

    #[error("failed to look up service account: {0}")]
    Lookup(#[source] nix::Error),

    #[error("failed to switch process identity: {0}")]
    Switch(#[source] nix::Error),
}

/// Resolved service account identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceAccount {
    pub uid: u32,
    pub gid: u32,
}

/// Resolve the configured service user/group to a UID/GID pair.
pub fn resolve_service_account(user: &str, group: &str) -> Result<ServiceAccount, PrivilegeError> {
    let user_entry = User::from_name(user)
        .map_err(PrivilegeError::Lookup)?
        .ok_or_else(|| PrivilegeError::UnknownUser(user.to_string()))?;
    let group_entry = Group::from_name(group)
        .map_err(PrivilegeError::Lookup)?
        .ok_or_else(|| PrivilegeError::UnknownGroup(group.to_string()))?;

    Ok(ServiceAccount {
        uid: user_entry.uid.as_raw(),
        gid: group_entry.gid.as_raw(),
    })
}

/// Switch the process identity to the service account.
///
/// GID first: once the UID changes, the process may no longer have the
/// right to change its group.
pub fn drop_privileges(account: ServiceAccount) -> Result<(), PrivilegeError> {
    setgid(Gid::from_raw(account.gid)).map_err(PrivilegeError::Switch)?;
    setuid(Uid::from_raw(account.uid)).map_err(PrivilegeError::Switch)?;
    tracing::info!(uid = account.uid, gid = account.gid, "Dropped privileges to service account");
    Ok(())
}
