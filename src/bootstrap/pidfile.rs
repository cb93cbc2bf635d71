//! PID file housekeeping.
//!
//! PID files are written as `<name>-<pid>.pid` in the configured directory.
//! Stale files from a previous unclean shutdown are detected by probing
//! process liveness with a null signal and removed before the new file is
//! written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write the PID file for `name`, creating the directory if needed.
pub fn create_pid(pid_dir: &Path, name: &str, pid: u32) -> io::Result<PathBuf> {
    fs::create_dir_all(pid_dir)?;
    let path = pid_path(pid_dir, name, pid);
    fs::write(&path, pid.to_string())?;
    tracing::debug!(path = %path.display(), "PID file written");
    Ok(path)
}

/// Remove the PID file for `name`, if present.
pub fn delete_pid(pid_dir: &Path, name: &str, pid: u32) -> io::Result<()> {
    let path = pid_path(pid_dir, name, pid);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(())
}

/// Remove PID files left behind by processes that are no longer alive.
///
/// Matches every `<name>*-<pid>.pid` in the directory, covering the main
/// process and its role-named children.
pub fn clean_stale_pid_files(pid_dir: &Path, name: &str) -> io::Result<()> {
    if !pid_dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(pid_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.starts_with(name) || !file_name.ends_with(".pid") {
            continue;
        }
        let Some(pid) = parse_pid(file_name) else {
            continue;
        };
        if !process_alive(pid) {
            tracing::info!(file = file_name, pid, "Removing stale PID file");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Kill the child processes registered under `<main_name>_<role>` PID files
/// and remove those files. Used by the termination handler.
pub fn kill_registered_children(pid_dir: &Path, main_name: &str) {
    let child_prefix = format!("{main_name}_");
    let Ok(entries) = fs::read_dir(pid_dir) else {
        return;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.starts_with(&child_prefix) || !file_name.ends_with(".pid") {
            continue;
        }
        if let Some(pid) = parse_pid(file_name) {
            let target = nix::unistd::Pid::from_raw(pid as i32);
            let _ = nix::sys::signal::kill(target, nix::sys::signal::Signal::SIGTERM);
        }
        let _ = fs::remove_file(entry.path());
    }
}

fn pid_path(pid_dir: &Path, name: &str, pid: u32) -> PathBuf {
    pid_dir.join(format!("{name}-{pid}.pid"))
}

/// Extract the trailing PID from a `<name>-<pid>.pid` file name.
fn parse_pid(file_name: &str) -> Option<u32> {
    file_name
        .strip_suffix(".pid")?
        .rsplit('-')
        .next()?
        .parse()
        .ok()
}

/// Null-signal probe; a delivery failure means the PID is gone.
fn process_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_pid(dir.path(), "vigil-apid", 1234).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "1234");

        delete_pid(dir.path(), "vigil-apid", 1234).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn stale_files_are_removed_live_ones_kept() {
        let dir = tempfile::tempdir().unwrap();
        let own_pid = std::process::id();
        let live = create_pid(dir.path(), "vigil-apid", own_pid).unwrap();
        // PID close to the kernel maximum; safe to assume not running.
        let stale = create_pid(dir.path(), "vigil-apid_exec", 4_194_000).unwrap();

        clean_stale_pid_files(dir.path(), "vigil-apid").unwrap();
        assert!(live.exists());
        assert!(!stale.exists());
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other-999999.pid");
        fs::write(&other, "999999").unwrap();

        clean_stale_pid_files(dir.path(), "vigil-apid").unwrap();
        assert!(other.exists());
    }

    #[test]
    fn pid_parsing() {
        assert_eq!(parse_pid("vigil-apid-42.pid"), Some(42));
        assert_eq!(parse_pid("vigil-apid_auth-7.pid"), Some(7));
        assert_eq!(parse_pid("vigil-apid.pid"), None);
        assert_eq!(parse_pid("garbage"), None);
    }
}
