//! Daemonization via the double-fork pattern.

use std::os::fd::RawFd;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, fork, setsid, ForkResult};

/// Detach from the controlling terminal and continue in the background.
///
/// Must be called before the async runtime exists: `fork()` in a
/// multi-threaded process only duplicates the calling thread, leaving any
/// mutex held by another thread locked forever in the child. The parent and
/// the intermediate child both exit; only the grandchild returns.
#[allow(unsafe_code)]
pub fn daemonize() -> Result<(), nix::Error> {
    // SAFETY: no runtime has been started yet; the process is
    // single-threaded at this point in the bootstrap sequence.
    match unsafe { fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    // Become session leader, losing the controlling terminal.
    setsid()?;

    // Second fork prevents the daemon from ever reacquiring one.
    // SAFETY: still single-threaded, same reasoning as above.
    match unsafe { fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    // Avoid holding a directory handle that would block unmounts.
    if let Err(error) = std::env::set_current_dir("/") {
        tracing::warn!(error = %error, "Failed to change to / after daemonizing");
    }

    // The inherited terminal descriptors must not outlive the detach.
    if let Err(errno) = redirect_to_devnull(&[0, 1, 2]) {
        tracing::warn!(error = %errno, "Failed to redirect standard descriptors to /dev/null");
    }

    Ok(())
}

/// Point the given descriptors at `/dev/null`.
fn redirect_to_devnull(fds: &[RawFd]) -> nix::Result<()> {
    let devnull = open("/dev/null", OFlag::O_RDWR, Mode::empty())?;
    for &fd in fds {
        dup2(devnull, fd)?;
    }
    if !fds.contains(&devnull) {
        close(devnull)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsRawFd;

    #[test]
    fn redirected_descriptor_writes_reach_devnull_not_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captured.log");
        let mut file = std::fs::File::create(&path).unwrap();

        file.write_all(b"before").unwrap();
        file.flush().unwrap();

        redirect_to_devnull(&[file.as_raw_fd()]).unwrap();

        // The handle's descriptor now points at /dev/null.
        file.write_all(b"after").unwrap();
        file.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "before");
    }
}
