//! Process-group helpers shared by the command runner and engine supervisor.

use tokio::process::Command;
use tracing::debug;

/// Put the spawned command in a fresh process group led by the child, so the
/// whole tree can be signalled at once.
pub fn isolate_group(command: &mut Command) {
    #[cfg(unix)]
    command.process_group(0);
    command.kill_on_drop(true);
}

/// Send SIGKILL to every process in the group led by `pid`.
#[cfg(unix)]
pub fn kill_group(pid: u32) {
    // pid 0 would target our own group.
    if pid == 0 {
        return;
    }
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "killpg({}) failed: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
pub fn kill_group(pid: u32) {
    debug!("Process groups unsupported on this platform; pid {} relies on kill_on_drop", pid);
}

/// Find an executable on PATH.
pub fn find_on_path(program: &str) -> Option<std::path::PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
