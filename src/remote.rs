//! Controlling a running launcher from the command line.
//!
//! The resident process records its pid in the runtime directory and maps
//! signals to overlay commands; `panel-launcher toggle` and friends look the
//! pid up and send the matching signal.

use std::fs;
use std::path::{Path, PathBuf};
use log::debug;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use crate::error::{LauncherError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Open,
    Close,
}

impl Command {
    pub fn signal(self) -> Signal {
        match self {
            Command::Toggle => Signal::SIGUSR1,
            Command::Close => Signal::SIGUSR2,
            Command::Open => Signal::SIGHUP,
        }
    }

    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::SIGUSR1 => Some(Command::Toggle),
            Signal::SIGUSR2 => Some(Command::Close),
            Signal::SIGHUP => Some(Command::Open),
            _ => None,
        }
    }
}

pub fn pid_file_path() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR").map_or_else(|_| std::env::temp_dir(), PathBuf::from);
    runtime.join("panel-launcher.pid")
}

/// Removes the pid file when dropped.
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Claim `path` for this process. A file naming a live process other than
    /// us is left alone; a stale one is overwritten.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(pid) = read_pid(&path) {
            if pid != Pid::this() && is_alive(pid) {
                return Err(LauncherError::AlreadyRunning { pid: pid.as_raw(), path });
            }
            debug!("Replacing stale pid file {} (pid {})", path.display(), pid);
        }
        fs::write(&path, format!("{}\n", std::process::id()))?;
        debug!("Wrote pid file {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("Could not remove {}: {}", self.path.display(), e);
        }
    }
}

pub fn read_pid(path: &Path) -> Option<Pid> {
    let content = fs::read_to_string(path).ok()?;
    let pid: i32 = content.trim().parse().ok()?;
    (pid > 0).then(|| Pid::from_raw(pid))
}

fn is_alive(pid: Pid) -> bool {
    kill(pid, None).is_ok()
}

/// Deliver `command` to the launcher recorded in `pid_file`.
pub fn send(command: Command, pid_file: &Path) -> Result<()> {
    let pid = read_pid(pid_file)
        .filter(|pid| is_alive(*pid))
        .ok_or_else(|| LauncherError::NotRunning(pid_file.to_path_buf()))?;
    kill(pid, command.signal()).map_err(|e| LauncherError::Io(e.into()))?;
    debug!("Sent {:?} to pid {}", command, pid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_signal_mapping_roundtrips() {
        for command in [Command::Toggle, Command::Open, Command::Close] {
            assert_eq!(Command::from_signal(command.signal()), Some(command));
        }
        assert_eq!(Command::from_signal(Signal::SIGTERM), None);
    }

    #[test]
    fn test_pid_file_written_and_removed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("launcher.pid");
        {
            let pid_file = PidFile::create(&path).unwrap();
            assert_eq!(pid_file.path(), path.as_path());
            assert_eq!(read_pid(&path), Some(Pid::this()));
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_pid_file_refuses_live_owner() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("launcher.pid");
        let mut other = std::process::Command::new("sleep").arg("5").spawn().unwrap();
        fs::write(&path, format!("{}\n", other.id())).unwrap();

        let result = PidFile::create(&path);
        other.kill().unwrap();
        other.wait().unwrap();

        match result {
            Err(LauncherError::AlreadyRunning { pid, .. }) => assert_eq!(pid as u32, other.id()),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("pid file of a live launcher was taken over"),
        }
        assert_eq!(read_pid(&path), Some(Pid::from_raw(other.id() as i32)));
    }

    #[test]
    fn test_pid_file_replaces_stale_owner() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("launcher.pid");
        let mut gone = std::process::Command::new("true").spawn().unwrap();
        gone.wait().unwrap();
        fs::write(&path, format!("{}\n", gone.id())).unwrap();

        let _pid_file = PidFile::create(&path).unwrap();
        assert_eq!(read_pid(&path), Some(Pid::this()));
    }

    #[test]
    fn test_read_pid_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("launcher.pid");
        assert_eq!(read_pid(&path), None);
        fs::write(&path, "not a pid").unwrap();
        assert_eq!(read_pid(&path), None);
        fs::write(&path, "-4").unwrap();
        assert_eq!(read_pid(&path), None);
    }

    #[test]
    fn test_send_without_instance() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.pid");
        assert!(matches!(send(Command::Toggle, &path), Err(LauncherError::NotRunning(_))));
    }
}
