//! Detecting whether another process holds the package tool's lock files.
//!
//! apt and dpkg take POSIX record locks (`fcntl`), other tools use `flock`.
//! Both are probed without ever holding a lock past the probe itself.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_LOCK_PATHS: &[&str] = &[
    "/var/lib/dpkg/lock",
    "/var/lib/apt/lists/lock",
    "/var/cache/apt/archives/lock",
];

/// What a probe found on one lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    Missing,
    Unreadable { reason: String },
    Free,
    RecordLock { pid: i32 },
    Flock,
}

impl LockState {
    pub fn is_held(&self) -> bool {
        matches!(self, Self::RecordLock { .. } | Self::Flock)
    }
}

#[derive(Debug, Clone)]
pub struct ExternalLock {
    paths: Vec<PathBuf>,
}

impl Default for ExternalLock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_PATHS.iter().map(PathBuf::from))
    }
}

impl ExternalLock {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// State of every configured lock file, in configuration order.
    pub fn status(&self) -> Vec<(PathBuf, LockState)> {
        self.paths
            .iter()
            .map(|path| (path.clone(), probe(path)))
            .collect()
    }

    /// The first lock file currently held by someone else.
    ///
    /// Files that are missing or cannot be opened count as not locked.
    pub fn held_by(&self) -> Option<PathBuf> {
        self.paths.iter().find_map(|path| {
            let state = probe(path);
            if state.is_held() {
                debug!("{} is held: {state:?}", path.display());
                Some(path.clone())
            } else {
                None
            }
        })
    }
}

pub fn probe(path: &Path) -> LockState {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return LockState::Missing,
        Err(e) => {
            debug!("cannot open {}: {e}", path.display());
            return LockState::Unreadable {
                reason: e.to_string(),
            };
        }
    };

    match record_lock_owner(&file) {
        Ok(Some(pid)) => return LockState::RecordLock { pid },
        Ok(None) => {}
        Err(e) => warn!("fcntl probe failed on {}: {e}", path.display()),
    }

    match file.try_lock_exclusive() {
        Ok(()) => {
            if let Err(e) = FileExt::unlock(&file) {
                warn!("failed to release probe lock on {}: {e}", path.display());
            }
            LockState::Free
        }
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            LockState::Flock
        }
        Err(e) => LockState::Unreadable {
            reason: e.to_string(),
        },
    }
}

/// PID of a process holding a conflicting POSIX record lock, if any.
///
/// Locks held by this process are never reported.
fn record_lock_owner(file: &File) -> io::Result<Option<i32>> {
    // SAFETY: flock is a plain C struct for which all-zero bytes are valid.
    #[allow(unsafe_code)]
    let mut query: libc::flock = unsafe { std::mem::zeroed() };
    query.l_type = libc::F_WRLCK as libc::c_short;
    query.l_whence = libc::SEEK_SET as libc::c_short;

    // SAFETY: the descriptor is open for the lifetime of `file` and `query`
    // is a valid, exclusively borrowed flock struct.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETLK, &mut query) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    if query.l_type == libc::F_UNLCK as libc::c_short {
        Ok(None)
    } else {
        Ok(Some(query.l_pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;

    #[test]
    fn missing_file_is_not_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock = ExternalLock::new([dir.path().join("lock")]);
        assert_eq!(lock.status()[0].1, LockState::Missing);
        assert!(lock.held_by().is_none());
    }

    #[test]
    fn unlocked_file_is_free() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock");
        File::create(&path).unwrap();
        assert_eq!(probe(&path), LockState::Free);
        // The probe must not leave the file locked.
        assert_eq!(probe(&path), LockState::Free);
    }

    #[test]
    fn flock_holder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let free = dir.path().join("free");
        let held = dir.path().join("held");
        File::create(&free).unwrap();
        let holder = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&held)
            .unwrap();
        holder.lock_exclusive().unwrap();

        let lock = ExternalLock::new([free.clone(), held.clone()]);
        assert_eq!(lock.held_by(), Some(held.clone()));
        assert_eq!(probe(&held), LockState::Flock);

        FileExt::unlock(&holder).unwrap();
        assert!(lock.held_by().is_none());
    }

    #[test]
    fn lock_state_serializes_tagged() {
        let json = serde_json::to_string(&LockState::RecordLock { pid: 42 }).unwrap();
        assert_eq!(json, r#"{"state":"record_lock","pid":42}"#);
        assert!(!LockState::Unreadable {
            reason: "denied".to_owned()
        }
        .is_held());
    }
}
