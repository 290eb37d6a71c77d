//! Writes OOM score adjustments to `/proc/<pid>/oom_score_adj`.
//!
//! Everything between open and close runs without heap allocation so the
//! routine can be called in a freshly forked child before `execve`.

use std::os::unix::io::RawFd;

use log::{debug, error};
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, Pid};
use thiserror::Error;

use crate::stack_string;
use crate::value::Adjustment;

pub const PROC_ROOT: &str = "/proc";
pub const OOM_SCORE_ADJ_FILE: &str = "oom_score_adj";

/// Fits any `<pid>` under a short procfs root.
pub type ControlPath = stack_string::String<128>;
/// Fits every i32, let alone [-1000, 1000].
pub type ControlValue = stack_string::String<16>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to compose control file path or value: {0}")]
    Format(#[from] stack_string::Error),

    #[error("{0} doesn't exist")]
    NotFound(ControlPath),

    #[error("Failed to open {path}: {errno}")]
    Open { path: ControlPath, errno: Errno },

    #[error("Failed to write {path}: {errno}")]
    Write { path: ControlPath, errno: Errno },

    #[error("Short write to {path}: {written} of {expected} bytes")]
    ShortWrite {
        path: ControlPath,
        written: usize,
        expected: usize,
    },
}

impl Error {
    /// Underlying system error, if the failure came from a syscall.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::NotFound(_) => Some(Errno::ENOENT),
            Error::Open { errno, .. } | Error::Write { errno, .. } => Some(*errno),
            Error::Format(_) | Error::ShortWrite { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Locates per-process control files under a procfs mount.
#[derive(Debug, Clone)]
pub struct ControlFile {
    proc_root: String,
}

impl Default for ControlFile {
    fn default() -> Self {
        Self::new(PROC_ROOT)
    }
}

impl ControlFile {
    pub fn new(proc_root: impl Into<String>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    pub fn path(&self, pid: Pid) -> Result<ControlPath, Error> {
        let path = ControlPath::format(format_args!(
            "{}/{}/{}",
            self.proc_root,
            pid.as_raw(),
            OOM_SCORE_ADJ_FILE
        ))?;
        Ok(path)
    }

    /// Writes `value` to the control file of `pid` in a single write.
    /// Either the whole decimal value lands in the file or an error is returned.
    pub fn apply(&self, pid: Pid, value: Adjustment) -> Result<(), Error> {
        self.apply_with(pid, value, nix::unistd::write)
    }

    fn apply_with<W>(&self, pid: Pid, value: Adjustment, mut write: W) -> Result<(), Error>
    where
        W: FnMut(RawFd, &[u8]) -> Result<usize, Errno>,
    {
        let path = self.path(pid)?;
        let contents: ControlValue = value.get().try_into()?;

        let fd = match open(path.as_str(), OFlag::O_WRONLY | OFlag::O_CLOEXEC, Mode::empty()) {
            Ok(fd) => ControlFd(fd),
            Err(Errno::ENOENT) => {
                debug!("oom_score_adj: {} doesn't exist: {}", path, Errno::ENOENT);
                return Err(Error::NotFound(path));
            }
            Err(errno) => {
                error!(
                    "oom_score_adj: failed to open {}, error {}: {}",
                    path, errno as i32, errno
                );
                return Err(Error::Open { path, errno });
            }
        };

        let bytes: &[u8] = contents.as_ref();
        let written = write_uninterrupted(|buf| write(fd.0, buf), bytes)
            .map_err(|errno| Error::Write { path, errno })?;
        if written != bytes.len() {
            return Err(Error::ShortWrite {
                path,
                written,
                expected: bytes.len(),
            });
        }

        Ok(())
    }
}

/// Sets the OOM score adjustment of `pid` through the host's `/proc`.
pub fn apply_adjustment(pid: Pid, value: Adjustment) -> Result<(), Error> {
    ControlFile::default().apply(pid, value)
}

/// Closes the descriptor on every path out of `ControlFile::apply`.
struct ControlFd(RawFd);

impl Drop for ControlFd {
    fn drop(&mut self) {
        // Nothing useful to do if close fails, the value was written or reported
        let _ = close(self.0);
    }
}

/// Issues `write` until it fails with something other than `EINTR`.
/// A signal arriving before any byte is transferred makes write(2) fail
/// with `EINTR`, so retrying can't duplicate output.
fn write_uninterrupted<F>(mut write: F, buf: &[u8]) -> Result<usize, Errno>
where
    F: FnMut(&[u8]) -> Result<usize, Errno>,
{
    loop {
        match write(buf) {
            Err(Errno::EINTR) => continue,
            outcome => return outcome,
        }
    }
}
