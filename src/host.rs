use core::fmt;

use nix::unistd::{getpid, Pid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host could not provide {0}")]
    Unavailable(&'static str),

    #[error("{item} is not available in {context} context")]
    WrongContext { item: &'static str, context: Context },
}

/// Where the plugin is being invoked from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Context {
    /// Job launcher front end, runs before any task exists.
    Local,
    /// Per-step task manager on the compute node, the only place tasks run.
    Remote,
    /// Batch submission or interactive allocation, no tasks under this call.
    Allocator,
    /// Node daemon.
    Slurmd,
    /// Prolog/epilog of a batch script.
    JobScript,
}

impl Context {
    pub const fn is_allocator(self) -> bool {
        matches!(self, Context::Allocator)
    }

    pub const fn is_remote(self) -> bool {
        matches!(self, Context::Remote)
    }
}

impl From<&Context> for &str {
    fn from(value: &Context) -> Self {
        match value {
            Context::Local => "local",
            Context::Remote => "remote",
            Context::Allocator => "allocator",
            Context::Slurmd => "slurmd",
            Context::JobScript => "job_script",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.into())
    }
}

/// Queries the plugin makes back into the scheduler that loaded it.
///
/// Logging is not part of this surface: the core emits through the `log`
/// facade and the host decides where records go by installing a logger.
pub trait Host {
    fn context(&self) -> Context;

    /// True when invoked where tasks are launched.
    fn is_remote(&self) -> bool {
        self.context().is_remote()
    }

    /// Global index of the task the current hook runs for.
    fn task_global_id(&self) -> Result<u32, HostError>;

    /// Process the per-task hook runs in. After fork this is the task itself.
    fn pid(&self) -> Pid {
        getpid()
    }
}

#[cfg(test)]
mod tests {
    use super::Context;

    #[test]
    fn given_allocator_context_then_only_allocator_is_classified() {
        assert!(Context::Allocator.is_allocator());
        assert!(!Context::Allocator.is_remote());
        assert!(!Context::Local.is_allocator());
    }

    #[test]
    fn given_remote_context_then_is_remote() {
        assert!(Context::Remote.is_remote());
        assert!(!Context::Slurmd.is_remote());
        assert!(!Context::JobScript.is_remote());
    }

    #[test]
    fn given_context_then_displays_lowercase_name() {
        assert_eq!(Context::JobScript.to_string(), "job_script");
        assert_eq!(Context::Remote.to_string(), "remote");
    }
}
