//! Lifecycle of the plugin inside a scheduler.
//!
//! The host calls `on_init` once per job step and `on_task_privileged` once
//! per task, in the task's own process right after fork and before
//! privileges are dropped. The configured value is written during init and
//! only read afterwards; every task process inherits its own copy through
//! fork, so no synchronization is involved.

use core::fmt;

use log::{debug, error, info, warn};
use nix::errno::Errno;
use thiserror::Error;

use crate::host::Host;
use crate::oom_score::{self, ControlFile};
use crate::value::{parse_adjustment, Adjustment};

/// The only argument the plugin understands.
pub const ARG_PREFIX: &str = "oom_score_adj=";

#[derive(Debug, Error)]
pub enum Error {
    #[error("oom_score_adj is already initialized")]
    AlreadyInitialized,

    #[error("unable to set oom_score_adj: {0}")]
    Apply(#[from] oom_score::Error),
}

impl Error {
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::AlreadyInitialized => None,
            Error::Apply(err) => err.errno(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    /// Initialized where no task will ever run.
    Inert,
    Configured(Adjustment),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Applied,
    Skipped,
}

/// Entry points a scheduler drives.
pub trait Plugin {
    fn on_init(&mut self, host: &dyn Host, args: &[&str]) -> Result<(), Error>;

    /// A failure here is fatal to the launch of the task.
    fn on_task_privileged(&self, host: &dyn Host) -> Result<TaskOutcome, Error>;
}

#[derive(Debug, Clone)]
pub struct OomScoreAdj {
    state: State,
    control_file: ControlFile,
}

impl Default for OomScoreAdj {
    fn default() -> Self {
        Self::new(ControlFile::default())
    }
}

impl OomScoreAdj {
    pub fn new(control_file: ControlFile) -> Self {
        Self {
            state: State::Uninitialized,
            control_file,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Value in force, the kernel default until init configures one.
    pub fn configured(&self) -> Adjustment {
        match self.state {
            State::Configured(value) => value,
            State::Uninitialized | State::Inert => Adjustment::DEFAULT,
        }
    }
}

impl Plugin for OomScoreAdj {
    fn on_init(&mut self, host: &dyn Host, args: &[&str]) -> Result<(), Error> {
        if self.state != State::Uninitialized {
            return Err(Error::AlreadyInitialized);
        }

        let context = host.context();
        if context.is_allocator() {
            debug!("oom_score_adj: nothing to do in {} context", context);
            self.state = State::Inert;
            return Ok(());
        }

        let value = configure(args.iter().copied());
        self.state = State::Configured(value);

        if !host.is_remote() {
            info!("oom_score_adj: value = {}", value);
        }

        Ok(())
    }

    fn on_task_privileged(&self, host: &dyn Host) -> Result<TaskOutcome, Error> {
        let value = match self.state {
            State::Configured(value) if !value.is_noop() => value,
            _ => return Ok(TaskOutcome::Skipped),
        };

        let pid = host.pid();
        let task = match host.task_global_id() {
            Ok(task) => TaskLabel(Some(task)),
            Err(err) => {
                warn!("oom_score_adj: unable to identify task (pid {}): {}", pid, err);
                TaskLabel(None)
            }
        };

        info!(
            "oom_score_adj: set oom_score_adj of task{} (pid {}) to {}",
            task, pid, value
        );

        match self.control_file.apply(pid, value) {
            Ok(()) => Ok(TaskOutcome::Applied),
            // Kernel without the control file, logged by the writer
            Err(err) if err.is_not_found() => Ok(TaskOutcome::Skipped),
            Err(err) => {
                error!("oom_score_adj: unable to set oom_score_adj: {}", err);
                Err(Error::Apply(err))
            }
        }
    }
}

/// Resolves plugin arguments to the value in force. Bad arguments are
/// reported and skipped; the first valid `oom_score_adj=` wins.
pub fn configure<'a>(args: impl IntoIterator<Item = &'a str>) -> Adjustment {
    let mut configured: Option<Adjustment> = None;

    for arg in args {
        let raw = match arg.strip_prefix(ARG_PREFIX) {
            Some(raw) => raw,
            None => {
                warn!("oom_score_adj: Invalid argument: '{}'", arg);
                continue;
            }
        };

        match (parse_adjustment(raw), configured) {
            (Err(err), _) => warn!("oom_score_adj: Ignoring invalid value: '{}' ({})", arg, err),
            (Ok(value), None) => configured = Some(value),
            (Ok(_), Some(current)) => warn!(
                "oom_score_adj: Ignoring '{}', value already set to {}",
                arg, current
            ),
        }
    }

    configured.unwrap_or_default()
}

struct TaskLabel(Option<u32>);

impl fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(task) => write!(f, "{}", task),
            None => f.write_str("?"),
        }
    }
}
