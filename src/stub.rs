/// Used for hosting the plugin outside a scheduler: fixed answers to every query.
use std::cell::Cell;

use nix::unistd::{getpid, Pid};

use crate::host::{Context, Host, HostError};

#[derive(Debug)]
pub struct StubHost {
    context: Context,
    task_id: Option<u32>,
    pid: Option<Pid>,
    identity_queries: Cell<usize>,
}

impl StubHost {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            task_id: None,
            pid: None,
            identity_queries: Cell::new(0),
        }
    }

    pub fn with_task(mut self, task_id: u32) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Pretend to be `pid` instead of the calling process.
    pub fn with_pid(mut self, pid: Pid) -> Self {
        self.pid = Some(pid);
        self
    }

    /// How often the task identity was asked for.
    pub fn identity_queries(&self) -> usize {
        self.identity_queries.get()
    }
}

impl Host for StubHost {
    fn context(&self) -> Context {
        self.context
    }

    fn task_global_id(&self) -> Result<u32, HostError> {
        self.identity_queries.set(self.identity_queries.get() + 1);
        if !self.context.is_remote() {
            return Err(HostError::WrongContext {
                item: "task global id",
                context: self.context,
            });
        }
        self.task_id.ok_or(HostError::Unavailable("task global id"))
    }

    fn pid(&self) -> Pid {
        self.pid.unwrap_or_else(getpid)
    }
}
