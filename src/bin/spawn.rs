use std::io::{self, Write};

use log::{error, info};
use oom_score_adj::host::Context;
use oom_score_adj::stub::StubHost;
use oom_score_adj::{OomScoreAdj, Plugin, PLUGIN_NAME};
use tokio::process::{Child, Command};

/// Environment variable selecting the maximum log level, e.g. `debug`.
const LOG_LEVEL_ENV: &str = "OOM_SCORE_ADJ_LOG";

/// Stands in for a scheduler: initializes the plugin with the arguments
/// before `--`, then launches NTASKS copies of the command after it, running
/// the per-task hook in each child between fork and exec.
///
/// `NTASKS=2 spawn oom_score_adj=-200 -- sleep 5`
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), oom_score_adj::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_LEVEL_ENV, "info"))
        .format(|buf, record| {
            writeln!(buf, "{}: {:<5} {}", PLUGIN_NAME, record.level(), record.args())
        })
        .try_init()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let split = args.iter().position(|arg| arg == "--").expect("Pass -- <bin> [args]");
    let plugin_args: Vec<&str> = args[..split].iter().map(String::as_str).collect();
    let bin = args.get(split + 1).expect("Pass bin");
    let bin_args = &args[split + 2..];

    let ntasks: u32 = std::env::var("NTASKS")
        .ok()
        .and_then(|n| n.parse().ok())
        .unwrap_or(1);

    // Launcher front end validates and reports, the step manager applies
    let mut launcher = OomScoreAdj::default();
    launcher.on_init(&StubHost::new(Context::Local), &plugin_args)?;

    let mut step = OomScoreAdj::default();
    step.on_init(&StubHost::new(Context::Remote), &plugin_args)?;

    let cmds = (0..ntasks).map(|task| (task, task_command(&step, task, bin, bin_args)));
    let children = launch(cmds).await?;

    for (task, mut child) in children {
        let status = child.wait().await?;
        info!("task{} exited: {}", task, status);
    }

    Ok(())
}

fn task_command(step: &OomScoreAdj, task: u32, bin: &str, args: &[String]) -> Command {
    let plugin = step.clone();
    let mut cmd = Command::new(bin);
    cmd.args(args).kill_on_drop(true);

    // Safety: the runtime is single threaded so no lock is held across fork,
    // and the hook writes the control file without allocating
    unsafe {
        cmd.pre_exec(move || {
            let host = StubHost::new(Context::Remote).with_task(task);
            plugin.on_task_privileged(&host).map_err(|err| {
                let errno = err.errno().unwrap_or(nix::errno::Errno::EIO);
                io::Error::from_raw_os_error(errno as i32)
            })?;
            Ok(())
        });
    }

    cmd
}

/// Spawns every task or none: a launch failure kills the tasks already running.
async fn launch(cmds: impl IntoIterator<Item = (u32, Command)>) -> io::Result<Vec<(u32, Child)>> {
    let mut children = Vec::new();

    for (task, mut cmd) in cmds {
        match cmd.spawn() {
            Ok(child) => children.push((task, child)),
            Err(err) => {
                error!("task{} failed to launch: {}", task, err);
                for (task, mut child) in children {
                    if let Err(err) = child.kill().await {
                        error!("task{} could not be stopped: {}", task, err);
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(children)
}
