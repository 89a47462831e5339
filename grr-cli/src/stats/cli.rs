use clap::{Arg, ArgAction, Command};

pub const STATS_CMD: &str = "stats";
pub const TASK_WORKER_CMD: &str = "task-worker";

pub fn create_stats_cli() -> Command {
    Command::new(STATS_CMD)
        .about("Build min/max and histogram statistics for a score resource")
        .arg(
            Arg::new("repository")
                .long("repository")
                .short('R')
                .required(true)
                .help("Directory repository root"),
        )
        .arg(
            Arg::new("resource")
                .long("resource")
                .short('r')
                .required(true)
                .help("Score resource id"),
        )
        .arg(
            Arg::new("work-dir")
                .long("work-dir")
                .short('w')
                .help("Directory for task, result and partial statistics files"),
        )
        .arg(
            Arg::new("processes")
                .long("processes")
                .action(ArgAction::SetTrue)
                .help("Run every task in its own worker process"),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .short('f')
                .action(ArgAction::SetTrue)
                .help("Rebuild even when stored statistics are up to date"),
        )
}

pub fn create_task_worker_cli() -> Command {
    Command::new(TASK_WORKER_CMD)
        .hide(true)
        .about("Internal statistics task worker")
        .arg(Arg::new("task-file").long("task-file").required(true))
        .arg(Arg::new("result-file").long("result-file").required(true))
}
