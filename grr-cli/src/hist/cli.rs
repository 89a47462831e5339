use clap::{Arg, Command};

pub const HIST_CMD: &str = "hist";

pub fn create_hist_cli() -> Command {
    Command::new(HIST_CMD)
        .about("Render the stored histogram of a score as a text chart")
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
            Arg::new("score")
                .long("score")
                .short('s')
                .required(true)
                .help("Score id within the resource"),
        )
}
