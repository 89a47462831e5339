use clap::{Arg, Command};

pub const REPO_CMD: &str = "repo";
pub const REPO_LIST: &str = "list";
pub const REPO_MANIFEST: &str = "manifest";
pub const REPO_REPAIR: &str = "repair";
pub const REPO_CONTENTS: &str = "contents";

fn repository_arg() -> Arg {
    Arg::new("repository")
        .long("repository")
        .short('R')
        .default_value(".")
        .help("Directory repository root")
}

fn resource_arg() -> Arg {
    Arg::new("resource")
        .long("resource")
        .short('r')
        .help("Restrict to one resource id; all resources when omitted")
}

pub fn create_repo_cli() -> Command {
    Command::new(REPO_CMD)
        .about("Manage a directory genomic resource repository")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(REPO_LIST)
                .about("List the resources of the repository")
                .arg(repository_arg()),
        )
        .subcommand(
            Command::new(REPO_MANIFEST)
                .about("Rebuild and store resource manifests")
                .arg(repository_arg())
                .arg(resource_arg()),
        )
        .subcommand(
            Command::new(REPO_REPAIR)
                .about("Refresh stored manifests and report changed files")
                .arg(repository_arg())
                .arg(resource_arg()),
        )
        .subcommand(
            Command::new(REPO_CONTENTS)
                .about("Rebuild the repository contents index")
                .arg(repository_arg()),
        )
}
