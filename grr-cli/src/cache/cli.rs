use clap::{Arg, Command};

pub const CACHE_CMD: &str = "cache";

pub fn create_cache_cli() -> Command {
    Command::new(CACHE_CMD)
        .about("Populate a local cache with repository resources")
        .arg(
            Arg::new("grr")
                .long("grr")
                .short('g')
                .required(true)
                .help("Repository definition file (YAML)"),
        )
        .arg(
            Arg::new("cache-dir")
                .long("cache-dir")
                .short('c')
                .required(true)
                .help("Local cache directory"),
        )
        .arg(
            Arg::new("resources")
                .num_args(0..)
                .help("Resource ids to cache; all resources when omitted"),
        )
}
