use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};

use grr_repository::{
    GroupRepository, RepositoriesConfig, Resource, build_group, cache_repository,
};

pub fn run_cache(matches: &ArgMatches) -> Result<()> {
    let grr_file = matches
        .get_one::<String>("grr")
        .expect("A repository definition file is required");
    let cache_dir = PathBuf::from(
        matches
            .get_one::<String>("cache-dir")
            .expect("A cache directory is required"),
    );

    let definitions = fs::read_to_string(grr_file)
        .with_context(|| format!("reading repository definitions from <{}>", grr_file))?;
    let group = build_group(&RepositoriesConfig::from_yaml_str(&definitions)?)?;

    // wrap every child repository with the caching decorator, one
    // cache subdirectory per repository id
    let cached = GroupRepository::new(
        group
            .children()
            .iter()
            .map(|child| cache_repository(child, cache_dir.join(child.repo_id())))
            .collect(),
    );

    let resources: Vec<Resource> = match matches.get_many::<String>("resources") {
        Some(ids) => ids
            .map(|id| cached.get_resource(id, None))
            .collect::<grr_repository::Result<_>>()?,
        None => cached.all_resources()?,
    };

    let progress = ProgressBar::new(resources.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .expect("a valid progress template"),
    );
    for resource in &resources {
        progress.set_message(resource.full_id());
        let manifest = resource
            .manifest()
            .with_context(|| format!("loading the manifest of <{}>", resource.full_id()))?;
        for entry in manifest.entries() {
            // reading through the caching repository pulls the file
            // into the local cache
            let mut reader = resource.open_raw_file(&entry.name, false)?;
            io::copy(&mut reader, &mut io::sink())?;
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "cached {} resources into <{}>",
        resources.len(),
        cache_dir.display()
    );
    Ok(())
}
