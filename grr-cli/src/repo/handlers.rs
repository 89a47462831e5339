use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::ArgMatches;

use grr_repository::{DirectoryProtocol, Repository, Resource};

use super::cli;

pub fn run_repo(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some((cli::REPO_LIST, matches)) => list_resources(matches),
        Some((cli::REPO_MANIFEST, matches)) => rebuild_manifests(matches),
        Some((cli::REPO_REPAIR, matches)) => repair_manifests(matches),
        Some((cli::REPO_CONTENTS, matches)) => rebuild_contents(matches),
        _ => unreachable!("Repo subcommand not found"),
    }
}

fn open_repository(matches: &ArgMatches) -> (Arc<DirectoryProtocol>, Repository) {
    let root = matches
        .get_one::<String>("repository")
        .expect("A repository root is required");
    let proto = Arc::new(DirectoryProtocol::new("local", Path::new(root)));
    let repository = Repository::new(Arc::clone(&proto) as _);
    (proto, repository)
}

fn selected_resources(
    matches: &ArgMatches,
    repository: &Repository,
) -> Result<Vec<Resource>> {
    match matches.get_one::<String>("resource") {
        Some(resource_id) => Ok(vec![repository.get_resource(resource_id, None)?]),
        None => Ok(repository.all_resources()?),
    }
}

fn list_resources(matches: &ArgMatches) -> Result<()> {
    let (_proto, repository) = open_repository(matches);
    for resource in repository.all_resources()? {
        let files = match resource.manifest() {
            Ok(manifest) => manifest.len().to_string(),
            Err(_) => "-".to_string(),
        };
        println!(
            "{}\t{}\t{} files",
            resource.full_id(),
            resource.resource_type(),
            files
        );
    }
    Ok(())
}

fn rebuild_manifests(matches: &ArgMatches) -> Result<()> {
    let (proto, repository) = open_repository(matches);
    for resource in selected_resources(matches, &repository)? {
        let manifest = proto.build_manifest(resource.entry())?;
        proto.save_manifest(resource.entry(), &manifest)?;
        println!("{}: {} files", resource.full_id(), manifest.len());
    }
    Ok(())
}

fn repair_manifests(matches: &ArgMatches) -> Result<()> {
    let (proto, repository) = open_repository(matches);
    for resource in selected_resources(matches, &repository)? {
        let (_manifest, changed) = proto.repair_manifest(resource.entry())?;
        if changed.is_empty() {
            println!("{}: up to date", resource.full_id());
        } else {
            println!("{}: updated {}", resource.full_id(), changed.join(", "));
        }
    }
    Ok(())
}

fn rebuild_contents(matches: &ArgMatches) -> Result<()> {
    let (proto, _repository) = open_repository(matches);
    let contents = proto.build_contents()?;
    proto.save_contents()?;
    println!("contents index rebuilt: {} resources", contents.len());
    Ok(())
}
