use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use serde_json::json;

use grr_repository::{DirectoryProtocol, Repository, Resource};
use grr_scores::{
    GenomicScore, ScoreStatistics, chromosome_statistics, merge_statistics,
    save_statistics, statistics_up_to_date,
};
use grr_taskgraph::{
    ProcessExecutor, SequentialExecutor, TaskGraph, TaskOutcome, TaskResult, run_worker,
};

use super::cli;

/// One unit of statistics work. Serializable, so it can cross the
/// worker process boundary as a JSON task file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsTask {
    /// Compute per-chromosome statistics and write them to a partial
    /// statistics file.
    Chromosome {
        repository: PathBuf,
        resource_id: String,
        chromosome: String,
        part_file: PathBuf,
    },
    /// Merge all partial files and store the result into the resource.
    Merge {
        repository: PathBuf,
        resource_id: String,
        part_files: Vec<PathBuf>,
    },
}

fn directory_resource(
    repository: &Path,
    resource_id: &str,
) -> std::result::Result<Resource, String> {
    let repository = Repository::new(Arc::new(DirectoryProtocol::new("local", repository)));
    repository
        .get_resource(resource_id, None)
        .map_err(|err| err.to_string())
}

/// Run one statistics task; errors become task failures, not process
/// errors.
pub fn run_stats_task(task: &StatsTask) -> std::result::Result<serde_json::Value, String> {
    match task {
        StatsTask::Chromosome {
            repository,
            resource_id,
            chromosome,
            part_file,
        } => {
            let resource = directory_resource(repository, resource_id)?;
            let mut score = GenomicScore::open(&resource).map_err(|err| err.to_string())?;
            let stats =
                chromosome_statistics(&mut score, chromosome).map_err(|err| err.to_string())?;
            let text = serde_yaml::to_string(&stats).map_err(|err| err.to_string())?;
            fs::write(part_file, text).map_err(|err| err.to_string())?;
            Ok(json!({ "chromosome": chromosome }))
        }
        StatsTask::Merge {
            repository,
            resource_id,
            part_files,
        } => {
            let resource = directory_resource(repository, resource_id)?;
            let mut parts = Vec::with_capacity(part_files.len());
            for part_file in part_files {
                let text = fs::read_to_string(part_file).map_err(|err| err.to_string())?;
                let stats: Vec<ScoreStatistics> =
                    serde_yaml::from_str(&text).map_err(|err| err.to_string())?;
                parts.push(stats);
            }
            let merged = merge_statistics(parts).map_err(|err| err.to_string())?;
            let proto = DirectoryProtocol::new("local", repository);
            save_statistics(&proto, &resource, &merged).map_err(|err| err.to_string())?;
            Ok(json!({ "scores": merged.len() }))
        }
    }
}

/// Build the statistics task graph: one task per chromosome and a
/// merge task depending on all of them.
fn build_stats_graph(
    root: &Path,
    resource_id: &str,
    chromosomes: &[String],
    work_dir: &Path,
) -> Result<TaskGraph<StatsTask>> {
    let mut graph = TaskGraph::new();
    let mut chromosome_tasks = Vec::with_capacity(chromosomes.len());
    let mut part_files = Vec::with_capacity(chromosomes.len());
    for chromosome in chromosomes {
        let task_id = format!("stats/{}/{}", resource_id, chromosome);
        let part_file = work_dir.join(format!("{}.part.yaml", slug(chromosome)));
        graph.create_task(
            &task_id,
            StatsTask::Chromosome {
                repository: root.to_path_buf(),
                resource_id: resource_id.to_string(),
                chromosome: chromosome.clone(),
                part_file: part_file.clone(),
            },
            &[],
        )?;
        chromosome_tasks.push(task_id);
        part_files.push(part_file);
    }
    let dependencies: Vec<&str> = chromosome_tasks.iter().map(String::as_str).collect();
    graph.create_task(
        format!("stats/{}/merge", resource_id),
        StatsTask::Merge {
            repository: root.to_path_buf(),
            resource_id: resource_id.to_string(),
            part_files,
        },
        &dependencies,
    )?;
    Ok(graph)
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn report_results(results: &[TaskResult]) -> Result<()> {
    let mut failed = 0;
    for result in results {
        match &result.outcome {
            TaskOutcome::Completed { .. } => {}
            TaskOutcome::Failed { message } => {
                failed += 1;
                tracing::error!(task = %result.task_id, error = %message, "task failed");
            }
            TaskOutcome::NotRun { failed_dependency } => {
                failed += 1;
                tracing::error!(
                    task = %result.task_id,
                    failed_dependency = %failed_dependency,
                    "task not run"
                );
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} statistics tasks failed", failed, results.len());
    }
    Ok(())
}

pub fn run_stats(matches: &ArgMatches) -> Result<()> {
    let root = PathBuf::from(
        matches
            .get_one::<String>("repository")
            .expect("A repository root is required"),
    );
    let resource_id = matches
        .get_one::<String>("resource")
        .expect("A score resource id is required");

    let repository = Repository::new(Arc::new(DirectoryProtocol::new("local", &root)));
    let resource = repository.get_resource(resource_id, None)?;

    if !matches.get_flag("force") && statistics_up_to_date(&resource)? {
        println!("statistics of <{}> are up to date", resource.full_id());
        return Ok(());
    }

    let chromosomes = GenomicScore::open(&resource)?.chromosomes();
    if chromosomes.is_empty() {
        bail!("score resource <{}> has an empty table", resource.full_id());
    }

    let work_dir = matches
        .get_one::<String>("work-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join(".stats-work"));
    fs::create_dir_all(&work_dir)
        .with_context(|| format!("creating work directory <{}>", work_dir.display()))?;

    let graph = build_stats_graph(&root, resource_id, &chromosomes, &work_dir)?;

    let results = if matches.get_flag("processes") {
        let program = std::env::current_exe().context("locating the grr executable")?;
        ProcessExecutor::new(program, vec![cli::TASK_WORKER_CMD.to_string()], &work_dir)
            .execute(&graph)?
    } else {
        SequentialExecutor::new().execute(&graph, &run_stats_task)?
    };
    report_results(&results)?;

    println!(
        "statistics of <{}> rebuilt over {} chromosomes",
        resource.full_id(),
        chromosomes.len()
    );
    Ok(())
}

pub fn run_task_worker(matches: &ArgMatches) -> Result<()> {
    let task_file = PathBuf::from(
        matches
            .get_one::<String>("task-file")
            .expect("A task file is required"),
    );
    let result_file = PathBuf::from(
        matches
            .get_one::<String>("result-file")
            .expect("A result file is required"),
    );
    run_worker::<StatsTask>(&task_file, &result_file, &run_stats_task)?;
    Ok(())
}
