//! Task executors.
//!
//! Both executors produce the same results for an acyclic graph: one
//! outcome per task, dependency-first. A failed task marks its
//! transitive dependents as not-run. The process executor trades
//! wall-clock parallelism and fault isolation for per-task process
//! spawn cost; tasks and results cross the process boundary only as
//! JSON files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use md5::{Digest, Md5};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::TaskCache;
use crate::error::{Result, TaskGraphError};
use crate::graph::TaskGraph;

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The task ran and produced a value.
    Completed { value: serde_json::Value },
    /// The task ran and failed; the error is carried as a value, not
    /// an executor failure.
    Failed { message: String },
    /// A dependency failed, so the task never started.
    NotRun { failed_dependency: String },
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub outcome: TaskOutcome,
}

/// The work behind a task payload. Errors are returned as messages;
/// they become [`TaskOutcome::Failed`], not executor errors.
pub type TaskFn<'a, T> =
    dyn Fn(&T) -> std::result::Result<serde_json::Value, String> + Sync + 'a;

fn failed_dependency<T>(
    graph: &TaskGraph<T>,
    node: usize,
    outcomes: &[Option<TaskOutcome>],
) -> Option<String> {
    for &dep in &graph.tasks()[node].dependencies {
        match &outcomes[dep] {
            Some(outcome) if outcome.is_completed() => {}
            _ => return Some(graph.tasks()[dep].task_id.clone()),
        }
    }
    None
}

fn collect_results<T>(
    graph: &TaskGraph<T>,
    outcomes: Vec<Option<TaskOutcome>>,
) -> Vec<TaskResult> {
    graph
        .tasks()
        .iter()
        .zip(outcomes)
        .map(|(task, outcome)| TaskResult {
            task_id: task.task_id.clone(),
            outcome: outcome.unwrap_or(TaskOutcome::Failed {
                message: "task was never scheduled".to_string(),
            }),
        })
        .collect()
}

/// Runs tasks inline, one at a time, in dependency order.
#[derive(Default)]
pub struct SequentialExecutor {
    cache: Option<TaskCache>,
}

impl SequentialExecutor {
    pub fn new() -> SequentialExecutor {
        SequentialExecutor::default()
    }

    pub fn with_cache(cache: TaskCache) -> SequentialExecutor {
        SequentialExecutor { cache: Some(cache) }
    }

    pub fn execute<T>(
        &self,
        graph: &TaskGraph<T>,
        task_fn: &TaskFn<'_, T>,
    ) -> Result<Vec<TaskResult>> {
        let order = graph.execution_order()?;
        let mut outcomes: Vec<Option<TaskOutcome>> = vec![None; graph.len()];

        for node in order {
            let task = &graph.tasks()[node];
            if let Some(dependency) = failed_dependency(graph, node, &outcomes) {
                tracing::warn!(
                    task = %task.task_id,
                    failed_dependency = %dependency,
                    "skipping task with failed dependency"
                );
                outcomes[node] = Some(TaskOutcome::NotRun {
                    failed_dependency: dependency,
                });
                continue;
            }
            if let Some(cache) = &self.cache {
                if let Some(cached) = cache.get(&task.task_id)? {
                    tracing::debug!(task = %task.task_id, "task result found in cache");
                    outcomes[node] = Some(cached);
                    continue;
                }
            }
            let outcome = match task_fn(&task.payload) {
                Ok(value) => TaskOutcome::Completed { value },
                Err(message) => {
                    tracing::error!(task = %task.task_id, error = %message, "task failed");
                    TaskOutcome::Failed { message }
                }
            };
            if let Some(cache) = &self.cache {
                if outcome.is_completed() {
                    cache.store(&task.task_id, &outcome)?;
                }
            }
            outcomes[node] = Some(outcome);
        }
        Ok(collect_results(graph, outcomes))
    }
}

/// Runs every task in its own worker process.
///
/// The worker is the configured program invoked with
/// `--task-file <path> --result-file <path>` appended to its
/// arguments; it reads the JSON payload, runs the task and writes a
/// [`TaskOutcome`] JSON result. A worker that exits without writing a
/// result file is a crash failure.
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
    cache: Option<TaskCache>,
}

impl ProcessExecutor {
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        work_dir: impl Into<PathBuf>,
    ) -> ProcessExecutor {
        ProcessExecutor {
            program: program.into(),
            args,
            work_dir: work_dir.into(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: TaskCache) -> ProcessExecutor {
        self.cache = Some(cache);
        self
    }

    pub fn execute<T: Serialize>(&self, graph: &TaskGraph<T>) -> Result<Vec<TaskResult>> {
        let order = graph.execution_order()?;
        fs::create_dir_all(&self.work_dir)?;
        let mut outcomes: Vec<Option<TaskOutcome>> = vec![None; graph.len()];

        // tasks whose dependencies are all satisfied run as one
        // parallel wave
        let mut pending = order;
        while !pending.is_empty() {
            let mut wave = Vec::new();
            let mut rest = Vec::new();
            for node in pending {
                let ready = graph.tasks()[node]
                    .dependencies
                    .iter()
                    .all(|&dep| outcomes[dep].is_some());
                if ready {
                    wave.push(node);
                } else {
                    rest.push(node);
                }
            }
            pending = rest;

            let mut running = Vec::new();
            for node in wave {
                let task = &graph.tasks()[node];
                if let Some(dependency) = failed_dependency(graph, node, &outcomes) {
                    outcomes[node] = Some(TaskOutcome::NotRun {
                        failed_dependency: dependency,
                    });
                    continue;
                }
                if let Some(cache) = &self.cache {
                    if let Some(cached) = cache.get(&task.task_id)? {
                        outcomes[node] = Some(cached);
                        continue;
                    }
                }
                running.push(self.spawn_worker(graph, node)?);
            }
            for worker in running {
                let (node, outcome) = self.wait_worker(graph, worker)?;
                if let Some(cache) = &self.cache {
                    if outcome.is_completed() {
                        cache.store(&graph.tasks()[node].task_id, &outcome)?;
                    }
                }
                outcomes[node] = Some(outcome);
            }
        }
        Ok(collect_results(graph, outcomes))
    }

    fn spawn_worker<T: Serialize>(
        &self,
        graph: &TaskGraph<T>,
        node: usize,
    ) -> Result<RunningWorker> {
        let task = &graph.tasks()[node];
        let slug = slugify(&task.task_id);
        let task_file = self.work_dir.join(format!("{}.task.json", slug));
        let result_file = self.work_dir.join(format!("{}.result.json", slug));
        fs::write(&task_file, serde_json::to_vec_pretty(&task.payload)?)?;
        let _ = fs::remove_file(&result_file);

        tracing::debug!(task = %task.task_id, "spawning task worker");
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg("--task-file")
            .arg(&task_file)
            .arg("--result-file")
            .arg(&result_file)
            .spawn()
            .map_err(|err| TaskGraphError::WorkerSpawn {
                task_id: task.task_id.clone(),
                message: err.to_string(),
            })?;
        Ok(RunningWorker {
            node,
            child,
            result_file,
        })
    }

    fn wait_worker<T>(
        &self,
        graph: &TaskGraph<T>,
        mut worker: RunningWorker,
    ) -> Result<(usize, TaskOutcome)> {
        let task_id = &graph.tasks()[worker.node].task_id;
        let status = worker.child.wait()?;
        let outcome = match fs::read(&worker.result_file) {
            Ok(content) => serde_json::from_slice(&content)?,
            // no result file: the worker crashed instead of reporting
            Err(_) => TaskOutcome::Failed {
                message: format!(
                    "task worker for <{}> exited with {} without writing a result",
                    task_id, status
                ),
            },
        };
        Ok((worker.node, outcome))
    }
}

struct RunningWorker {
    node: usize,
    child: std::process::Child,
    result_file: PathBuf,
}

/// File-name-safe form of a task id. Distinct ids must map to
/// distinct names, so a short digest of the original id is appended
/// after the character replacement.
pub(crate) fn slugify(task_id: &str) -> String {
    let safe: String = task_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let mut hasher = Md5::new();
    hasher.update(task_id.as_bytes());
    let digest = hasher.finalize();
    format!(
        "{}-{:02x}{:02x}{:02x}{:02x}",
        safe, digest[0], digest[1], digest[2], digest[3]
    )
}

/// Worker-side handler: read the task file, run the task, report the
/// outcome through the result file. The result is written atomically
/// so a partially-written file is never mistaken for a report.
pub fn run_worker<T: DeserializeOwned>(
    task_file: &Path,
    result_file: &Path,
    task_fn: &TaskFn<'_, T>,
) -> Result<()> {
    let payload: T = serde_json::from_slice(&fs::read(task_file)?)?;
    let outcome = match task_fn(&payload) {
        Ok(value) => TaskOutcome::Completed { value },
        Err(message) => TaskOutcome::Failed { message },
    };
    let temp = result_file.with_extension("tmp");
    fs::write(&temp, serde_json::to_vec_pretty(&outcome)?)?;
    fs::rename(&temp, result_file)?;
    Ok(())
}
