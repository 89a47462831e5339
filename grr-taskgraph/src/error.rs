use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskGraphError>;

#[derive(Error, Debug)]
pub enum TaskGraphError {
    #[error("Duplicate task id <{0}>")]
    DuplicateTask(String),

    #[error("Task <{task_id}> depends on unknown task <{dependency}>")]
    UnknownDependency {
        task_id: String,
        dependency: String,
    },

    #[error("Unknown task <{0}>")]
    UnknownTask(String),

    #[error("Cyclic task dependency: {0}")]
    Cycle(String),

    #[error("Task worker for <{task_id}> failed to start: {message}")]
    WorkerSpawn { task_id: String, message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
