//! File-based task result cache keyed by task id.

use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::executor::TaskOutcome;

/// Stores completed task outcomes as JSON files in a directory so a
/// rerun of the same graph skips finished work. Only completed
/// outcomes are stored; failures always rerun.
#[derive(Debug, Clone)]
pub struct TaskCache {
    directory: PathBuf,
}

impl TaskCache {
    pub fn new(directory: impl Into<PathBuf>) -> TaskCache {
        TaskCache {
            directory: directory.into(),
        }
    }

    fn cache_file(&self, task_id: &str) -> PathBuf {
        self.directory
            .join(format!("{}.json", crate::executor::slugify(task_id)))
    }

    pub fn get(&self, task_id: &str) -> Result<Option<TaskOutcome>> {
        let path = self.cache_file(task_id);
        match fs::read(&path) {
            Ok(content) => Ok(Some(serde_json::from_slice(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn store(&self, task_id: &str, outcome: &TaskOutcome) -> Result<()> {
        debug_assert!(outcome.is_completed());
        fs::create_dir_all(&self.directory)?;
        let path = self.cache_file(task_id);
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, serde_json::to_vec_pretty(outcome)?)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }

    pub fn invalidate(&self, task_id: &str) -> Result<()> {
        let path = self.cache_file(task_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_store_and_get() {
        let temp = tempfile::tempdir().unwrap();
        let cache = TaskCache::new(temp.path());

        assert_eq!(cache.get("stats/one/chr1").unwrap(), None);
        let outcome = TaskOutcome::Completed { value: json!(7) };
        cache.store("stats/one/chr1", &outcome).unwrap();
        assert_eq!(cache.get("stats/one/chr1").unwrap(), Some(outcome));

        cache.invalidate("stats/one/chr1").unwrap();
        assert_eq!(cache.get("stats/one/chr1").unwrap(), None);
    }

    #[test]
    fn test_ids_differing_only_in_separators_do_not_collide() {
        let temp = tempfile::tempdir().unwrap();
        let cache = TaskCache::new(temp.path());

        cache
            .store("a/b", &TaskOutcome::Completed { value: json!(1) })
            .unwrap();
        cache
            .store("a_b", &TaskOutcome::Completed { value: json!(2) })
            .unwrap();

        assert_eq!(
            cache.get("a/b").unwrap(),
            Some(TaskOutcome::Completed { value: json!(1) })
        );
        assert_eq!(
            cache.get("a_b").unwrap(),
            Some(TaskOutcome::Completed { value: json!(2) })
        );
    }
}
