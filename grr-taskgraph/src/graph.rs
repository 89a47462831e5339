//! The task dependency graph.

use std::collections::HashMap;

use crate::error::{Result, TaskGraphError};

/// One node of the graph: an identifier, a serializable payload
/// describing the work, and dependencies on other tasks.
#[derive(Debug, Clone)]
pub struct Task<T> {
    pub task_id: String,
    pub payload: T,
    pub dependencies: Vec<usize>,
}

/// A DAG of tasks. Ids are unique; dependencies must name tasks
/// already in the graph.
#[derive(Debug, Default)]
pub struct TaskGraph<T> {
    tasks: Vec<Task<T>>,
    index: HashMap<String, usize>,
}

impl<T> TaskGraph<T> {
    pub fn new() -> TaskGraph<T> {
        TaskGraph {
            tasks: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn tasks(&self) -> &[Task<T>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_index(&self, task_id: &str) -> Option<usize> {
        self.index.get(task_id).copied()
    }

    pub fn create_task(
        &mut self,
        task_id: impl Into<String>,
        payload: T,
        dependencies: &[&str],
    ) -> Result<()> {
        let task_id = task_id.into();
        if self.index.contains_key(&task_id) {
            return Err(TaskGraphError::DuplicateTask(task_id));
        }
        let dependencies = dependencies
            .iter()
            .map(|dep| {
                self.index.get(*dep).copied().ok_or_else(|| {
                    TaskGraphError::UnknownDependency {
                        task_id: task_id.clone(),
                        dependency: dep.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        self.index.insert(task_id.clone(), self.tasks.len());
        self.tasks.push(Task {
            task_id,
            payload,
            dependencies,
        });
        Ok(())
    }

    /// Add a dependency between existing tasks.
    pub fn add_dependency(&mut self, task_id: &str, dependency: &str) -> Result<()> {
        let dep_index = self.index.get(dependency).copied().ok_or_else(|| {
            TaskGraphError::UnknownDependency {
                task_id: task_id.to_string(),
                dependency: dependency.to_string(),
            }
        })?;
        let task_index = self
            .index
            .get(task_id)
            .copied()
            .ok_or_else(|| TaskGraphError::UnknownTask(task_id.to_string()))?;
        self.tasks[task_index].dependencies.push(dep_index);
        Ok(())
    }

    /// Dependency-first execution order.
    ///
    /// A depth-first walk with a recursion stack; a back-edge to a
    /// task on the stack is a cycle error naming the cycle.
    pub fn execution_order(&self) -> Result<Vec<usize>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.tasks.len()];
        let mut order = Vec::with_capacity(self.tasks.len());
        let mut stack: Vec<usize> = Vec::new();

        fn visit<T>(
            graph: &TaskGraph<T>,
            node: usize,
            marks: &mut [Mark],
            stack: &mut Vec<usize>,
            order: &mut Vec<usize>,
        ) -> Result<()> {
            match marks[node] {
                Mark::Done => return Ok(()),
                Mark::OnStack => {
                    let start = stack
                        .iter()
                        .position(|&n| n == node)
                        .unwrap_or_default();
                    let cycle = stack[start..]
                        .iter()
                        .chain(std::iter::once(&node))
                        .map(|&n| graph.tasks[n].task_id.as_str())
                        .collect::<Vec<_>>()
                        .join(" -> ");
                    return Err(TaskGraphError::Cycle(cycle));
                }
                Mark::Unvisited => {}
            }
            marks[node] = Mark::OnStack;
            stack.push(node);
            for &dep in &graph.tasks[node].dependencies {
                visit(graph, dep, marks, stack, order)?;
            }
            stack.pop();
            marks[node] = Mark::Done;
            order.push(node);
            Ok(())
        }

        for node in 0..self.tasks.len() {
            visit(self, node, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph() -> TaskGraph<u32> {
        let mut graph = TaskGraph::new();
        graph.create_task("a", 1, &[]).unwrap();
        graph.create_task("b", 2, &["a"]).unwrap();
        graph.create_task("c", 3, &["a"]).unwrap();
        graph.create_task("d", 4, &["b", "c"]).unwrap();
        graph
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut graph = graph();
        let error = graph.create_task("a", 9, &[]).unwrap_err();
        assert!(matches!(error, TaskGraphError::DuplicateTask(id) if id == "a"));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let mut graph = graph();
        assert!(graph.create_task("e", 5, &["nope"]).is_err());
    }

    #[test]
    fn test_add_dependency_rejects_unknown_ids() {
        let mut graph = graph();
        let error = graph.add_dependency("nope", "a").unwrap_err();
        assert!(matches!(error, TaskGraphError::UnknownTask(id) if id == "nope"));

        let error = graph.add_dependency("a", "nope").unwrap_err();
        assert!(matches!(
            error,
            TaskGraphError::UnknownDependency { task_id, dependency }
                if task_id == "a" && dependency == "nope"
        ));
    }

    #[test]
    fn test_execution_order_is_dependency_first() {
        let graph = graph();
        let order = graph.execution_order().unwrap();
        let position = |id: &str| {
            order
                .iter()
                .position(|&n| graph.tasks()[n].task_id == id)
                .unwrap()
        };
        assert!(position("a") < position("b"));
        assert!(position("a") < position("c"));
        assert!(position("b") < position("d"));
        assert!(position("c") < position("d"));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_cycle_is_named() {
        let mut graph = graph();
        graph.add_dependency("a", "d").unwrap();
        let error = graph.execution_order().unwrap_err();
        let TaskGraphError::Cycle(cycle) = error else {
            panic!("expected a cycle error");
        };
        assert!(cycle.contains("a"));
        assert!(cycle.contains("d"));
    }
}
