// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DagScheduler`: runs a set of named, dependency-ordered tasks in
//! parallel where the graph allows (§4.3).

use crate::ScheduleError;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

type VertexTask = Pin<Box<dyn Future<Output = ()> + Send>>;

struct Vertex {
    name: String,
    dependencies: Vec<String>,
    task: VertexTask,
}

/// Builds and runs a DAG of zero-argument tasks. A vertex begins only after
/// every predecessor has returned; a predecessor's failure does not block
/// its dependents from being scheduled — step-level skipping is the step's
/// own policy, not the scheduler's concern.
#[derive(Default)]
pub struct DagScheduler {
    vertices: Vec<Vertex>,
}

impl DagScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(
        &mut self,
        name: impl Into<String>,
        dependencies: impl IntoIterator<Item = String>,
        task: impl Future<Output = ()> + Send + 'static,
    ) -> &mut Self {
        self.vertices.push(Vertex {
            name: name.into(),
            dependencies: dependencies.into_iter().collect(),
            task: Box::pin(task),
        });
        self
    }

    /// `"missing vertex"` / `"dependency cycle detected"` validation (§4.3),
    /// run before any task is scheduled.
    fn validate(&self) -> Result<(), ScheduleError> {
        let names: HashSet<&str> = self.vertices.iter().map(|v| v.name.as_str()).collect();
        for vertex in &self.vertices {
            for dep in &vertex.dependencies {
                if !names.contains(dep.as_str()) {
                    return Err(ScheduleError::MissingVertex(dep.clone()));
                }
            }
        }
        self.check_acyclic()
    }

    fn check_acyclic(&self) -> Result<(), ScheduleError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let by_name: HashMap<&str, &Vertex> =
            self.vertices.iter().map(|v| (v.name.as_str(), v)).collect();
        let mut marks: HashMap<&str, Mark> = self
            .vertices
            .iter()
            .map(|v| (v.name.as_str(), Mark::Unvisited))
            .collect();

        fn visit<'a>(
            name: &'a str,
            by_name: &HashMap<&'a str, &'a Vertex>,
            marks: &mut HashMap<&'a str, Mark>,
        ) -> Result<(), ScheduleError> {
            match marks.get(name).copied() {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => return Err(ScheduleError::Cycle),
                _ => {}
            }
            marks.insert(name, Mark::InProgress);
            if let Some(vertex) = by_name.get(name) {
                for dep in &vertex.dependencies {
                    visit(dep.as_str(), by_name, marks)?;
                }
            }
            marks.insert(name, Mark::Done);
            Ok(())
        }

        for name in by_name.keys() {
            visit(name, &by_name, &mut marks)?;
        }
        Ok(())
    }

    /// Run every vertex's task to completion, respecting dependency edges.
    /// Returns after the last task returns, or immediately on a validation
    /// error (before any task runs).
    pub async fn run(self) -> Result<(), ScheduleError> {
        self.validate()?;

        let mut senders = HashMap::new();
        let mut receivers: HashMap<String, watch::Receiver<bool>> = HashMap::new();
        for vertex in &self.vertices {
            let (tx, rx) = watch::channel(false);
            senders.insert(vertex.name.clone(), tx);
            receivers.insert(vertex.name.clone(), rx);
        }

        let mut handles = Vec::with_capacity(self.vertices.len());
        for vertex in self.vertices {
            let mut dep_rx: Vec<_> = vertex
                .dependencies
                .iter()
                .map(|dep| receivers[dep].clone())
                .collect();
            let done_tx = senders
                .remove(&vertex.name)
                .expect("every vertex registers its own sender");
            let task = vertex.task;
            handles.push(tokio::spawn(async move {
                for rx in dep_rx.iter_mut() {
                    let _ = rx.changed().await;
                }
                task.await;
                let _ = done_tx.send(true);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
