//! Job collection and dependency validation using petgraph.

use crate::schema::Job;
use aw_core::{Error, Result};
use indexmap::IndexMap;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::debug;

/// Jobs of one workflow, kept in submission order.
#[derive(Debug, Default)]
pub struct JobManager {
    jobs: IndexMap<String, Job>,
}

impl JobManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobGraph`] when a job with the same id exists.
    pub fn add_job(&mut self, job: Job) -> Result<()> {
        if self.jobs.contains_key(&job.id) {
            return Err(Error::job_graph(format!("job '{}' already exists", job.id)));
        }
        debug!(job = %job.id, needs = ?job.needs, "added job");
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    /// Look up a job by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no jobs were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs in submission order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    fn graph(&self) -> Result<DiGraph<&str, ()>> {
        let mut graph = DiGraph::new();
        let nodes: HashMap<&str, NodeIndex> = self
            .jobs
            .keys()
            .map(|id| (id.as_str(), graph.add_node(id.as_str())))
            .collect();
        for job in self.jobs.values() {
            for need in &job.needs {
                let Some(&from) = nodes.get(need.as_str()) else {
                    return Err(Error::job_graph(format!(
                        "job '{}' depends on non-existent job '{need}'",
                        job.id
                    )));
                };
                graph.add_edge(from, nodes[job.id.as_str()], ());
            }
        }
        Ok(graph)
    }

    /// Check that every dependency exists and that there are no cycles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobGraph`] naming the missing job or reporting the
    /// cycle.
    pub fn validate_dependencies(&self) -> Result<()> {
        let graph = self.graph()?;
        if is_cyclic_directed(&graph) {
            return Err(Error::job_graph("cycle detected in job dependencies"));
        }
        Ok(())
    }

    /// Job ids with every job after the jobs it needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobGraph`] for missing dependencies or cycles.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let graph = self.graph()?;
        let order = toposort(&graph, None)
            .map_err(|_| Error::job_graph("cycle detected in job dependencies"))?;
        Ok(order.into_iter().map(|n| graph[n].to_string()).collect())
    }

    /// Render the `jobs:` section in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emit`] when a job cannot be serialized.
    pub fn render_jobs(&self) -> Result<String> {
        let mut out = String::from("jobs:\n");
        for job in self.jobs.values() {
            out.push_str(&job.to_fragment()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Step;

    fn job(id: &str, needs: &[&str]) -> Job {
        needs
            .iter()
            .fold(Job::new(id, "ubuntu-slim"), |job, need| job.with_need(*need))
            .with_step(Step::run("echo ok").with_name("Noop"))
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut manager = JobManager::new();
        manager.add_job(job("agent", &[])).unwrap();
        let err = manager.add_job(job("agent", &[])).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_missing_dependency() {
        let mut manager = JobManager::new();
        manager.add_job(job("add_labels", &["agent"])).unwrap();
        let err = manager.validate_dependencies().unwrap_err();
        assert_eq!(
            err.to_string(),
            "job 'add_labels' depends on non-existent job 'agent'"
        );
    }

    #[test]
    fn test_cycle() {
        let mut manager = JobManager::new();
        manager.add_job(job("a", &["b"])).unwrap();
        manager.add_job(job("b", &["a"])).unwrap();
        let err = manager.validate_dependencies().unwrap_err();
        assert!(err.to_string().contains("cycle detected"));
        assert!(manager.topological_order().is_err());
    }

    #[test]
    fn test_topological_order() {
        let mut manager = JobManager::new();
        manager.add_job(job("add_comment", &["agent", "create_issue"])).unwrap();
        manager.add_job(job("create_issue", &["agent"])).unwrap();
        manager.add_job(job("agent", &["activation"])).unwrap();
        manager.add_job(job("activation", &[])).unwrap();
        manager.validate_dependencies().unwrap();
        let order = manager.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|j| j == id).unwrap();
        assert!(pos("activation") < pos("agent"));
        assert!(pos("agent") < pos("create_issue"));
        assert!(pos("create_issue") < pos("add_comment"));
    }

    #[test]
    fn test_render_in_submission_order() {
        let mut manager = JobManager::new();
        manager.add_job(job("activation", &[])).unwrap();
        manager.add_job(job("agent", &["activation"])).unwrap();
        let yaml = manager.render_jobs().unwrap();
        assert!(yaml.starts_with("jobs:\n  activation:\n"));
        let activation = yaml.find("  activation:").unwrap();
        let agent = yaml.find("  agent:").unwrap();
        assert!(activation < agent);
        assert!(yaml.contains("    needs: activation\n"));
    }
}
