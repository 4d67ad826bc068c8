//! Compiles agentic workflow documents into GitHub Actions lock files.
//!
//! [`Compiler::compile`] runs the whole pipeline. The pieces are public so
//! hosts can inspect or reuse them:
//!
//! - [`model`] resolves frontmatter into [`WorkflowData`]
//! - [`engine`] holds the Copilot, Claude and Codex adapters and their log
//!   parsers
//! - [`safe_outputs`] builds the jobs that apply the agent's requested writes
//! - [`jobs`] and [`step_order`] check the job graph and the agent job layout
//! - [`schema`] and [`yaml`] describe and render the emitted workflow

pub mod compiler;
pub mod engine;
pub mod expressions;
pub mod jobs;
pub mod model;
pub mod safe_outputs;
pub mod schema;
pub mod step_order;
pub mod steps;
pub mod tokens;
pub mod yaml;

pub use compiler::{CompiledWorkflow, Compiler};
pub use engine::{Engine, EngineKind, LogMetrics, ToolCallInfo};
pub use jobs::JobManager;
pub use model::{WorkflowBuilder, WorkflowData};
pub use schema::{Job, RunsOn, Step};
pub use step_order::StepOrderTracker;
