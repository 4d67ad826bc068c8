//! Step emitters shared by the agent and safe-output jobs.

pub mod common;
pub mod git;
pub mod serena;

pub use git::{clean_git_credentials_step, configure_git_credentials_steps};
pub use serena::{serena_languages, serena_setup_steps};
