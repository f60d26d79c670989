//! Task Orchestration Core
//!
//! Tracks the lifecycle of long-running media-processing jobs, runs their
//! pipeline stages off the request path, and fans out progress snapshots to
//! any number of subscribers.
//!
//! The pieces fit together as: a gateway creates a [`task::Task`] in the
//! [`store::TaskStore`], hands a stage list to the
//! [`executor::PipelineExecutor`], and serves live updates by subscribing to
//! the [`notify::ProgressHub`]. Stages implement [`stage::Stage`] and know
//! nothing about tasks or progress.

pub mod executor;
pub mod notify;
pub mod stage;
pub mod store;
pub mod task;

pub use executor::PipelineExecutor;
pub use notify::ProgressHub;
pub use stage::{Artifacts, Stage, StageContext, StageError, StageErrorKind};
pub use store::{StoreError, TaskStore};
pub use task::{Task, TaskOutput, TaskStatus};
