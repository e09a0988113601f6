mod config;
mod error;
mod gate;
mod progress;
mod run;
mod stats;
mod task;
mod user;
mod wait;

pub use config::RunConfig;
pub use error::{Error, Result};
pub use gate::TaskGate;
pub use progress::{ProgressFn, ProgressUpdate};
pub use run::run_users;
pub use stats::{LatencySummary, RequestMeta, RequestSummary, RunStats, RunSummary, TaskSummary};
pub use task::{Task, TaskFn, TaskFuture, TaskPicker, TaskSet};
pub use user::{UserBehavior, UserContext, rng_for_user};
pub use wait::WaitTime;
