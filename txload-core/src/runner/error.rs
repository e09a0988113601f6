pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`users` must be a positive integer")]
    InvalidUsers,

    #[error("`iterations` must be a positive integer")]
    InvalidIterations,

    #[error("`spawn_rate` must be a positive, finite number of users per second")]
    InvalidSpawnRate,

    #[error("`duration` must be a positive duration")]
    InvalidDuration,

    #[error("invalid wait time: min ({min:?}) is greater than max ({max:?})")]
    InvalidWaitTime {
        min: std::time::Duration,
        max: std::time::Duration,
    },

    #[error("`host` must be an http:// base URL (got `{0}`)")]
    InvalidHost(String),

    #[error("no tasks registered (every task weight is 0)")]
    NoTasks,
}
