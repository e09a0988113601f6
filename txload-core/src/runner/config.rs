use std::time::Duration;

use super::error::{Error, Result};
use super::wait::WaitTime;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL of the service under test, e.g. `http://127.0.0.1:8080`.
    pub host: String,
    pub users: u64,
    /// Users started per second. `None` starts every user at once.
    pub spawn_rate: Option<f64>,
    pub duration: Option<Duration>,
    /// Total task executions across all users.
    pub iterations: Option<u64>,
    pub wait_time: WaitTime,
    /// Per-request timeout applied by the shared client.
    pub timeout: Option<Duration>,
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            users: 1,
            spawn_rate: None,
            duration: None,
            iterations: None,
            wait_time: WaitTime::default(),
            timeout: None,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        match url::Url::parse(&self.host) {
            Ok(u) if u.scheme() == "http" && u.host_str().is_some() => {}
            _ => return Err(Error::InvalidHost(self.host.clone())),
        }
        if self.users == 0 {
            return Err(Error::InvalidUsers);
        }
        if self.iterations == Some(0) {
            return Err(Error::InvalidIterations);
        }
        if self.duration.is_some_and(|d| d.is_zero()) {
            return Err(Error::InvalidDuration);
        }
        if let Some(rate) = self.spawn_rate
            && !(rate.is_finite() && rate > 0.0 && Duration::try_from_secs_f64(1.0 / rate).is_ok())
        {
            return Err(Error::InvalidSpawnRate);
        }
        self.wait_time.validate()
    }

    /// Pause between two user spawns. `None` starts every user at once.
    #[must_use]
    pub fn spawn_interval(&self) -> Option<Duration> {
        self.spawn_rate
            .and_then(|rate| Duration::try_from_secs_f64(1.0 / rate).ok())
    }

    /// Whether the run stops on its own (otherwise it runs until interrupted).
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.duration.is_some() || self.iterations.is_some()
    }
}
