use std::time::Duration;

use rand::Rng;

use super::error::{Error, Result};

/// Pause a simulated user takes between two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTime {
    Constant(Duration),
    Between { min: Duration, max: Duration },
}

impl Default for WaitTime {
    fn default() -> Self {
        Self::Between {
            min: Duration::from_secs(1),
            max: Duration::from_secs(5),
        }
    }
}

impl WaitTime {
    pub fn between(min: Duration, max: Duration) -> Result<Self> {
        let w = Self::Between { min, max };
        w.validate()?;
        Ok(w)
    }

    #[must_use]
    pub fn constant(d: Duration) -> Self {
        Self::Constant(d)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match *self {
            Self::Between { min, max } if min > max => Err(Error::InvalidWaitTime { min, max }),
            _ => Ok(()),
        }
    }

    /// Draw the next pause, uniformly distributed over `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Constant(d) => d,
            Self::Between { min, max } if min >= max => min,
            Self::Between { min, max } => {
                let lo = u64::try_from(min.as_nanos()).unwrap_or(u64::MAX);
                let hi = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
                Duration::from_nanos(rng.random_range(lo..=hi))
            }
        }
    }
}
