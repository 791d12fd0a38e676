//! Document expiry.

use crate::{error::Result, Error};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Durations shorter than this are sent as relative seconds.
pub const RELATIVE_EXPIRY_CUTOFF: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Durations longer than this are taken to be epoch seconds.
pub const EPOCH_EXPIRY_CUTOFF: Duration = Duration::from_secs(50 * 365 * 24 * 60 * 60);

/// When a document should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    #[default]
    None,
    Relative(Duration),
    Absolute(SystemTime),
}

impl Expiry {
    pub fn relative_secs(secs: u64) -> Self {
        Expiry::Relative(Duration::from_secs(secs))
    }

    /// Wire representation: zero, relative seconds, or epoch seconds.
    pub fn to_wire(self) -> Result<u32> {
        self.to_wire_at(SystemTime::now())
    }

    pub fn to_wire_at(self, now: SystemTime) -> Result<u32> {
        match self {
            Expiry::None => Ok(0),
            Expiry::Relative(duration) if duration < RELATIVE_EXPIRY_CUTOFF => {
                Ok(duration.as_secs() as u32)
            }
            Expiry::Relative(duration) if duration > EPOCH_EXPIRY_CUTOFF => {
                tracing::warn!(
                    seconds = duration.as_secs(),
                    "expiry longer than 50 years is interpreted as an epoch second"
                );
                to_u32(duration.as_secs())
            }
            Expiry::Relative(duration) => to_u32(epoch_secs(now)? + duration.as_secs()),
            Expiry::Absolute(at) => to_u32(epoch_secs(at)?),
        }
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Expiry::Relative(duration)
    }
}

impl From<SystemTime> for Expiry {
    fn from(at: SystemTime) -> Self {
        Expiry::Absolute(at)
    }
}

fn epoch_secs(at: SystemTime) -> Result<u64> {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| Error::InvalidArgument("expiry before the unix epoch".into()))
}

fn to_u32(secs: u64) -> Result<u32> {
    u32::try_from(secs).map_err(|_| Error::InvalidArgument(format!("expiry out of range: {secs}")))
}
