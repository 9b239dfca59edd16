//! Remote liveness tracking.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::remote::RemoteStore;
use crate::util::unix_timestamp_millis;

/// Last known reachability of the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No probe has completed yet
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    const fn to_raw(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Healthy => 1,
            Self::Unhealthy => 2,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Healthy,
            2 => Self::Unhealthy,
            _ => Self::Unknown,
        }
    }

    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        })
    }
}

/// Probes the remote and remembers the outcome.
pub struct HealthMonitor {
    status: AtomicU8,
    checked_at: AtomicI64,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    pub const fn new() -> Self {
        Self {
            status: AtomicU8::new(HealthStatus::Unknown.to_raw()),
            checked_at: AtomicI64::new(0),
        }
    }

    /// Probe once. A probe that outlives `deadline` counts as unhealthy.
    pub async fn probe(&self, remote: &dyn RemoteStore, deadline: Duration) -> bool {
        let healthy = tokio::time::timeout(deadline, remote.health())
            .await
            .unwrap_or(false);
        self.record(healthy);
        healthy
    }

    /// Store a probe result, logging transitions.
    pub fn record(&self, healthy: bool) -> HealthStatus {
        let status = if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        let previous = HealthStatus::from_raw(self.status.swap(status.to_raw(), Ordering::AcqRel));
        self.checked_at
            .store(unix_timestamp_millis(), Ordering::Release);

        match (previous, status) {
            (HealthStatus::Healthy, HealthStatus::Unhealthy) => {
                tracing::warn!("Remote became unreachable");
            }
            (HealthStatus::Unhealthy | HealthStatus::Unknown, HealthStatus::Healthy) => {
                tracing::info!(%previous, "Remote is healthy");
            }
            (HealthStatus::Unknown, HealthStatus::Unhealthy) => {
                tracing::warn!("Remote is unreachable");
            }
            _ => {}
        }
        previous
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    /// Unix ms of the last probe, if any.
    pub fn checked_at(&self) -> Option<i64> {
        match self.checked_at.load(Ordering::Acquire) {
            0 => None,
            millis => Some(millis),
        }
    }
}
