//! Per-caller admission limits for each operation class.
//!
//! Each (caller, class) pair keeps a log of recent admission instants. A
//! request is admitted while fewer than `limit` admissions fall inside the
//! trailing window; otherwise the caller is told how long until the oldest
//! one leaves it. Callers never affect each other.
//!
//! Logs whose every entry has left the window are swept from the check
//! path at most once per sweep interval, so the table only holds callers
//! seen recently.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

/// Logical operation classes with independent quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    /// Fan-out price aggregation; expensive.
    Aggregate,
    /// Read-only catalogue lookups.
    Browse,
    /// Operator-triggered catalogue re-population.
    Refresh,
}

impl OperationClass {
    /// Lowercase name used in messages and config.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::Browse => "browse",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `limit` admissions per `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Admissions allowed inside one window.
    pub limit: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Quota {
    /// `limit` per hour.
    pub const fn per_hour(limit: u32) -> Self {
        Self {
            limit,
            window_secs: 3_600,
        }
    }

    /// `limit` per day.
    pub const fn per_day(limit: u32) -> Self {
        Self {
            limit,
            window_secs: 86_400,
        }
    }

    /// Window as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Quotas for every operation class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Aggregate queries (default 20 per hour).
    pub aggregate: Quota,
    /// Read-only lookups (default 1000 per hour).
    pub browse: Quota,
    /// Catalogue refreshes (default 5 per day).
    pub refresh: Quota,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            aggregate: Quota::per_hour(20),
            browse: Quota::per_hour(1_000),
            refresh: Quota::per_day(5),
        }
    }
}

impl AdmissionConfig {
    /// Quota for one class.
    pub fn quota(&self, class: OperationClass) -> Quota {
        match class {
            OperationClass::Aggregate => self.aggregate,
            OperationClass::Browse => self.browse,
            OperationClass::Refresh => self.refresh,
        }
    }

    /// Reject zero limits and zero windows.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] naming the offending class.
    pub fn validate(&self) -> Result<()> {
        for class in [
            OperationClass::Aggregate,
            OperationClass::Browse,
            OperationClass::Refresh,
        ] {
            let quota = self.quota(class);
            if quota.limit == 0 || quota.window_secs == 0 {
                return Err(ScrapeError::Config(format!(
                    "admission quota for {class} must have a non-zero limit and window"
                )));
            }
        }
        Ok(())
    }
}

/// Opaque caller identity; the network origin for anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<IpAddr> for CallerId {
    fn from(addr: IpAddr) -> Self {
        Self(addr.to_string())
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admitted; `remaining` further requests fit in the current window.
    Admitted {
        /// Admissions left before the limit.
        remaining: u32,
    },
    /// Refused until `retry_after` has passed.
    Denied {
        /// Time until the oldest admission leaves the window.
        retry_after: Duration,
    },
}

impl Admission {
    /// Whether the request may proceed.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    /// Convert a denial into [`ScrapeError::AdmissionDenied`].
    ///
    /// # Errors
    ///
    /// Returns the denial for `class`, rounding the wait up to whole seconds.
    pub fn into_result(self, class: OperationClass) -> Result<()> {
        match self {
            Self::Admitted { .. } => Ok(()),
            Self::Denied { retry_after } => Err(ScrapeError::AdmissionDenied {
                operation: class,
                retry_after_secs: ceil_secs(retry_after),
            }),
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

type WindowKey = (CallerId, OperationClass);

/// Upper bound on the time between sweeps of idle logs.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Windows {
    logs: HashMap<WindowKey, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Sliding-window-log admission limiter.
pub struct AdmissionLimiter {
    config: AdmissionConfig,
    sweep_interval: Duration,
    windows: Mutex<Windows>,
}

impl AdmissionLimiter {
    /// Create a limiter with `config` quotas.
    pub fn new(config: AdmissionConfig) -> Self {
        let sweep_interval = [config.aggregate, config.browse, config.refresh]
            .iter()
            .map(Quota::window)
            .min()
            .unwrap_or(MAX_SWEEP_INTERVAL)
            .min(MAX_SWEEP_INTERVAL);
        Self {
            config,
            sweep_interval,
            windows: Mutex::new(Windows {
                logs: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Configured quotas.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Check and, if admitted, record a request now.
    pub fn check(&self, caller: &CallerId, class: OperationClass) -> Admission {
        self.check_at(caller, class, Instant::now())
    }

    /// Check and record a request at `now`.
    pub fn check_at(&self, caller: &CallerId, class: OperationClass, now: Instant) -> Admission {
        let quota = self.config.quota(class);
        let window = quota.window();

        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if now.saturating_duration_since(windows.last_sweep) >= self.sweep_interval {
            self.sweep(&mut windows, now);
        }
        let log = windows.logs.entry((caller.clone(), class)).or_default();
        while log
            .front()
            .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= window)
        {
            log.pop_front();
        }

        if log.len() < quota.limit as usize {
            log.push_back(now);
            let remaining = quota.limit - log.len() as u32;
            return Admission::Admitted { remaining };
        }

        let retry_after = log
            .front()
            .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or(window);
        tracing::debug!(
            caller = %caller,
            class = %class,
            retry_after_secs = ceil_secs(retry_after),
            "admission denied"
        );
        Admission::Denied { retry_after }
    }

    /// Drop logs with no admission inside their window.
    pub fn prune(&self) {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        self.sweep(&mut windows, Instant::now());
    }

    fn sweep(&self, windows: &mut Windows, now: Instant) {
        let before = windows.logs.len();
        windows.logs.retain(|(_, class), log| {
            let window = self.config.quota(*class).window();
            log.back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
        });
        windows.last_sweep = now;
        tracing::trace!(
            removed = before - windows.logs.len(),
            tracked = windows.logs.len(),
            "admission logs swept"
        );
    }

    /// Number of tracked (caller, class) logs.
    pub fn tracked(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .logs
            .len()
    }
}
