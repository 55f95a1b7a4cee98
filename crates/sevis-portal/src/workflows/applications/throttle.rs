use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window throttle for failed admin actions.
///
/// Failures are recorded per admin identifier; once an identifier collects
/// `max_failures` inside `window` it is locked out until the window slides
/// past the oldest failure. Stale identifiers are pruned every
/// `cleanup_interval` recorded failures so the map stays bounded.
pub struct AdminAttemptThrottle {
    config: ThrottleConfig,
    state: Mutex<HashMap<String, Vec<Instant>>>,
    failure_count: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub max_failures: u32,
    pub window: Duration,
    pub cleanup_interval: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_failures: 10,
            window: Duration::from_secs(60),
            cleanup_interval: 100,
        }
    }
}

impl AdminAttemptThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HashMap::new()),
            failure_count: AtomicU64::new(0),
        }
    }

    /// Whether the identifier has exhausted its failure budget.
    pub fn blocked(&self, admin_id: &str) -> bool {
        let cutoff = self.cutoff();
        let state = self.state.lock().expect("throttle mutex poisoned");
        state
            .get(admin_id)
            .map(|failures| {
                let recent = failures.iter().filter(|&&at| at > cutoff).count();
                recent >= self.config.max_failures as usize
            })
            .unwrap_or(false)
    }

    pub fn record_failure(&self, admin_id: &str) {
        let now = Instant::now();
        let cutoff = self.cutoff();

        let count = self.failure_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval == 0 {
            self.cleanup();
        }

        let mut state = self.state.lock().expect("throttle mutex poisoned");
        let failures = state.entry(admin_id.to_string()).or_default();
        failures.retain(|&at| at > cutoff);
        failures.push(now);

        if failures.len() >= self.config.max_failures as usize {
            tracing::warn!(
                admin = admin_id,
                failures = failures.len(),
                "admin identifier crossed the failure threshold"
            );
        }
    }

    /// Drops identifiers whose failures have all aged out of the window.
    pub fn cleanup(&self) {
        let cutoff = self.cutoff();
        let mut state = self.state.lock().expect("throttle mutex poisoned");
        state.retain(|_, failures| {
            failures.retain(|&at| at > cutoff);
            !failures.is_empty()
        });
    }

    /// Number of identifiers currently holding recent failures.
    pub fn tracked(&self) -> usize {
        let state = self.state.lock().expect("throttle mutex poisoned");
        state.len()
    }

    fn cutoff(&self) -> Instant {
        let now = Instant::now();
        now.checked_sub(self.config.window).unwrap_or(now)
    }
}
