//! Per-client admission control
//!
//! Each client key owns a [`TokenBucket`]. Buckets live in a sharded
//! [`DashMap`], so the refill-and-consume step for one client runs under that
//! key's shard lock and never races another admit for the same key, while
//! distinct clients proceed in parallel. A background sweep drops clients that
//! have been idle longer than the configured TTL.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::bucket::TokenBucket;
use crate::config::RateLimitConfig;
use crate::error::Result;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Request admitted; `remaining` whole tokens are left
    Allowed { remaining: u32 },
    /// Request refused; a token accrues after `retry_after`
    Denied { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

#[derive(Debug)]
struct ClientState {
    bucket: TokenBucket,
    last_seen: Instant,
}

#[derive(Debug)]
struct Inner {
    clients: DashMap<String, ClientState>,
    rate: f64,
    burst: u32,
    ttl: Duration,
    sweep_interval: Duration,
}

/// Token-bucket rate limiter keyed by client identifier
///
/// Cheap to clone; clones share the same client table.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Build a limiter without starting the eviction sweep
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                clients: DashMap::new(),
                rate: config.requests_per_second,
                burst: config.burst,
                ttl: config.ttl(),
                sweep_interval: config.sweep_interval(),
            }),
        })
    }

    /// Build a limiter and start its eviction sweep
    ///
    /// The sweep runs until `shutdown` is cancelled.
    pub fn spawn(
        config: &RateLimitConfig,
        shutdown: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>)> {
        let limiter = Self::new(config)?;
        let handle = limiter.start_sweeper(shutdown);
        Ok((limiter, handle))
    }

    /// Consume one token for `client_id` if one is available
    pub fn admit(&self, client_id: &str) -> bool {
        self.check(client_id).is_allowed()
    }

    /// Like [`admit`](Self::admit), reporting what is left or how long to wait
    ///
    /// Unknown clients start with a full bucket.
    pub fn check(&self, client_id: &str) -> Decision {
        let now = Instant::now();

        if let Some(mut state) = self.inner.clients.get_mut(client_id) {
            return Self::decide(&mut state, now);
        }

        let mut state = self
            .inner
            .clients
            .entry(client_id.to_owned())
            .or_insert_with(|| ClientState {
                bucket: TokenBucket::full(self.inner.rate, self.inner.burst, now),
                last_seen: now,
            });
        Self::decide(&mut state, now)
    }

    fn decide(state: &mut ClientState, now: Instant) -> Decision {
        state.last_seen = now;
        if state.bucket.try_acquire(now) {
            Decision::Allowed {
                remaining: state.bucket.available(),
            }
        } else {
            Decision::Denied {
                retry_after: state.bucket.retry_after(),
            }
        }
    }

    /// Drop every client idle for longer than the TTL, returning how many went
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let ttl = self.inner.ttl;
        let mut evicted = 0;

        self.inner.clients.retain(|_, state| {
            let keep = now.saturating_duration_since(state.last_seen) <= ttl;
            if !keep {
                evicted += 1;
            }
            keep
        });

        evicted
    }

    /// Run [`sweep`](Self::sweep) every sweep interval until `shutdown` fires
    pub fn start_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.inner.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::debug!("Rate limiter sweep stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let evicted = limiter.sweep();
                        if evicted > 0 {
                            tracing::debug!(
                                evicted,
                                tracked = limiter.tracked_clients(),
                                "Evicted idle rate limit clients"
                            );
                        }
                    }
                }
            }
        })
    }

    /// Number of clients currently holding a bucket
    pub fn tracked_clients(&self) -> usize {
        self.inner.clients.len()
    }

    pub fn is_tracked(&self, client_id: &str) -> bool {
        self.inner.clients.contains_key(client_id)
    }

    pub fn burst(&self) -> u32 {
        self.inner.burst
    }

    pub fn rate(&self) -> f64 {
        self.inner.rate
    }
}
