//! Turnstile - Per-Key Admission Control
//!
//! This crate implements fixed-window admission control for inbound
//! requests: each key (a client IP, API token, or user id) gets a bounded
//! quota per time window and a timed lockout once the quota is exceeded.
//! Decisions are composed against a pluggable storage backend, so the same
//! limiter runs against an in-process map in tests and single-instance
//! deployments, and against a shared Redis server when several instances
//! must agree.

pub mod config;
pub mod error;
pub mod limiter;
pub mod store;

pub use config::LimiterConfig;
pub use error::{Result, TurnstileError};
pub use limiter::RateLimiter;
pub use store::{MemoryStore, RedisStore, StateStore};
