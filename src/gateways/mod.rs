//! Rate-limited access to the two external dependencies: the crawl
//! origin (page fetches) and the LLM provider (semantic classification).
//!
//! Each gateway owns its own [`rate::RateGate`], so all callers of a
//! gateway share one serialization point while the two dependencies
//! throttle independently of each other.

pub mod classifier;
pub mod page;
pub mod rate;
