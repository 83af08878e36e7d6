#![doc = include_str!("../README.md")]

mod error;
mod job;
mod queue;
mod rate_limiter;
mod stopwatch;
mod translator;

pub use error::*;
pub use job::*;
pub use queue::*;
pub use rate_limiter::*;
pub use stopwatch::*;
pub use translator::*;
