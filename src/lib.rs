pub mod browser;
pub mod cli;
pub mod config;
pub mod driver;
pub mod logger;
pub mod page;
pub mod resolver;
pub mod sheet;

pub use driver::{MergeDriver, MergeError, MergeOutcome, RunReport};
pub use resolver::{DedupeOptions, DedupeStats};
