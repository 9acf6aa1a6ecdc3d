pub mod accounts;
pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod platform;
pub mod report;
pub mod scan;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
