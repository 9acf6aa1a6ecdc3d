//! Ambient facts about where the scan ran, recorded alongside each snapshot.

use crate::error::{Error, Result};

pub const DEFAULT_CHECK_IP_URL: &str = "http://checkip.amazonaws.com";

pub trait Environment {
    /// Outbound IP address the probes were sent from.
    fn external_ip(&self) -> Result<String>;
}

/// Asks a "what is my IP" service that answers with the address as plain text.
pub struct CheckIp {
    url: String,
}

impl CheckIp {
    pub fn new(url: impl Into<String>) -> Self {
        CheckIp { url: url.into() }
    }
}

impl Default for CheckIp {
    fn default() -> Self {
        Self::new(DEFAULT_CHECK_IP_URL)
    }
}

impl Environment for CheckIp {
    fn external_ip(&self) -> Result<String> {
        let body = ureq::get(&self.url)
            .call()
            .map_err(|e| Error::http(&self.url, e))?
            .into_string()
            .map_err(|e| Error::io("read ip lookup", &self.url, e))?;
        Ok(body.trim_end().to_string())
    }
}

/// Fixed answer, for tests and offline runs.
pub struct StaticEnvironment(pub String);

impl Environment for StaticEnvironment {
    fn external_ip(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
