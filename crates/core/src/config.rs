//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services. Request
//! handlers never read environment variables.

use crate::constants::DEFAULT_SITE_CODE;
use crate::validation::{parse_bool_flag, validate_site_code};
use crate::LimsResult;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    site_code: String,
    seed_demo: bool,
}

impl CoreConfig {
    /// Create a new `CoreConfig`, validating the site code.
    pub fn new(site_code: impl Into<String>, seed_demo: bool) -> LimsResult<Self> {
        let site_code = site_code.into().trim().to_string();
        validate_site_code(&site_code)?;

        Ok(Self {
            site_code,
            seed_demo,
        })
    }

    /// Build a config from raw environment-style values.
    ///
    /// Callers read `LIMS_SITE_CODE` and `LIMS_SEED_DEMO` themselves and pass the values in,
    /// which keeps this function free of process-wide state.
    pub fn from_values(site_code: Option<String>, seed_demo: Option<String>) -> LimsResult<Self> {
        let site_code = site_code
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SITE_CODE.to_string());
        let seed_demo = parse_bool_flag(seed_demo.as_deref(), false)?;

        Self::new(site_code, seed_demo)
    }

    pub fn site_code(&self) -> &str {
        &self.site_code
    }

    /// Whether the demo fixtures should be loaded into the store at startup.
    pub fn seed_demo(&self) -> bool {
        self.seed_demo
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            site_code: DEFAULT_SITE_CODE.to_string(),
            seed_demo: false,
        }
    }
}
