//! Constants used throughout the LIMS core crate.
//!
//! Critical thresholds are a laboratory convention applied to every analyte. They assume
//! positive reference bounds.

/// A result below `reference_low * CRITICAL_LOW_FACTOR` is critically low.
pub const CRITICAL_LOW_FACTOR: f64 = 0.7;

/// A result above `reference_high * CRITICAL_HIGH_FACTOR` is critically high.
pub const CRITICAL_HIGH_FACTOR: f64 = 1.3;

/// Default site code when none is configured.
pub const DEFAULT_SITE_CODE: &str = "lims.dev.1";

/// Default bind address for the REST service.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Maximum length of a whole site code, dots included.
pub const MAX_SITE_CODE_LEN: usize = 64;

/// Maximum length of one dot-separated site code segment.
pub const MAX_SITE_SEGMENT_LEN: usize = 32;

/// Events held by the in-memory audit trail before the oldest are dropped.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Worklist rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Largest page a worklist query may ask for.
pub const MAX_PAGE_SIZE: usize = 100;
