//! Input validation utilities.
//!
//! Functions here check configuration and operator inputs before they reach the domain
//! types.

use crate::constants::{MAX_SITE_CODE_LEN, MAX_SITE_SEGMENT_LEN};
use crate::{LimsError, LimsResult};

/// Validates a laboratory site code such as `lims.dev.1` or `dh.colombo.central-lab`.
///
/// A site code is a dot-separated path from organisation to bench. Each segment is 1 to 32
/// characters of lowercase ASCII letters, digits and inner hyphens. The whole code is at most
/// 64 characters.
///
/// # Errors
///
/// Returns `LimsError::InvalidInput` naming the offending segment.
pub fn validate_site_code(site_code: &str) -> LimsResult<()> {
    if site_code.len() > MAX_SITE_CODE_LEN {
        return Err(LimsError::InvalidInput(format!(
            "site code is longer than {MAX_SITE_CODE_LEN} characters"
        )));
    }

    for (index, segment) in site_code.split('.').enumerate() {
        validate_site_segment(segment).map_err(|rule| {
            LimsError::InvalidInput(format!("site code segment {}: {rule}", index + 1))
        })?;
    }
    Ok(())
}

fn validate_site_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("is empty".into());
    }
    if segment.len() > MAX_SITE_SEGMENT_LEN {
        return Err(format!("'{segment}' is longer than {MAX_SITE_SEGMENT_LEN} characters"));
    }
    if segment.starts_with('-') || segment.ends_with('-') {
        return Err(format!("'{segment}' starts or ends with a hyphen"));
    }
    match segment
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        Some(c) => Err(format!("'{segment}' contains '{c}'")),
        None => Ok(()),
    }
}

/// Parse an on/off flag from an environment-style value.
///
/// `None` and blank values yield `default`. Accepts `true/false`, `1/0`, `yes/no` and
/// `on/off`, case-insensitively.
pub fn parse_bool_flag(value: Option<&str>, default: bool) -> LimsResult<bool> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };

    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(LimsError::InvalidInput(format!(
            "expected a boolean flag, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_site_code_accepts_dotted_lowercase() {
        assert!(validate_site_code("lims.dev.1").is_ok());
        assert!(validate_site_code("dh.colombo.central-lab").is_ok());
        assert!(validate_site_code("a").is_ok());
    }

    #[test]
    fn test_validate_site_code_rejects_empty_segments() {
        for bad in ["", "lims..dev", ".lims", "lims."] {
            let err = validate_site_code(bad).expect_err("empty segment");
            assert!(
                matches!(err, LimsError::InvalidInput(ref msg) if msg.contains("is empty")),
                "{bad}: {err:?}"
            );
        }
    }

    #[test]
    fn test_validate_site_code_names_failing_segment() {
        let err = validate_site_code("dh.Central").expect_err("uppercase");
        assert!(matches!(
            err,
            LimsError::InvalidInput(msg) if msg == "site code segment 2: 'Central' contains 'C'"
        ));

        let err = validate_site_code("dh.-lab").expect_err("leading hyphen");
        assert!(matches!(err, LimsError::InvalidInput(msg) if msg.contains("hyphen")));

        for bad in ["bad site", "bad/site", "lab_1", "labü"] {
            assert!(validate_site_code(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_validate_site_code_length_limits() {
        let segment = "a".repeat(33);
        let err = validate_site_code(&format!("dh.{segment}")).expect_err("long segment");
        assert!(
            matches!(err, LimsError::InvalidInput(msg) if msg.starts_with("site code segment 2"))
        );

        let long = vec!["abcdefgh"; 8].join(".");
        assert_eq!(long.len(), 71);
        let err = validate_site_code(&long).expect_err("long code");
        assert!(matches!(err, LimsError::InvalidInput(msg) if msg.contains("longer than 64")));
    }

    #[test]
    fn test_parse_bool_flag() {
        assert!(!parse_bool_flag(None, false).expect("default"));
        assert!(parse_bool_flag(Some(""), true).expect("blank uses default"));
        assert!(parse_bool_flag(Some("TRUE"), false).expect("true"));
        assert!(parse_bool_flag(Some(" yes "), false).expect("yes"));
        assert!(!parse_bool_flag(Some("0"), true).expect("zero"));
        assert!(parse_bool_flag(Some("maybe"), false).is_err());
    }
}
