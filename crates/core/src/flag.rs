//! Result flag classification.
//!
//! A numeric lab result is classified against its reference range into one of five flags.
//! Critical bounds are derived multiplicatively from the reference bounds using
//! [`CRITICAL_LOW_FACTOR`] and [`CRITICAL_HIGH_FACTOR`].
//!
//! Parsing operator input is a separate step ([`parse_result_value`]) so that the classifier
//! itself only ever sees finite numbers.

use crate::constants::{CRITICAL_HIGH_FACTOR, CRITICAL_LOW_FACTOR};
use crate::{LimsError, LimsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a lab result relative to its reference range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultFlag {
    Normal,
    Low,
    High,
    CriticalLow,
    CriticalHigh,
}

impl ResultFlag {
    /// All flags, in severity-report order.
    pub const ALL: [ResultFlag; 5] = [
        ResultFlag::Normal,
        ResultFlag::Low,
        ResultFlag::High,
        ResultFlag::CriticalLow,
        ResultFlag::CriticalHigh,
    ];

    /// Critical values require clinician notification before reporting.
    pub fn is_critical(self) -> bool {
        matches!(self, ResultFlag::CriticalLow | ResultFlag::CriticalHigh)
    }

    pub fn is_abnormal(self) -> bool {
        self != ResultFlag::Normal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultFlag::Normal => "NORMAL",
            ResultFlag::Low => "LOW",
            ResultFlag::High => "HIGH",
            ResultFlag::CriticalLow => "CRITICAL_LOW",
            ResultFlag::CriticalHigh => "CRITICAL_HIGH",
        }
    }
}

impl fmt::Display for ResultFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFlag {
    type Err = LimsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ResultFlag::ALL
            .into_iter()
            .find(|flag| flag.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LimsError::InvalidInput(format!("unknown result flag: {wanted}")))
    }
}

/// Classify `value` against `[reference_low, reference_high]`.
///
/// Evaluated in order, first match wins:
/// 1. below `reference_low * 0.7` is `CriticalLow`
/// 2. above `reference_high * 1.3` is `CriticalHigh`
/// 3. below `reference_low` is `Low`
/// 4. above `reference_high` is `High`
/// 5. otherwise `Normal`
///
/// Total over finite inputs. Zero or negative bounds are not rejected and give results that
/// only make sense for positive-valued analytes.
pub fn classify(value: f64, reference_low: f64, reference_high: f64) -> ResultFlag {
    if value < reference_low * CRITICAL_LOW_FACTOR {
        ResultFlag::CriticalLow
    } else if value > reference_high * CRITICAL_HIGH_FACTOR {
        ResultFlag::CriticalHigh
    } else if value < reference_low {
        ResultFlag::Low
    } else if value > reference_high {
        ResultFlag::High
    } else {
        ResultFlag::Normal
    }
}

/// Parse an operator-entered result.
///
/// Returns `None` for blank input, for anything that is not entirely a number, and for
/// non-finite values such as `NaN` or `inf`.
pub fn parse_result_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validated normal range for an analyte.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds", into = "RangeBounds")]
pub struct ReferenceRange {
    low: f64,
    high: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct RangeBounds {
    low: f64,
    high: f64,
}

impl ReferenceRange {
    /// Create a range, requiring finite bounds with `low < high`.
    pub fn new(low: f64, high: f64) -> LimsResult<Self> {
        if !low.is_finite() || !high.is_finite() {
            return Err(LimsError::InvalidInput(
                "reference bounds must be finite numbers".into(),
            ));
        }
        if low >= high {
            return Err(LimsError::InvalidInput(format!(
                "reference low ({low}) must be below reference high ({high})"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// `(critical_low, critical_high)` thresholds for this range.
    pub fn critical_bounds(&self) -> (f64, f64) {
        (
            self.low * CRITICAL_LOW_FACTOR,
            self.high * CRITICAL_HIGH_FACTOR,
        )
    }

    pub fn classify(&self, value: f64) -> ResultFlag {
        classify(value, self.low, self.high)
    }
}

impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.low, self.high)
    }
}

impl TryFrom<RangeBounds> for ReferenceRange {
    type Error = LimsError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        ReferenceRange::new(bounds.low, bounds.high)
    }
}

impl From<ReferenceRange> for RangeBounds {
    fn from(range: ReferenceRange) -> Self {
        RangeBounds {
            low: range.low,
            high: range.high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values_around_reference_low() {
        assert_eq!(classify(100.0, 100.0, 200.0), ResultFlag::Normal);
        assert_eq!(classify(99.9, 100.0, 200.0), ResultFlag::Low);
        assert_eq!(classify(69.9, 100.0, 200.0), ResultFlag::CriticalLow);
        assert_eq!(classify(70.0, 100.0, 200.0), ResultFlag::Low);
    }

    #[test]
    fn boundary_values_around_reference_high() {
        assert_eq!(classify(200.0, 100.0, 200.0), ResultFlag::Normal);
        assert_eq!(classify(200.1, 100.0, 200.0), ResultFlag::High);
        assert_eq!(classify(260.0, 100.0, 200.0), ResultFlag::High);
        assert_eq!(classify(260.1, 100.0, 200.0), ResultFlag::CriticalHigh);
    }

    #[test]
    fn potassium_above_critical_threshold_is_critical_high() {
        // 5.1 * 1.3 = 6.63
        assert_eq!(classify(6.8, 3.5, 5.1), ResultFlag::CriticalHigh);
    }

    #[test]
    fn hemoglobin_below_range_is_low() {
        assert_eq!(classify(11.2, 12.0, 17.0), ResultFlag::Low);
    }

    #[test]
    fn critical_low_wins_when_ranges_overlap() {
        // With a negative low bound, low * 0.7 > low, so a value can satisfy both the
        // critical-low and high branches. The first branch decides.
        assert_eq!(classify(-8.0, -10.0, -9.0), ResultFlag::CriticalLow);
        assert_eq!(classify(0.0, 0.0, 1.0), ResultFlag::Normal);
    }

    fn band(flag: ResultFlag) -> u8 {
        match flag {
            ResultFlag::CriticalLow => 0,
            ResultFlag::Low => 1,
            ResultFlag::Normal => 2,
            ResultFlag::High => 3,
            ResultFlag::CriticalHigh => 4,
        }
    }

    #[test]
    fn flags_follow_ordered_bands_across_value_grid() {
        let ranges = [
            (100.0, 200.0),
            (3.5, 5.1),
            (12.0, 17.0),
            (135.0, 145.0),
            (0.4, 0.9),
        ];

        for (low, high) in ranges {
            let mut previous = 0;
            for step in 0..=400 {
                let value = high * 2.0 * f64::from(step) / 400.0;
                let flag = classify(value, low, high);
                assert_eq!(flag, classify(value, low, high), "stable for {value}");

                assert!(band(flag) >= previous, "{value} in {low}..{high} went back to {flag}");
                previous = band(flag);

                let in_range = value >= low && value <= high;
                assert_eq!(flag == ResultFlag::Normal, in_range, "{value} in {low}..{high}");
                let critical =
                    value < low * CRITICAL_LOW_FACTOR || value > high * CRITICAL_HIGH_FACTOR;
                assert_eq!(flag.is_critical(), critical, "{value} in {low}..{high}");
                if !critical && !in_range {
                    let expected = if value < low { ResultFlag::Low } else { ResultFlag::High };
                    assert_eq!(flag, expected, "{value} in {low}..{high}");
                }
            }
            assert_eq!(previous, band(ResultFlag::CriticalHigh), "grid reaches 2 * high");
        }
    }

    #[test]
    fn flag_predicates() {
        assert!(ResultFlag::CriticalLow.is_critical());
        assert!(ResultFlag::CriticalHigh.is_critical());
        assert!(!ResultFlag::High.is_critical());
        assert!(ResultFlag::Low.is_abnormal());
        assert!(!ResultFlag::Normal.is_abnormal());
    }

    #[test]
    fn flag_names_parse_case_insensitively() {
        assert_eq!("critical_high".parse::<ResultFlag>().expect("parse"), ResultFlag::CriticalHigh);
        assert_eq!(" NORMAL ".parse::<ResultFlag>().expect("parse"), ResultFlag::Normal);
        assert!("BORDERLINE".parse::<ResultFlag>().is_err());
        assert_eq!(
            serde_json::to_string(&ResultFlag::CriticalLow).expect("serialise"),
            "\"CRITICAL_LOW\""
        );
    }

    #[test]
    fn parse_result_value_handles_operator_input() {
        assert_eq!(parse_result_value("7.2"), Some(7.2));
        assert_eq!(parse_result_value("  185 "), Some(185.0));
        assert_eq!(parse_result_value("-0.5"), Some(-0.5));
        assert_eq!(parse_result_value(""), None);
        assert_eq!(parse_result_value("   "), None);
        assert_eq!(parse_result_value("7.2abc"), None);
        assert_eq!(parse_result_value("NaN"), None);
        assert_eq!(parse_result_value("inf"), None);
    }

    #[test]
    fn reference_range_validation() {
        let range = ReferenceRange::new(3.5, 5.1).expect("valid range");
        assert_eq!(range.classify(4.2), ResultFlag::Normal);
        let (critical_low, critical_high) = range.critical_bounds();
        assert!((critical_low - 2.45).abs() < 1e-9);
        assert!((critical_high - 6.63).abs() < 1e-9);

        assert!(ReferenceRange::new(5.0, 5.0).is_err());
        assert!(ReferenceRange::new(6.0, 5.0).is_err());
        assert!(ReferenceRange::new(f64::NAN, 5.0).is_err());
        // Non-positive bounds are accepted as-is.
        assert!(ReferenceRange::new(-2.0, 2.0).is_ok());
    }

    #[test]
    fn reference_range_deserialisation_validates() {
        let range: ReferenceRange =
            serde_json::from_str(r#"{"low": 135, "high": 145}"#).expect("valid");
        assert_eq!(range.low(), 135.0);

        let err = serde_json::from_str::<ReferenceRange>(r#"{"low": 145, "high": 135}"#)
            .expect_err("inverted range");
        assert!(err.to_string().contains("must be below"));
    }
}
