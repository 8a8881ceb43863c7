//! Up:down churn ratio
//!
//! A ratio of `up:down` means every churn step clones `up` containers and
//! removes `down` containers. Either side being zero collapses the ratio to
//! the 1:1 default.

use crate::error::ChurnError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of clones (`up`) and removals (`down`) per churn step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ratio {
    pub up: u8,
    pub down: u8,
}

impl Ratio {
    pub const DEFAULT: Ratio = Ratio { up: 1, down: 1 };

    pub const fn new(up: u8, down: u8) -> Self {
        Self { up, down }
    }

    /// Parse an `up:down` string without applying the zero default
    pub fn parse(s: &str) -> Result<Self, ChurnError> {
        let tokens: Vec<&str> = s.split(':').collect();
        if tokens.len() != 2 {
            return Err(ChurnError::Format {
                input: s.to_string(),
                reason: "wrong format, expected up:down".to_string(),
            });
        }

        let parse_side = |token: &str| {
            // u8::from_str takes a leading '+', plain digits only here
            if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ChurnError::Format {
                    input: s.to_string(),
                    reason: format!("{:?} is not an unsigned integer", token),
                });
            }
            token.parse::<u8>().map_err(|e| ChurnError::Format {
                input: s.to_string(),
                reason: format!("{:?} is not an integer in 0..=255: {}", token, e),
            })
        };

        Ok(Self {
            up: parse_side(tokens[0])?,
            down: parse_side(tokens[1])?,
        })
    }

    /// True when either side is zero, i.e. the ratio is unset or unusable
    pub fn is_zero(&self) -> bool {
        self.up == 0 || self.down == 0
    }

    /// Coerce a zero-sided ratio to 1:1
    pub fn resolve(self) -> Self {
        if self.is_zero() {
            Self::DEFAULT
        } else {
            self
        }
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Ratio {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.resolve();
        write!(f, "{}:{}", shown.up, shown.down)
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ratio::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Ratio::parse("2:1").unwrap(), Ratio::new(2, 1));
        assert_eq!(Ratio::parse("255:0").unwrap(), Ratio::new(255, 0));
        assert_eq!(Ratio::parse("0:0").unwrap(), Ratio::new(0, 0));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for input in [
            "", "1", "1:2:3", ":", "1:", ":1", "a:b", "-1:2", "1:256", " 1:2", "1.5:2", "+1:2",
            "1:+2", "+1:+2",
        ] {
            let err = Ratio::parse(input).unwrap_err();
            assert!(
                matches!(err, ChurnError::Format { .. }),
                "expected format error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_resolve_zero_sides() {
        assert_eq!(Ratio::new(0, 0).resolve(), Ratio::DEFAULT);
        assert_eq!(Ratio::new(3, 0).resolve(), Ratio::DEFAULT);
        assert_eq!(Ratio::new(0, 3).resolve(), Ratio::DEFAULT);
        assert_eq!(Ratio::new(2, 5).resolve(), Ratio::new(2, 5));
    }

    #[test]
    fn test_zero_up_string_resolves_to_default() {
        let ratio: Ratio = "0:3".parse().unwrap();
        assert_eq!(ratio.resolve(), Ratio::new(1, 1));
        assert_eq!(ratio.to_string(), "1:1");
    }

    #[test]
    fn test_render() {
        assert_eq!(Ratio::new(2, 1).to_string(), "2:1");
        assert_eq!(Ratio::new(7, 0).to_string(), "1:1");
        assert_eq!(Ratio::default().to_string(), "1:1");
    }

    #[test]
    fn test_serde_string_form() {
        let ratio: Ratio = serde_json::from_str("\"4:2\"").unwrap();
        assert_eq!(ratio, Ratio::new(4, 2));
        assert_eq!(serde_json::to_string(&ratio).unwrap(), "\"4:2\"");
        assert!(serde_json::from_str::<Ratio>("\"4-2\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_parse_accepts_any_u8_pair(up in any::<u8>(), down in any::<u8>()) {
            let parsed = Ratio::parse(&format!("{}:{}", up, down)).unwrap();
            prop_assert_eq!(parsed, Ratio::new(up, down));
        }

        #[test]
        fn prop_parse_rejects_out_of_range(up in 256u32..100_000, down in any::<u8>()) {
            let up_too_big = Ratio::parse(&format!("{}:{}", up, down));
            let down_too_big = Ratio::parse(&format!("{}:{}", down, up));
            prop_assert!(up_too_big.is_err());
            prop_assert!(down_too_big.is_err());
        }

        #[test]
        fn prop_parse_rejects_strings_without_single_colon(s in "[0-9a-z]{0,8}") {
            let parsed = Ratio::parse(&s);
            prop_assert!(parsed.is_err());
        }

        #[test]
        fn prop_parse_rejects_signed_sides(up in any::<u8>(), down in any::<u8>()) {
            let plus_up = Ratio::parse(&format!("+{}:{}", up, down));
            let plus_down = Ratio::parse(&format!("{}:+{}", up, down));
            prop_assert!(plus_up.is_err());
            prop_assert!(plus_down.is_err());
        }

        #[test]
        fn prop_resolve(up in any::<u8>(), down in any::<u8>()) {
            let resolved = Ratio::new(up, down).resolve();
            if up == 0 || down == 0 {
                prop_assert_eq!(resolved, Ratio::DEFAULT);
            } else {
                prop_assert_eq!(resolved, Ratio::new(up, down));
            }
        }
    }
}
