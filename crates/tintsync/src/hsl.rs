//! HSL triple values.
//!
//! Palette slots hold bare HSL triples, the form CSS custom properties are
//! consumed with (`hsl(var(--primary))`):
//!
//! ```text
//! 222.2 47.4% 11.2%
//! 200deg 50% 40%
//! ```
//!
//! Values are tokenized with `cssparser`, so whitespace and comments are
//! handled the way a browser would. Resolution does not call into this module:
//! it is for validating editor input and configuration.

use std::fmt;

use cssparser::{Parser, ParserInput, Token};

use crate::error::ColorValueError;

/// A parsed `<hue> <saturation>% <lightness>%` triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HslTriple {
    /// Hue in degrees.
    pub hue: f32,
    /// Saturation, 0 to 100.
    pub saturation: f32,
    /// Lightness, 0 to 100.
    pub lightness: f32,
}

impl HslTriple {
    pub fn new(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Parses a triple such as `"200 50% 40%"`.
    ///
    /// # Errors
    ///
    /// Returns [`ColorValueError`] when the value is blank, is not three
    /// components, or has a saturation/lightness outside 0..=100.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tintsync::HslTriple;
    ///
    /// let triple = HslTriple::parse("200 50% 40%").unwrap();
    /// assert_eq!(triple.hue, 200.0);
    /// assert_eq!(triple.to_string(), "200 50% 40%");
    /// ```
    pub fn parse(value: &str) -> Result<Self, ColorValueError> {
        if value.trim().is_empty() {
            return Err(ColorValueError::Empty);
        }

        let mut input = ParserInput::new(value);
        let mut parser = Parser::new(&mut input);

        let hue = parse_hue(&mut parser, value)?;
        let saturation = parse_percentage(&mut parser, value, "saturation")?;
        let lightness = parse_percentage(&mut parser, value, "lightness")?;

        if !parser.is_exhausted() {
            return Err(ColorValueError::syntax(
                value,
                "unexpected trailing content after lightness",
            ));
        }

        Ok(Self::new(hue, saturation, lightness))
    }
}

impl fmt::Display for HslTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}% {}%",
            round3(self.hue),
            round3(self.saturation),
            round3(self.lightness)
        )
    }
}

impl std::str::FromStr for HslTriple {
    type Err = ColorValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns `Ok(())` when `value` is a well-formed triple.
pub fn validate_hsl(value: &str) -> Result<(), ColorValueError> {
    HslTriple::parse(value).map(|_| ())
}

fn parse_hue(parser: &mut Parser<'_, '_>, value: &str) -> Result<f32, ColorValueError> {
    let token = match parser.next() {
        Ok(token) => token.clone(),
        Err(_) => return Err(ColorValueError::syntax(value, "missing hue")),
    };

    let hue = match token {
        Token::Number { value: hue, .. } => hue,
        Token::Dimension {
            value: hue, unit, ..
        } if unit.eq_ignore_ascii_case("deg") => hue,
        _ => return Err(ColorValueError::syntax(value, "hue must be a number")),
    };

    if !hue.is_finite() {
        return Err(ColorValueError::syntax(value, "hue must be finite"));
    }
    Ok(hue)
}

fn parse_percentage(
    parser: &mut Parser<'_, '_>,
    value: &str,
    component: &'static str,
) -> Result<f32, ColorValueError> {
    let token = match parser.next() {
        Ok(token) => token.clone(),
        Err(_) => {
            return Err(ColorValueError::syntax(
                value,
                format!("missing {}", component),
            ))
        }
    };

    let percent = match token {
        Token::Percentage { unit_value, .. } => round3(unit_value * 100.0),
        _ => {
            return Err(ColorValueError::syntax(
                value,
                format!("{} must be a percentage", component),
            ))
        }
    };

    if !(0.0..=100.0).contains(&percent) {
        return Err(ColorValueError::OutOfRange {
            value: value.to_string(),
            component,
        });
    }
    Ok(percent)
}

// cssparser stores percentages as unit fractions; undo the float noise.
fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_triple() {
        let triple = HslTriple::parse("222.2 84% 4.9%").unwrap();
        assert_eq!(triple.hue, 222.2);
        assert_eq!(triple.saturation, 84.0);
        assert_eq!(triple.lightness, 4.9);
    }

    #[test]
    fn test_parse_deg_unit_and_extra_whitespace() {
        let triple = HslTriple::parse("  200deg   50%\t40% ").unwrap();
        assert_eq!(triple, HslTriple::new(200.0, 50.0, 40.0));
    }

    #[test]
    fn test_display_is_canonical() {
        let triple = HslTriple::parse("200DEG 50% 40.0%").unwrap();
        assert_eq!(triple.to_string(), "200 50% 40%");
    }

    #[test]
    fn test_rejects_blank() {
        assert_eq!(HslTriple::parse("   "), Err(ColorValueError::Empty));
    }

    #[test]
    fn test_rejects_hex() {
        assert!(matches!(
            HslTriple::parse("#ff0000"),
            Err(ColorValueError::Syntax { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_component() {
        let err = HslTriple::parse("200 50%").unwrap_err();
        assert!(err.to_string().contains("lightness"), "{err}");
    }

    #[test]
    fn test_rejects_trailing_content() {
        assert!(HslTriple::parse("200 50% 40% 10%").is_err());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = HslTriple::parse("200 150% 40%").unwrap_err();
        assert_eq!(
            err,
            ColorValueError::OutOfRange {
                value: "200 150% 40%".into(),
                component: "saturation",
            }
        );
    }

    #[test]
    fn test_rejects_non_percentage_saturation() {
        assert!(HslTriple::parse("200 50 40%").is_err());
    }

    #[test]
    fn test_validate_hsl() {
        assert!(validate_hsl("0 0% 100%").is_ok());
        assert!(validate_hsl("white").is_err());
    }
}
