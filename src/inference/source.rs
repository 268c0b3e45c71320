//! Feature sources: where a single prediction's inputs come from

use crate::error::{DiagnosisError, Result};
use dialoguer::{theme::ColorfulTheme, Input};
use std::io::{BufRead, Write};
use tracing::warn;

/// Attempts allowed per feature before input is rejected
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Supplies one value per feature, in the order given
pub trait FeatureSource {
    fn read_features(&mut self, feature_names: &[String]) -> Result<Vec<f64>>;
}

/// Parse a user-entered value; only finite numbers are accepted
pub fn parse_feature_value(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn check_len(values: &[f64], feature_names: &[String]) -> Result<()> {
    if values.len() != feature_names.len() {
        return Err(DiagnosisError::ShapeError {
            expected: format!("{} features", feature_names.len()),
            actual: format!("{} values", values.len()),
        });
    }
    Ok(())
}

/// Reject NaN and infinite values, naming the first offending feature
pub fn check_finite(values: &[f64], feature_names: &[String]) -> Result<()> {
    match feature_names.iter().zip(values).find(|(_, v)| !v.is_finite()) {
        Some((name, value)) => Err(DiagnosisError::ParseError {
            feature: name.clone(),
            input: value.to_string(),
        }),
        None => Ok(()),
    }
}

impl FeatureSource for Vec<f64> {
    fn read_features(&mut self, feature_names: &[String]) -> Result<Vec<f64>> {
        check_len(self, feature_names)?;
        check_finite(self, feature_names)?;
        Ok(self.clone())
    }
}

impl FeatureSource for &[f64] {
    fn read_features(&mut self, feature_names: &[String]) -> Result<Vec<f64>> {
        check_len(self, feature_names)?;
        check_finite(self, feature_names)?;
        Ok(self.to_vec())
    }
}

/// Line-based prompts over any reader and writer.
///
/// Writes `"{feature}: "` and reads one line per attempt.
pub struct PromptFeatureSource<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    max_attempts: usize,
}

impl<R: BufRead, W: Write> PromptFeatureSource<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Builder method to set the attempts allowed per feature
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn read_one(&mut self, feature: &str) -> Result<f64> {
        let mut last = String::new();
        for attempt in 1..=self.max_attempts {
            write!(self.writer, "{}: ", feature)?;
            self.writer.flush()?;

            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(DiagnosisError::InputError(format!(
                    "input ended before a value for '{}' was given",
                    feature
                )));
            }
            if let Some(value) = parse_feature_value(&line) {
                return Ok(value);
            }

            last = line.trim().to_string();
            warn!(feature, input = %last, attempt, "Rejected feature value");
            if attempt < self.max_attempts {
                writeln!(self.writer, "Invalid input, please enter a number.")?;
            }
        }
        Err(DiagnosisError::ParseError {
            feature: feature.to_string(),
            input: last,
        })
    }
}

impl<R: BufRead, W: Write> FeatureSource for PromptFeatureSource<R, W> {
    fn read_features(&mut self, feature_names: &[String]) -> Result<Vec<f64>> {
        feature_names
            .iter()
            .map(|name| self.read_one(name))
            .collect()
    }
}

/// Interactive terminal prompts
pub struct TerminalFeatureSource {
    theme: ColorfulTheme,
    max_attempts: usize,
}

impl TerminalFeatureSource {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn read_one(&self, feature: &str) -> Result<f64> {
        let mut last = String::new();
        for attempt in 1..=self.max_attempts {
            let input: String = Input::with_theme(&self.theme)
                .with_prompt(feature)
                .allow_empty(true)
                .interact_text()?;
            if let Some(value) = parse_feature_value(&input) {
                return Ok(value);
            }
            last = input.trim().to_string();
            warn!(feature, input = %last, attempt, "Rejected feature value");
        }
        Err(DiagnosisError::ParseError {
            feature: feature.to_string(),
            input: last,
        })
    }
}

impl Default for TerminalFeatureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureSource for TerminalFeatureSource {
    fn read_features(&mut self, feature_names: &[String]) -> Result<Vec<f64>> {
        feature_names
            .iter()
            .map(|name| self.read_one(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_feature_value() {
        assert_eq!(parse_feature_value(" 12.5\n"), Some(12.5));
        assert_eq!(parse_feature_value("-3e2"), Some(-300.0));
        assert_eq!(parse_feature_value("abc"), None);
        assert_eq!(parse_feature_value("NaN"), None);
        assert_eq!(parse_feature_value("inf"), None);
        assert_eq!(parse_feature_value(""), None);
    }

    #[test]
    fn test_prompt_source_reads_in_order() {
        let input = Cursor::new("1.5\n2\n");
        let mut source = PromptFeatureSource::new(input, Vec::new());
        let values = source.read_features(&names(&["radius", "texture"])).unwrap();
        assert_eq!(values, vec![1.5, 2.0]);

        let (_, out) = source.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "radius: texture: ");
    }

    #[test]
    fn test_prompt_source_retries_then_accepts() {
        let input = Cursor::new("oops\n4.0\n");
        let mut source = PromptFeatureSource::new(input, Vec::new());
        assert_eq!(source.read_features(&names(&["area"])).unwrap(), vec![4.0]);

        let (_, out) = source.into_inner();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("area: ").count(), 2);
        assert!(out.contains("Invalid input"));
    }

    #[test]
    fn test_prompt_source_exhausts_attempts() {
        let input = Cursor::new("a\nb\nc\n5\n");
        let mut source = PromptFeatureSource::new(input, Vec::new());
        match source.read_features(&names(&["area"])) {
            Err(DiagnosisError::ParseError { feature, input }) => {
                assert_eq!(feature, "area");
                assert_eq!(input, "c");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_prompt_source_single_attempt() {
        let input = Cursor::new("x\n1\n");
        let mut source = PromptFeatureSource::new(input, Vec::new()).with_max_attempts(1);
        assert!(matches!(
            source.read_features(&names(&["area"])),
            Err(DiagnosisError::ParseError { .. })
        ));
    }

    #[test]
    fn test_prompt_source_eof() {
        let input = Cursor::new("1\n");
        let mut source = PromptFeatureSource::new(input, Vec::new());
        assert!(matches!(
            source.read_features(&names(&["a", "b"])),
            Err(DiagnosisError::InputError(_))
        ));
    }

    #[test]
    fn test_vector_source_length_check() {
        let mut source = vec![1.0, 2.0];
        assert!(source.read_features(&names(&["a", "b"])).is_ok());
        assert!(matches!(
            source.read_features(&names(&["a"])),
            Err(DiagnosisError::ShapeError { .. })
        ));

        let values = [3.0];
        let mut slice: &[f64] = &values;
        assert_eq!(slice.read_features(&names(&["a"])).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_vector_source_rejects_non_finite() {
        let mut source = vec![1.0, f64::NAN];
        match source.read_features(&names(&["a", "b"])) {
            Err(DiagnosisError::ParseError { feature, input }) => {
                assert_eq!(feature, "b");
                assert_eq!(input, "NaN");
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        let values = [f64::NEG_INFINITY];
        let mut slice: &[f64] = &values;
        assert!(matches!(
            slice.read_features(&names(&["a"])),
            Err(DiagnosisError::ParseError { .. })
        ));
    }
}
