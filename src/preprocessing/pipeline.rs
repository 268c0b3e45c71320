//! Raw table to standardized train/test matrices

use super::{
    config::PreprocessingConfig,
    encoder::LabelEncoder,
    scaler::StandardScaler,
    split::{StratifiedSplit, TrainTestSplit},
};
use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Output of a fitted preprocessor. Carries every fitted transform so the
/// same mapping can be applied to later inputs.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Feature names in training order
    pub feature_names: Vec<String>,
    pub encoder: LabelEncoder,
    pub scaler: StandardScaler,
    pub split: TrainTestSplit,
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

impl PreparedData {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Drops the identifier, encodes the target, splits and standardizes
#[derive(Debug, Clone, Default)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
}

impl DataPreprocessor {
    /// Create a new preprocessor with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Run the full preprocessing chain on a raw table
    pub fn fit_transform(&self, df: &DataFrame) -> Result<PreparedData> {
        self.config.validate()?;
        let start = Instant::now();

        let feature_names = self.feature_columns(df)?;
        let x = Self::feature_matrix(df, &feature_names)?;
        let labels = self.target_labels(df)?;

        let mut encoder = LabelEncoder::new();
        if let Some(positive) = &self.config.positive_label {
            encoder = encoder.with_positive_label(positive.clone());
        }
        let y = encoder.fit_transform(&labels)?;
        debug!(classes = ?encoder.classes(), "Encoded target");

        let split =
            StratifiedSplit::new(self.config.test_size, self.config.random_seed).split(&y)?;
        let (x_train_raw, x_test_raw, y_train, y_test) = split.apply(&x, &y);

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&x_train_raw)?;
        let x_test = scaler.transform(&x_test_raw)?;

        info!(
            rows = df.height(),
            features = feature_names.len(),
            train = split.n_train(),
            test = split.n_test(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessed dataset"
        );

        Ok(PreparedData {
            feature_names,
            encoder,
            scaler,
            split,
            x_train,
            x_test,
            y_train,
            y_test,
        })
    }

    /// Resolve the ordered feature list and check every referenced column
    pub fn feature_columns(&self, df: &DataFrame) -> Result<Vec<String>> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        let has = |name: &str| columns.iter().any(|c| c == name);

        if let Some(id) = &self.config.id_column {
            if !has(id) {
                return Err(DiagnosisError::SchemaError(format!(
                    "identifier column '{}' not found",
                    id
                )));
            }
        }
        if !has(&self.config.target_column) {
            return Err(DiagnosisError::SchemaError(format!(
                "target column '{}' not found",
                self.config.target_column
            )));
        }

        let is_reserved = |name: &str| {
            name == self.config.target_column || self.config.id_column.as_deref() == Some(name)
        };

        let features = match &self.config.feature_columns {
            Some(explicit) => {
                for name in explicit {
                    if !has(name) {
                        return Err(DiagnosisError::SchemaError(format!(
                            "feature column '{}' not found",
                            name
                        )));
                    }
                    if is_reserved(name) {
                        return Err(DiagnosisError::SchemaError(format!(
                            "'{}' cannot be both a feature and the identifier or target",
                            name
                        )));
                    }
                }
                explicit.clone()
            }
            None => columns.into_iter().filter(|c| !is_reserved(c)).collect(),
        };

        if features.is_empty() {
            return Err(DiagnosisError::SchemaError(
                "no feature columns remain after dropping identifier and target".to_string(),
            ));
        }
        Ok(features)
    }

    /// Build an `n x F` matrix from numeric columns, in the given order
    pub fn feature_matrix(df: &DataFrame, feature_names: &[String]) -> Result<Array2<f64>> {
        let n = df.height();
        let mut x = Array2::<f64>::zeros((n, feature_names.len()));

        for (j, name) in feature_names.iter().enumerate() {
            let series = df.column(name)?.as_materialized_series();

            if !is_numeric(series.dtype()) {
                return Err(DiagnosisError::SchemaError(format!(
                    "feature column '{}' is not numeric ({})",
                    name,
                    series.dtype()
                )));
            }
            if series.null_count() > 0 {
                return Err(DiagnosisError::SchemaError(format!(
                    "feature column '{}' has {} missing value(s)",
                    name,
                    series.null_count()
                )));
            }

            let values = series.cast(&DataType::Float64)?;
            for (i, v) in values.f64()?.into_no_null_iter().enumerate() {
                x[[i, j]] = v;
            }
        }

        Ok(x)
    }

    /// Target column as strings; numeric codes are stringified
    pub fn target_labels(&self, df: &DataFrame) -> Result<Vec<String>> {
        let series = df
            .column(&self.config.target_column)?
            .as_materialized_series();

        if series.null_count() > 0 {
            return Err(DiagnosisError::SchemaError(format!(
                "target column '{}' has {} missing value(s)",
                self.config.target_column,
                series.null_count()
            )));
        }

        let as_str = series.cast(&DataType::String)?;
        Ok(as_str
            .str()?
            .into_no_null_iter()
            .map(|s| s.trim().to_string())
            .collect())
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "id" => &[1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            "diagnosis" => &["M", "B", "B", "M", "B", "B", "M", "B", "M", "B"],
            "radius" => &[17.9, 11.4, 12.1, 20.3, 10.9, 13.0, 19.7, 11.8, 18.2, 12.6],
            "texture" => &[10.4, 18.2, 17.9, 14.3, 19.0, 16.5, 21.0, 20.1, 15.5, 17.0]
        )
        .unwrap()
    }

    #[test]
    fn test_drops_id_and_target() {
        let prepared = DataPreprocessor::new().fit_transform(&sample_df()).unwrap();
        assert_eq!(prepared.feature_names, vec!["radius", "texture"]);
        assert_eq!(prepared.x_train.ncols(), 2);
        assert_eq!(prepared.x_train.nrows() + prepared.x_test.nrows(), 10);
    }

    #[test]
    fn test_malignant_encoded_as_one() {
        let prepared = DataPreprocessor::new().fit_transform(&sample_df()).unwrap();
        assert_eq!(prepared.encoder.encode("M"), Some(1));
        assert_eq!(prepared.encoder.encode("B"), Some(0));
    }

    #[test]
    fn test_missing_id_column() {
        let df = sample_df().drop("id").unwrap();
        let err = DataPreprocessor::new().fit_transform(&df).unwrap_err();
        assert!(matches!(err, DiagnosisError::SchemaError(_)));
    }

    #[test]
    fn test_without_id_column() {
        let df = sample_df().drop("id").unwrap();
        let config = PreprocessingConfig::new().with_id_column(None);
        let prepared = DataPreprocessor::with_config(config).fit_transform(&df).unwrap();
        assert_eq!(prepared.n_features(), 2);
    }

    #[test]
    fn test_non_numeric_feature() {
        let mut df = sample_df();
        df.with_column(Series::new(
            "site".into(),
            &["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"],
        ))
        .unwrap();

        let err = DataPreprocessor::new().fit_transform(&df).unwrap_err();
        assert!(matches!(err, DiagnosisError::SchemaError(_)));
    }

    #[test]
    fn test_missing_feature_values() {
        let mut df = sample_df();
        df.with_column(Series::new(
            "area".into(),
            &[Some(1.0), None, Some(2.0), Some(3.0), Some(1.5), Some(2.2), Some(0.9), Some(1.1), Some(2.8), Some(1.7)],
        ))
        .unwrap();

        let err = DataPreprocessor::new().fit_transform(&df).unwrap_err();
        assert!(matches!(err, DiagnosisError::SchemaError(_)));
    }

    #[test]
    fn test_explicit_feature_order() {
        let config =
            PreprocessingConfig::new().with_feature_columns(vec!["texture".into(), "radius".into()]);
        let preprocessor = DataPreprocessor::with_config(config);
        let df = sample_df();

        let names = preprocessor.feature_columns(&df).unwrap();
        assert_eq!(names, vec!["texture", "radius"]);

        let x = DataPreprocessor::feature_matrix(&df, &names).unwrap();
        assert_eq!(x[[0, 0]], 10.4);
        assert_eq!(x[[0, 1]], 17.9);
    }

    #[test]
    fn test_single_class_target() {
        let df = df!(
            "id" => &[1i64, 2, 3, 4],
            "diagnosis" => &["B", "B", "B", "B"],
            "radius" => &[1.0, 2.0, 3.0, 4.0]
        )
        .unwrap();
        let err = DataPreprocessor::new().fit_transform(&df).unwrap_err();
        assert!(matches!(err, DiagnosisError::SchemaError(_)));
    }
}
