//! Data loading utilities

use crate::error::{DiagnosisError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Delimited-file loader
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator; inferred from the extension when unset
    delimiter: Option<u8>,
    /// Rows scanned for schema inference (`None` scans the whole file)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            delimiter: None,
            infer_schema_length: None,
        }
    }

    /// Force a field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Limit the number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Load a delimited file with a header row
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();

        let file = File::open(path).map_err(|e| {
            DiagnosisError::LoadError(format!("cannot open '{}': {}", path.display(), e))
        })?;

        let delimiter = self.delimiter.unwrap_or_else(|| Self::delimiter_for(path));
        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                DiagnosisError::LoadError(format!("cannot parse '{}': {}", path.display(), e))
            })?;

        if df.width() == 0 {
            return Err(DiagnosisError::LoadError(format!(
                "'{}' has no header columns",
                path.display()
            )));
        }
        if df.height() == 0 {
            return Err(DiagnosisError::LoadError(format!(
                "'{}' contains a header but no records",
                path.display()
            )));
        }

        debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );

        Ok(df)
    }

    fn delimiter_for(path: &Path) -> u8 {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv() {
        let tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp.as_file(), "id,diagnosis,radius").unwrap();
        writeln!(tmp.as_file(), "1,M,17.99").unwrap();
        writeln!(tmp.as_file(), "2,B,11.42").unwrap();
        tmp.as_file().flush().unwrap();

        let df = DataLoader::new().load_csv(tmp.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_load_tsv_by_extension() {
        let tmp = tempfile::NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(tmp.as_file(), "id\tdiagnosis\tradius").unwrap();
        writeln!(tmp.as_file(), "1\tM\t17.99").unwrap();
        tmp.as_file().flush().unwrap();

        let df = DataLoader::new().load_csv(tmp.path()).unwrap();
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = DataLoader::new()
            .load_csv("/definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, DiagnosisError::LoadError(_)));
    }

    #[test]
    fn test_header_only_is_load_error() {
        let tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp.as_file(), "id,diagnosis,radius").unwrap();
        tmp.as_file().flush().unwrap();

        let err = DataLoader::new().load_csv(tmp.path()).unwrap_err();
        assert!(matches!(err, DiagnosisError::LoadError(_)));
    }
}
