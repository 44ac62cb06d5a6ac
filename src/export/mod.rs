pub mod csv;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::ExportError;

/// Writes timestamped JSON/CSV files into one output directory.
///
/// All files written by one exporter share the same timestamp, so the JSON
/// and CSV of one run pair up.
pub struct Exporter {
    dir: PathBuf,
    stamp: String,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    /// `<dir>/<name>_<stamp>.<ext>`
    pub fn path_for(&self, name: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.{}", sanitize(name), self.stamp, ext))
    }

    pub fn export_to_json<T: Serialize + ?Sized>(
        &self,
        data: &T,
        name: &str,
    ) -> Result<PathBuf, ExportError> {
        let path = self.path_for(name, "json");
        let body = serde_json::to_string_pretty(data)?;
        self.write(&path, body)?;
        Ok(path)
    }

    /// Fails on empty input or records that are not objects with one shared key set.
    pub fn export_to_csv<T: Serialize>(
        &self,
        records: &[T],
        name: &str,
    ) -> Result<PathBuf, ExportError> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        let body = csv::to_csv_string(&values, name)?;
        let path = self.path_for(name, "csv");
        self.write(&path, body)?;
        Ok(path)
    }

    fn write(&self, path: &Path, body: String) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(path, body)?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Keep file names to `[A-Za-z0-9_-]`, collapsing everything else to `_`.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() {
        "export".into()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Row {
        url: String,
        domains: Vec<String>,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                url: "https://a.example/".into(),
                domains: vec!["x.example".into(), "y.example".into()],
            },
            Row {
                url: "https://b.example/".into(),
                domains: vec![],
            },
        ]
    }

    #[test]
    fn sanitize_names() {
        assert_eq!(sanitize("backlinks example.com"), "backlinks_example_com");
        assert_eq!(sanitize("https://a.example/x"), "https_a_example_x");
        assert_eq!(sanitize("///"), "export");
    }

    #[test]
    fn json_and_csv_share_stamp_and_create_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/out");
        let exporter = Exporter::new(&out);

        let json_path = exporter.export_to_json(&rows(), "backlinks").unwrap();
        let csv_path = exporter.export_to_csv(&rows(), "backlinks").unwrap();

        assert_eq!(json_path.parent().unwrap(), out.as_path());
        assert_eq!(json_path.file_stem(), csv_path.file_stem());
        assert!(json_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("backlinks_"));

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed[0]["domains"][1], "y.example");

        let csv = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(
            csv,
            "url,domains\nhttps://a.example/,x.example; y.example\nhttps://b.example/,\n"
        );
    }

    #[test]
    fn empty_csv_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        let exporter = Exporter::new(&out);
        let err = exporter.export_to_csv::<Row>(&[], "empty").unwrap_err();
        assert!(matches!(err, ExportError::Empty(_)));
        assert!(!out.exists());
    }
}
