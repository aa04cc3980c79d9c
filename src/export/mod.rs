pub mod csv;
pub mod excel;

use chrono::Local;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::models::{IssueRecord, preferred_columns};

/// CLI で指定する出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    #[default]
    Both,
}

impl ExportFormat {
    pub fn targets(&self) -> Vec<FileFormat> {
        match self {
            ExportFormat::Excel => vec![FileFormat::Excel],
            ExportFormat::Csv => vec![FileFormat::Csv],
            ExportFormat::Both => vec![FileFormat::Excel, FileFormat::Csv],
        }
    }
}

/// 実際に書き出すファイルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Excel,
    Csv,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Excel => "xlsx",
            FileFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Excel => write!(f, "Excel"),
            FileFormat::Csv => write!(f, "CSV"),
        }
    }
}

/// 列順を確定させた表
///
/// 既知の列は決められた順に並び、それ以外の列は最初に現れた順で末尾に付く。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn from_records(records: &[IssueRecord]) -> Self {
        let columns: Vec<Vec<(String, String)>> = records.iter().map(IssueRecord::columns).collect();

        let mut present: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (name, _) in columns.iter().flatten() {
            if seen.insert(name.clone()) {
                present.push(name.clone());
            }
        }

        let mut headers: Vec<String> = preferred_columns()
            .filter(|name| seen.contains(*name))
            .map(str::to_string)
            .collect();
        let preferred: HashSet<&str> = preferred_columns().collect();
        headers.extend(
            present
                .into_iter()
                .filter(|name| !preferred.contains(name.as_str())),
        );

        let rows = columns
            .into_iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|header| {
                        record
                            .iter()
                            .find(|(name, _)| name == header)
                            .map(|(_, value)| value.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列ごとの最大文字数（ヘッダー含む）
    pub fn column_lengths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|value| value.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// `<project_lower>_data_<timestamp>.<ext>`
pub fn report_file_name(project_key: &str, timestamp: &str, format: FileFormat) -> String {
    format!(
        "{}_data_{}.{}",
        project_key.to_lowercase(),
        timestamp,
        format.extension()
    )
}

/// 現在時刻を設定の形式で文字列にする。解釈できない指定子はエラー
pub fn format_timestamp(format: &str) -> Result<String> {
    let mut timestamp = String::new();
    write!(timestamp, "{}", Local::now().format(format)).map_err(|_| {
        Error::InvalidConfiguration(format!("invalid timestamp format: {}", format))
    })?;
    Ok(timestamp)
}

/// 出力の結果
#[derive(Debug, Clone, Default)]
pub struct ExportOutcome {
    pub files: Vec<PathBuf>,
    pub failures: Vec<(FileFormat, String)>,
    pub errors: Vec<String>,
}

impl ExportOutcome {
    /// 要求された形式がすべて書き出せたか
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty() && !self.files.is_empty()
    }
}

/// 最終レコードをファイルに書き出す
pub struct ReportExporter {
    config: ExportConfig,
}

impl ReportExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// 形式ごとに独立して書き出す。1つの形式の失敗は他の形式を止めない
    pub fn export(
        &self,
        records: &[IssueRecord],
        project_key: &str,
        format: ExportFormat,
    ) -> ExportOutcome {
        let mut outcome = ExportOutcome::default();

        let table = ReportTable::from_records(records);
        if table.is_empty() {
            error!("No data to export");
            outcome.errors.push("no data to export".to_string());
            return outcome;
        }

        if let Err(e) = std::fs::create_dir_all(&self.config.reports_dir) {
            error!(
                "Cannot create reports directory {}: {}",
                self.config.reports_dir.display(),
                e
            );
            outcome.errors.push(e.to_string());
            return outcome;
        }

        let timestamp = match format_timestamp(&self.config.timestamp_format) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                error!("{}", e);
                outcome.errors.push(e.to_string());
                return outcome;
            }
        };
        for target in format.targets() {
            let path = self
                .config
                .reports_dir
                .join(report_file_name(project_key, &timestamp, target));

            match self.write(&table, &path, project_key, target) {
                Ok(()) => {
                    info!("{} exported: {}", target, path.display());
                    outcome.files.push(path);
                }
                Err(e) => {
                    error!("{} export failed: {}", target, e);
                    outcome.failures.push((target, e.to_string()));
                }
            }
        }

        outcome
    }

    fn write(
        &self,
        table: &ReportTable,
        path: &Path,
        project_key: &str,
        format: FileFormat,
    ) -> Result<()> {
        match format {
            FileFormat::Excel => excel::write_workbook(table, path, project_key, &self.config),
            FileFormat::Csv => csv::write_csv(table, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SubtaskAggregator;
    use crate::config::ExtractionConfig;
    use crate::models::fixtures::record;
    use tempfile::TempDir;

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("ABC", "20240301_101500", FileFormat::Excel),
            "abc_data_20240301_101500.xlsx"
        );
        assert_eq!(
            report_file_name("ABC", "20240301_101500", FileFormat::Csv),
            "abc_data_20240301_101500.csv"
        );
    }

    #[test]
    fn test_table_uses_preferred_order_with_extras_last() {
        // Given: 独自の列を持つレコード
        let mut first = record("ABC-1", "Story", "Login");
        first.metadata.passthrough.push(("cliente".to_string(), "ACME".to_string()));
        let second = record("ABC-2", "Bug", "Crash");
        let outcome = SubtaskAggregator::from_config(&ExtractionConfig::default())
            .aggregate(vec![first, second]);

        // When
        let table = ReportTable::from_records(&outcome.records);

        // Then: 既知の列が先頭、独自の列が末尾、欠けている値は空
        assert_eq!(table.headers[0], "epic_key");
        assert_eq!(table.headers[2], "key");
        assert_eq!(table.headers[18], "analisis_time_spent");
        assert_eq!(table.headers.last().map(String::as_str), Some("cliente"));
        assert_eq!(table.headers.len(), 40);
        assert_eq!(table.rows[0].last().map(String::as_str), Some("ACME"));
        assert_eq!(table.rows[1].last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_export_both_formats() {
        let temp_dir = TempDir::new().unwrap();
        let reports_dir = temp_dir.path().join("reports");
        let exporter = ReportExporter::new(ExportConfig::new().reports_dir(&reports_dir));

        let outcome = exporter.export(
            &[record("ABC-1", "Story", "Login")],
            "ABC",
            ExportFormat::Both,
        );

        assert!(outcome.is_success());
        assert_eq!(outcome.files.len(), 2);
        for file in &outcome.files {
            assert!(file.exists());
            assert!(file.starts_with(&reports_dir));
            let name = file.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("abc_data_"));
        }
    }

    #[test]
    fn test_export_without_records_fails() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = ReportExporter::new(ExportConfig::new().reports_dir(temp_dir.path()));

        let outcome = exporter.export(&[], "ABC", ExportFormat::Csv);

        assert!(!outcome.is_success());
        assert!(outcome.files.is_empty());
    }

    #[test]
    fn test_failure_in_one_format_does_not_block_other() {
        // Given: Excel のシート名に使えない文字を含むテンプレート
        let temp_dir = TempDir::new().unwrap();
        let mut config = ExportConfig::new().reports_dir(temp_dir.path());
        config.sheet_name_template = "[{project_key}]".to_string();
        let exporter = ReportExporter::new(config);

        // When
        let outcome = exporter.export(
            &[record("ABC-1", "Story", "Login")],
            "ABC",
            ExportFormat::Both,
        );

        // Then: CSV は書き出され、全体としては失敗
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, FileFormat::Excel);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_bad_timestamp_format_is_reported_not_panicking() {
        // Given: chrono が解釈できない指定子
        let temp_dir = TempDir::new().unwrap();
        let mut config = ExportConfig::new().reports_dir(temp_dir.path());
        config.timestamp_format = "%Q".to_string();
        let exporter = ReportExporter::new(config);

        // When
        let outcome = exporter.export(
            &[record("ABC-1", "Story", "Login")],
            "ABC",
            ExportFormat::Both,
        );

        // Then: ファイルは作らずエラーとして返る
        assert!(!outcome.is_success());
        assert!(outcome.files.is_empty());
        assert!(outcome.errors[0].contains("%Q"));
        assert!(format_timestamp("%Y%m%d").is_ok());
    }
}
