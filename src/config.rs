use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::{Error, Result};
use crate::models::SubtaskCategory;

/// アプリケーション設定
///
/// JSON の一部だけを書いた設定ファイルも読めるよう、全項目に既定値を持つ。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub export: ExportConfig,
}

/// 抽出処理の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// 件数指定が無いときは全件取得（上限は `max_issues_fallback`）
    pub extract_all_issues: bool,
    /// 暴走防止の取得上限
    pub max_issues_fallback: usize,
    pub page_size: u32,
    /// 同一クエリのページ間で待つ時間（ミリ秒）
    pub page_delay_ms: u64,
    pub board_page_size: u32,
    pub sprint_page_size: u32,
    /// 作成からこの日数以内のスプリントを「最近」とみなす
    pub recent_sprint_days: i64,
    /// 2番目の検索戦略で使う更新日の範囲
    pub recent_issue_days: u32,
    /// ボードごとに取り込む閉じたスプリントの数
    pub closed_sprints_per_board: usize,
    /// 1番目の検索戦略で除外するステータス
    pub terminal_statuses: Vec<String>,
    /// エピックキーを探すカスタムフィールド（優先順）
    pub epic_fields: Vec<String>,
    /// そのまま出力するカスタムフィールド
    pub passthrough_fields: Vec<PassthroughField>,
    /// サブタスク分類のキーワード表（先に一致した分類が優先）
    pub subtask_keywords: Vec<KeywordRule>,
    pub search_fields: Vec<String>,
    pub search_expand: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassthroughField {
    pub column: String,
    pub field_id: String,
}

impl PassthroughField {
    pub fn new(column: impl Into<String>, field_id: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            field_id: field_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: SubtaskCategory,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(category: SubtaskCategory, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl ExtractionConfig {
    pub fn new() -> Self {
        Self {
            extract_all_issues: true,
            max_issues_fallback: 5000,
            page_size: 100,
            page_delay_ms: 100,
            board_page_size: 50,
            sprint_page_size: 50,
            recent_sprint_days: 60,
            recent_issue_days: 90,
            closed_sprints_per_board: 2,
            terminal_statuses: strings(&["Cerrado", "Finalizado", "Done", "Resolved", "Closed"]),
            epic_fields: strings(&["customfield_10014", "customfield_10008"]),
            passthrough_fields: vec![
                PassthroughField::new("generico1", "customfield_14399"),
                PassthroughField::new("generico2", "customfield_14400"),
                PassthroughField::new("generico3", "customfield_14401"),
            ],
            subtask_keywords: vec![
                KeywordRule::new(
                    SubtaskCategory::Analisis,
                    &["analisis", "análisis", "analysis", "diseño", "design"],
                ),
                KeywordRule::new(
                    SubtaskCategory::Testing,
                    &["testing", "test", "qa", "prueba", "pruebas"],
                ),
                KeywordRule::new(
                    SubtaskCategory::Desarrollo,
                    &["desarrollo", "dev", "development", "implementación", "implementation"],
                ),
            ],
            search_fields: strings(&["*all"]),
            search_expand: Vec::new(),
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_delay_ms(mut self, delay_ms: u64) -> Self {
        self.page_delay_ms = delay_ms;
        self
    }

    pub fn max_issues_fallback(mut self, limit: usize) -> Self {
        self.max_issues_fallback = limit;
        self
    }

    pub fn extract_all_issues(mut self, enabled: bool) -> Self {
        self.extract_all_issues = enabled;
        self
    }

    pub fn recent_sprint_days(mut self, days: i64) -> Self {
        self.recent_sprint_days = days;
        self
    }

    pub fn subtask_keywords(mut self, rules: Vec<KeywordRule>) -> Self {
        self.subtask_keywords = rules;
        self
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfiguration(
                "extraction.page_size must be greater than 0".to_string(),
            ));
        }
        if self.board_page_size == 0 || self.sprint_page_size == 0 {
            return Err(Error::InvalidConfiguration(
                "board and sprint page sizes must be greater than 0".to_string(),
            ));
        }
        if self.max_issues_fallback == 0 {
            return Err(Error::InvalidConfiguration(
                "extraction.max_issues_fallback must be greater than 0".to_string(),
            ));
        }
        if !DAY_WINDOW.contains(&self.recent_sprint_days) {
            return Err(Error::InvalidConfiguration(format!(
                "extraction.recent_sprint_days must be between {} and {}",
                DAY_WINDOW.start(),
                DAY_WINDOW.end()
            )));
        }
        if !DAY_WINDOW.contains(&i64::from(self.recent_issue_days)) {
            return Err(Error::InvalidConfiguration(format!(
                "extraction.recent_issue_days must be between {} and {}",
                DAY_WINDOW.start(),
                DAY_WINDOW.end()
            )));
        }
        Ok(())
    }
}

/// 日数で指定する範囲の許容値（10年まで）
const DAY_WINDOW: RangeInclusive<i64> = 1..=3650;

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// ファイル出力の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub reports_dir: PathBuf,
    /// chrono の strftime 形式
    pub timestamp_format: String,
    /// `{project_key}` を置換してシート名にする
    pub sheet_name_template: String,
    pub min_column_width: usize,
    pub max_column_width: usize,
}

impl ExportConfig {
    pub fn new() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
            sheet_name_template: "{project_key}_Data".to_string(),
            min_column_width: 10,
            max_column_width: 50,
        }
    }

    pub fn reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    pub fn sheet_name(&self, project_key: &str) -> String {
        self.sheet_name_template.replace("{project_key}", project_key)
    }

    /// 日時形式に chrono が解釈できない指定子が無いか確認する
    pub fn validate(&self) -> Result<()> {
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidConfiguration(format!(
                "export.timestamp_format is not a valid strftime format: {}",
                self.timestamp_format
            )));
        }
        Ok(())
    }

    pub fn column_width(&self, content_len: usize) -> usize {
        (content_len + 2).clamp(self.min_column_width, self.max_column_width.max(self.min_column_width))
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON形式のファイルベース設定ストア
pub struct FileConfigStore {
    config_dir: PathBuf,
}

impl FileConfigStore {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// デフォルトの設定ディレクトリでファイル設定ストアを作成
    pub fn default_config_dir() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::ConfigurationMissing("config directory not found".to_string()))?
            .join("jira-sprint-report");

        Ok(Self::new(config_dir))
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// 設定ファイルを読む。ファイルが無い・空の場合は None
    pub async fn load_app_config(&self) -> Result<Option<AppConfig>> {
        read_config_file(&self.config_path()).await
    }

    pub async fn save_app_config(&self, config: &AppConfig) -> Result<PathBuf> {
        let path = self.config_path();
        fs::create_dir_all(&self.config_dir).await?;
        let json_data = serde_json::to_string_pretty(config)?;
        fs::write(&path, json_data).await?;
        Ok(path)
    }
}

async fn read_config_file(path: &Path) -> Result<Option<AppConfig>> {
    if !fs::try_exists(path).await? {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).await?;
    if contents.trim().is_empty() {
        return Ok(None);
    }

    let config: AppConfig = serde_json::from_str(&contents).map_err(|e| {
        Error::InvalidConfiguration(format!("{}: {}", path.display(), e))
    })?;
    Ok(Some(config))
}

/// 明示されたパス → 既定の設定ディレクトリ → 組み込みの既定値の順で設定を決める
pub async fn load_app_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let config = match explicit {
        Some(path) => read_config_file(path).await?.ok_or_else(|| {
            Error::ConfigurationMissing(format!("config file not found: {}", path.display()))
        })?,
        None => match FileConfigStore::default_config_dir() {
            Ok(store) => store.load_app_config().await?.unwrap_or_default(),
            Err(_) => AppConfig::default(),
        },
    };

    config.extraction.validate()?;
    config.export.validate()?;
    Ok(config)
}
