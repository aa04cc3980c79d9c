use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::aggregate::SubtaskAggregator;
use crate::catalog::BoardSprintCatalog;
use crate::config::AppConfig;
use crate::export::{ExportFormat, ReportExporter};
use crate::extract::IssueFieldExtractor;
use crate::models::{BoardSprint, FieldNames, IssueRecord};
use crate::pagination::SearchPagination;
use crate::selection::{SelectionInput, SprintSelectionPolicy};
use crate::strategy::SearchStrategyPlanner;
use crate::summary::ExtractionSummary;
use crate::tracker::IssueTracker;

/// 1回の抽出の指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub project_key: String,
    pub format: ExportFormat,
    /// None なら全件（安全上限あり）
    pub limit: Option<usize>,
    /// false なら通常検索（スプリント選択を行わない）
    pub use_sprints: bool,
}

impl ExtractionRequest {
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            format: ExportFormat::Both,
            limit: None,
            use_sprints: true,
        }
    }

    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn use_sprints(mut self, enabled: bool) -> Self {
        self.use_sprints = enabled;
        self
    }
}

/// 抽出の結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// 開始時刻
    pub start_time: DateTime<Utc>,
    /// 終了時刻
    pub end_time: DateTime<Utc>,
    pub project_key: String,
    /// 結果を返した検索戦略
    pub strategy: Option<String>,
    /// 検索対象にしたスプリント
    pub sprint_ids: Vec<u64>,
    /// 重複除去前の取得件数
    pub retrieved_count: usize,
    pub duplicate_count: usize,
    /// 抽出に失敗して除外した件数
    pub dropped_count: usize,
    pub subtask_count: usize,
    pub orphan_count: usize,
    /// 出力したレコード数
    pub final_count: usize,
    pub summary: Option<ExtractionSummary>,
    pub exported_files: Vec<PathBuf>,
    /// エラーメッセージ一覧
    pub error_messages: Vec<String>,
    /// 抽出が成功したかどうか
    pub is_success: bool,
}

impl ExtractionResult {
    pub fn new(project_key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            project_key: project_key.into(),
            strategy: None,
            sprint_ids: Vec::new(),
            retrieved_count: 0,
            duplicate_count: 0,
            dropped_count: 0,
            subtask_count: 0,
            orphan_count: 0,
            final_count: 0,
            summary: None,
            exported_files: Vec::new(),
            error_messages: Vec::new(),
            is_success: false,
        }
    }

    /// 終了を記録
    pub fn finish(&mut self) {
        self.end_time = Utc::now();
        self.is_success = self.error_messages.is_empty() && !self.exported_files.is_empty();
    }

    /// エラーを追加
    pub fn add_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.error_messages.push(message);
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// 接続 → 検索 → 抽出 → 集計 → 出力 を順に実行する
///
/// ボード一覧のキャッシュはこのインスタンスが生きている間だけ有効。
pub struct ExtractionPipeline<'a> {
    tracker: &'a dyn IssueTracker,
    config: AppConfig,
    catalog: BoardSprintCatalog<'a>,
}

impl<'a> ExtractionPipeline<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, config: AppConfig) -> Self {
        let catalog = BoardSprintCatalog::new(tracker, &config.extraction);
        Self {
            tracker,
            config,
            catalog,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &BoardSprintCatalog<'a> {
        &self.catalog
    }

    pub async fn run(
        &mut self,
        request: &ExtractionRequest,
        input: &mut dyn SelectionInput,
    ) -> ExtractionResult {
        let mut result = ExtractionResult::new(&request.project_key);
        info!("Extracting project {}", request.project_key);

        match self.tracker.connect().await {
            Ok(user) => info!("Connected as {}", user.label().unwrap_or("unknown user")),
            Err(e) => {
                result.add_error(format!("Connection failed: {}", e));
                result.finish();
                return result;
            }
        }

        let names = match self.tracker.fields().await {
            Ok(fields) => FieldNames::from_fields(&fields),
            Err(e) => {
                warn!("Field list unavailable, matching custom fields by id only: {}", e);
                FieldNames::new()
            }
        };

        let mut sprint_boards = HashMap::new();
        let sprint_ids = if request.use_sprints {
            let available = self
                .catalog
                .active_and_recent_sprints(&request.project_key)
                .await;
            sprint_boards = board_names(&available);

            let policy = SprintSelectionPolicy::new(self.tracker);
            match policy.select(&available, input).await {
                Ok(selection) => {
                    if !selection.not_found.is_empty() {
                        warn!("Sprints not found: {:?}", selection.not_found);
                    }
                    Some(selection.ids)
                }
                Err(e) => {
                    result.add_error(format!("Sprint selection failed: {}", e));
                    result.finish();
                    return result;
                }
            }
        } else {
            None
        };
        result.sprint_ids = sprint_ids.clone().unwrap_or_default();

        let pagination = SearchPagination::from_config(&self.config.extraction, request.limit);
        let planner = SearchStrategyPlanner::new(self.tracker, pagination);
        let search = planner
            .plan(
                &request.project_key,
                &self.config.extraction,
                sprint_ids.as_deref(),
            )
            .await;
        result.strategy = search.strategy_description().map(str::to_string);
        result.retrieved_count = search.retrieved;
        result.duplicate_count = search.duplicates;
        if search.is_empty() {
            result.add_error(format!("No issues found for project {}", request.project_key));
            result.finish();
            return result;
        }

        let extractor = IssueFieldExtractor::new(names, &self.config.extraction)
            .with_sprint_boards(sprint_boards);
        let batch = extractor.extract_all(&search.issues);
        result.dropped_count = batch.dropped.len();

        let aggregation = SubtaskAggregator::from_config(&self.config.extraction)
            .aggregate(batch.records);
        result.subtask_count = aggregation.subtask_count;
        result.orphan_count = aggregation.orphans.len();
        let records: Vec<IssueRecord> = aggregation.records;
        result.final_count = records.len();

        let summary = ExtractionSummary::from_records(&records);
        summary.log();
        result.summary = Some(summary);

        let exporter = ReportExporter::new(self.config.export.clone());
        let outcome = exporter.export(&records, &request.project_key, request.format);
        for message in &outcome.errors {
            result.add_error(format!("Export failed: {}", message));
        }
        for (format, message) in &outcome.failures {
            result.add_error(format!("{} export failed: {}", format, message));
        }
        result.exported_files = outcome.files;

        result.finish();
        info!(
            "Finished in {:.1}s: {} records, {} files",
            result.duration_seconds(),
            result.final_count,
            result.exported_files.len()
        );
        result
    }
}

/// スプリントID → ボード名（複数ボードの場合は結合済みの名前）
fn board_names(sprints: &[BoardSprint]) -> HashMap<u64, String> {
    sprints
        .iter()
        .map(|sprint| (sprint.id(), sprint.board_name.clone()))
        .collect()
}
