use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ExtractionConfig;
use crate::models::Issue;
use crate::pagination::{SearchPagination, dedup_by_key, paginated_search};
use crate::tracker::IssueTracker;

/// 検索戦略の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Active,
    Recent,
    All,
    Sprints,
}

/// 1つの検索戦略（説明とJQL）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub kind: StrategyKind,
    pub description: String,
    pub jql: String,
}

impl SearchStrategy {
    /// 完了系ステータス以外を更新の新しい順に
    pub fn active(project_key: &str, terminal_statuses: &[String]) -> Self {
        let jql = if terminal_statuses.is_empty() {
            format!("project = {} ORDER BY updated DESC", project_key)
        } else {
            let statuses: Vec<String> = terminal_statuses.iter().map(|s| jql_value(s)).collect();
            format!(
                "project = {} AND status NOT IN ({}) ORDER BY updated DESC",
                project_key,
                statuses.join(", ")
            )
        };
        Self {
            kind: StrategyKind::Active,
            description: "active issues".to_string(),
            jql,
        }
    }

    /// 直近N日に更新されたもの
    pub fn recent(project_key: &str, days: u32) -> Self {
        Self {
            kind: StrategyKind::Recent,
            description: format!("issues updated in the last {} days", days),
            jql: format!(
                "project = {} AND updated >= -{}d ORDER BY updated DESC",
                project_key, days
            ),
        }
    }

    pub fn all(project_key: &str) -> Self {
        Self {
            kind: StrategyKind::All,
            description: "all issues".to_string(),
            jql: format!("project = {} ORDER BY created DESC", project_key),
        }
    }

    /// 選択されたスプリントを OR で結合した1本のクエリ
    pub fn sprints(project_key: &str, sprint_ids: &[u64]) -> Self {
        let clauses: Vec<String> = sprint_ids
            .iter()
            .map(|id| format!("sprint = {}", id))
            .collect();
        let ids: Vec<String> = sprint_ids.iter().map(u64::to_string).collect();
        Self {
            kind: StrategyKind::Sprints,
            description: format!("sprints {}", ids.join(", ")),
            jql: format!(
                "project = {} AND ({}) ORDER BY updated DESC",
                project_key,
                clauses.join(" OR ")
            ),
        }
    }

    /// 通常検索の順序: アクティブ → 最近 → 全件
    pub fn ladder(project_key: &str, config: &ExtractionConfig) -> Vec<SearchStrategy> {
        vec![
            Self::active(project_key, &config.terminal_statuses),
            Self::recent(project_key, config.recent_issue_days),
            Self::all(project_key),
        ]
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.description, self.jql)
    }
}

/// 英数字だけの値はそのまま、それ以外は引用符で囲む
fn jql_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_alphanumeric() || c == '_') {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// 検索の結果
#[derive(Debug, Clone, Default)]
pub struct PlannedSearch {
    /// 結果を返した戦略。どれも返さなければ None
    pub strategy: Option<SearchStrategy>,
    /// 重複除去後のIssue
    pub issues: Vec<Issue>,
    /// 重複除去前の件数
    pub retrieved: usize,
    pub duplicates: usize,
}

impl PlannedSearch {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn strategy_description(&self) -> Option<&str> {
        self.strategy.as_ref().map(|s| s.description.as_str())
    }
}

/// 検索戦略を順に試す
pub struct SearchStrategyPlanner<'a> {
    tracker: &'a dyn IssueTracker,
    pagination: SearchPagination,
}

impl<'a> SearchStrategyPlanner<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, pagination: SearchPagination) -> Self {
        Self {
            tracker,
            pagination,
        }
    }

    pub fn pagination(&self) -> &SearchPagination {
        &self.pagination
    }

    /// スプリントIDがあればスプリント検索、無ければ通常検索の順序で試す
    pub async fn plan(
        &self,
        project_key: &str,
        config: &ExtractionConfig,
        sprint_ids: Option<&[u64]>,
    ) -> PlannedSearch {
        match sprint_ids {
            Some(ids) if !ids.is_empty() => {
                self.run_single(SearchStrategy::sprints(project_key, ids))
                    .await
            }
            Some(_) => {
                warn!("No sprints selected, falling back to traditional search");
                self.run_ladder(&SearchStrategy::ladder(project_key, config))
                    .await
            }
            None => {
                self.run_ladder(&SearchStrategy::ladder(project_key, config))
                    .await
            }
        }
    }

    /// 結果が1件以上返った最初の戦略を採用する。以降の戦略は実行しない
    pub async fn run_ladder(&self, strategies: &[SearchStrategy]) -> PlannedSearch {
        info!("Search mode: {}", self.pagination.describe());

        for strategy in strategies {
            info!("Trying strategy: {}", strategy);
            let issues = paginated_search(self.tracker, &strategy.jql, &self.pagination).await;
            if issues.is_empty() {
                info!("No results for {}", strategy.description);
                continue;
            }
            return finish(strategy.clone(), issues);
        }

        warn!("No strategy returned issues");
        PlannedSearch::default()
    }

    /// 戦略を1つだけ実行する。空でも他の戦略は試さない
    pub async fn run_single(&self, strategy: SearchStrategy) -> PlannedSearch {
        info!("Search mode: {}", self.pagination.describe());
        info!("Running strategy: {}", strategy);

        let issues = paginated_search(self.tracker, &strategy.jql, &self.pagination).await;
        if issues.is_empty() {
            warn!("No results for {}", strategy.description);
            return PlannedSearch::default();
        }
        finish(strategy, issues)
    }
}

fn finish(strategy: SearchStrategy, issues: Vec<Issue>) -> PlannedSearch {
    let retrieved = issues.len();
    let (issues, duplicates) = dedup_by_key(issues, |issue| issue.key.clone());
    if duplicates > 0 {
        info!("Removed {} duplicate issues", duplicates);
    }
    info!(
        "{}: {} issues ({} retrieved)",
        strategy.description,
        issues.len(),
        retrieved
    );

    PlannedSearch {
        strategy: Some(strategy),
        issues,
        retrieved,
        duplicates,
    }
}
