use serde::{Deserialize, Serialize};
use std::fmt;

use super::Hours;

/// 値が無いときに出力する文字列
pub mod sentinel {
    pub const NO_PRIORITY: &str = "Sin Prioridad";
    pub const NO_ASSIGNEE: &str = "Sin Asignar";
    pub const NO_REPORTER: &str = "Desconocido";
    pub const NO_EPIC: &str = "Sin Epic";
    pub const NO_SPRINT: &str = "Sin Sprint";
    pub const NOT_AVAILABLE: &str = "N/A";
    pub const NO_COMPONENTS: &str = "Sin Componentes";
    pub const NO_LABELS: &str = "Sin Labels";
    pub const NO_FIX_VERSION: &str = "Sin Fix Version";
    pub const NO_DATA: &str = "Sin Datos";
}

pub const BASE_COLUMNS: [&str; 2] = ["epic_key", "feature"];

pub const MAIN_COLUMNS: [&str; 10] = [
    "key",
    "summary",
    "issue_type",
    "status",
    "priority",
    "assignee",
    "reporter",
    "created",
    "updated",
    "project_key",
];

pub const TIME_COLUMNS: [&str; 3] = ["time_spent", "original_estimate", "remaining_estimate"];

pub const AGGREGATE_TIME_COLUMNS: [&str; 3] = [
    "aggregate_time_spent",
    "aggregate_original_estimate",
    "aggregate_time_estimate",
];

pub const SUBTASK_COLUMNS: [&str; 9] = [
    "analisis_time_spent",
    "analisis_original_estimate",
    "analisis_remaining",
    "testing_time_spent",
    "testing_original_estimate",
    "testing_remaining",
    "desarrollo_time_spent",
    "desarrollo_original_estimate",
    "desarrollo_remaining",
];

pub const METADATA_COLUMNS: [&str; 12] = [
    "is_subtask",
    "parent_key",
    "sprint_name",
    "sprint_id",
    "sprint_state",
    "board_name",
    "components",
    "labels",
    "fixversion",
    "generico1",
    "generico2",
    "generico3",
];

/// 出力列の優先順（ここに無い列は末尾に追加される）
pub fn preferred_columns() -> impl Iterator<Item = &'static str> {
    BASE_COLUMNS
        .into_iter()
        .chain(MAIN_COLUMNS)
        .chain(TIME_COLUMNS)
        .chain(AGGREGATE_TIME_COLUMNS)
        .chain(SUBTASK_COLUMNS)
        .chain(METADATA_COLUMNS)
}

/// timetracking 系の値
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeFields {
    pub time_spent: Hours,
    pub original_estimate: Hours,
    pub remaining_estimate: Hours,
    pub aggregate_time_spent: Hours,
    pub aggregate_original_estimate: Hours,
    pub aggregate_time_estimate: Hours,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintInfo {
    pub name: String,
    pub id: String,
    pub state: String,
}

impl Default for SprintInfo {
    fn default() -> Self {
        Self {
            name: sentinel::NO_SPRINT.to_string(),
            id: sentinel::NOT_AVAILABLE.to_string(),
            state: sentinel::NOT_AVAILABLE.to_string(),
        }
    }
}

impl SprintInfo {
    pub fn is_assigned(&self) -> bool {
        self.name != sentinel::NO_SPRINT
    }
}

/// 親子関係・エピック・スプリントなどの構造情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureFields {
    pub epic_key: String,
    pub feature: String,
    pub is_subtask: bool,
    pub parent_key: Option<String>,
    pub sprint: SprintInfo,
    pub board_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFields {
    pub components: String,
    pub labels: String,
    pub fix_versions: String,
    /// (列名, 値) の組。設定された順に並ぶ
    pub passthrough: Vec<(String, String)>,
}

/// サブタスクの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskCategory {
    Analisis,
    Testing,
    Desarrollo,
}

impl SubtaskCategory {
    pub const ALL: [SubtaskCategory; 3] = [
        SubtaskCategory::Analisis,
        SubtaskCategory::Testing,
        SubtaskCategory::Desarrollo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubtaskCategory::Analisis => "analisis",
            SubtaskCategory::Testing => "testing",
            SubtaskCategory::Desarrollo => "desarrollo",
        }
    }
}

impl fmt::Display for SubtaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub time_spent: Hours,
    pub original_estimate: Hours,
    pub remaining: Hours,
}

impl CategoryTotals {
    pub fn add(&mut self, time: &TimeFields) {
        self.time_spent += time.time_spent;
        self.original_estimate += time.original_estimate;
        self.remaining += time.remaining_estimate;
    }
}

/// 分類ごとのサブタスク時間合計（3分類 × 3指標）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtaskTotals {
    pub analisis: CategoryTotals,
    pub testing: CategoryTotals,
    pub desarrollo: CategoryTotals,
}

impl SubtaskTotals {
    pub fn get(&self, category: SubtaskCategory) -> &CategoryTotals {
        match category {
            SubtaskCategory::Analisis => &self.analisis,
            SubtaskCategory::Testing => &self.testing,
            SubtaskCategory::Desarrollo => &self.desarrollo,
        }
    }

    pub fn get_mut(&mut self, category: SubtaskCategory) -> &mut CategoryTotals {
        match category {
            SubtaskCategory::Analisis => &mut self.analisis,
            SubtaskCategory::Testing => &mut self.testing,
            SubtaskCategory::Desarrollo => &mut self.desarrollo,
        }
    }
}

/// 正規化済みのIssue 1件
///
/// `subtasks` は集計後の親Issueにだけ設定される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub key: String,
    pub summary: String,
    pub issue_type: String,
    pub status: String,
    pub priority: String,
    pub assignee: String,
    pub reporter: String,
    pub created: String,
    pub updated: String,
    pub project_key: String,
    pub time: TimeFields,
    pub structure: StructureFields,
    pub metadata: MetadataFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<SubtaskTotals>,
}

impl IssueRecord {
    pub fn is_subtask(&self) -> bool {
        self.structure.is_subtask
    }

    pub fn parent_key(&self) -> Option<&str> {
        self.structure.parent_key.as_deref()
    }

    /// (列名, 値) の一覧。順序はレコード内の自然な並びで、出力順は exporter が決める
    pub fn columns(&self) -> Vec<(String, String)> {
        let mut columns: Vec<(String, String)> = Vec::with_capacity(40);
        let mut push = |name: &str, value: String| columns.push((name.to_string(), value));

        push("epic_key", self.structure.epic_key.clone());
        push("feature", self.structure.feature.clone());

        push("key", self.key.clone());
        push("summary", self.summary.clone());
        push("issue_type", self.issue_type.clone());
        push("status", self.status.clone());
        push("priority", self.priority.clone());
        push("assignee", self.assignee.clone());
        push("reporter", self.reporter.clone());
        push("created", self.created.clone());
        push("updated", self.updated.clone());
        push("project_key", self.project_key.clone());

        push("time_spent", self.time.time_spent.to_string());
        push("original_estimate", self.time.original_estimate.to_string());
        push("remaining_estimate", self.time.remaining_estimate.to_string());
        push("aggregate_time_spent", self.time.aggregate_time_spent.to_string());
        push(
            "aggregate_original_estimate",
            self.time.aggregate_original_estimate.to_string(),
        );
        push("aggregate_time_estimate", self.time.aggregate_time_estimate.to_string());

        if let Some(totals) = &self.subtasks {
            for category in SubtaskCategory::ALL {
                let values = totals.get(category);
                push(
                    &format!("{}_time_spent", category),
                    values.time_spent.to_string(),
                );
                push(
                    &format!("{}_original_estimate", category),
                    values.original_estimate.to_string(),
                );
                push(&format!("{}_remaining", category), values.remaining.to_string());
            }
        }

        push("is_subtask", self.structure.is_subtask.to_string());
        push(
            "parent_key",
            self.structure.parent_key.clone().unwrap_or_default(),
        );
        push("sprint_name", self.structure.sprint.name.clone());
        push("sprint_id", self.structure.sprint.id.clone());
        push("sprint_state", self.structure.sprint.state.clone());
        push("board_name", self.structure.board_name.clone());
        push("components", self.metadata.components.clone());
        push("labels", self.metadata.labels.clone());
        push("fixversion", self.metadata.fix_versions.clone());
        for (name, value) in &self.metadata.passthrough {
            push(name, value.clone());
        }

        columns
    }
}
