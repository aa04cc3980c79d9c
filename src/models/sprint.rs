use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// スプリントの状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    Active,
    Closed,
    Future,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SprintState {
    /// Agile API の `state` クエリパラメータ値
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintState::Active => "active",
            SprintState::Closed => "closed",
            SprintState::Future => "future",
            SprintState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SprintState {
    type Err = std::convert::Infallible;

    // 旧形式のスプリント文字列は "ACTIVE" のように大文字で返る
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "active" => SprintState::Active,
            "closed" => SprintState::Closed,
            "future" => SprintState::Future,
            _ => SprintState::Unknown,
        })
    }
}

/// Agile API のスプリント
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sprint {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: SprintState,
    #[serde(rename = "startDate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "completeDate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_date: Option<String>,
    #[serde(rename = "createdDate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(rename = "originBoardId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_board_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

impl Sprint {
    /// 完了日（無ければ終了日）。閉じたスプリントの新しさ比較に使う
    pub fn completion_marker(&self) -> &str {
        self.complete_date
            .as_deref()
            .or(self.end_date.as_deref())
            .unwrap_or("")
    }
}

/// ボード横断で収集したスプリント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSprint {
    pub sprint: Sprint,
    pub board_id: u64,
    /// 複数ボードに現れた場合は "A (+B)" の形に連結される
    pub board_name: String,
    /// どの状態フィルタで見つかったか
    pub origin: SprintState,
}

impl BoardSprint {
    pub fn id(&self) -> u64 {
        self.sprint.id
    }

    pub fn is_active(&self) -> bool {
        self.origin == SprintState::Active
    }
}
