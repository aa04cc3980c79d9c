use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub subtask: bool,
    #[serde(rename = "hierarchyLevel")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy_level: Option<i32>,
}

impl IssueType {
    /// 種別名が "Epic" かどうか（大文字小文字は区別しない）
    pub fn is_epic(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.trim().eq_ignore_ascii_case("epic"))
    }
}
