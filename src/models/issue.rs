use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FieldValue, IssueType, Priority, ProjectRef, Status, User};

/// 検索APIが返すIssue
///
/// 不完全なレコードでもページ全体を失わないよう、`key` 以外は欠けていてもよい。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "issuetype")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<User>,
    // 作成・更新日時は受け取った文字列のまま出力する
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timetracking: Option<TimeTracking>,
    #[serde(rename = "aggregatetimespent")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_time_spent: Option<i64>,
    #[serde(rename = "aggregatetimeoriginalestimate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_original_estimate: Option<i64>,
    #[serde(rename = "aggregatetimeestimate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_time_estimate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<NamedRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(rename = "fixVersions")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_versions: Option<Vec<NamedRef>>,

    // カスタムフィールドは動的に追加（ID順で走査できるよう BTreeMap）
    #[serde(flatten)]
    pub custom_fields: BTreeMap<String, FieldValue>,
}

impl IssueFields {
    pub fn custom_field(&self, field_id: &str) -> Option<&FieldValue> {
        self.custom_fields.get(field_id)
    }
}

/// 親Issueへの参照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParentRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ParentFields>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParentFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "issuetype")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
}

impl ParentRef {
    pub fn is_epic(&self) -> bool {
        self.fields
            .as_ref()
            .and_then(|fields| fields.issue_type.as_ref())
            .is_some_and(IssueType::is_epic)
    }
}

/// timetracking サブオブジェクト（値はすべて秒）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeTracking {
    #[serde(rename = "originalEstimateSeconds")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_estimate_seconds: Option<i64>,
    #[serde(rename = "remainingEstimateSeconds")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_estimate_seconds: Option<i64>,
    #[serde(rename = "timeSpentSeconds")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<i64>,
}

/// コンポーネントや Fix Version のような名前付き参照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
