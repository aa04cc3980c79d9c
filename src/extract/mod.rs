pub mod metadata;
pub mod structure;
pub mod timetracking;

use log::{info, warn};
use std::collections::HashMap;

use crate::config::{ExtractionConfig, PassthroughField};
use crate::error::{Error, Result};
use crate::models::{FieldNames, Issue, IssueRecord, User, sentinel};

pub use structure::{StructureExtractor, default_board_name, sprint_from_text};

/// 生のIssueを正規化レコードに変換する
///
/// 時間・構造・メタデータの3つの抽出を組み合わせる。
#[derive(Debug, Clone)]
pub struct IssueFieldExtractor {
    names: FieldNames,
    epic_fields: Vec<String>,
    passthrough_fields: Vec<PassthroughField>,
    sprint_boards: HashMap<u64, String>,
}

/// 一括抽出の結果
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatch {
    pub records: Vec<IssueRecord>,
    /// 抽出に失敗して除外したIssue（キー, 理由）
    pub dropped: Vec<(String, String)>,
}

impl IssueFieldExtractor {
    pub fn new(names: FieldNames, config: &ExtractionConfig) -> Self {
        Self {
            names,
            epic_fields: config.epic_fields.clone(),
            passthrough_fields: config.passthrough_fields.clone(),
            sprint_boards: HashMap::new(),
        }
    }

    /// スプリントID → ボード名。ここにあるスプリントのIssueはそのボード名になる
    pub fn with_sprint_boards(mut self, sprint_boards: HashMap<u64, String>) -> Self {
        self.sprint_boards = sprint_boards;
        self
    }

    pub fn field_names(&self) -> &FieldNames {
        &self.names
    }

    /// 1件を変換する。種別・ステータス・プロジェクトが無いIssueはエラー
    pub fn extract(&self, issue: &Issue) -> Result<IssueRecord> {
        if issue.key.trim().is_empty() {
            return Err(Error::InvalidData("issue without key".to_string()));
        }

        let fields = &issue.fields;
        let issue_type = fields
            .issue_type
            .as_ref()
            .and_then(|issue_type| issue_type.name.clone())
            .ok_or_else(|| missing(issue, "issuetype"))?;
        let status = fields
            .status
            .as_ref()
            .and_then(|status| status.name.clone())
            .ok_or_else(|| missing(issue, "status"))?;
        let project_key = fields
            .project
            .as_ref()
            .and_then(|project| project.key.clone())
            .ok_or_else(|| missing(issue, "project"))?;

        let structure = StructureExtractor::new(&self.names, &self.epic_fields, &self.sprint_boards)
            .extract(issue, &project_key);

        Ok(IssueRecord {
            key: issue.key.clone(),
            summary: fields.summary.clone().unwrap_or_default(),
            issue_type,
            status,
            priority: fields
                .priority
                .as_ref()
                .and_then(|priority| priority.name.clone())
                .unwrap_or_else(|| sentinel::NO_PRIORITY.to_string()),
            assignee: user_label(fields.assignee.as_ref(), sentinel::NO_ASSIGNEE),
            reporter: user_label(fields.reporter.as_ref(), sentinel::NO_REPORTER),
            created: fields.created.clone().unwrap_or_default(),
            updated: fields.updated.clone().unwrap_or_default(),
            time: timetracking::extract(fields),
            structure,
            metadata: metadata::extract(fields, &self.passthrough_fields),
            project_key,
            subtasks: None,
        })
    }

    /// 全件を変換する。失敗したIssueはログに残して除外し、残りは続行する
    pub fn extract_all(&self, issues: &[Issue]) -> ExtractionBatch {
        let mut batch = ExtractionBatch::default();

        for issue in issues {
            match self.extract(issue) {
                Ok(record) => batch.records.push(record),
                Err(e) => {
                    warn!("Skipping issue {}: {}", issue.key, e);
                    batch.dropped.push((issue.key.clone(), e.to_string()));
                }
            }
        }

        info!(
            "Extracted {} records ({} dropped)",
            batch.records.len(),
            batch.dropped.len()
        );
        batch
    }
}

fn missing(issue: &Issue, field: &str) -> Error {
    Error::InvalidData(format!("{} has no {}", issue.key, field))
}

fn user_label(user: Option<&User>, fallback: &str) -> String {
    user.and_then(User::label)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue(value: serde_json::Value) -> Issue {
        serde_json::from_value(value).unwrap()
    }

    fn extractor() -> IssueFieldExtractor {
        IssueFieldExtractor::new(FieldNames::new(), &ExtractionConfig::default())
    }

    fn complete_issue(key: &str) -> serde_json::Value {
        json!({
            "id": "10001",
            "key": key,
            "fields": {
                "summary": "Login page",
                "issuetype": {"name": "Story", "subtask": false},
                "status": {"name": "In Progress"},
                "priority": {"name": "High"},
                "assignee": {"displayName": "Ana"},
                "reporter": null,
                "created": "2024-03-01T10:00:00.000+0100",
                "updated": "2024-03-05T10:00:00.000+0100",
                "project": {"key": "ABC"},
                "timetracking": {"timeSpentSeconds": 3600}
            }
        })
    }

    #[test]
    fn test_extract_complete_issue() {
        let record = extractor().extract(&issue(complete_issue("ABC-1"))).unwrap();

        assert_eq!(record.key, "ABC-1");
        assert_eq!(record.issue_type, "Story");
        assert_eq!(record.status, "In Progress");
        assert_eq!(record.priority, "High");
        assert_eq!(record.assignee, "Ana");
        assert_eq!(record.reporter, "Desconocido");
        assert_eq!(record.created, "2024-03-01T10:00:00.000+0100");
        assert_eq!(record.project_key, "ABC");
        assert_eq!(record.time.time_spent.to_string(), "1,0");
        assert_eq!(record.structure.epic_key, "Sin Epic");
        assert_eq!(record.structure.sprint.name, "Sin Sprint");
        assert_eq!(record.structure.sprint.id, "N/A");
        assert!(record.subtasks.is_none());
    }

    #[test]
    fn test_missing_optional_people_use_sentinels() {
        let record = extractor()
            .extract(&issue(json!({
                "key": "ABC-2",
                "fields": {
                    "issuetype": {"name": "Bug"},
                    "status": {"name": "Open"},
                    "project": {"key": "ABC"}
                }
            })))
            .unwrap();

        assert_eq!(record.priority, "Sin Prioridad");
        assert_eq!(record.assignee, "Sin Asignar");
        assert_eq!(record.summary, "");
    }

    #[test]
    fn test_missing_required_field_is_error() {
        let result = extractor().extract(&issue(json!({
            "key": "ABC-3",
            "fields": {"issuetype": {"name": "Bug"}, "project": {"key": "ABC"}}
        })));

        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_extract_all_drops_failing_issues_only() {
        // Given: 正常2件の間に不正な1件
        let issues = vec![
            issue(complete_issue("ABC-1")),
            issue(json!({"key": "ABC-2", "fields": {}})),
            issue(complete_issue("ABC-3")),
        ];

        // When
        let batch = extractor().extract_all(&issues);

        // Then: 不正な1件だけ除外される
        let keys: Vec<&str> = batch.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["ABC-1", "ABC-3"]);
        assert_eq!(batch.dropped.len(), 1);
        assert_eq!(batch.dropped[0].0, "ABC-2");
    }

    #[test]
    fn test_sprint_board_names_are_applied() {
        let extractor = extractor().with_sprint_boards(HashMap::from([(
            31,
            "Equipo A".to_string(),
        )]));
        let mut value = complete_issue("ABC-1");
        value["fields"]["sprint"] = json!([{"id": 31, "name": "Sprint 31", "state": "active"}]);

        let record = extractor.extract(&issue(value)).unwrap();

        assert_eq!(record.structure.sprint.id, "31");
        assert_eq!(record.structure.board_name, "Equipo A");
    }
}
