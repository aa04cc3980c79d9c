use std::collections::HashMap;

use crate::models::{FieldNames, FieldRef, FieldValue, Issue, SprintInfo, StructureFields, sentinel};

/// 親子関係・エピック・スプリント・ボードを解決する
#[derive(Debug, Clone)]
pub struct StructureExtractor<'a> {
    names: &'a FieldNames,
    epic_fields: &'a [String],
    sprint_boards: &'a HashMap<u64, String>,
}

impl<'a> StructureExtractor<'a> {
    pub fn new(
        names: &'a FieldNames,
        epic_fields: &'a [String],
        sprint_boards: &'a HashMap<u64, String>,
    ) -> Self {
        Self {
            names,
            epic_fields,
            sprint_boards,
        }
    }

    pub fn extract(&self, issue: &Issue, project_key: &str) -> StructureFields {
        let fields = &issue.fields;
        let is_subtask = fields
            .issue_type
            .as_ref()
            .is_some_and(|issue_type| issue_type.subtask);
        let parent_key = fields
            .parent
            .as_ref()
            .and_then(|parent| parent.key.clone())
            .filter(|key| !key.trim().is_empty());

        let feature = if is_subtask {
            parent_key.clone().unwrap_or_default()
        } else {
            issue.key.clone()
        };

        let sprint = self.sprint(issue);
        let board_name = sprint
            .id
            .parse::<u64>()
            .ok()
            .and_then(|id| self.sprint_boards.get(&id).cloned())
            .unwrap_or_else(|| default_board_name(project_key));

        StructureFields {
            epic_key: self.epic_key(issue),
            feature,
            is_subtask,
            parent_key,
            sprint,
            board_name,
        }
    }

    /// エピックキーの解決順:
    /// 設定されたエピック用フィールド → 自身がエピック → 名前に "epic" を含むフィールド → エピック型の親
    pub fn epic_key(&self, issue: &Issue) -> String {
        let fields = &issue.fields;

        for field_id in self.epic_fields {
            if let Some(key) = fields.custom_field(field_id).and_then(epic_candidate) {
                return key;
            }
        }

        if fields
            .issue_type
            .as_ref()
            .is_some_and(|issue_type| issue_type.is_epic())
        {
            return issue.key.clone();
        }

        let scanned = fields
            .custom_fields
            .iter()
            .filter(|(field_id, _)| self.names.matches(field_id, "epic"))
            .find_map(|(_, value)| epic_candidate(value));
        if let Some(key) = scanned {
            return key;
        }

        let epic_parent = fields
            .parent
            .as_ref()
            .filter(|parent| parent.is_epic())
            .and_then(|parent| parent.key.clone());
        if let Some(key) = epic_parent {
            return key;
        }

        sentinel::NO_EPIC.to_string()
    }

    /// 名前に "sprint" を含むフィールドを ID 順に走査し、最初に値があるフィールドだけを見る
    ///
    /// リストの場合は最後の要素（最新のスプリント）を採用する。読み取れなければ既定値のまま。
    pub fn sprint(&self, issue: &Issue) -> SprintInfo {
        for (field_id, value) in &issue.fields.custom_fields {
            if value.is_empty() || !self.names.matches(field_id, "sprint") {
                continue;
            }

            let candidate = match value {
                FieldValue::List(items) => items.last().and_then(sprint_from_value),
                FieldValue::Reference(reference) if reference.name().is_some() => {
                    sprint_from_reference(reference)
                }
                FieldValue::Text(text) => Some(sprint_from_text(text)),
                _ => None,
            };
            return candidate.unwrap_or_default();
        }
        SprintInfo::default()
    }
}

pub fn default_board_name(project_key: &str) -> String {
    format!("{} - Proyecto Principal", project_key)
}

fn epic_candidate(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        FieldValue::Reference(reference) => reference.key().or_else(|| reference.name()),
        _ => None,
    }
}

fn sprint_from_value(value: &FieldValue) -> Option<SprintInfo> {
    match value {
        FieldValue::Reference(reference) => sprint_from_reference(reference),
        FieldValue::Text(text) if !text.trim().is_empty() => Some(sprint_from_text(text)),
        _ => None,
    }
}

fn sprint_from_reference(reference: &FieldRef) -> Option<SprintInfo> {
    let defaults = SprintInfo::default();
    let name = reference.name();
    let id = reference.id();
    if name.is_none() && id.is_none() {
        return None;
    }
    Some(SprintInfo {
        name: name.unwrap_or(defaults.name),
        id: id.unwrap_or(defaults.id),
        state: reference
            .state()
            .map(|state| state.to_lowercase())
            .unwrap_or(defaults.state),
    })
}

/// GreenHopper 形式 `...Sprint@1a2b[id=1,state=ACTIVE,name=Sprint 1,...]` を解釈する。
/// それ以外の文字列はスプリント名として扱う。
pub fn sprint_from_text(text: &str) -> SprintInfo {
    let text = text.trim();
    let Some(attributes) = legacy_attributes(text) else {
        return SprintInfo {
            name: text.to_string(),
            ..SprintInfo::default()
        };
    };

    let mut info = SprintInfo::default();
    for (key, value) in attributes {
        if value.is_empty() || value == "<null>" {
            continue;
        }
        match key.as_str() {
            "id" => info.id = value,
            "state" => info.state = value.to_lowercase(),
            "name" => info.name = value,
            _ => {}
        }
    }
    info
}

fn legacy_attributes(text: &str) -> Option<Vec<(String, String)>> {
    let open = text.find('[')?;
    let close = text.rfind(']')?;
    if close <= open {
        return None;
    }

    let mut attributes: Vec<(String, String)> = Vec::new();
    for part in text[open + 1..close].split(',') {
        match part.split_once('=') {
            Some((key, value)) if is_attribute_key(key) => {
                attributes.push((key.trim().to_string(), value.to_string()));
            }
            // 名前にカンマを含む場合は直前の値に戻す
            _ => {
                if let Some((_, value)) = attributes.last_mut() {
                    value.push(',');
                    value.push_str(part);
                }
            }
        }
    }

    if attributes.is_empty() {
        None
    } else {
        Some(attributes)
    }
}

fn is_attribute_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric())
}
