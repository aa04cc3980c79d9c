use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `GET /rest/api/2/field` が返すフィールド定義
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<bool>,
    #[serde(rename = "schema")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<FieldSchema>,
    #[serde(rename = "clauseNames")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

/// カスタムフィールドの値
///
/// スキーマはインスタンスごとに異なるため、JSON のあらゆる形を受け付ける。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
    Reference(FieldRef),
}

impl FieldValue {
    /// 値が「空」とみなせるか（null、false、0、空文字列、空リスト、空オブジェクト）
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Bool(value) => !value,
            FieldValue::Number(value) => *value == 0.0,
            FieldValue::Text(value) => value.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Reference(reference) => reference.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&FieldRef> {
        match self {
            FieldValue::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// エクスポート用の文字列表現
    ///
    /// 参照型は name → value の順に解決し、どちらも無ければ JSON を出力する。
    pub fn display_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(value) => value.to_string(),
            FieldValue::Number(value) => format_number(*value),
            FieldValue::Text(value) => value.clone(),
            FieldValue::List(items) => items
                .iter()
                .filter(|item| !item.is_empty())
                .map(FieldValue::display_text)
                .collect::<Vec<_>>()
                .join(", "),
            FieldValue::Reference(reference) => reference
                .name()
                .or_else(|| reference.value())
                .unwrap_or_else(|| reference.to_json()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// `key`/`name`/`value`/`id`/`state` などを持つ参照オブジェクト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRef(serde_json::Map<String, serde_json::Value>);

impl FieldRef {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 文字列・数値・真偽値の属性を文字列として取り出す。空文字列は None。
    pub fn attr(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            serde_json::Value::String(value) if !value.trim().is_empty() => Some(value.clone()),
            serde_json::Value::Number(value) => Some(value.to_string()),
            serde_json::Value::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<String> {
        self.attr("key")
    }

    pub fn name(&self) -> Option<String> {
        self.attr("name")
    }

    pub fn value(&self) -> Option<String> {
        self.attr("value")
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    pub fn state(&self) -> Option<String> {
        self.attr("state")
    }

    fn to_json(&self) -> String {
        serde_json::Value::Object(self.0.clone()).to_string()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for FieldRef {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// フィールドID → 表示名の対応表
///
/// 取得に失敗した場合は空のまま使い、ID だけで照合する。
#[derive(Debug, Clone, Default)]
pub struct FieldNames {
    names: HashMap<String, String>,
}

impl FieldNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: &[Field]) -> Self {
        let names = fields
            .iter()
            .map(|field| (field.id.clone(), field.name.clone()))
            .collect();
        Self { names }
    }

    pub fn name_of(&self, field_id: &str) -> Option<&str> {
        self.names.get(field_id).map(String::as_str)
    }

    /// フィールドID または表示名に `term` を含むか（大文字小文字は区別しない）
    pub fn matches(&self, field_id: &str, term: &str) -> bool {
        let term = term.to_lowercase();
        if field_id.to_lowercase().contains(&term) {
            return true;
        }
        self.name_of(field_id)
            .is_some_and(|name| name.to_lowercase().contains(&term))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
