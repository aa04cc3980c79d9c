use serde::{Deserialize, Serialize};

/// Agile API のボード
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<BoardLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardLocation {
    #[serde(rename = "projectId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(rename = "projectKey")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(rename = "projectName")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl Board {
    pub fn project_key(&self) -> Option<&str> {
        self.location.as_ref()?.project_key.as_deref()
    }

    pub fn belongs_to(&self, project_key: &str) -> bool {
        self.project_key() == Some(project_key)
    }
}

/// Agile API のオフセット型ページ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgilePage<T> {
    #[serde(rename = "startAt")]
    #[serde(default)]
    pub start_at: u32,
    #[serde(rename = "maxResults")]
    #[serde(default)]
    pub max_results: u32,
    #[serde(rename = "isLast")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_last: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_board_page_deserialization() {
        let json_data = json!({
            "maxResults": 50,
            "startAt": 0,
            "total": 2,
            "isLast": true,
            "values": [
                {
                    "id": 42,
                    "self": "https://example.atlassian.net/rest/agile/1.0/board/42",
                    "name": "ABC board",
                    "type": "scrum",
                    "location": {"projectId": 10000, "projectKey": "ABC", "projectName": "Proyecto ABC"}
                },
                {"id": 43, "name": "Sin ubicación", "type": "kanban"}
            ]
        });

        let page: AgilePage<Board> = serde_json::from_value(json_data).unwrap();

        assert_eq!(page.values.len(), 2);
        assert_eq!(page.is_last, Some(true));
        assert!(page.values[0].belongs_to("ABC"));
        assert!(!page.values[0].belongs_to("XYZ"));
        assert_eq!(page.values[1].project_key(), None);
    }

    #[test]
    fn test_page_without_values_is_empty() {
        let page: AgilePage<Board> = serde_json::from_value(json!({"startAt": 0})).unwrap();

        assert!(page.values.is_empty());
    }
}
