use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "statusCategory")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_category: Option<StatusCategory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_deserialization() {
        let json_data = json!({
            "id": "3",
            "name": "En curso",
            "self": "https://example.atlassian.net/rest/api/2/status/3",
            "statusCategory": {
                "id": 4,
                "key": "indeterminate",
                "name": "In Progress",
                "colorName": "yellow"
            }
        });

        let status: Status = serde_json::from_value(json_data).unwrap();

        assert_eq!(status.name.as_deref(), Some("En curso"));
        assert_eq!(
            status.status_category.and_then(|c| c.key).as_deref(),
            Some("indeterminate")
        );
    }
}
