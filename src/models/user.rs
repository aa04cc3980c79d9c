use serde::{Deserialize, Serialize};

/// Issueの担当者・報告者
///
/// Cloud と Server で返る属性が異なるため、全項目を任意とする。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "accountId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(rename = "displayName")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "emailAddress")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl User {
    /// 表示名を displayName → name → emailAddress の順で解決する
    pub fn label(&self) -> Option<&str> {
        [&self.display_name, &self.name, &self.email_address]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_deserialization() {
        let json_data = json!({
            "accountId": "557058:f58131cb-b67d-43c7-b30d-6b58d40bd077",
            "displayName": "Test User",
            "emailAddress": "test@example.com",
            "self": "https://example.atlassian.net/rest/api/2/user?accountId=557058:f58131cb",
            "active": true,
            "timeZone": "Europe/Madrid"
        });

        let user: User = serde_json::from_value(json_data).unwrap();

        assert_eq!(user.display_name.as_deref(), Some("Test User"));
        assert_eq!(user.email_address.as_deref(), Some("test@example.com"));
        assert_eq!(user.active, Some(true));
        assert_eq!(user.label(), Some("Test User"));
    }

    #[test]
    fn test_user_label_fallbacks() {
        // Given: displayName が空で name だけがある Server 形式
        let server_user: User = serde_json::from_value(json!({
            "displayName": "  ",
            "name": "jdoe"
        }))
        .unwrap();
        // Given: メールアドレスしかない
        let email_only: User = serde_json::from_value(json!({
            "emailAddress": "only@example.com"
        }))
        .unwrap();

        // Then: 空でない最初の値が選ばれる
        assert_eq!(server_user.label(), Some("jdoe"));
        assert_eq!(email_only.label(), Some("only@example.com"));
        assert_eq!(User::default().label(), None);
    }
}
