use async_trait::async_trait;
use base64::Engine;
use log::debug;
use reqwest::{Client, header};
use std::sync::Arc;
use url::Url;

use crate::error::{Error, Result};
use crate::models::{AgilePage, Board, Field, SearchParams, SearchResult, Sprint, SprintState, User};
use crate::tracker::IssueTracker;

pub const ENV_SERVER: &str = "JIRA_SERVER";
pub const ENV_EMAIL: &str = "JIRA_EMAIL";
pub const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

impl JiraConfig {
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        // Validate URL
        let _ = Url::parse(&base_url)
            .map_err(|_| Error::InvalidConfiguration("Invalid base URL".to_string()))?;

        Ok(Self {
            base_url,
            email: email.into(),
            api_token: api_token.into(),
        })
    }

    /// 環境変数から認証情報を読む。不足している変数はすべてまとめて報告する
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let server = read(ENV_SERVER);
        let email = read(ENV_EMAIL);
        let api_token = read(ENV_API_TOKEN);

        match (server, email, api_token) {
            (Some(server), Some(email), Some(api_token)) => Self::new(server, email, api_token),
            (server, email, api_token) => {
                let missing: Vec<&str> = [
                    (ENV_SERVER, server.is_none()),
                    (ENV_EMAIL, email.is_none()),
                    (ENV_API_TOKEN, api_token.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(name, _)| name)
                .collect();
                Err(Error::ConfigurationMissing(format!(
                    "missing environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    pub(crate) client: Client,
    pub(crate) config: Arc<JiraConfig>,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        // 認証ヘッダーを追加
        let credentials = format!("{}:{}", config.email, config.api_token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Basic {}", encoded))
                .map_err(|_| Error::InvalidConfiguration("Invalid auth header".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    pub(crate) async fn get<T>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, endpoint);
        debug!("GET {} {:?}", endpoint, query);

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ApiError { status, message });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub(crate) async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{}{}", self.config.base_url, endpoint);

        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ApiError { status, message });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub async fn search_issues(&self, jql: &str, params: SearchParams) -> Result<SearchResult> {
        #[derive(serde::Serialize)]
        struct SearchRequest<'a> {
            jql: &'a str,
            #[serde(flatten)]
            params: &'a SearchParams,
        }

        debug!(
            "POST search [{}] startAt={:?} maxResults={:?}",
            jql, params.start_at, params.max_results
        );
        self.post(
            "/rest/api/2/search",
            &SearchRequest {
                jql,
                params: &params,
            },
        )
        .await
    }
}

fn paging(start_at: u32, max_results: u32) -> Vec<(&'static str, String)> {
    vec![
        ("startAt", start_at.to_string()),
        ("maxResults", max_results.to_string()),
    ]
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn connect(&self) -> Result<User> {
        self.get("/rest/api/2/myself", &[]).await
    }

    async fn search_page(&self, jql: &str, params: SearchParams) -> Result<SearchResult> {
        self.search_issues(jql, params).await
    }

    async fn board_page(&self, start_at: u32, max_results: u32) -> Result<AgilePage<Board>> {
        self.get("/rest/agile/1.0/board", &paging(start_at, max_results))
            .await
    }

    async fn sprint_page(
        &self,
        board_id: u64,
        state: Option<SprintState>,
        start_at: u32,
        max_results: u32,
    ) -> Result<AgilePage<Sprint>> {
        let mut query = paging(start_at, max_results);
        if let Some(state) = state {
            query.push(("state", state.as_str().to_string()));
        }
        self.get(&format!("/rest/agile/1.0/board/{}/sprint", board_id), &query)
            .await
    }

    async fn sprint(&self, sprint_id: u64) -> Result<Sprint> {
        self.get(&format!("/rest/agile/1.0/sprint/{}", sprint_id), &[])
            .await
    }

    async fn fields(&self) -> Result<Vec<Field>> {
        self.get("/rest/api/2/field", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    async fn client_for(server: &MockServer) -> JiraClient {
        let config = JiraConfig::new(server.uri(), "test@example.com", "test_token").unwrap();
        JiraClient::new(config).unwrap()
    }

    #[test]
    fn test_jira_config_new_with_valid_url() {
        // Given: 有効なURL（末尾スラッシュ付き）
        let base_url = "https://example.atlassian.net/";

        // When: JiraConfigを作成
        let config = JiraConfig::new(base_url, "test@example.com", "test_token").unwrap();

        // Then: 末尾スラッシュが除去される
        assert_eq!(config.base_url, "https://example.atlassian.net");
        assert_eq!(config.email, "test@example.com");
    }

    #[test]
    fn test_jira_config_new_with_invalid_url() {
        let result = JiraConfig::new("not a valid url", "test@example.com", "test_token");

        match result {
            Err(Error::InvalidConfiguration(msg)) => assert_eq!(msg, "Invalid base URL"),
            other => panic!("Expected InvalidConfiguration error, got {:?}", other),
        }
    }

    #[test]
    fn test_jira_config_from_lookup() {
        // Given: 3つの変数が揃っている
        let vars = lookup(&[
            ("JIRA_SERVER", "https://test.atlassian.net"),
            ("JIRA_EMAIL", "test@example.com"),
            ("JIRA_API_TOKEN", "test_api_token"),
        ]);

        // When
        let config = JiraConfig::from_lookup(vars).unwrap();

        // Then
        assert_eq!(config.base_url, "https://test.atlassian.net");
        assert_eq!(config.api_token, "test_api_token");
    }

    #[test]
    fn test_jira_config_reports_every_missing_variable() {
        // Given: サーバーだけ設定され、トークンは空文字
        let vars = lookup(&[
            ("JIRA_SERVER", "https://test.atlassian.net"),
            ("JIRA_API_TOKEN", "  "),
        ]);

        // When
        let result = JiraConfig::from_lookup(vars);

        // Then: 不足分がすべてメッセージに含まれる
        match result {
            Err(Error::ConfigurationMissing(msg)) => {
                assert!(msg.contains("JIRA_EMAIL"));
                assert!(msg.contains("JIRA_API_TOKEN"));
                assert!(!msg.contains("JIRA_SERVER"));
            }
            other => panic!("Expected ConfigurationMissing error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_sends_basic_auth() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/myself"))
            .and(header(
                "Authorization",
                "Basic dGVzdEBleGFtcGxlLmNvbTp0ZXN0X3Rva2Vu",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accountId": "abc",
                "displayName": "Test User"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let user = client.connect().await.unwrap();

        assert_eq!(user.label(), Some("Test User"));
    }

    #[tokio::test]
    async fn test_get_request_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/agile/1.0/sprint/99"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Sprint not found"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let result = client.sprint(99).await;

        match result {
            Err(error @ Error::ApiError { .. }) => {
                assert!(error.is_not_found());
                if let Error::ApiError { status, message } = error {
                    assert_eq!(status, 404);
                    assert_eq!(message, "Sprint not found");
                }
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_issues_posts_jql_and_paging() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/2/search"))
            .and(body_json(json!({
                "jql": "project = ABC ORDER BY created DESC",
                "startAt": 100,
                "maxResults": 100,
                "fields": ["*all"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 100,
                "maxResults": 100,
                "total": 101,
                "issues": [{"id": "1", "key": "ABC-1", "fields": {"summary": "Uno"}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let params = SearchParams::new()
            .start_at(100)
            .max_results(100)
            .fields(vec!["*all".to_string()]);

        let result = client
            .search_issues("project = ABC ORDER BY created DESC", params)
            .await
            .unwrap();

        assert_eq!(result.total, 101);
        assert_eq!(result.issues[0].key, "ABC-1");
    }

    #[tokio::test]
    async fn test_lenient_search_returns_empty_on_auth_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let issues = client.search("project = ABC", SearchParams::new()).await;

        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_board_and_sprint_pages_use_query_parameters() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/agile/1.0/board"))
            .and(query_param("startAt", "50"))
            .and(query_param("maxResults", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 50,
                "maxResults": 50,
                "isLast": true,
                "values": [{"id": 7, "name": "ABC board", "location": {"projectKey": "ABC"}}]
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/agile/1.0/board/7/sprint"))
            .and(query_param("state", "active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 0,
                "maxResults": 50,
                "isLast": true,
                "values": [{"id": 11, "name": "Sprint 11", "state": "active"}]
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let boards = client.board_page(50, 50).await.unwrap();
        let sprints = client
            .sprint_page(7, Some(SprintState::Active), 0, 50)
            .await
            .unwrap();

        assert_eq!(boards.values[0].id, 7);
        assert_eq!(sprints.values[0].state, SprintState::Active);
    }

    #[tokio::test]
    async fn test_fields_lookup() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/field"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "summary", "name": "Summary", "custom": false},
                {"id": "customfield_10020", "name": "Sprint", "custom": true}
            ])))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let fields = client.fields().await.unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].name, "Sprint");
    }
}
