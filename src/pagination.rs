use log::{debug, info};
use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::models::{Issue, SearchParams};
use crate::tracker::IssueTracker;

/// オフセット型ページングの状態
///
/// 0件のページ、または要求サイズ未満のページを受け取った時点で終了する。
#[derive(Debug, Clone)]
pub struct PageCursor {
    start_at: u32,
    collected: usize,
    page_size: u32,
    safety_limit: Option<usize>,
    shrink_to_limit: bool,
    last_requested: u32,
    done: bool,
}

impl PageCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            start_at: 0,
            collected: 0,
            page_size: page_size.max(1),
            safety_limit: None,
            shrink_to_limit: false,
            last_requested: 0,
            done: false,
        }
    }

    /// 取得件数の上限を設定する。`shrink` が真なら最後のページを残り件数まで縮める
    pub fn safety_limit(mut self, limit: usize, shrink: bool) -> Self {
        self.safety_limit = Some(limit);
        self.shrink_to_limit = shrink;
        self
    }

    /// 次に要求する (startAt, maxResults)。終了または上限到達なら None
    pub fn next_request(&mut self) -> Option<(u32, u32)> {
        if self.done {
            return None;
        }
        let mut size = self.page_size;
        if let Some(limit) = self.safety_limit {
            if self.collected >= limit {
                info!("Safety limit reached: {} issues", limit);
                self.done = true;
                return None;
            }
            if self.shrink_to_limit {
                let remaining = (limit - self.collected).min(u32::MAX as usize) as u32;
                size = size.min(remaining);
            }
        }
        self.last_requested = size;
        Some((self.start_at, size))
    }

    /// 受け取ったページ件数を反映する
    pub fn advance(&mut self, received: usize) {
        self.collected += received;
        self.start_at = self.start_at.saturating_add(received as u32);
        if received == 0 || received < self.last_requested as usize {
            self.done = true;
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn collected(&self) -> usize {
        self.collected
    }
}

/// 検索クエリのページング設定
#[derive(Debug, Clone)]
pub struct SearchPagination {
    pub page_size: u32,
    pub safety_limit: usize,
    /// 真なら常に page_size 件ずつ要求する
    pub extract_all: bool,
    pub page_delay: Duration,
    pub fields: Vec<String>,
    pub expand: Vec<String>,
}

impl SearchPagination {
    /// `limit` が指定されていれば全件取得モードを無効にし、それを上限にする。0 は未指定と同じ
    pub fn from_config(config: &ExtractionConfig, limit: Option<usize>) -> Self {
        let limit = limit.filter(|&limit| limit > 0);
        Self {
            page_size: config.page_size,
            safety_limit: limit.unwrap_or(config.max_issues_fallback),
            extract_all: config.extract_all_issues && limit.is_none(),
            page_delay: config.page_delay(),
            fields: config.search_fields.clone(),
            expand: config.search_expand.clone(),
        }
    }

    pub fn cursor(&self) -> PageCursor {
        PageCursor::new(self.page_size).safety_limit(self.safety_limit, !self.extract_all)
    }

    pub fn describe(&self) -> String {
        if self.extract_all {
            format!("full extraction (ceiling {})", self.safety_limit)
        } else {
            format!("limited to {} issues", self.safety_limit)
        }
    }
}

/// 1つのクエリをページングで最後まで取得する。ページ順は保持される
pub async fn paginated_search(
    tracker: &dyn IssueTracker,
    jql: &str,
    pagination: &SearchPagination,
) -> Vec<Issue> {
    let mut cursor = pagination.cursor();
    let mut issues = Vec::new();

    while let Some((start_at, max_results)) = cursor.next_request() {
        debug!("Page: startAt={} maxResults={}", start_at, max_results);
        let params = SearchParams::new()
            .start_at(start_at)
            .max_results(max_results)
            .fields(pagination.fields.clone())
            .expand(pagination.expand.clone());

        let page = tracker.search(jql, params).await;
        cursor.advance(page.len());
        if !page.is_empty() {
            debug!("+{} issues (total: {})", page.len(), cursor.collected());
        }
        issues.extend(page);

        if !cursor.is_done() && !pagination.page_delay.is_zero() {
            tokio::time::sleep(pagination.page_delay).await;
        }
    }

    issues
}

/// キーで重複を除く（最初に現れたものを残す）。除いた件数も返す
pub fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> (Vec<T>, usize)
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let total = items.len();
    let mut seen_keys = HashSet::new();
    let mut deduplicated = Vec::with_capacity(total);

    for item in items {
        if seen_keys.insert(key(&item)) {
            deduplicated.push(item);
        }
    }

    let removed = total - deduplicated.len();
    (deduplicated, removed)
}
