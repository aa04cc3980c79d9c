use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;

use crate::config::ExtractionConfig;
use crate::models::{Board, BoardSprint, Sprint, SprintState};
use crate::pagination::{PageCursor, dedup_by_key};
use crate::tracker::IssueTracker;

/// プロジェクトキーごとのボード一覧キャッシュ
///
/// 1回の実行（プロセス）の間だけ有効。キーごとに一度だけ書き込まれ、無効化はしない。
/// ボード一覧の取得に失敗した場合は書き込まないので、次の呼び出しで再取得される。
#[derive(Debug, Clone, Default)]
pub struct BoardCache {
    boards: HashMap<String, Vec<Board>>,
}

impl BoardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project_key: &str) -> Option<&[Board]> {
        self.boards.get(project_key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, project_key: &str, boards: Vec<Board>) {
        self.boards.entry(project_key.to_string()).or_insert(boards);
    }

    pub fn contains(&self, project_key: &str) -> bool {
        self.boards.contains_key(project_key)
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

/// ボードとスプリントの探索
pub struct BoardSprintCatalog<'a> {
    tracker: &'a dyn IssueTracker,
    cache: BoardCache,
    board_page_size: u32,
    sprint_page_size: u32,
    recent_sprint_days: i64,
    closed_sprints_per_board: usize,
}

impl<'a> BoardSprintCatalog<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, config: &ExtractionConfig) -> Self {
        Self::with_cache(tracker, config, BoardCache::new())
    }

    pub fn with_cache(
        tracker: &'a dyn IssueTracker,
        config: &ExtractionConfig,
        cache: BoardCache,
    ) -> Self {
        Self {
            tracker,
            cache,
            board_page_size: config.board_page_size,
            sprint_page_size: config.sprint_page_size,
            recent_sprint_days: config.recent_sprint_days,
            closed_sprints_per_board: config.closed_sprints_per_board,
        }
    }

    pub fn cache(&self) -> &BoardCache {
        &self.cache
    }

    pub fn into_cache(self) -> BoardCache {
        self.cache
    }

    /// プロジェクトのボード一覧。2回目以降はキャッシュを返す
    pub async fn project_boards(&mut self, project_key: &str) -> Vec<Board> {
        if let Some(boards) = self.cache.get(project_key) {
            debug!("Using cached boards for {}", project_key);
            return boards.to_vec();
        }

        let mut cursor = PageCursor::new(self.board_page_size);
        let mut all_boards = Vec::new();
        while let Some((start_at, max_results)) = cursor.next_request() {
            match self.tracker.board_page(start_at, max_results).await {
                Ok(page) => {
                    cursor.advance(page.values.len());
                    all_boards.extend(page.values);
                }
                Err(e) => {
                    warn!("Agile API unavailable while listing boards: {}", e);
                    return Vec::new();
                }
            }
        }

        let project_boards: Vec<Board> = all_boards
            .iter()
            .filter(|board| board.belongs_to(project_key))
            .cloned()
            .collect();
        info!(
            "Found {} boards in total, {} for project {}",
            all_boards.len(),
            project_boards.len(),
            project_key
        );

        self.cache.insert(project_key, project_boards.clone());
        project_boards
    }

    /// ボードのスプリント一覧。途中でエラーになった場合はそこまでの結果を返す
    pub async fn board_sprints(&self, board_id: u64, state: Option<SprintState>) -> Vec<Sprint> {
        let mut cursor = PageCursor::new(self.sprint_page_size);
        let mut sprints = Vec::new();
        while let Some((start_at, max_results)) = cursor.next_request() {
            match self
                .tracker
                .sprint_page(board_id, state, start_at, max_results)
                .await
            {
                Ok(page) => {
                    cursor.advance(page.values.len());
                    sprints.extend(page.values);
                }
                Err(e) => {
                    warn!("Failed to list sprints of board {}: {}", board_id, e);
                    break;
                }
            }
        }
        sprints
    }

    /// 全ボードのアクティブなスプリントと直近に閉じたスプリント
    ///
    /// アクティブが先、それぞれID降順。複数ボードに現れるスプリントは1件にまとめる。
    pub async fn active_and_recent_sprints(&mut self, project_key: &str) -> Vec<BoardSprint> {
        // 範囲外の日数は絞り込み無しとして扱う
        let cutoff = Duration::try_days(self.recent_sprint_days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        info!(
            "Looking for sprints created after {}",
            cutoff.format("%Y-%m-%d")
        );

        let boards = self.project_boards(project_key).await;
        if boards.is_empty() {
            warn!("No boards found for project {}", project_key);
            return Vec::new();
        }

        let mut collected = Vec::new();
        for board in &boards {
            let active: Vec<Sprint> = self
                .board_sprints(board.id, Some(SprintState::Active))
                .await
                .into_iter()
                .filter(|sprint| is_recent(sprint.created_date.as_deref(), cutoff))
                .collect();
            let closed = self
                .board_sprints(board.id, Some(SprintState::Closed))
                .await;
            let closed = latest_closed(closed, cutoff, self.closed_sprints_per_board);

            debug!(
                "Board {} ({}): {} active, {} recent closed",
                board.name,
                board.id,
                active.len(),
                closed.len()
            );

            collected.extend(active.into_iter().map(|sprint| BoardSprint {
                sprint,
                board_id: board.id,
                board_name: board.name.clone(),
                origin: SprintState::Active,
            }));
            collected.extend(closed.into_iter().map(|sprint| BoardSprint {
                sprint,
                board_id: board.id,
                board_name: board.name.clone(),
                origin: SprintState::Closed,
            }));
        }

        let merged = merge_duplicates(collected);
        let active = merged.iter().filter(|s| s.is_active()).count();
        info!(
            "Sprints available: {} active + {} recently closed",
            active,
            merged.len() - active
        );
        merged
    }
}

/// 作成日が cutoff 以降か。作成日が無い・解析できない場合は「最近」とみなす
pub fn is_recent(created: Option<&str>, cutoff: DateTime<Utc>) -> bool {
    match created.map(str::trim).filter(|value| !value.is_empty()) {
        None => true,
        Some(value) => match parse_timestamp(value) {
            Some(created) => created >= cutoff,
            None => true,
        },
    }
}

/// RFC 3339 と Jira の "+0000" 形式の両方を受け付ける
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// 最近作成された閉じたスプリントを完了日の新しい順に `limit` 件
fn latest_closed(sprints: Vec<Sprint>, cutoff: DateTime<Utc>, limit: usize) -> Vec<Sprint> {
    let mut recent: Vec<Sprint> = sprints
        .into_iter()
        .filter(|sprint| is_recent(sprint.created_date.as_deref(), cutoff))
        .collect();
    recent.sort_by(|a, b| b.completion_marker().cmp(a.completion_marker()));
    recent.truncate(limit);
    recent
}

/// スプリントIDで重複を除き、ボード名を "A (+B)" の形で連結する
fn merge_duplicates(sprints: Vec<BoardSprint>) -> Vec<BoardSprint> {
    let mut extra_boards: HashMap<u64, Vec<String>> = HashMap::new();
    for sprint in &sprints {
        extra_boards
            .entry(sprint.id())
            .or_default()
            .push(sprint.board_name.clone());
    }

    let (mut unique, removed) = dedup_by_key(sprints, BoardSprint::id);
    if removed > 0 {
        debug!("Removed {} duplicate sprints", removed);
    }

    for sprint in &mut unique {
        let Some(names) = extra_boards.get(&sprint.id()) else {
            continue;
        };
        for name in names.iter().skip(1) {
            if *name != sprint.board_name {
                sprint.board_name = format!("{} (+{})", sprint.board_name, name);
            }
        }
    }

    unique.sort_by(|a, b| {
        b.is_active()
            .cmp(&a.is_active())
            .then_with(|| b.id().cmp(&a.id()))
    });
    unique
}
