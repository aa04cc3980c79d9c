use async_trait::async_trait;
use log::{info, warn};
use std::collections::VecDeque;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

use crate::error::{Error, Result};
use crate::models::{BoardSprint, Sprint};
use crate::pagination::dedup_by_key;
use crate::tracker::IssueTracker;

/// スプリント選択の入力元
#[async_trait]
pub trait SelectionInput: Send {
    /// 1行読む。入力が終わっていれば None
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// 標準入力から読む
pub struct StdinInput {
    reader: BufReader<Stdin>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SelectionInput for StdinInput {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{} ", prompt)?;
        stderr.flush()?;

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// 決められた行を順に返す（`--sprints` 指定時やテストで使う）
#[derive(Debug, Clone, Default)]
pub struct FixedInput {
    lines: VecDeque<String>,
}

impl FixedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl SelectionInput for FixedInput {
    async fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// 入力の解釈結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRequest {
    /// 空入力。アクティブなスプリントをすべて使う
    Default,
    Explicit(Vec<u64>),
}

/// カンマ区切りのスプリントIDを解釈する。数値でないトークンがあればエラー
pub fn parse_selection(input: &str) -> Result<SelectionRequest> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(SelectionRequest::Default);
    }

    let ids = input
        .split(',')
        .map(str::trim)
        .map(|token| {
            token.parse::<u64>().map_err(|_| {
                Error::InvalidInput(format!(
                    "'{}' is not a sprint ID; enter numbers separated by commas",
                    token
                ))
            })
        })
        .collect::<Result<Vec<u64>>>()?;

    let (ids, _) = dedup_by_key(ids, |id| *id);
    Ok(SelectionRequest::Explicit(ids))
}

/// 選択されたスプリント
#[derive(Debug, Clone, Default)]
pub struct SprintSelection {
    /// 検索に使うスプリントID
    pub ids: Vec<u64>,
    /// 詳細を確認できたスプリント（明示指定の場合のみ）
    pub confirmed: Vec<Sprint>,
    /// 詳細取得に失敗したID（検索対象には残す）
    pub not_found: Vec<u64>,
    /// 既定のアクティブスプリントを使ったか
    pub defaulted: bool,
}

impl SprintSelection {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// どのスプリントを検索するか決める
pub struct SprintSelectionPolicy<'a> {
    tracker: &'a dyn IssueTracker,
    max_attempts: usize,
}

impl<'a> SprintSelectionPolicy<'a> {
    pub fn new(tracker: &'a dyn IssueTracker) -> Self {
        Self {
            tracker,
            max_attempts: 5,
        }
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// 入力を読み、解釈できるまで聞き直す。入力が尽きた場合は既定の選択になる
    pub async fn select(
        &self,
        available: &[BoardSprint],
        input: &mut dyn SelectionInput,
    ) -> Result<SprintSelection> {
        log_available(available);

        for _ in 0..self.max_attempts {
            let line = input
                .read_line("Sprint IDs to process (comma separated, Enter = active sprints):")
                .await?;
            let Some(line) = line else {
                return Ok(Self::default_selection(available));
            };

            match parse_selection(&line) {
                Ok(SelectionRequest::Default) => return Ok(Self::default_selection(available)),
                Ok(SelectionRequest::Explicit(ids)) => return Ok(self.confirm(ids).await),
                Err(e) => warn!("{}", e),
            }
        }

        Err(Error::InvalidInput(format!(
            "no valid sprint selection after {} attempts",
            self.max_attempts
        )))
    }

    /// アクティブなスプリントをすべて選ぶ
    pub fn default_selection(available: &[BoardSprint]) -> SprintSelection {
        let ids: Vec<u64> = available
            .iter()
            .filter(|sprint| sprint.is_active())
            .map(BoardSprint::id)
            .collect();

        if ids.is_empty() {
            warn!("No active sprints available");
        } else {
            info!("Processing {} active sprints by default", ids.len());
        }

        SprintSelection {
            ids,
            defaulted: true,
            ..SprintSelection::default()
        }
    }

    /// 指定IDごとに詳細を取得して確認結果を記録する。
    ///
    /// 詳細を読めないIDも `not_found` に記録するだけで、検索対象からは外さない。
    pub async fn confirm(&self, ids: Vec<u64>) -> SprintSelection {
        let mut selection = SprintSelection::default();

        for id in &ids {
            match self.tracker.sprint(*id).await {
                Ok(sprint) => {
                    info!("Sprint {} [{}] {}", sprint.id, sprint.state, sprint.name);
                    selection.confirmed.push(sprint);
                }
                Err(e) => {
                    warn!("Sprint {} not found: {}", id, e);
                    selection.not_found.push(*id);
                }
            }
        }

        info!(
            "Sprints confirmed: {}/{}",
            selection.confirmed.len(),
            ids.len()
        );
        selection.ids = ids;
        selection
    }
}

fn log_available(available: &[BoardSprint]) {
    for sprint in available {
        info!(
            "  {} [{}] {} ({})",
            sprint.id(),
            sprint.origin,
            sprint.sprint.name,
            sprint.board_name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SprintState;
    use crate::tracker::fake::FakeTracker;
    use std::sync::atomic::Ordering;

    fn available(id: u64, origin: SprintState) -> BoardSprint {
        BoardSprint {
            sprint: Sprint {
                id,
                name: format!("Sprint {}", id),
                state: origin,
                ..Sprint::default()
            },
            board_id: 1,
            board_name: "ABC board".to_string(),
            origin,
        }
    }

    fn detail(id: u64, state: SprintState) -> Sprint {
        Sprint {
            id,
            name: format!("Sprint {}", id),
            state,
            ..Sprint::default()
        }
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("").unwrap(), SelectionRequest::Default);
        assert_eq!(parse_selection("  \n").unwrap(), SelectionRequest::Default);
        assert_eq!(
            parse_selection("6393, 6364,5847").unwrap(),
            SelectionRequest::Explicit(vec![6393, 6364, 5847])
        );
        assert_eq!(
            parse_selection("7,7,8").unwrap(),
            SelectionRequest::Explicit(vec![7, 8])
        );
    }

    #[test]
    fn test_parse_selection_rejects_non_numeric_tokens() {
        assert!(matches!(parse_selection("12,abc"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_selection("12,,13"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_selection("-4"), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_empty_input_selects_active_sprints() {
        let tracker = FakeTracker::default();
        let policy = SprintSelectionPolicy::new(&tracker);
        let sprints = vec![
            available(31, SprintState::Active),
            available(30, SprintState::Active),
            available(29, SprintState::Closed),
        ];
        let mut input = FixedInput::new([""]);

        let selection = policy.select(&sprints, &mut input).await.unwrap();

        assert!(selection.defaulted);
        assert_eq!(selection.ids, vec![31, 30]);
        assert_eq!(tracker.sprint_detail_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_input_is_reprompted() {
        // Given: 1行目は不正、2行目は正しい
        let mut tracker = FakeTracker::default();
        tracker.sprint_details.insert(29, detail(29, SprintState::Closed));
        let policy = SprintSelectionPolicy::new(&tracker);
        let mut input = FixedInput::new(["29,x", "29"]);

        // When
        let selection = policy.select(&[], &mut input).await.unwrap();

        // Then: 2行目が採用される
        assert!(!selection.defaulted);
        assert_eq!(selection.ids, vec![29]);
        assert_eq!(selection.confirmed[0].state, SprintState::Closed);
    }

    #[tokio::test]
    async fn test_explicit_ids_flag_missing_sprints() {
        let mut tracker = FakeTracker::default();
        tracker.sprint_details.insert(1, detail(1, SprintState::Active));
        tracker.sprint_details.insert(3, detail(3, SprintState::Future));
        let policy = SprintSelectionPolicy::new(&tracker);

        let selection = policy.confirm(vec![1, 2, 3]).await;

        assert_eq!(selection.ids, vec![1, 2, 3]);
        assert_eq!(selection.confirmed.len(), 2);
        assert_eq!(selection.not_found, vec![2]);
        assert_eq!(tracker.sprint_detail_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unreadable_sprints_stay_selected() {
        // Given: どのスプリントの詳細も読めない
        let tracker = FakeTracker::default();
        let policy = SprintSelectionPolicy::new(&tracker);
        let mut input = FixedInput::new(["6393,6364"]);

        // When
        let selection = policy.select(&[], &mut input).await.unwrap();

        // Then: 指定したIDのまま検索に使う
        assert_eq!(selection.ids, vec![6393, 6364]);
        assert!(selection.confirmed.is_empty());
        assert_eq!(selection.not_found, vec![6393, 6364]);
    }

    #[tokio::test]
    async fn test_exhausted_input_uses_default() {
        let tracker = FakeTracker::default();
        let policy = SprintSelectionPolicy::new(&tracker);
        let sprints = vec![available(30, SprintState::Active)];
        let mut input = FixedInput::default();

        let selection = policy.select(&sprints, &mut input).await.unwrap();

        assert_eq!(selection.ids, vec![30]);
    }

    #[tokio::test]
    async fn test_too_many_invalid_attempts() {
        let tracker = FakeTracker::default();
        let policy = SprintSelectionPolicy::new(&tracker).max_attempts(2);
        let mut input = FixedInput::new(["a", "b", "1"]);

        let result = policy.select(&[], &mut input).await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
