use log::{debug, info};
use std::collections::{HashMap, HashSet};

use crate::config::{ExtractionConfig, KeywordRule};
use crate::models::{IssueRecord, SubtaskCategory, SubtaskTotals};

/// キーワードでサブタスクを分類する
///
/// 種別名と要約を連結した小文字文字列に対し、表の順に部分一致を調べる。
/// どれにも一致しなければ desarrollo。
#[derive(Debug, Clone)]
pub struct SubtaskClassifier {
    rules: Vec<(SubtaskCategory, Vec<String>)>,
}

impl SubtaskClassifier {
    pub fn new(rules: &[KeywordRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let keywords = rule
                    .keywords
                    .iter()
                    .map(|keyword| keyword.to_lowercase())
                    .filter(|keyword| !keyword.is_empty())
                    .collect();
                (rule.category, keywords)
            })
            .collect();
        Self { rules }
    }

    pub fn categorize(&self, issue_type: &str, summary: &str) -> SubtaskCategory {
        let text = format!("{} {}", issue_type, summary).to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword.as_str())))
            .map(|(category, _)| *category)
            .unwrap_or(SubtaskCategory::Desarrollo)
    }
}

/// 集計の結果
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    /// 親Issue（サブタスク以外）。すべて `subtasks` が設定されている
    pub records: Vec<IssueRecord>,
    pub subtask_count: usize,
    /// 親に集計されたサブタスク数
    pub matched_subtasks: usize,
    /// 親が見つからず除外されたサブタスクのキー
    pub orphans: Vec<String>,
}

/// サブタスクの時間を親Issueに分類別で合算する
#[derive(Debug, Clone)]
pub struct SubtaskAggregator {
    classifier: SubtaskClassifier,
}

impl SubtaskAggregator {
    pub fn new(rules: &[KeywordRule]) -> Self {
        Self {
            classifier: SubtaskClassifier::new(rules),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.subtask_keywords)
    }

    pub fn classifier(&self) -> &SubtaskClassifier {
        &self.classifier
    }

    /// サブタスク以外のレコードだけを返す。サブタスクは親の合計に吸収される
    pub fn aggregate(&self, records: Vec<IssueRecord>) -> AggregationOutcome {
        let (subtasks, mut main_issues): (Vec<IssueRecord>, Vec<IssueRecord>) =
            records.into_iter().partition(IssueRecord::is_subtask);

        let mut by_parent: HashMap<String, Vec<&IssueRecord>> = HashMap::new();
        let mut orphans = Vec::new();
        for subtask in &subtasks {
            match subtask.parent_key() {
                Some(parent) => by_parent.entry(parent.to_string()).or_default().push(subtask),
                None => orphans.push(subtask.key.clone()),
            }
        }

        let main_keys: HashSet<&str> = main_issues.iter().map(|r| r.key.as_str()).collect();
        for (parent, children) in &by_parent {
            if !main_keys.contains(parent.as_str()) {
                orphans.extend(children.iter().map(|child| child.key.clone()));
            }
        }

        let mut matched_subtasks = 0;
        for issue in &mut main_issues {
            let mut totals = SubtaskTotals::default();
            if let Some(children) = by_parent.get(&issue.key) {
                for child in children {
                    let category = self.classifier.categorize(&child.issue_type, &child.summary);
                    debug!("{} -> {} ({})", child.key, issue.key, category);
                    totals.get_mut(category).add(&child.time);
                    matched_subtasks += 1;
                }
            }
            issue.subtasks = Some(totals);
        }

        orphans.sort();
        info!(
            "Aggregated {} of {} subtasks into {} issues ({} orphans dropped)",
            matched_subtasks,
            subtasks.len(),
            main_issues.len(),
            orphans.len()
        );

        AggregationOutcome {
            subtask_count: subtasks.len(),
            records: main_issues,
            matched_subtasks,
            orphans,
        }
    }
}
