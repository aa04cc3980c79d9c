use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Hours, IssueRecord};

/// 分布の1行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub label: String,
    pub count: usize,
    /// 全Issueに対する割合（%）
    pub percentage: f64,
}

/// 抽出結果の集計値
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_issues: usize,
    pub hours_spent: Hours,
    pub hours_estimated: Hours,
    /// 見積りが 0 の場合は None
    pub progress_percent: Option<f64>,
    pub by_type: Vec<DistributionEntry>,
    /// スプリント未設定のIssueは含めない
    pub by_sprint: Vec<DistributionEntry>,
}

impl ExtractionSummary {
    pub fn from_records(records: &[IssueRecord]) -> Self {
        let total_issues = records.len();
        let hours_spent: Hours = records.iter().map(|r| r.time.time_spent).sum();
        let hours_estimated: Hours = records.iter().map(|r| r.time.original_estimate).sum();
        let progress_percent = (!hours_estimated.is_zero())
            .then(|| hours_spent.as_f64() / hours_estimated.as_f64() * 100.0);

        let by_type = distribution(
            records.iter().map(|r| r.issue_type.as_str()),
            total_issues,
        );
        let by_sprint = distribution(
            records
                .iter()
                .filter(|r| r.structure.sprint.is_assigned())
                .map(|r| r.structure.sprint.name.as_str()),
            total_issues,
        );

        Self {
            total_issues,
            hours_spent,
            hours_estimated,
            progress_percent,
            by_type,
            by_sprint,
        }
    }

    /// 集計値をログに出す
    pub fn log(&self) {
        info!("Total issues: {}", self.total_issues);
        info!("Hours spent: {} h", self.hours_spent);
        info!("Hours estimated: {} h", self.hours_estimated);
        if let Some(progress) = self.progress_percent {
            info!("Progress: {}%", format!("{:.1}", progress).replace('.', ","));
        }
        for entry in &self.by_type {
            info!("  {}: {} ({:.1}%)", entry.label, entry.count, entry.percentage);
        }
        for entry in &self.by_sprint {
            info!("  {}: {} ({:.1}%)", entry.label, entry.count, entry.percentage);
        }
    }
}

/// 件数の多い順（同数はラベル順）
fn distribution<'a>(labels: impl Iterator<Item = &'a str>, total: usize) -> Vec<DistributionEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut entries: Vec<DistributionEntry> = counts
        .into_iter()
        .map(|(label, count)| DistributionEntry {
            label: label.to_string(),
            count,
            percentage: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            },
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries
}
