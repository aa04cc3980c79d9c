use crate::models::{Hours, IssueFields, TimeFields};

/// timetracking と集計済み時間（サブタスク込み、API 側で計算済み）を読む
///
/// 値が無い項目はゼロになる。
pub fn extract(fields: &IssueFields) -> TimeFields {
    let tracking = fields.timetracking.clone().unwrap_or_default();

    TimeFields {
        time_spent: Hours::from_optional_seconds(tracking.time_spent_seconds),
        original_estimate: Hours::from_optional_seconds(tracking.original_estimate_seconds),
        remaining_estimate: Hours::from_optional_seconds(tracking.remaining_estimate_seconds),
        aggregate_time_spent: Hours::from_optional_seconds(fields.aggregate_time_spent),
        aggregate_original_estimate: Hours::from_optional_seconds(
            fields.aggregate_original_estimate,
        ),
        aggregate_time_estimate: Hours::from_optional_seconds(fields.aggregate_time_estimate),
    }
}
