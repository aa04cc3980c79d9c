use crate::config::PassthroughField;
use crate::models::{IssueFields, MetadataFields, NamedRef, sentinel};

pub fn extract(fields: &IssueFields, passthrough: &[PassthroughField]) -> MetadataFields {
    MetadataFields {
        components: join_names(fields.components.as_deref(), ", ", sentinel::NO_COMPONENTS),
        labels: join_labels(fields.labels.as_deref()),
        fix_versions: join_names(fields.fix_versions.as_deref(), "; ", sentinel::NO_FIX_VERSION),
        passthrough: passthrough
            .iter()
            .map(|field| (field.column.clone(), passthrough_value(fields, &field.field_id)))
            .collect(),
    }
}

fn join_names(items: Option<&[NamedRef]>, separator: &str, empty: &str) -> String {
    let names: Vec<&str> = items
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        empty.to_string()
    } else {
        names.join(separator)
    }
}

fn join_labels(labels: Option<&[String]>) -> String {
    let labels: Vec<&str> = labels
        .unwrap_or_default()
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .collect();

    if labels.is_empty() {
        sentinel::NO_LABELS.to_string()
    } else {
        labels.join(", ")
    }
}

/// 参照型は name → value の順に解決する
fn passthrough_value(fields: &IssueFields, field_id: &str) -> String {
    fields
        .custom_field(field_id)
        .filter(|value| !value.is_empty())
        .map(|value| value.display_text())
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| sentinel::NO_DATA.to_string())
}
