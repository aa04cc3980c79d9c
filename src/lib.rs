pub mod aggregate;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod selection;
pub mod strategy;
pub mod summary;
pub mod tracker;

pub use client::{JiraClient, JiraConfig};
pub use error::Error;
pub use models::*;
pub use tracker::IssueTracker;

// Config re-exports
pub use config::{
    AppConfig, ExportConfig, ExtractionConfig, FileConfigStore, KeywordRule, PassthroughField,
    load_app_config,
};

// Component re-exports
pub use aggregate::{AggregationOutcome, SubtaskAggregator, SubtaskClassifier};
pub use catalog::{BoardCache, BoardSprintCatalog};
pub use export::{ExportFormat, ExportOutcome, FileFormat, ReportExporter, ReportTable};
pub use extract::{ExtractionBatch, IssueFieldExtractor};
pub use pagination::{PageCursor, SearchPagination, dedup_by_key, paginated_search};
pub use selection::{SelectionInput, SprintSelection, SprintSelectionPolicy};
pub use strategy::{PlannedSearch, SearchStrategy, SearchStrategyPlanner, StrategyKind};
pub use summary::{DistributionEntry, ExtractionSummary};

// Pipeline re-exports
pub use pipeline::{ExtractionPipeline, ExtractionRequest, ExtractionResult};
