use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use jira_sprint_report::error::{Error, Result};
use jira_sprint_report::selection::{FixedInput, StdinInput, parse_selection};
use jira_sprint_report::{
    AppConfig, ExportFormat, ExtractionPipeline, ExtractionRequest, FileConfigStore, JiraClient,
    JiraConfig, load_app_config,
};

#[derive(Parser)]
#[command(name = "jira-sprint-report")]
#[command(author, version, about = "Extract Jira issues and time tracking into Excel/CSV reports", long_about = None)]
struct Cli {
    /// Project key (e.g. ABC)
    #[arg(long, short, required_unless_present = "init_config")]
    project: Option<String>,

    /// Export format
    #[arg(long, short, value_enum, default_value_t = ExportFormat::Both)]
    format: ExportFormat,

    /// Maximum number of issues (unset or 0 = all, bounded by the safety ceiling)
    #[arg(long, short)]
    limit: Option<usize>,

    /// Use traditional search instead of sprint selection
    #[arg(long, conflicts_with = "sprints")]
    no_sprints: bool,

    /// Comma separated sprint IDs (skips the interactive prompt)
    #[arg(long)]
    sprints: Option<String>,

    /// Config file (or set JIRA_REPORT_CONFIG env var)
    #[arg(long, env = "JIRA_REPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Reports directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    if cli.init_config {
        let store = FileConfigStore::default_config_dir()?;
        let path = store.save_app_config(&AppConfig::default()).await?;
        info!("Default config written to {}", path.display());
        return Ok(true);
    }

    let project_key = cli
        .project
        .map(|key| key.trim().to_uppercase())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| Error::InvalidInput("project key is required".to_string()))?;

    let mut config = load_app_config(cli.config.as_deref()).await?;
    if let Some(dir) = cli.output_dir {
        config.export.reports_dir = dir;
    }

    // 認証情報の不足はネットワークに触れる前に報告する
    let client = JiraClient::new(JiraConfig::from_env()?)?;

    let request = ExtractionRequest::new(project_key)
        .format(cli.format)
        .limit(cli.limit)
        .use_sprints(!cli.no_sprints);
    let mut pipeline = ExtractionPipeline::new(&client, config);

    let result = match cli.sprints {
        Some(ids) => {
            parse_selection(&ids)?;
            pipeline.run(&request, &mut FixedInput::new([ids])).await
        }
        None => pipeline.run(&request, &mut StdinInput::new()).await,
    };

    for file in &result.exported_files {
        info!("Report: {}", file.display());
    }
    Ok(result.is_success)
}
