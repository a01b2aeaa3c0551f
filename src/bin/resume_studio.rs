use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use resume_studio_lib::core::backend::HttpResumeBackend;
use resume_studio_lib::core::models::{RecordId, SelectedFile, ViewModel};
use resume_studio_lib::core::render::{render_history, render_profile};
use resume_studio_lib::core::service::{SessionService, SubmitOutcome};
use resume_studio_lib::core::session::Tab;
use resume_studio_lib::core::settings_store::SettingsStore;
use resume_studio_lib::init_logging;

#[derive(Parser)]
#[command(author, version, about = "Resume Studio client", long_about = None)]
struct Cli {
    /// Backend base address (overrides RESUME_STUDIO_API_BASE and the settings file)
    #[arg(long = "api-base", global = true)]
    api_base: Option<String>,
    /// Print the derived profile as JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[arg(long = "log-level", global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF resume and show the parsed profile
    Upload { path: PathBuf },
    /// List previously processed resumes
    History,
    /// Show the parsed profile of one processed resume
    Show { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let settings = SettingsStore::new()
        .with_api_base(cli.api_base.clone())
        .load()
        .await?;
    let service = SessionService::http(&settings)?;

    let code = match &cli.command {
        Commands::Upload { path } => upload(&service, path, cli.json).await?,
        Commands::History => {
            service.switch_tab(Tab::History).await;
            let state = service.snapshot().await;
            if let Some(err) = state.history_error {
                eprintln!("Could not load history: {err}");
                1
            } else {
                let rows = state.history;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else if rows.is_empty() {
                    println!("No resumes processed yet");
                } else {
                    println!("{}", render_history(&rows));
                }
                0
            }
        }
        Commands::Show { id } => {
            let id = RecordId::new(id.clone());
            if service.open_details(&id).await {
                if let Some(view) = service.detail_view().await {
                    print_view(&view, cli.json)?;
                }
                0
            } else {
                eprintln!("Could not load details for resume {id}");
                1
            }
        }
    };

    service.shutdown();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn upload(
    service: &SessionService<HttpResumeBackend>,
    path: &Path,
    json: bool,
) -> anyhow::Result<i32> {
    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        return Ok(2);
    }

    let file_name = path
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("resume.pdf")
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    service.select_file(SelectedFile::new(file_name, bytes)).await;
    match service.submit().await {
        SubmitOutcome::Uploaded(_) => {
            if let Some(view) = service.active_view().await {
                print_view(&view, json)?;
            }
            Ok(0)
        }
        _ => {
            let notice = service.snapshot().await.notice.map(|n| n.message);
            eprintln!("{}", notice.unwrap_or_else(|| "Upload failed".to_string()));
            Ok(1)
        }
    }
}

fn print_view(view: &ViewModel, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        println!("{}", render_profile(view));
    }
    Ok(())
}
