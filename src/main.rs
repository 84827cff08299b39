//! cleanmate - Reports system load and safely clears whitelisted caches.
//!
//! Usage:
//!   cleanmate analyze [-t TARGET]...   Show what could be recovered
//!   cleanmate clean [-t TARGET]... -y  Delete whitelisted temp and cache files
//!   cleanmate targets                  List the whitelist
//!   cleanmate stats                    Show CPU, RAM and disk load
//!   cleanmate chat <MESSAGE>           Ask the assistant
//!   cleanmate --help                   Show help

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};

use cleanmate_assistant::{
    ActionInterpreter, ActionKind, AssistantContext, ChatMode, ChatSession, HistoryStore, Report,
    ReportKind, ReportStore, ScriptedAdvisor, SystemMetrics, SystemMonitor,
};
use cleanmate_core::{
    Analysis, CleanConfig, Cleanup, PathWhitelist, Privilege, PrivilegeProbe, ProgressEvent,
    SystemProbe,
};
use cleanmate_ops::{CleanService, CleanUpdate, start_clean};

#[derive(Parser)]
#[command(
    name = "cleanmate",
    version,
    about = "Reports system load and safely clears temp and cache directories",
    long_about = "cleanmate finds recoverable space in temporary folders, browser caches \
                  and system logs, and removes it without ever leaving the whitelisted \
                  directories.\n\nRun `cleanmate analyze` first; `cleanmate clean --yes` \
                  performs the deletion."
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan whitelisted targets and report recoverable space
    Analyze {
        /// Target to scan (repeatable; defaults to every configured target)
        #[arg(short = 't', long = "target")]
        targets: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete the contents of whitelisted targets
    Clean {
        /// Target to clean (repeatable; defaults to every configured target)
        #[arg(short = 't', long = "target")]
        targets: Vec<String>,

        /// Actually delete; without this only a preview is shown
        #[arg(short, long)]
        yes: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List whitelisted targets and their roots
    Targets,

    /// Show current CPU, memory and disk usage
    Stats {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Send a message to the assistant
    Chat {
        /// The message
        message: String,

        /// Conversation mode (analysis, optimization, hardware)
        #[arg(short, long, default_value = "analysis")]
        mode: ChatMode,
    },

    /// Print the assistant's greeting
    Greet {
        /// Conversation mode (analysis, optimization, hardware)
        #[arg(short, long, default_value = "analysis")]
        mode: ChatMode,
    },

    /// Show or clear chat history
    History {
        /// Remove all stored messages
        #[arg(long)]
        clear: bool,
    },

    /// Show stored analyze and clean reports
    Reports {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs, loaded once.
struct App {
    config: CleanConfig,
    whitelist: PathWhitelist,
    reports: ReportStore,
    history: HistoryStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CleanConfig::load_or_default(cli.config.as_deref())
        .wrap_err("Failed to load configuration")?;
    let data_dir = config.data_dir();
    log::debug!("Data directory: {}", data_dir.display());

    let app = App {
        whitelist: PathWhitelist::system_default(),
        reports: ReportStore::new(&data_dir, config.report_limit),
        history: HistoryStore::new(&data_dir, config.history_limit),
        config,
    };

    match cli.command {
        Command::Analyze { targets, format } => run_analyze(&app, targets, format).await?,
        Command::Clean {
            targets,
            yes,
            format,
        } => {
            if yes {
                run_clean(&app, targets, format).await?;
            } else {
                run_preview(&app, targets, format).await?;
            }
        }
        Command::Targets => run_targets(&app),
        Command::Stats { format } => run_stats(format).await?,
        Command::Chat { message, mode } => run_chat(&app, &message, mode).await?,
        Command::Greet { mode } => {
            let ctx = build_context(&app, mode).await;
            println!("{}", ScriptedAdvisor::new().greeting(&ctx));
        }
        Command::History { clear } => run_history(&app, clear).await?,
        Command::Reports { format } => run_reports(&app, format).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn service_for(app: &App, targets: Vec<String>) -> CleanService {
    let mut config = app.config.clone();
    if !targets.is_empty() {
        config.targets = targets;
    }
    CleanService::new(app.whitelist.clone(), config)
}

/// Draw a single-line progress indicator on stderr.
fn progress_line(event: ProgressEvent) {
    let mut stderr = std::io::stderr();
    let _ = write!(
        stderr,
        "\r\x1b[2K{} {:>3}% {}",
        event.phase,
        event.percent_complete,
        truncate(&event.current_item_label, 40)
    );
    if event.percent_complete == 100 {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}

async fn analyze(app: &App, targets: Vec<String>, format: OutputFormat) -> Result<Analysis> {
    let service = service_for(app, targets);
    let mut sink = |event: ProgressEvent| {
        if format == OutputFormat::Text {
            progress_line(event);
        }
    };
    let analysis = service.analyze(&mut sink).await.wrap_err("Analysis failed")?;

    if let Err(err) = app.reports.save(Report::from_analysis(&analysis)).await {
        tracing::warn!(error = %err, "could not save report");
    }
    Ok(analysis)
}

/// Scan and summarize.
async fn run_analyze(app: &App, targets: Vec<String>, format: OutputFormat) -> Result<()> {
    let analysis = analyze(app, targets, format).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Text => {
            print_analysis(&analysis);

            let mut ctx = build_context(app, ChatMode::Analysis).await;
            ctx.record_analysis(&analysis);
            let reply = ScriptedAdvisor::new().respond("clean", &ctx);
            println!();
            println!("{}", reply.text);
            if let Some(action) = reply.action {
                println!("  -> {}", command_hint(action.kind, &action.targets));
            }
        }
    }
    Ok(())
}

/// Show what `clean --yes` would remove.
async fn run_preview(app: &App, targets: Vec<String>, format: OutputFormat) -> Result<()> {
    let analysis = analyze(app, targets, format).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Text => {
            print_analysis(&analysis);
            println!();
            println!(
                "Would remove {} files ({}). Re-run with --yes to delete.",
                analysis.result.file_count,
                format_size(analysis.result.total_recoverable_bytes)
            );
        }
    }
    Ok(())
}

/// Delete in the background and stream progress.
async fn run_clean(app: &App, targets: Vec<String>, format: OutputFormat) -> Result<()> {
    let service = Arc::new(service_for(app, targets));
    let mut rx = start_clean(service);

    let mut result = None;
    while let Some(update) = rx.recv().await {
        match update {
            CleanUpdate::Progress(event) => {
                if format == OutputFormat::Text {
                    progress_line(event);
                }
            }
            CleanUpdate::Complete(outcome) => result = Some(outcome),
        }
    }

    let cleanup: Cleanup = result
        .ok_or_else(|| color_eyre::eyre::eyre!("Cleanup task ended without a result"))?
        .wrap_err("Cleanup failed")?;

    if let Err(err) = app.reports.save(Report::from_cleanup(&cleanup)).await {
        tracing::warn!(error = %err, "could not save report");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cleanup)?),
        OutputFormat::Text => {
            let mut ctx = AssistantContext::default();
            ctx.record_cleanup(&cleanup);

            println!("{}", "─".repeat(60));
            println!(" {}", cleanup.outcome.summary());
            println!(
                " Freed {} of {} scanned",
                format_size(cleanup.outcome.freed_bytes),
                format_size(cleanup.scanned_bytes)
            );
            if cleanup.outcome.items_vanished > 0 {
                println!(" {} items were already gone", cleanup.outcome.items_vanished);
            }
            println!("{}", "─".repeat(60));

            if let Some(snapshot) = ctx.last_cleanup.filter(|s| !s.warnings.is_empty()) {
                println!();
                println!("{} warning(s):", snapshot.warnings.len());
                for warning in snapshot.warnings.iter().take(20) {
                    println!("  {}", truncate(warning, 100));
                }
                if snapshot.warnings.len() > 20 {
                    println!("  ... and {} more", snapshot.warnings.len() - 20);
                }
            }
        }
    }
    Ok(())
}

fn print_analysis(analysis: &Analysis) {
    let result = &analysis.result;

    println!();
    println!("{}", "─".repeat(60));
    println!(
        " Recoverable: {} ({} MB)",
        format_size(result.total_recoverable_bytes),
        result.recoverable_mb()
    );
    println!(
        " {} files, {} directories",
        result.file_count, result.dir_count
    );
    println!("{}", "─".repeat(60));

    if !result.category_totals.is_empty() {
        println!();
        println!("By target:");
        for (name, total) in &result.category_totals {
            let ratio = if result.total_recoverable_bytes > 0 {
                total.bytes as f64 / result.total_recoverable_bytes as f64
            } else {
                0.0
            };
            println!(
                "  {:<24} {:>10} {:>7} files {}",
                truncate(name, 24),
                format_size(total.bytes),
                total.count,
                make_bar(ratio, 10)
            );
        }
    }

    if !result.top_entries.is_empty() {
        println!();
        println!("Largest files:");
        for entry in &result.top_entries {
            println!(
                "  {:>10}  {}",
                format_size(entry.size_bytes),
                truncate(&entry.path.display().to_string(), 70)
            );
        }
    }

    if !result.read_only_entries.is_empty() {
        println!();
        println!(
            "{} read-only file(s) may not be removable",
            result.read_only_entries.len()
        );
    }

    for warning in &analysis.warnings {
        println!("warning: {warning}");
    }
}

fn run_targets(app: &App) {
    for target in app.whitelist.targets() {
        let marker = match target.privilege {
            Privilege::User => "",
            Privilege::Elevated => " (administrator)",
        };
        println!("{}{}", target.name, marker);
        for root in &target.roots {
            let state = if root.exists() { "" } else { "  [missing]" };
            println!("    {}{}", root.display(), state);
        }
    }
}

async fn run_stats(format: OutputFormat) -> Result<()> {
    let metrics = SystemMonitor::new().sample().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&metrics)?),
        OutputFormat::Text => print_metrics(&metrics),
    }
    Ok(())
}

fn print_metrics(metrics: &SystemMetrics) {
    println!(" CPU   {:>3}% {}", metrics.cpu_load, make_bar(f64::from(metrics.cpu_load) / 100.0, 20));
    println!(" RAM   {:>3}% {}", metrics.ram_used, make_bar(f64::from(metrics.ram_used) / 100.0, 20));
    println!(" Disk  {:>3}% {}", metrics.disk_used, make_bar(f64::from(metrics.disk_used) / 100.0, 20));
    println!(" Free  {} GB", metrics.disk_free_gb);
    println!(" Status: {}", metrics.status);
}

/// Assemble the assistant context from live metrics and stored reports.
async fn build_context(app: &App, mode: ChatMode) -> AssistantContext {
    let metrics = SystemMonitor::new().sample().await;
    let admin = SystemProbe.is_elevated();
    AssistantContext::new(mode, metrics, admin).with_reports(app.reports.load().await)
}

async fn run_chat(app: &App, message: &str, mode: ChatMode) -> Result<()> {
    let ctx = build_context(app, mode).await;
    let session = ChatSession::new(
        ScriptedAdvisor::new(),
        app.history.clone(),
        ActionInterpreter::new(app.whitelist.clone()),
    );

    let turn = session
        .send(message, &ctx)
        .await
        .wrap_err("Failed to store chat history")?;

    println!("{}", turn.reply.message);
    if let Some(ready) = turn.ready {
        println!();
        println!(
            "Suggested: {} ({})",
            ready.action.label, ready.action.description
        );
        println!("  -> {}", command_hint(ready.action.kind, &ready.action.targets));
    } else if let Some(reason) = turn.rejected {
        println!();
        println!("Suggested action was blocked: {reason}");
    }
    Ok(())
}

async fn run_history(app: &App, clear: bool) -> Result<()> {
    if clear {
        app.history.clear().await.wrap_err("Failed to clear history")?;
        println!("Chat history cleared");
        return Ok(());
    }

    let entries = app.history.load().await;
    if entries.is_empty() {
        println!("No chat history");
    }
    for entry in entries {
        println!(
            "[{}] {:?}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.role,
            entry.message.lines().next().unwrap_or_default()
        );
    }
    Ok(())
}

async fn run_reports(app: &App, format: OutputFormat) -> Result<()> {
    let reports = app.reports.load().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("No reports yet. Run `cleanmate analyze` to create one.");
            }
            for report in &reports {
                let when = report.timestamp.format("%Y-%m-%d %H:%M");
                match report.kind {
                    ReportKind::Analysis => println!(
                        "{when}  analysis  {} MB recoverable in {} files",
                        report.stats.recoverable_mb, report.stats.file_count
                    ),
                    ReportKind::Cleanup => println!(
                        "{when}  cleanup   freed {} MB, {} deleted, {} failed",
                        report.stats.freed_mb, report.stats.files_deleted, report.stats.failed
                    ),
                }
            }
        }
    }
    Ok(())
}

/// The command that carries out a suggested action.
fn command_hint(kind: ActionKind, targets: &[String]) -> String {
    match kind {
        ActionKind::Analyze => "cleanmate analyze".to_string(),
        ActionKind::Clean => {
            let flags: Vec<String> = targets.iter().map(|t| format!("-t {t}")).collect();
            format!("cleanmate clean {} --yes", flags.join(" "))
        }
        ActionKind::OpenSettings => match CleanConfig::default_path() {
            Some(path) => format!("edit {}", path.display()),
            None => "edit your cleanmate config.toml".to_string(),
        },
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio.clamp(0.0, 1.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
