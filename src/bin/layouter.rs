//! CLI binary for effilayouter.
//!
//! A thin shim over the library crate: maps CLI flags to `WizardConfig` and
//! form inputs, then walks every visible step of the chosen pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use effilayouter::config::{API_BASE_ENV, DEFAULT_API_BASE};
use effilayouter::engine::normalise_pdf_name;
use effilayouter::registry;
use effilayouter::{
    ExecutionObserver, ExecutionOutcome, FileHandle, Language, SharedObserver, StepId, Wizard,
    WizardConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn title(step: StepId) -> &'static str {
    registry::find(step).map_or("?", |d| d.title)
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: one bar over the visible steps, with each step's log
/// lines printed above it as they arrive.
struct CliObserver {
    bar: ProgressBar,
    start_times: Mutex<HashMap<StepId, Instant>>,
}

impl CliObserver {
    fn new(total_steps: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:32.green/238}] {pos}/{len} steps  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total_steps as u64);
        bar.set_style(style);
        bar.set_prefix("Pipeline");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed(&self, step: StepId) -> String {
        let secs = self
            .start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&step)
            .map_or(0.0, |t| t.elapsed().as_secs_f64());
        dim(&format!("{secs:.1}s"))
    }
}

impl ExecutionObserver for CliObserver {
    fn on_execution_start(&self, step: StepId, _first_line: &str) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(step, Instant::now());
        self.bar.set_message(title(step));
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("Step {step}: {}", title(step)))));
    }

    fn on_log(&self, _step: StepId, line: &str) {
        self.bar.println(format!("    {}", dim(line)));
    }

    fn on_execution_success(&self, step: StepId, _message: &str) {
        self.bar
            .println(format!("  {} Step {step} done  {}", green("✓"), self.elapsed(step)));
        self.bar.inc(1);
    }

    fn on_execution_error(&self, step: StepId, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Step {step} failed  {}  {}",
            red("✗"),
            red(&msg),
            self.elapsed(step)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # English pipeline against a local service
  layouter contract.pdf

  # Arabic pipeline with four translation workers
  layouter --language arabic --max-workers 4 scan.pdf

  # Store the upload under another name
  layouter --save-as brochure report.pdf

  # Show the steps that would run, without contacting the service
  layouter --plan --language arabic

  # Check the service and list stored files
  layouter --health
  layouter --list --json

PIPELINES:
  english   1 upload → 2 language → 3 remove text → 4 extract characters
            → 6 reconstruct → 7 visualize → 8 compare
  arabic    1 upload → 2 language → 3 remove text → 4 extract lines
            → 5 translate → 6 reconstruct → 7 visualize → 8 compare

ENVIRONMENT VARIABLES:
  EFFILAYOUTER_API_BASE   Processing service URL (default http://localhost:8000)
  RUST_LOG                Override the log filter
"#;

/// Run a PDF through the EffiLayouter translation pipeline.
#[derive(Parser, Debug)]
#[command(
    name = "layouter",
    version,
    about = "Run a PDF through the EffiLayouter translation pipeline",
    long_about = "Upload a PDF to the EffiLayouter processing service and run every step of \
the chosen language pipeline in order: text removal, extraction, translation (Arabic only), \
reconstruction and visualisation. Stops at the first failing step.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file to process.
    #[arg(required_unless_present_any = ["plan", "health", "list"])]
    input: Option<PathBuf>,

    /// Processing pipeline.
    #[arg(short, long, env = "EFFILAYOUTER_LANGUAGE", value_enum, default_value = "english")]
    language: LanguageArg,

    /// Processing service base URL.
    #[arg(long, env = API_BASE_ENV, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Name to store the upload under (".pdf" is appended when missing).
    #[arg(long)]
    save_as: Option<String>,

    /// Parallel translation workers (Arabic).
    #[arg(long, default_value_t = 2,
          value_parser = clap::value_parser!(i64).range(1..=8))]
    max_workers: i64,

    /// Per-batch translation timeout in seconds (Arabic).
    #[arg(long, default_value_t = 120,
          value_parser = clap::value_parser!(i64).range(30..=600))]
    timeout_seconds: i64,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "EFFILAYOUTER_REQUEST_TIMEOUT", default_value_t = 900)]
    request_timeout: u64,

    /// Print the steps that would run and exit.
    #[arg(long)]
    plan: bool,

    /// Call the service health endpoint and exit.
    #[arg(long)]
    health: bool,

    /// List files in the service storage and exit.
    #[arg(long)]
    list: bool,

    /// Output structured JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    English,
    Arabic,
}

impl From<LanguageArg> for Language {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::English => Language::English,
            LanguageArg::Arabic => Language::Arabic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let language = Language::from(cli.language);
    let runs_pipeline = !(cli.plan || cli.health || cli.list);

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = runs_pipeline && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Plan mode ────────────────────────────────────────────────────────
    if cli.plan {
        print_plan(language, cli.json)?;
        return Ok(());
    }

    // ── Build session ────────────────────────────────────────────────────
    let visible = effilayouter::gating::visible_steps(language);
    let observer: Option<SharedObserver> = if show_progress {
        Some(CliObserver::new(visible.len()) as SharedObserver)
    } else {
        None
    };
    let config = build_config(&cli, language, observer)?;
    let wizard = Wizard::new(config).context("Failed to create session")?;

    if cli.health {
        let response = wizard.health().await.context("Health check failed")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            println!("{} {}", green("✔"), response.message);
        }
        return Ok(());
    }

    if cli.list {
        let files = wizard.list_files().await.context("Listing files failed")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&files)?);
        } else {
            for f in &files {
                let url = wizard.download_url(&f.filename);
                println!("{:<40} {:>10}  {}", f.filename, f.size, dim(&url));
            }
        }
        return Ok(());
    }

    // ── Bind inputs ──────────────────────────────────────────────────────
    let input = cli.input.as_ref().context("No input PDF given")?;
    let file = FileHandle::open(input)
        .with_context(|| format!("Cannot open input PDF {}", input.display()))?;
    wizard
        .set_input(1, "file", file)
        .context("Input rejected")?;
    if let Some(ref save_as) = cli.save_as {
        wizard.set_input(1, "save_as", save_as.as_str())?;
        wizard.set_input(3, "input_pdf", normalise_pdf_name(save_as))?;
    }
    wizard.set_input(5, "max_workers", cli.max_workers)?;
    wizard.set_input(5, "timeout_seconds", cli.timeout_seconds)?;

    // ── Run every visible step ───────────────────────────────────────────
    let started = Instant::now();
    let mut failure = None;
    for def in &visible {
        wizard.navigate_to(def.id)?;
        let outcome = wizard
            .execute(def.id)
            .await
            .with_context(|| format!("Step {} could not start", def.id))?;
        if !show_progress && !cli.quiet && !cli.json {
            match &outcome {
                ExecutionOutcome::Succeeded { step, message } => {
                    eprintln!("{} Step {step} {}: {message}", green("✓"), title(*step))
                }
                ExecutionOutcome::Failed { step, error } => {
                    eprintln!("{} Step {step} {}: {error}", red("✗"), title(*step))
                }
            }
        }
        if let ExecutionOutcome::Failed { step, error } = outcome {
            failure = Some((step, error));
            break;
        }
    }

    let download = wizard.download_url(&wizard.final_document());
    if cli.json {
        let report = json!({
            "language": language,
            "completed": failure.is_none(),
            "downloadUrl": failure.is_none().then_some(&download),
            "state": wizard.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some((step, error)) = failure {
        anyhow::bail!("Step {} ({}) failed: {}", step, title(step), error);
    }

    if !cli.json {
        println!("{download}");
    }
    if !cli.quiet && !cli.json {
        let progress = wizard.progress();
        eprintln!(
            "{}  {}/{} steps  {}ms",
            green("✔"),
            progress.completed,
            progress.visible,
            started.elapsed().as_millis()
        );
    }

    Ok(())
}

/// Map CLI args to `WizardConfig`.
fn build_config(
    cli: &Cli,
    language: Language,
    observer: Option<SharedObserver>,
) -> Result<WizardConfig> {
    let mut builder = WizardConfig::builder()
        .api_base(&cli.api_base)
        .request_timeout_secs(cli.request_timeout)
        .initial_language(language);
    if let Some(obs) = observer {
        builder = builder.observer(obs);
    }
    builder.build().context("Invalid configuration")
}

fn print_plan(language: Language, as_json: bool) -> Result<()> {
    let steps: Vec<_> = effilayouter::gating::visible_steps(language)
        .into_iter()
        .map(|def| {
            let action = registry::resolve(def, language).and_then(|r| r.action);
            (def, action)
        })
        .collect();

    if as_json {
        let plan: Vec<_> = steps
            .iter()
            .map(|(def, action)| json!({ "step": def.id, "title": def.title, "action": action }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{} pipeline:", bold(language.as_str()));
        for (def, action) in steps {
            let action = action.map_or_else(|| dim("(local)"), |a| a.to_string());
            println!("  {}  {:<26} {}", def.id, def.title, action);
        }
    }
    Ok(())
}
