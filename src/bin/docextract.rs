//! CLI binary for doc-extractor.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalyzerConfig` / `ServerConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use doc_extractor::{
    analyze_inputs, build_model, create_pdf_from_text, serve, write_pdf, AnalysisProgressCallback,
    AnalyzerConfig, AppState, ProgressCallback, ServerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the document currently being analysed.
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_analysis_start` tells us how many documents there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analysing");
    }

    fn take_elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, _doc_num: usize, _total: usize, filename: &str) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_document_complete(&self, doc_num: usize, total: usize, answer_len: usize) {
        let secs = self.take_elapsed_secs();
        self.bar.println(format!(
            "  {} Document {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            doc_num,
            total,
            dim(&format!("{answer_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, doc_num: usize, total: usize, error: &str) {
        let secs = self.take_elapsed_secs();

        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} Document {:>3}/{:<3}  {}  {}",
            red("✗"),
            doc_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_analysis_complete(&self, _total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} document(s) analysed",
            green("✔"),
            bold(&success_count.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the upload form on http://127.0.0.1:8501
  docextract serve

  # Analyse two invoices, print the details and write analysis_results.pdf
  docextract analyze invoice-1.pdf invoice-2.pdf

  # Analyse a photographed receipt, JSON output
  docextract analyze --json receipt.jpg > receipt.json

  # Analyse from a URL and choose the output file
  docextract analyze https://example.com/invoice.pdf -o out/summary.pdf

  # Render existing text files into the summary layout (no API key needed)
  docextract render notes-1.txt notes-2.txt -o summary.pdf

  # Use another provider through edgequake-llm
  docextract --provider openai --model gpt-4.1-nano analyze invoice.pdf

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Gemini API key (default provider)
  DOCEXTRACT_MODEL        Override model ID (default: gemini-1.5-flash)
  DOCEXTRACT_PROVIDER     Route through an edgequake-llm provider
                          (openai, anthropic, gemini, ollama, …)
  OPENAI_API_KEY, ANTHROPIC_API_KEY, …
                          Keys read by edgequake-llm providers
  RUST_LOG                Override log filter
"#;

/// Extract customer, product and billing details from PDFs and images.
#[derive(Parser, Debug)]
#[command(
    name = "docextract",
    version,
    about = "Extract customer, product and billing details from PDFs and images with an LLM",
    long_about = "Send PDF text or images to an LLM with a fixed extraction prompt and compile \
the answers into a downloadable, paginated PDF. Runs as a local web form or from the command line.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    model: ModelArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCEXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCEXTRACT_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "DOCEXTRACT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Gemini API key.
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID (e.g. gemini-1.5-flash, gemini-1.5-pro).
    #[arg(long, global = true, env = "DOCEXTRACT_MODEL")]
    model: Option<String>,

    /// Route calls through an edgequake-llm provider instead of Gemini.
    #[arg(long, global = true, env = "DOCEXTRACT_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file replacing the built-in extraction prompt.
    #[arg(long, global = true, env = "DOCEXTRACT_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Model temperature (0.0–2.0).
    #[arg(long, global = true, env = "DOCEXTRACT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-document model call timeout in seconds.
    #[arg(long, global = true, env = "DOCEXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "DOCEXTRACT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the upload form and JSON API.
    Serve {
        /// Listen address.
        #[arg(long, env = "DOCEXTRACT_BIND", default_value = "127.0.0.1:8501")]
        bind: SocketAddr,

        /// Largest accepted request body in MiB.
        #[arg(long, env = "DOCEXTRACT_MAX_UPLOAD_MB", default_value_t = 25)]
        max_upload_mb: usize,
    },

    /// Analyse local files or URLs (PDF, PNG, JPEG).
    Analyze {
        /// Local file paths or HTTP/HTTPS URLs, analysed in order.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Write the summary PDF here.
        #[arg(short, long, default_value = "analysis_results.pdf")]
        output: PathBuf,

        /// Do not write the summary PDF.
        #[arg(long, conflicts_with = "output")]
        no_pdf: bool,

        /// Print structured JSON (AnalysisOutput) instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Render text files as blocks into the summary PDF, without a model.
    Render {
        /// Text files; each becomes one block.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output PDF path.
        #[arg(short, long, default_value = "analysis_results.pdf")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs during `analyze`.
    let json = matches!(cli.command, Command::Analyze { json: true, .. });
    let is_analyze = matches!(cli.command, Command::Analyze { .. });
    let show_progress = is_analyze && !cli.quiet && !cli.no_progress && !json;
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

    match cli.command {
        Command::Serve {
            bind,
            max_upload_mb,
        } => {
            let config = build_config(&cli.model, None).await?;
            let model = build_model(&config).context("Cannot start without a model")?;
            let server = ServerConfig {
                bind,
                max_upload_bytes: max_upload_mb * 1024 * 1024,
            };
            if !cli.quiet {
                eprintln!(
                    "{} Document Information Extractor on {}",
                    cyan("◆"),
                    bold(&format!("http://{bind}"))
                );
            }
            let state = AppState::new(model, config, &server).context("Cannot build the web pages")?;
            serve(state, &server).await.context("Server failed")?;
        }

        Command::Analyze {
            inputs,
            output,
            no_pdf,
            json,
        } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new_dynamic() as Arc<dyn AnalysisProgressCallback>)
            } else {
                None
            };
            let config = build_config(&cli.model, progress).await?;

            let result = analyze_inputs(&inputs, &config)
                .await
                .context("Analysis failed")?;

            if json {
                let text =
                    serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
                println!("{text}");
            } else {
                let combined = result.combined_text();
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(combined.as_bytes())
                    .context("Failed to write to stdout")?;
                if !combined.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }

            if !no_pdf {
                write_pdf(&result, &output)
                    .await
                    .context("Failed to write summary PDF")?;
                if !cli.quiet {
                    eprintln!(
                        "{}  {} document(s)  {}ms  →  {}",
                        green("✔"),
                        result.stats.total_documents,
                        result.stats.total_duration_ms,
                        bold(&output.display().to_string()),
                    );
                }
            }
        }

        Command::Render { files, output } => {
            let mut blocks = Vec::with_capacity(files.len());
            for path in &files {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {:?}", path))?;
                blocks.push(text);
            }
            let pdf = create_pdf_from_text(&blocks).context("Failed to render PDF")?;
            let bytes = pdf.into_inner();
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("Failed to write {:?}", output))?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} block(s)  {} bytes  →  {}",
                    green("✔"),
                    blocks.len(),
                    dim(&bytes.len().to_string()),
                    bold(&output.display().to_string()),
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
async fn build_config(args: &ModelArgs, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let prompt = if let Some(ref path) = args.prompt_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        if text.trim().is_empty() {
            bail!("Prompt file {:?} is empty", path);
        }
        Some(text)
    } else {
        None
    };

    let mut builder = AnalyzerConfig::builder()
        .api_timeout_secs(args.api_timeout)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(prompt) = prompt {
        builder = builder.prompt(prompt);
    }
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
