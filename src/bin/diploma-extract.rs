//! CLI binary for diploma-extract.
//!
//! A thin shim over the library crate: `serve` runs the HTTP adapter,
//! `extract` pushes a local PDF through the same handler the server uses.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use diploma_extract::{server, ExtractionRequest, Extractor, ExtractorConfig};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the extraction endpoint on port 8080
  diploma-extract serve --port 8080

  # Extract fields from a local diploma
  diploma-extract extract diploma.pdf --pretty

  # Call the running server
  curl -X POST localhost:8080/extract \
       -H 'Content-Type: application/json' \
       -d "{\"file\":\"$(base64 -w0 diploma.pdf)\"}"

ENVIRONMENT VARIABLES:
  YANDEX_API_KEY      YandexGPT API key (required at request time)
  YANDEX_FOLDER_ID    Yandex Cloud folder id (required at request time)
  PDFIUM_LIB_PATH     Path to an existing libpdfium
  RUST_LOG            Log filter, overrides --verbose / --quiet
"#;

/// Extract diploma fields from PDFs using YandexGPT.
#[derive(Parser, Debug)]
#[command(
    name = "diploma-extract",
    version,
    about = "Extract student, institution, degree and teacher from PDF diplomas",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Completion endpoint URL.
    #[arg(long, global = true, env = "DIPLOMA_EXTRACT_ENDPOINT")]
    endpoint: Option<String>,

    /// Model identifier (placed into gpt://<folder>/<model>).
    #[arg(long, global = true, env = "DIPLOMA_EXTRACT_MODEL")]
    model: Option<String>,

    /// Completion call timeout in seconds.
    #[arg(long, global = true, env = "DIPLOMA_EXTRACT_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DIPLOMA_EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DIPLOMA_EXTRACT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the extraction handler over HTTP.
    Serve {
        /// Address to bind.
        #[arg(long, env = "DIPLOMA_EXTRACT_HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        /// Port to bind.
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },

    /// Extract fields from a local PDF and print the JSON record.
    Extract {
        /// Path to the PDF diploma.
        input: PathBuf,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    fn extractor_config(&self) -> Result<ExtractorConfig> {
        let mut builder = ExtractorConfig::builder().timeout_secs(self.timeout);
        if let Some(ref endpoint) = self.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(ref model) = self.model {
            builder = builder.model(model);
        }
        builder.build().context("invalid extractor configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    let extractor = Arc::new(Extractor::new(cli.extractor_config()?));

    match cli.command {
        Command::Serve { host, port } => {
            server::serve(SocketAddr::new(host, port), extractor)
                .await
                .with_context(|| format!("server on {host}:{port} failed"))?;
        }
        Command::Extract { input, pretty } => {
            let bytes = tokio::fs::read(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;

            let body = serde_json::json!({ "file": STANDARD.encode(&bytes) }).to_string();
            let response = extractor
                .handle_from_env(ExtractionRequest::post(body))
                .await;

            if response.status_code != 200 {
                bail!("HTTP {}: {}", response.status_code, response.body);
            }

            if pretty {
                let value: serde_json::Value = serde_json::from_str(&response.body)
                    .context("handler returned a non-JSON body")?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", response.body);
            }
        }
    }

    Ok(())
}
