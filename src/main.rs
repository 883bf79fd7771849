use clap::{Parser, Subcommand};
use mark_uploader::app::ports::{MarksApi, Notifier};
use mark_uploader::config::{self, Config};
use mark_uploader::constants;
use mark_uploader::infra::console_notifier::ConsoleNotifier;
use mark_uploader::infra::http_client::ReqwestMarksApi;
use mark_uploader::logging;
use mark_uploader::parser::FsUploadSource;
use mark_uploader::pipeline::validate_upload;
use mark_uploader::{UploadError, UploadKind, UploadPipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "mark_uploader")]
#[command(about = "Upload marks, personal circumstances and academic misconducts from CSV files")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file (default: config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a file and upload it to the marks API
    Upload {
        /// Upload kind. Available: student_marks, personal_circumstances, academic_misconducts
        #[arg(long, value_parser = parse_kind)]
        kind: UploadKind,
        /// CSV file to upload
        #[arg(long)]
        file: PathBuf,
        /// MIME type of the file, inferred from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        /// Bearer token, falls back to MARK_API_TOKEN
        #[arg(long)]
        token: Option<String>,
        /// Print the upload report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a file without contacting the API
    Validate {
        #[arg(long, value_parser = parse_kind)]
        kind: UploadKind,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn parse_kind(s: &str) -> Result<UploadKind, String> {
    s.parse::<UploadKind>().map_err(|_| {
        format!(
            "unknown upload kind '{}', expected one of: {}",
            s,
            constants::get_supported_kinds().join(", ")
        )
    })
}

fn file_source(file: PathBuf, content_type: Option<String>) -> FsUploadSource {
    let source = FsUploadSource::new(file);
    match content_type {
        Some(ct) => source.with_content_type(ct),
        None => source,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let config = Config::load(cli.config.as_deref())?;
    debug!("Loaded config: {:?}", config);

    match cli.command {
        Commands::Upload { kind, file, content_type, token, json } => {
            // with --json, stdout carries the report and nothing else
            let notifier: Arc<dyn Notifier> = if json {
                Arc::new(ConsoleNotifier::stderr())
            } else {
                Arc::new(ConsoleNotifier::stdout())
            };
            let say = |line: String| {
                if json {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            };

            say(format!("🔄 Uploading {} from {}...", kind, file.display()));
            let token = config::api_token(token);
            if token.is_none() {
                say(format!("❌ {}", UploadError::MissingCredential));
                return Ok(ExitCode::FAILURE);
            }
            let api: Arc<dyn MarksApi> =
                Arc::new(ReqwestMarksApi::new(&config.api.base_url, token, config.timeout())?);
            info!("Using marks API at {}", config.api.base_url);

            let pipeline = UploadPipeline::new(api, notifier, config.limits());
            match pipeline.run(kind, &file_source(file, content_type)).await {
                Ok(report) => {
                    say(format!("\n📊 Upload results for {}:", report.file_name));
                    say(format!("   Rows: {}", report.total_rows));
                    say(format!("   Created: {} ({} new students)", report.created, report.students_created));
                    say(format!("   Already uploaded: {}", report.already_exists));
                    say(format!("   Skipped: {}", report.skipped));
                    say(format!("   Failed: {}", report.failed));
                    if json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    }
                    Ok(ExitCode::SUCCESS)
                }
                // already reported through the notifier
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
        Commands::Validate { kind, file, content_type } => {
            println!("🔍 Validating {} from {}...", kind, file.display());
            let source = file_source(file, content_type);
            let notifier = ConsoleNotifier::stdout();
            match validate_upload(kind, &source, &config.limits(), &notifier) {
                Ok(_) => Ok(ExitCode::SUCCESS),
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
    }
}
