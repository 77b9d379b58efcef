use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use image_upscaler::config::session::{API_KEY_ENV, DEFAULT_MODEL_ID, DEFAULT_OUTPUT, DEFAULT_QUEUE_URL};
use image_upscaler::config::config::DEFAULT_PROMPT;
use image_upscaler::{
    Credentials, Endpoint, ErrorSeverity, HasRecoverySuggestion, ProgressEvent, SessionConfig, SessionState,
    SourceImage, UpscaleConfig, UpscaleSession,
};

/// Upscale an image with a hosted AI model:
/// - encodes the image and submits it to the provider's queue
/// - reports progress while the job runs
/// - downloads the result and saves it as PNG
#[derive(Parser, Debug)]
#[command(name = "upscale")]
#[command(about = "🖼️ AI image upscaler backed by a hosted inference model")]
#[command(long_about = "Upload a PNG or JPEG image to a hosted AI upscaling model, follow its progress
and save the enhanced result as PNG.")]
struct Args {
    /// Input image (PNG or JPEG)
    #[arg(help = "Image to upscale (.png, .jpg, .jpeg)")]
    input: PathBuf,

    /// Output PNG path
    #[arg(short, long, default_value = DEFAULT_OUTPUT, help = "Where to save the upscaled PNG")]
    output: PathBuf,

    /// API key of the inference provider
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, default_value = "",
          help = "Inference provider API key")]
    api_key: String,

    /// Text prompt guiding the upscaler
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Creativity, 0.0 to 1.0
    #[arg(long, default_value_t = 0.35, help = "How much new detail the model may invent (0.0-1.0)")]
    creativity: f64,

    /// Resemblance, 0.0 to 1.0
    #[arg(long, default_value_t = 0.6, help = "How closely the result follows the input (0.0-1.0)")]
    resemblance: f64,

    /// Upscale factor, 1.0 to 4.0
    #[arg(short = 'f', long, default_value_t = 2.0, help = "Output size multiplier (1.0-4.0)")]
    upscale_factor: f64,

    /// Model identifier
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// Queue API base URL
    #[arg(long, default_value = DEFAULT_QUEUE_URL)]
    queue_url: String,

    /// Delay between status polls in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_interval_ms: u64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let params = UpscaleConfig::new(
        args.prompt,
        args.creativity,
        args.resemblance,
        args.upscale_factor,
    );
    if let Err(err) = params.validate() {
        eprintln!("⚠️  {}", err);
        return Ok(ExitCode::from(2));
    }

    let config = SessionConfig::new(
        Credentials::new(args.api_key),
        Endpoint::new(args.queue_url, args.model),
        Duration::from_millis(args.poll_interval_ms),
        args.output,
    );

    let source = match SourceImage::from_path(&args.input).await {
        Ok(source) => source,
        Err(err) => {
            eprintln!("⚠️  {}", err);
            if let Some(hint) = err.recovery_suggestion() {
                eprintln!("   {}", hint);
            }
            return Ok(ExitCode::from(2));
        }
    };
    println!("Original Size: {}x{}", source.width(), source.height());

    let mut session = UpscaleSession::from_config(&config, params);
    session.set_source(Some(source));

    let print_progress = |event: ProgressEvent| {
        eprintln!("[{:>11}] {}", event.stage, event.message);
    };

    session.run(&print_progress).await;
    match session.state() {
        SessionState::Displaying(output) => {
            println!("New Size: {}x{}", output.width(), output.height());
        }
        SessionState::Failed(report) => {
            let marker = if report.severity <= ErrorSeverity::Warning { "⚠️ " } else { "❌" };
            eprintln!("{} Error occurred: {}", marker, report.message);
            for cause in &report.causes {
                eprintln!("   caused by: {}", cause);
            }
            if let Some(hint) = &report.recovery_suggestion {
                eprintln!("   {}", hint);
            }
            return Ok(ExitCode::from(1));
        }
        _ => {
            eprintln!("⚠️  {}", session.warning().unwrap_or(image_upscaler::MISSING_INPUT_WARNING));
            return Ok(ExitCode::from(2));
        }
    }

    session.download(&config.output).await?;
    println!("Saved: {}", config.output.display());
    Ok(ExitCode::SUCCESS)
}

/// `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
