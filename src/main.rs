use anyhow::{Context, Result};
use clap::Parser;
use splitcap::media::Ffmpeg;
use splitcap::subtitle::CaptionBuilder;
use splitcap::transcribe::WhisperClient;
use splitcap::{print_summary, Config, Pipeline};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "splitcap")]
#[command(version, about = "Split-screen video composer with burned-in captions")]
#[command(
    long_about = "Stack every video in the source folder over a random background clip, \
                  optionally burn word-level captions from OpenAI Whisper, and move the \
                  result to the output folder."
)]
struct Cli {
    /// Config file (defaults to ./splitcap.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip transcription and captions
    #[arg(long)]
    no_captions: bool,

    /// Language hint for transcription (e.g., en, ja, es)
    #[arg(short, long)]
    language: Option<String>,

    /// Hide the batch progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.no_captions {
        config.add_subtitles = false;
    }
    if let Some(language) = cli.language {
        config.language = Some(language);
    }
    config
        .validate()
        .context("Configuration validation failed")?;
    config
        .ensure_folders_exist()
        .context("Failed to create working folders")?;

    let tool = Ffmpeg::from_config(&config);
    tool.check().context("FFmpeg is required")?;

    info!("Source:     {}", config.source_dir.display());
    info!("Background: {}", config.background_dir.display());
    info!("Output:     {}", config.output_dir.display());
    info!("Codec:      {}", config.video_codec);
    info!("Captions:   {}", if config.add_subtitles { "on" } else { "off" });

    let mut pipeline = Pipeline::new(config.clone(), Box::new(tool)).with_progress(!cli.no_progress);

    if config.add_subtitles {
        let captions = CaptionBuilder::load(&config.ass_header_path)
            .context("Failed to read ASS header template")?;

        let api_key = config
            .openai_api_key
            .clone()
            .context("OPENAI_API_KEY not set")?;
        let mut whisper = WhisperClient::new(api_key);
        if let Some(language) = config.language.clone() {
            whisper = whisper.with_language(language);
        }

        pipeline = pipeline
            .with_caption_builder(captions)
            .with_transcriber(Box::new(whisper));
    }

    let report = pipeline.run_batch().await.context("Batch aborted")?;
    print_summary(&report);

    Ok(())
}
