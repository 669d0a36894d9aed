use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yt_ai_transcript::transcript::{PageContext, StaticPage};
use yt_ai_transcript::{extract_video_id, Config, VideoProcessor};

const NO_TRANSCRIPT: &str = "No transcript available for this video";

fn video_arg() -> Arg {
    Arg::new("video")
        .value_name("VIDEO")
        .help("Video ID or YouTube URL")
        .required(true)
}

fn cli() -> Command {
    Command::new("YouTube AI Transcript")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Fetch YouTube transcripts and ask AI about them")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .global(true),
        )
        .subcommand(
            Command::new("transcript")
                .about("Print the transcript of a video")
                .arg(video_arg())
                .arg(
                    Arg::new("html")
                        .long("html")
                        .value_name("FILE")
                        .help("Saved watch page to read captions from first"),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .value_parser(["text", "timestamped", "json"])
                        .default_value("timestamped"),
                )
                .arg(
                    Arg::new("no-cache")
                        .long("no-cache")
                        .help("Skip the transcript cache")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("summarize")
                .about("Summarize a video")
                .arg(video_arg())
                .arg(Arg::new("title").short('t').long("title").value_name("TITLE")),
        )
        .subcommand(Command::new("key-points").about("List the key points of a video").arg(video_arg()))
        .subcommand(Command::new("moments").about("List timestamped key moments").arg(video_arg()))
        .subcommand(
            Command::new("chat")
                .about("Ask a question about a video")
                .arg(video_arg())
                .arg(Arg::new("message").value_name("MESSAGE").required(true)),
        )
}

fn load_config(matches: &ArgMatches) -> Config {
    let loaded = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path)),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        Config::default()
    })
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("yt_ai_transcript={},warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn video_id(matches: &ArgMatches) -> Result<String> {
    let raw = matches
        .get_one::<String>("video")
        .ok_or_else(|| anyhow!("Missing video argument"))?;
    extract_video_id(raw).ok_or_else(|| anyhow!("Not a YouTube video ID or URL: {}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches);
    init_logging(&config, matches.get_flag("verbose"));

    if let Err(e) = config.validate() {
        warn!("Configuration problem: {}", e);
    }
    info!("🚀 YouTube AI Transcript starting...");

    match matches.subcommand() {
        Some(("transcript", sub)) => {
            let code = run_transcript(config, sub).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Some(("summarize", sub)) => {
            let video_id = video_id(sub)?;
            let processor = VideoProcessor::new(config, None)?;
            let title = sub.get_one::<String>("title").map(String::as_str);
            println!("{}", processor.summarize(&video_id, title).await?);
        }
        Some(("key-points", sub)) => {
            let video_id = video_id(sub)?;
            let processor = VideoProcessor::new(config, None)?;
            println!("{}", processor.key_points(&video_id).await?);
        }
        Some(("moments", sub)) => {
            let video_id = video_id(sub)?;
            let processor = VideoProcessor::new(config, None)?;
            println!("{}", processor.key_moments(&video_id).await?);
        }
        Some(("chat", sub)) => {
            let video_id = video_id(sub)?;
            let message = sub
                .get_one::<String>("message")
                .ok_or_else(|| anyhow!("Missing message argument"))?;
            let processor = VideoProcessor::new(config, None)?;
            let reply = processor.chat(&video_id, message).await?;
            println!("{}", reply.reply);
            info!("💬 Conversation now holds {} messages", reply.history.len());
        }
        _ => return Err(anyhow!("Unknown command")),
    }

    Ok(())
}

/// Returns the process exit code
async fn run_transcript(mut config: Config, matches: &ArgMatches) -> Result<i32> {
    let video_id = video_id(matches)?;
    let format = matches.get_one::<String>("format").map(String::as_str).unwrap_or("timestamped");
    let use_cache = !matches.get_flag("no-cache");
    if !use_cache {
        config.cache.enabled = false;
    }

    let page: Option<Arc<dyn PageContext>> = match matches.get_one::<String>("html") {
        Some(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path))?;
            Some(Arc::new(StaticPage::new(html).with_video_id(video_id.clone())))
        }
        None => None,
    };

    let processor = VideoProcessor::new(config, page)?;
    let start_time = std::time::Instant::now();
    let acquired = processor.transcript(&video_id, use_cache).await?;

    let Some(acquired) = acquired else {
        if format == "json" {
            println!("{}", serde_json::json!({ "success": false, "error": NO_TRANSCRIPT }));
            return Ok(2);
        }
        println!("{}", NO_TRANSCRIPT);
        return Ok(0);
    };

    let transcript = &acquired.transcript;
    info!(
        "🎉 {} segments from {} in {:.2}s",
        transcript.len(),
        acquired.source,
        start_time.elapsed().as_secs_f64()
    );

    match format {
        "text" => println!("{}", transcript.full_text()),
        "json" => println!("{}", serde_json::to_string_pretty(transcript)?),
        _ => println!("{}", transcript.timestamped_text()),
    }

    Ok(0)
}
