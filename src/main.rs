use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use talktally::analyzer::TalkTimeAnalyzer;
use talktally::config::read_app_config;
use talktally::speaker_stats::SpeakerBreakdown;
use talktally::wav_encoder;

#[derive(Parser)]
#[command(name = "talktally")]
#[command(about = "Per-speaker talk time from a recording or a WAV file")]
#[command(version)]
struct Args {
    /// Analyze an existing WAV file instead of recording
    #[arg(long)]
    file: Option<PathBuf>,

    /// Stop recording automatically after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = read_app_config(&args.config);
    if let Ok(key) = std::env::var("TALKTALLY_API_KEY") {
        if !key.is_empty() {
            config.engine.api_key = key;
        }
    }

    let mut analyzer = TalkTimeAnalyzer::new(config)?;

    // Forward request telemetry into the log
    let mut telemetry_rx = analyzer.telemetry_events();
    tokio::spawn(async move {
        while let Some(event) = telemetry_rx.recv().await {
            match (event.status, &event.error) {
                (Some(status), _) => log::debug!(
                    "{} {} -> {} in {}ms",
                    event.method,
                    event.url,
                    status,
                    event.latency_ms
                ),
                (None, Some(error)) => log::warn!(
                    "{} {} failed after {}ms: {}",
                    event.method,
                    event.url,
                    event.latency_ms,
                    error
                ),
                (None, None) => log::debug!("{} {} issued", event.method, event.url),
            }
        }
    });

    let (encoded, file_name_hint) = match &args.file {
        Some(path) => {
            println!("Loading {}...", path.display());
            let buffer = wav_encoder::read_wav_file(path)?;
            let hint = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input.wav".to_string());
            (wav_encoder::encode(&buffer)?, hint)
        }
        None => {
            analyzer.start_capture()?;
            match args.duration {
                Some(secs) => {
                    println!("Recording for up to {} seconds, Ctrl+C to stop early...", secs);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                        _ = tokio::signal::ctrl_c() => {
                            println!();
                        }
                    }
                }
                None => {
                    println!("Recording... press Ctrl+C to stop.");
                    tokio::signal::ctrl_c().await?;
                    println!();
                }
            }
            (analyzer.stop_capture()?, "recording.wav".to_string())
        }
    };

    println!("Submitting {} bytes for diarization...", encoded.len());
    let outcome = analyzer
        .run_diarization(&encoded, &file_name_hint)
        .await?;
    let breakdown = analyzer.aggregate(&outcome.segments, outcome.total_duration_ms);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    } else {
        print_report(&breakdown);
    }

    Ok(())
}

fn format_duration(ms: f64) -> String {
    let total_secs = (ms / 1000.0).round() as u64;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

fn print_report(breakdown: &SpeakerBreakdown) {
    println!("=====================================");
    println!(
        "Total duration: {}",
        format_duration(breakdown.total_duration_ms)
    );
    for speaker in &breakdown.speakers {
        println!(
            "{:<12} {:>6}  {:5.1}%",
            speaker.label,
            format_duration(speaker.speaking_time_ms),
            speaker.percentage
        );
        for example in &speaker.speech_examples {
            println!("    \"{}\"", example);
        }
    }
}
