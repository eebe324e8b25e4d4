use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use vision_assist::{
    prompts::{tip_for, title_for},
    AnalysisMode, AnalysisResult, FailureKind, Settings, UploadedImage, VisionAssistant,
};

#[derive(Parser, Debug)]
#[command(name = "vision-assist", version, about)]
struct Cli {
    #[arg(value_name = "IMAGE", index = 1)]
    input: PathBuf,

    /// Analysis type: "safety" (navigation and hazards) or "daily" (labels and items)
    #[arg(short, long, default_value_t = AnalysisMode::SafetyNavigation)]
    mode: AnalysisMode,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result as JSON instead of markdown
    #[arg(long)]
    json: bool,

    /// Inference timeout in seconds
    #[arg(long, env = "VISION_TIMEOUT_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// JPEG quality used when re-encoding the image (1-100)
    #[arg(long, env = "VISION_JPEG_QUALITY", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", FailureKind::Configuration.user_hint());
            return ExitCode::from(2);
        }
    };
    if let Some(secs) = cli.timeout {
        settings = settings.with_timeout(Duration::from_secs(secs));
    }
    if let Some(quality) = cli.quality {
        settings = settings.with_jpeg_quality(quality);
    }

    let upload = match UploadedImage::from_path(&cli.input) {
        Ok(upload) => upload,
        Err(e) => {
            eprintln!("Error: Unable to read '{}'. {}", cli.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let assistant = VisionAssistant::from_settings(&settings);
    let result = assistant.assist(&upload, cli.mode).await;

    let rendered = if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error: Unable to serialize result. {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        match &result {
            AnalysisResult::Success { text } => render_markdown(cli.mode, text),
            AnalysisResult::Failure(failure) => {
                eprintln!("Error analyzing image: {}", failure);
                eprintln!("{}", failure.kind.user_hint());
                return ExitCode::FAILURE;
            }
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &rendered) {
                eprintln!("Error: Failed to write to '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            eprintln!("Successfully wrote analysis to: {}", path.display());
        }
        None => println!("{}", rendered),
    }

    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn render_markdown(mode: AnalysisMode, text: &str) -> String {
    format!(
        "## {}\n\n{}\n\n> Tip: {}\n",
        title_for(mode),
        text.trim(),
        tip_for(mode)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_and_quality_flags() {
        let cli = Cli::try_parse_from([
            "vision-assist",
            "photo.jpg",
            "--mode",
            "daily",
            "--timeout",
            "15",
            "--quality",
            "90",
        ])
        .unwrap();
        assert_eq!(cli.mode, AnalysisMode::DailyTasks);
        assert_eq!(cli.timeout, Some(15));
        assert_eq!(cli.quality, Some(90));
    }

    #[test]
    fn test_out_of_range_flags_are_rejected() {
        for args in [
            ["vision-assist", "photo.jpg", "--timeout", "0"],
            ["vision-assist", "photo.jpg", "--quality", "0"],
            ["vision-assist", "photo.jpg", "--quality", "101"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{:?} should be rejected", args);
        }
    }

    #[test]
    fn test_markdown_has_title_and_tip() {
        let rendered = render_markdown(AnalysisMode::SafetyNavigation, "  A clear hallway.\n");
        assert!(rendered.starts_with(&format!("## {}", title_for(AnalysisMode::SafetyNavigation))));
        assert!(rendered.contains("\n\nA clear hallway.\n\n"));
        assert!(rendered.contains("> Tip:"));
    }
}
