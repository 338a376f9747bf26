//! gesture_keys — interactive entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gesture_keys::app::{run, AppConfig, InputMode};
use key_select::{FingerState, KeyGrid};

/// Type with hand gestures: index picks a column, pinky a row,
/// thumb enters the key, middle deletes.
#[derive(Debug, Parser)]
#[command(name = "gesture_keys", version, about)]
struct Args {
    /// Key layout: rows split by '/', one character per key, '_' for a gap.
    #[arg(long, default_value_t = KeyGrid::qwerty())]
    layout: KeyGrid,

    /// Milliseconds between gesture ticks.
    #[arg(long, default_value_t = 100)]
    gesture_interval_ms: u64,

    /// Milliseconds per simulated/scripted capture [default: 33, or the
    /// gesture interval when replaying a script so no sample is skipped].
    #[arg(long)]
    capture_interval_ms: Option<u64>,

    /// Detector confidence / finger-extension threshold (0.0–1.0).
    #[arg(long, default_value_t = 0.75)]
    confidence: f32,

    /// Replay a comma-separated sample script instead of live input,
    /// e.g. "1_0_0_0,0_0_0_0,none"; fields are index_middle_pinky_thumb.
    /// A capture interval shorter than the gesture interval drops samples.
    #[arg(long, value_parser = parse_script)]
    script: Option<Script>,
}

const LIVE_CAPTURE_MS: u64 = 33;

impl Args {
    fn gesture_interval(&self) -> Duration {
        Duration::from_millis(self.gesture_interval_ms.max(1))
    }

    /// Scripts default to one sample per gesture tick.
    fn capture_interval(&self) -> Duration {
        match (self.capture_interval_ms, &self.script) {
            (Some(ms), _)    => Duration::from_millis(ms),
            (None, Some(_))  => self.gesture_interval().max(Duration::from_millis(LIVE_CAPTURE_MS)),
            (None, None)     => Duration::from_millis(LIVE_CAPTURE_MS),
        }
    }
}

/// Parsed `--script` value; `None` entries are "no hand visible".
#[derive(Clone, Debug, PartialEq)]
struct Script(Vec<Option<FingerState>>);

fn parse_script(s: &str) -> Result<Script, String> {
    let samples = s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item {
            "none" | "-" => Ok(None),
            packed => packed.parse::<FingerState>().map(Some).map_err(|e| format!("{:?}: {}", packed, e)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Script(samples))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Hand Gesture Keyboard                           ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let gesture_interval = args.gesture_interval();
    let capture_interval = args.capture_interval();

    let input = match args.script {
        Some(Script(samples)) => {
            println!("  Mode: scripted replay ({} samples)", samples.len());
            InputMode::Scripted(samples)
        }
        None => {
            #[cfg(feature = "leap")]
            println!("  Mode: LeapMotion hardware");
            #[cfg(not(feature = "leap"))]
            println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
            InputMode::default()
        }
    };
    println!();

    let cfg = AppConfig {
        grid:                 args.layout,
        input,
        gesture_interval,
        capture_interval,
        detection_confidence: args.confidence.clamp(0.0, 1.0),
    };

    match run(cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gesture keyboard failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_parses_samples_and_gaps() {
        let Script(s) = parse_script("1_0_0_0, none ,0_0_1_0,").unwrap();
        assert_eq!(
            s,
            vec![
                Some(FingerState::new(true, false, false, false)),
                None,
                Some(FingerState::new(false, false, true, false)),
            ]
        );
    }

    #[test]
    fn script_rejects_bad_sample() {
        assert!(parse_script("1_0_0_0,2_0_0_0").is_err());
    }

    #[test]
    fn args_default_to_qwerty_layout() {
        let args = Args::parse_from(["gesture_keys"]);
        assert_eq!(args.layout, KeyGrid::qwerty());
        assert_eq!(args.gesture_interval_ms, 100);
        assert!(args.script.is_none());
    }

    #[test]
    fn live_capture_defaults_to_33ms() {
        let args = Args::parse_from(["gesture_keys"]);
        assert_eq!(args.capture_interval(), Duration::from_millis(33));
    }

    #[test]
    fn script_paces_at_gesture_interval_by_default() {
        let args = Args::parse_from(["gesture_keys", "--script", "1_0_0_0,0_0_1_0"]);
        assert_eq!(args.capture_interval(), Duration::from_millis(100));

        let args = Args::parse_from([
            "gesture_keys", "--script", "1_0_0_0", "--gesture-interval-ms", "250",
        ]);
        assert_eq!(args.capture_interval(), Duration::from_millis(250));
    }

    #[test]
    fn explicit_capture_interval_wins_for_scripts() {
        let args = Args::parse_from([
            "gesture_keys", "--script", "1_0_0_0", "--capture-interval-ms", "10",
        ]);
        assert_eq!(args.capture_interval(), Duration::from_millis(10));
    }

    #[test]
    fn args_accept_custom_layout() {
        let args = Args::parse_from(["gesture_keys", "--layout", "AB/CD"]);
        assert_eq!(args.layout.height(), 2);
    }
}
