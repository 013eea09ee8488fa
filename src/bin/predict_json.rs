//! One-shot prediction from a JSON patient record.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin predict_json -- [--model <path>] [--input patient.json] [--require-manifest]
//! ```
//!
//! Loads the classifier (from `--model`, else `HEARTLINE_MODEL_PATH`), then
//! reads a `PatientInputs` document (from `--input` or stdin) and prints the
//! result as JSON.
//!
//! # Exit codes
//!
//! - 0: prediction printed
//! - 1: bad arguments or unreadable input
//! - 2: model could not be loaded
//! - 3: input incomplete, notice printed

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use heartline::adapters::model::LoadOptions;
use heartline::adapters::sanitize::SanitizingMakeWriter;
use heartline::adapters::ArtifactClassifier;
use heartline::application::PredictionService;
use heartline::config::Settings;
use heartline::domain::{PatientField, PatientInputs};

const USAGE: &str =
    "Usage: predict_json [--model <path>] [--input <file>] [--require-manifest]";

const EXIT_OK: i32 = 0;
const EXIT_USAGE: i32 = 1;
const EXIT_MODEL: i32 = 2;
const EXIT_INCOMPLETE: i32 = 3;

/// What the process prints and how it exits.
#[derive(Debug)]
enum Report {
    /// JSON document on stdout
    Json(Value),
    /// Usage text on stdout (`--help`)
    Help,
    /// Message on stderr
    Error(String),
}

#[derive(Debug, Default)]
struct Args {
    model_path: Option<PathBuf>,
    input_path: Option<PathBuf>,
    require_manifest: bool,
    help: bool,
}

fn parse_args<I>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => {
                let p = args.next().unwrap_or_default();
                if p.is_empty() {
                    return Err(USAGE.to_string());
                }
                parsed.model_path = Some(PathBuf::from(p));
            }
            "--input" => {
                let p = args.next().unwrap_or_default();
                if p.is_empty() {
                    return Err(USAGE.to_string());
                }
                parsed.input_path = Some(PathBuf::from(p));
            }
            "--require-manifest" => parsed.require_manifest = true,
            "-h" | "--help" => parsed.help = true,
            other => return Err(format!("Unknown argument {other:?}\n{USAGE}")),
        }
    }

    Ok(parsed)
}

fn field_names(fields: &[PatientField]) -> Vec<&'static str> {
    fields.iter().map(|f| f.name()).collect()
}

/// Model first, then the record: a missing model is reported even when the
/// record is also bad.
fn run<I, R>(args: I, settings: &Settings, stdin: R) -> (i32, Report)
where
    I: IntoIterator<Item = String>,
    R: Read,
{
    let args = match parse_args(args) {
        Ok(args) => args,
        Err(message) => return (EXIT_USAGE, Report::Error(message)),
    };
    if args.help {
        return (EXIT_OK, Report::Help);
    }

    let model_path = args
        .model_path
        .unwrap_or_else(|| settings.model_path.clone());
    let options = LoadOptions {
        require_manifest: args.require_manifest || settings.require_manifest,
    };

    let classifier = match ArtifactClassifier::load(&model_path, options) {
        Ok(classifier) => classifier,
        Err(e) => {
            return (
                EXIT_MODEL,
                Report::Error(format!(
                    "Failed to load model from {}: {e}",
                    model_path.display()
                )),
            )
        }
    };

    let raw = match &args.input_path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut stdin = stdin;
            let mut buf = String::new();
            stdin.read_to_string(&mut buf).map(|_| buf)
        }
    };
    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => return (EXIT_USAGE, Report::Error(format!("Failed to read input: {e}"))),
    };

    let inputs: PatientInputs = match serde_json::from_str(&raw) {
        Ok(inputs) => inputs,
        Err(e) => return (EXIT_USAGE, Report::Error(format!("Invalid patient record: {e}"))),
    };

    let service = PredictionService::new(Arc::new(classifier));

    match service.evaluate(&inputs) {
        Ok(result) => (
            EXIT_OK,
            Report::Json(json!({
                "risk_level": result.risk_level.to_string(),
                "probability": result.probability,
                "probability_percent": result.probability_percent(),
            })),
        ),
        Err(incomplete) => (
            EXIT_INCOMPLETE,
            Report::Json(json!({
                "notice": incomplete.notice(),
                "missing": field_names(&incomplete.missing),
                "out_of_range": field_names(&incomplete.out_of_range),
            })),
        ),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(SanitizingMakeWriter::new(std::io::stderr))
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(EXIT_USAGE);
        }
    };

    let (code, report) = run(std::env::args().skip(1), &settings, std::io::stdin().lock());
    match report {
        Report::Json(value) => println!("{value}"),
        Report::Help => println!("{USAGE}"),
        Report::Error(message) => eprintln!("{message}"),
    }
    std::process::exit(code);
}
