//! Heartline: heart failure risk prediction.
//!
//! Main entry point for the terminal application.

use anyhow::Result;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartline::adapters::sanitize::SanitizingMakeWriter;
use heartline::adapters::ArtifactClassifier;
use heartline::application::PredictionService;
use heartline::config::Settings;
use heartline::tui::App;
use heartline::HeartlineError;

fn main() -> Result<()> {
    let settings = Settings::from_env().map_err(HeartlineError::from)?;

    // Writing logs to the terminal would corrupt the TUI (alternate screen),
    // so an interactive session logs to a file.
    let use_file = settings.log_to_file(std::io::stdout().is_terminal());

    let (writer, _guard) = if use_file {
        if let Some(parent) = settings.log_file.parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Heartline...");

    // Refuse to start without a usable classifier.
    let classifier = ArtifactClassifier::load(&settings.model_path, settings.load_options())
        .map_err(|e| {
            tracing::error!("Failed to load model from {:?}: {}", settings.model_path, e);
            HeartlineError::ClassifierUnavailable(e)
        })?;
    tracing::info!("Model loaded from {:?}", classifier.source());

    let service = PredictionService::new(Arc::new(classifier));
    let mut app = App::with_service(service);
    app.run()?;

    tracing::info!("Heartline shutdown complete.");
    Ok(())
}
