use anyhow::Context;
use executor::backend::enn::EnnDriver;
use executor::labels::load_labels;
use executor::logging::setup_logging;
use executor::session::{ClassifySession, ModelIo};
use executor::ExecutorConfig;
use pipeline::image::RgbImage;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let config = ExecutorConfig::from_env()?;

    setup_logging(&config);

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let image_path = std::env::args()
        .nth(1)
        .context("usage: classify <image-path>")?;

    let labels = load_labels(Path::new(&config.label_path))?;

    tracing::info!("Loading inference model");
    let mut session = ClassifySession::new(
        EnnDriver::new(),
        Path::new(&config.model_path),
        ModelIo::mobilenet_v2_quant(),
        labels,
        config.threshold,
    )?;
    tracing::info!("Model loaded successfully");

    let decoded = image::open(&image_path)
        .with_context(|| format!("failed to decode {image_path}"))?
        .to_rgb8();
    let frame = RgbImage::from_raw(decoded.width(), decoded.height(), decoded.into_raw())?;

    let (ranking, latency_ms) = session.process(&frame)?;

    tracing::info!(latency_ms, results = ranking.len(), "Inference complete");

    for entry in ranking.iter() {
        println!("{:<28} {:.4}", entry.label, entry.score);
    }

    Ok(())
}
