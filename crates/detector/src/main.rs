use anyhow::Context;
use common::TelemetryGuard;
use detector::{
    DarknetDetector, Detector, DetectorConfig, ImageFrame, backend::opencv::OpenCvBackend,
    logging::setup_logging,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DetectorConfig::from_env()?;

    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(TelemetryGuard::init(
            "detector",
            endpoint,
            config.environment,
        )?),
        None => {
            setup_logging(&config);
            None
        }
    };

    tracing::info!(config = ?config, "Loaded configuration");

    let detector = DarknetDetector::<OpenCvBackend>::new();

    let (identity, registered) = detector
        .register(&config.model_dir)
        .with_context(|| format!("Failed to register {}", config.model_dir.display()))?;

    let mut network = detector.load(&registered)?;
    tracing::info!(identity = %identity, "Model loaded successfully");

    let image = image::open(&config.image_path)
        .with_context(|| format!("Failed to open image {}", config.image_path.display()))?
        .to_rgb8();
    let frame = ImageFrame::rgb(image.width(), image.height(), image.into_raw());

    let detections = detector.predict(&mut network, &registered, &frame)?;
    tracing::info!(detections = detections.len(), "Prediction finished");

    let labelled: Vec<_> = detections
        .iter()
        .map(|d| {
            json!({
                "label": registered.labels.name(d.class_id),
                "class_id": d.class_id,
                "confidence": d.confidence,
                "bbox": d.bbox,
            })
        })
        .collect();

    let report = json!({
        "identity": identity,
        "detections": detections,
        "labelled": labelled,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
