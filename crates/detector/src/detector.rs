use crate::{
    backend::InferenceBackend,
    errors::DetectorError,
    identity::{DetectorIdentity, DirectoryFingerprint, IdentityKeyDeriver},
    processing::post::{Detections, PostProcessor},
    registration::{RegisteredDetector, register},
};
use anyhow::Context;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use preprocess::{BlobPreProcessor, ImageFrame};
use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

/// One kind of detector: how artifacts are registered, loaded and run.
pub trait Detector {
    /// Immutable metadata produced once by [`Detector::register`]
    type Registered;
    /// Runnable model produced by [`Detector::load`]
    type Loaded;

    fn register(
        &self,
        directory: &Path,
    ) -> Result<(DetectorIdentity, Self::Registered), DetectorError>;

    fn load(&self, registered: &Self::Registered) -> Result<Self::Loaded, DetectorError>;

    /// Any failure is reported as [`DetectorError::PredictionFailed`].
    fn predict(
        &self,
        loaded: &mut Self::Loaded,
        registered: &Self::Registered,
        image: &ImageFrame,
    ) -> Result<Detections, DetectorError>;
}

struct DetectorMetrics {
    duration: Histogram<f64>,
    predictions: Counter<u64>,
    detections: Counter<u64>,
}

impl DetectorMetrics {
    fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 2.0,
        ];
        Self {
            duration: meter
                .f64_histogram("detector_predict_duration_seconds")
                .with_description("Time to run one prediction (blob + forward + decode)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            predictions: meter
                .u64_counter("detector_predictions_total")
                .with_description("Total predictions, by outcome")
                .build(),
            detections: meter
                .u64_counter("detector_detections_total")
                .with_description("Total detections produced")
                .build(),
        }
    }
}

/// Darknet (`.cfg` + `.weights` + `.names`) detector running on backend `B`.
pub struct DarknetDetector<B, K = DirectoryFingerprint> {
    key_deriver: K,
    metrics: DetectorMetrics,
    _backend: PhantomData<fn() -> B>,
}

impl<B: InferenceBackend> DarknetDetector<B> {
    pub fn new() -> Self {
        Self::with_key_deriver(DirectoryFingerprint)
    }
}

impl<B: InferenceBackend> Default for DarknetDetector<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: InferenceBackend, K: IdentityKeyDeriver> DarknetDetector<B, K> {
    pub fn with_key_deriver(key_deriver: K) -> Self {
        Self {
            key_deriver,
            metrics: DetectorMetrics::new("detector"),
            _backend: PhantomData,
        }
    }

    fn run_prediction(
        &self,
        backend: &mut B,
        registered: &RegisteredDetector,
        image: &ImageFrame,
    ) -> anyhow::Result<Detections> {
        image.validate().context("Invalid input image")?;
        let (image_height, image_width) = image.dimensions();

        let output_names = backend
            .output_layer_names()
            .context("Failed to select output layers")?;

        let mut preprocessor = BlobPreProcessor::new(registered.geometry.input_size());
        let blob = preprocessor.preprocess_frame(image)?;

        let outputs = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            backend
                .forward(&blob, &output_names)
                .context("Forward pass failed")?
        };

        if outputs.len() != output_names.len() {
            anyhow::bail!(
                "Backend returned {} outputs for {} requested layers",
                outputs.len(),
                output_names.len()
            );
        }

        PostProcessor::new(registered.num_classes()).decode(&outputs, image_height, image_width)
    }
}

impl<B: InferenceBackend, K: IdentityKeyDeriver> Detector for DarknetDetector<B, K> {
    type Registered = RegisteredDetector;
    type Loaded = B;

    fn register(
        &self,
        directory: &Path,
    ) -> Result<(DetectorIdentity, RegisteredDetector), DetectorError> {
        register(directory, &self.key_deriver)
    }

    fn load(&self, registered: &RegisteredDetector) -> Result<B, DetectorError> {
        let _s = common::span!("load");

        let artifacts = &registered.artifacts;
        tracing::info!(
            identity = %registered.identity,
            config = %artifacts.config_path().display(),
            weights = %artifacts.weights_path().display(),
            "Loading network"
        );

        B::load_darknet(artifacts.config_path(), artifacts.weights_path())
            .map_err(DetectorError::BackendLoadFailed)
    }

    #[tracing::instrument(skip_all, fields(identity = %registered.identity))]
    fn predict(
        &self,
        loaded: &mut B,
        registered: &RegisteredDetector,
        image: &ImageFrame,
    ) -> Result<Detections, DetectorError> {
        let start = Instant::now();
        let result = self.run_prediction(loaded, registered, image);
        self.metrics
            .duration
            .record(start.elapsed().as_secs_f64(), &[]);

        match result {
            Ok(detections) => {
                self.metrics
                    .predictions
                    .add(1, &[KeyValue::new("outcome", "ok")]);
                self.metrics.detections.add(detections.len() as u64, &[]);
                tracing::debug!(detections = detections.len(), "Prediction complete");
                Ok(detections)
            }
            Err(e) => {
                self.metrics
                    .predictions
                    .add(1, &[KeyValue::new("outcome", "error")]);
                tracing::error!(error = %format!("{e:#}"), "Prediction failed");
                Err(DetectorError::PredictionFailed(e))
            }
        }
    }
}
