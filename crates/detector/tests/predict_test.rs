use detector::{
    DarknetDetector, Detector, DetectorError, ImageFrame, InferenceBackend, RegisteredDetector,
};
use ndarray::{Array2, Array4};
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

/// Backend returning canned outputs and recording what it was fed
#[derive(Default)]
struct FakeBackend {
    layers: Vec<String>,
    out_layer_ids: Vec<i32>,
    outputs: Vec<Array2<f32>>,
    fail_forward: bool,
    seen_blob_shape: Option<Vec<usize>>,
    seen_names: Vec<String>,
}

impl FakeBackend {
    fn yolo(outputs: Vec<Array2<f32>>) -> Self {
        Self {
            layers: vec!["conv_0".into(), "yolo_1".into(), "conv_2".into()],
            out_layer_ids: vec![2],
            outputs,
            ..Default::default()
        }
    }
}

impl InferenceBackend for FakeBackend {
    fn load_darknet(_config: &Path, _weights: &Path) -> anyhow::Result<Self> {
        Ok(Self::yolo(Vec::new()))
    }

    fn layer_names(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn unconnected_out_layers(&self) -> anyhow::Result<Vec<i32>> {
        Ok(self.out_layer_ids.clone())
    }

    fn forward(
        &mut self,
        blob: &Array4<f32>,
        output_names: &[String],
    ) -> anyhow::Result<Vec<Array2<f32>>> {
        self.seen_blob_shape = Some(blob.shape().to_vec());
        self.seen_names = output_names.to_vec();
        if self.fail_forward {
            anyhow::bail!("CUDA out of memory");
        }
        Ok(self.outputs.clone())
    }
}

/// Backend whose network never loads
struct BrokenBackend;

impl InferenceBackend for BrokenBackend {
    fn load_darknet(config: &Path, _weights: &Path) -> anyhow::Result<Self> {
        anyhow::bail!("unsupported layer type in {}", config.display())
    }

    fn layer_names(&self) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn unconnected_out_layers(&self) -> anyhow::Result<Vec<i32>> {
        Ok(Vec::new())
    }

    fn forward(&mut self, _: &Array4<f32>, _: &[String]) -> anyhow::Result<Vec<Array2<f32>>> {
        Ok(Vec::new())
    }
}

fn two_class_dir() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("pets.names"), "cat\ndog\n").unwrap();
    fs::write(dir.path().join("pets.weights"), [0u8; 16]).unwrap();
    fs::write(dir.path().join("pets.cfg"), "[net]\nwidth=64\nheight=32\n").unwrap();
    dir
}

fn registered<B: InferenceBackend>(
    detector: &DarknetDetector<B>,
    dir: &TempDir,
) -> RegisteredDetector {
    detector.register(dir.path()).unwrap().1
}

fn gray_image(width: u32, height: u32) -> ImageFrame {
    ImageFrame::rgb(width, height, vec![127; (width * height * 3) as usize])
}

#[test]
fn test_single_row_yields_one_detection() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let output = Array2::from_shape_vec((1, 6), vec![0.5, 0.5, 0.2, 0.2, 0.1, 0.9]).unwrap();
    let mut backend = FakeBackend::yolo(vec![output]);

    let detections = detector
        .predict(&mut backend, &registered, &gray_image(100, 100))
        .unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections.boxes.shape(), &[1, 4]);
    let d = detections.get(0).unwrap();
    assert_eq!(d.class_id, 1);
    assert!((d.confidence - 0.9).abs() < 1e-6);
    assert_eq!(d.bbox, [40, 40, 60, 60]);
    assert!(detections.masks.is_none());
}

#[test]
fn test_blob_matches_network_geometry() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let mut backend = FakeBackend::yolo(vec![Array2::zeros((0, 7))]);
    detector
        .predict(&mut backend, &registered, &gray_image(200, 150))
        .unwrap();

    // NCHW, height 32 and width 64 from the cfg
    assert_eq!(backend.seen_blob_shape, Some(vec![1, 3, 32, 64]));
    assert_eq!(backend.seen_names, vec!["yolo_1".to_string()]);
}

#[test]
fn test_no_rows_gives_empty_rank_consistent_output() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let mut backend = FakeBackend::yolo(vec![Array2::zeros((0, 6))]);
    let detections = detector
        .predict(&mut backend, &registered, &gray_image(10, 10))
        .unwrap();

    assert!(detections.is_empty());
    assert_eq!(detections.boxes.shape(), &[0, 4]);
    assert_eq!(detections.scores.shape(), &[0]);
    assert_eq!(detections.class_ids.shape(), &[0]);
}

#[test]
fn test_shapeless_empty_layers_give_empty_output() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let mut backend = FakeBackend {
        layers: vec!["yolo_a".into(), "yolo_b".into()],
        out_layer_ids: vec![1, 2],
        outputs: vec![Array2::zeros((0, 0)), Array2::zeros((0, 3))],
        ..Default::default()
    };
    let detections = detector
        .predict(&mut backend, &registered, &gray_image(10, 10))
        .unwrap();

    assert!(detections.is_empty());
    assert_eq!(detections.boxes.shape(), &[0, 4]);
    assert_eq!(detections.scores.shape(), &[0]);
    assert_eq!(detections.class_ids.shape(), &[0]);
}

#[test]
fn test_rows_across_layers_keep_order() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let first = Array2::from_shape_vec((1, 7), vec![0.5, 0.5, 0.1, 0.1, 0.8, 0.7, 0.2]).unwrap();
    let second = Array2::from_shape_vec(
        (2, 7),
        vec![
            0.25, 0.25, 0.1, 0.1, 0.9, 0.1, 0.6, //
            0.75, 0.75, 0.1, 0.1, 0.9, 0.3, 0.3,
        ],
    )
    .unwrap();
    let mut backend = FakeBackend {
        layers: vec!["yolo_a".into(), "yolo_b".into()],
        out_layer_ids: vec![1, 2],
        outputs: vec![first, second],
        ..Default::default()
    };

    let detections = detector
        .predict(&mut backend, &registered, &gray_image(100, 100))
        .unwrap();

    let classes: Vec<u32> = detections.iter().map(|d| d.class_id).collect();
    // Ties resolve to the first class
    assert_eq!(classes, vec![0, 1, 0]);
    assert_eq!(detections.get(1).unwrap().bbox, [20, 20, 30, 30]);
}

#[test]
fn test_forward_failure_is_prediction_failed() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let mut backend = FakeBackend {
        fail_forward: true,
        ..FakeBackend::yolo(Vec::new())
    };

    let err = detector
        .predict(&mut backend, &registered, &gray_image(10, 10))
        .unwrap_err();
    assert!(matches!(err, DetectorError::PredictionFailed(_)));
    assert!(err.to_string().contains("CUDA out of memory"));
}

#[test]
fn test_out_of_range_layer_id_is_prediction_failed() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let mut backend = FakeBackend {
        out_layer_ids: vec![9],
        ..FakeBackend::yolo(Vec::new())
    };

    let err = detector
        .predict(&mut backend, &registered, &gray_image(10, 10))
        .unwrap_err();
    assert!(matches!(err, DetectorError::PredictionFailed(_)));
    assert!(backend.seen_blob_shape.is_none(), "forward must not run");
}

#[test]
fn test_wrong_column_count_is_prediction_failed() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    // 4 box fields + 3 scores, but the catalog has 2 classes
    let mut backend = FakeBackend::yolo(vec![Array2::zeros((1, 9))]);

    let err = detector
        .predict(&mut backend, &registered, &gray_image(10, 10))
        .unwrap_err();
    assert!(matches!(err, DetectorError::PredictionFailed(_)));
}

#[test]
fn test_truncated_image_is_prediction_failed() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let mut backend = FakeBackend::yolo(Vec::new());
    let image = ImageFrame::rgb(10, 10, vec![0; 12]);

    let err = detector
        .predict(&mut backend, &registered, &image)
        .unwrap_err();
    assert!(matches!(err, DetectorError::PredictionFailed(_)));
}

#[test]
fn test_load_uses_registered_artifacts() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<FakeBackend>::new();
    let registered = registered(&detector, &dir);

    let backend = detector.load(&registered).unwrap();
    assert_eq!(backend.output_layer_names().unwrap(), vec!["yolo_1"]);
}

#[test]
fn test_load_failure_is_backend_load_failed() {
    let dir = two_class_dir();
    let detector = DarknetDetector::<BrokenBackend>::new();
    let registered = registered(&detector, &dir);

    match detector.load(&registered) {
        Err(DetectorError::BackendLoadFailed(e)) => {
            assert!(e.to_string().contains("pets.cfg"));
        }
        Err(other) => panic!("expected BackendLoadFailed, got {other}"),
        Ok(_) => panic!("expected BackendLoadFailed"),
    }
}
