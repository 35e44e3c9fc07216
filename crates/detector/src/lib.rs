pub mod artifacts;
pub mod backend;
pub mod config;
pub mod detector;
pub mod errors;
pub mod identity;
pub mod labels;
pub mod logging;
pub mod network_config;
pub mod processing;
pub mod registration;

// Re-export commonly used types for convenience
pub use artifacts::{ArtifactKind, ArtifactSet};
pub use backend::InferenceBackend;
pub use config::DetectorConfig;
pub use detector::{DarknetDetector, Detector};
pub use errors::DetectorError;
pub use identity::{DetectorIdentity, DirectoryFingerprint, IdentityKeyDeriver};
pub use labels::{LabelCatalog, LabelEntry};
pub use network_config::NetworkGeometry;
pub use preprocess::{ColorFormat, ImageFrame};
pub use processing::post::{Detection, Detections, PostProcessor};
pub use registration::{RegisteredDetector, register};
