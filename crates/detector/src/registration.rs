use crate::{
    artifacts::ArtifactSet,
    errors::DetectorError,
    identity::{DetectorIdentity, IdentityKeyDeriver},
    labels::LabelCatalog,
    network_config::NetworkGeometry,
};
use std::path::Path;

/// Everything registration learns about an artifact directory. Immutable;
/// threaded explicitly into `load` and `predict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredDetector {
    pub artifacts: ArtifactSet,
    pub geometry: NetworkGeometry,
    pub labels: LabelCatalog,
    pub identity: DetectorIdentity,
}

impl RegisteredDetector {
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }
}

/// Resolve, parse and key an artifact directory. Sub-step errors are returned
/// as they are.
pub fn register<K: IdentityKeyDeriver + ?Sized>(
    directory: &Path,
    key_deriver: &K,
) -> Result<(DetectorIdentity, RegisteredDetector), DetectorError> {
    let _s = common::span!("register");

    let artifacts = ArtifactSet::resolve(directory)?;
    let geometry = NetworkGeometry::parse(artifacts.config_path())?;
    let labels = LabelCatalog::load(artifacts.labels_path())?;
    let identity = key_deriver.derive_key(directory)?;

    tracing::info!(
        identity = %identity,
        input_width = geometry.input_width,
        input_height = geometry.input_height,
        classes = labels.len(),
        "Detector registered"
    );

    let registered = RegisteredDetector {
        artifacts,
        geometry,
        labels,
        identity: identity.clone(),
    };

    Ok((identity, registered))
}
