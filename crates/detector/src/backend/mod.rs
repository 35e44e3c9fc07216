use ndarray::{Array2, Array4};
use std::path::Path;

#[cfg(feature = "opencv-backend")]
pub mod opencv;

/// A runnable Darknet network.
///
/// Forward passes mutate the network, so a loaded backend serves one
/// prediction at a time. Load one backend per worker (or put it behind a
/// `Mutex`) to predict concurrently.
pub trait InferenceBackend {
    /// Read a network from its `.cfg` description and `.weights` blob
    fn load_darknet(config: &Path, weights: &Path) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Names of every layer, in network order
    fn layer_names(&self) -> anyhow::Result<Vec<String>>;

    /// 1-based ids (into [`Self::layer_names`]) of the layers whose outputs
    /// feed nothing else
    fn unconnected_out_layers(&self) -> anyhow::Result<Vec<i32>>;

    /// Run the network on an NCHW blob and return one `[rows, columns]` tensor
    /// per requested output layer, in request order
    fn forward(
        &mut self,
        blob: &Array4<f32>,
        output_names: &[String],
    ) -> anyhow::Result<Vec<Array2<f32>>>;

    /// Names of the unconnected output layers
    fn output_layer_names(&self) -> anyhow::Result<Vec<String>> {
        let names = self.layer_names()?;
        self.unconnected_out_layers()?
            .into_iter()
            .map(|id| {
                usize::try_from(id)
                    .ok()
                    .and_then(|id| id.checked_sub(1))
                    .and_then(|idx| names.get(idx))
                    .cloned()
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "Output layer id {} out of range for {} layers",
                            id,
                            names.len()
                        )
                    })
            })
            .collect()
    }
}
