use super::InferenceBackend;
use anyhow::Context;
use ndarray::{Array2, Array4};
use opencv::{
    core::{CV_32F, Mat, Scalar, Vector},
    dnn,
    prelude::*,
};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub enum ComputeTarget {
    Cpu,
    Cuda,
}

/// Darknet networks run through OpenCV's `dnn` module.
pub struct OpenCvBackend {
    net: dnn::Net,
}

impl OpenCvBackend {
    /// Load network with the specified compute target
    pub fn load_darknet_with_target(
        config: &Path,
        weights: &Path,
        target: ComputeTarget,
    ) -> anyhow::Result<Self> {
        let config_path = config
            .to_str()
            .with_context(|| format!("Config path is not valid UTF-8: {}", config.display()))?;
        let weights_path = weights
            .to_str()
            .with_context(|| format!("Weights path is not valid UTF-8: {}", weights.display()))?;

        let mut net = dnn::read_net_from_darknet(config_path, weights_path)
            .with_context(|| format!("Failed to read Darknet network from {}", config_path))?;

        match target {
            ComputeTarget::Cuda => {
                tracing::info!("Initializing OpenCV DNN with CUDA target");
                net.set_preferable_backend(dnn::DNN_BACKEND_CUDA)?;
                net.set_preferable_target(dnn::DNN_TARGET_CUDA)?;
            }
            ComputeTarget::Cpu => {
                tracing::info!("Initializing OpenCV DNN with CPU target");
                net.set_preferable_backend(dnn::DNN_BACKEND_OPENCV)?;
                net.set_preferable_target(dnn::DNN_TARGET_CPU)?;
            }
        }

        tracing::info!(config = %config_path, weights = %weights_path, "Network loaded");
        Ok(Self { net })
    }

    fn blob_to_mat(blob: &Array4<f32>) -> anyhow::Result<Mat> {
        let shape = blob
            .shape()
            .iter()
            .map(|&d| i32::try_from(d))
            .collect::<Result<Vec<_>, _>>()?;

        let mut mat = Mat::new_nd_with_default(&shape, CV_32F, Scalar::all(0.0))?;
        let src = blob
            .as_slice()
            .context("Input blob is not in standard layout")?;
        mat.data_typed_mut::<f32>()?.copy_from_slice(src);
        Ok(mat)
    }

    fn mat_to_array(mat: &Mat) -> anyhow::Result<Array2<f32>> {
        let rows = usize::try_from(mat.rows())?;
        let cols = usize::try_from(mat.cols())?;
        let data = mat.data_typed::<f32>()?;
        Ok(Array2::from_shape_vec((rows, cols), data.to_vec())?)
    }
}

impl InferenceBackend for OpenCvBackend {
    fn load_darknet(config: &Path, weights: &Path) -> anyhow::Result<Self> {
        Self::load_darknet_with_target(config, weights, ComputeTarget::Cpu)
    }

    fn layer_names(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.net.get_layer_names()?.to_vec())
    }

    fn unconnected_out_layers(&self) -> anyhow::Result<Vec<i32>> {
        Ok(self.net.get_unconnected_out_layers()?.to_vec())
    }

    fn forward(
        &mut self,
        blob: &Array4<f32>,
        output_names: &[String],
    ) -> anyhow::Result<Vec<Array2<f32>>> {
        let input = Self::blob_to_mat(blob)?;
        self.net.set_input(&input, "", 1.0, Scalar::default())?;

        let mut names = Vector::<String>::new();
        for name in output_names {
            names.push(name);
        }

        let mut outputs = Vector::<Mat>::new();
        self.net.forward(&mut outputs, &names)?;

        outputs.iter().map(|mat| Self::mat_to_array(&mat)).collect()
    }
}
