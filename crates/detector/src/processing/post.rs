use ndarray::{Array1, Array2, Array3, ArrayView1};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Columns before the class scores in a plain row: cx, cy, w, h.
const BOX_FIELDS: usize = 4;
/// Darknet YOLO rows carry an objectness column between box and scores.
const OBJECTNESS_FIELDS: usize = 1;

/// One decoded detection.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Detection {
    /// `[ymin, xmin, ymax, xmax]` in image pixels
    pub bbox: [i32; 4],
    pub confidence: f32,
    pub class_id: u32,
}

/// Decoded detections as parallel arrays.
///
/// Shapes are always `boxes: [N, 4]`, `scores: [N]`, `class_ids: [N]`,
/// including for `N == 0` and `N == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Detections {
    pub boxes: Array2<i32>,
    pub scores: Array1<f32>,
    pub class_ids: Array1<u32>,
    /// Darknet detectors never produce masks.
    pub masks: Option<Array3<f32>>,
}

impl Detections {
    pub fn empty() -> Self {
        Self {
            boxes: Array2::zeros((0, BOX_FIELDS)),
            scores: Array1::zeros(0),
            class_ids: Array1::zeros(0),
            masks: None,
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Detection> {
        if i >= self.len() {
            return None;
        }
        let row = self.boxes.row(i);
        Some(Detection {
            bbox: [row[0], row[1], row[2], row[3]],
            confidence: self.scores[i],
            class_id: self.class_ids[i],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Detection> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

impl Serialize for Detections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let boxes: Vec<[i32; 4]> = self.iter().map(|d| d.bbox).collect();

        let mut state = serializer.serialize_struct("Detections", 4)?;
        state.serialize_field("detection_boxes", &boxes)?;
        state.serialize_field("detection_scores", &self.scores.to_vec())?;
        state.serialize_field("detection_classes", &self.class_ids.to_vec())?;
        state.serialize_field("detection_masks", &Option::<()>::None)?;
        state.end()
    }
}

/// Turns raw per-cell output rows into pixel-space detections.
///
/// Every row yields one detection: no confidence threshold and no
/// non-maximum suppression are applied here.
pub struct PostProcessor {
    pub num_classes: usize,
}

impl PostProcessor {
    pub fn new(num_classes: usize) -> Self {
        Self { num_classes }
    }

    /// Decode every row of every output layer, in layer then row order.
    #[tracing::instrument(skip(self, outputs), fields(layers = outputs.len()))]
    pub fn decode(
        &self,
        outputs: &[Array2<f32>],
        image_height: u32,
        image_width: u32,
    ) -> anyhow::Result<Detections> {
        if self.num_classes == 0 {
            anyhow::bail!("Cannot decode detections without class labels");
        }

        let total_rows: usize = outputs.iter().map(|o| o.nrows()).sum();
        let mut boxes = Vec::with_capacity(total_rows * BOX_FIELDS);
        let mut scores = Vec::with_capacity(total_rows);
        let mut class_ids = Vec::with_capacity(total_rows);

        for (layer_idx, output) in outputs.iter().enumerate() {
            // Empty layers carry no rows to check the width of
            if output.nrows() == 0 {
                continue;
            }

            let score_offset = self.score_offset(output.ncols()).ok_or_else(|| {
                anyhow::anyhow!(
                    "Output layer {} has {} columns, expected {} or {} for {} classes",
                    layer_idx,
                    output.ncols(),
                    BOX_FIELDS + self.num_classes,
                    BOX_FIELDS + OBJECTNESS_FIELDS + self.num_classes,
                    self.num_classes
                )
            })?;

            tracing::trace!(layer_idx, rows = output.nrows(), score_offset, "Decoding layer");

            for row in output.rows() {
                let (class_id, confidence) = argmax(row.slice(ndarray::s![score_offset..]))
                    .ok_or_else(|| anyhow::anyhow!("Empty score vector in layer {}", layer_idx))?;

                let bbox = to_corner_box(
                    [row[0], row[1], row[2], row[3]],
                    image_width,
                    image_height,
                );

                boxes.extend_from_slice(&bbox);
                scores.push(confidence);
                class_ids.push(class_id as u32);
            }
        }

        let count = scores.len();
        tracing::debug!(count, "Decoded detections");

        Ok(Detections {
            boxes: Array2::from_shape_vec((count, BOX_FIELDS), boxes)?,
            scores: Array1::from_vec(scores),
            class_ids: Array1::from_vec(class_ids),
            masks: None,
        })
    }

    fn score_offset(&self, columns: usize) -> Option<usize> {
        if columns == BOX_FIELDS + self.num_classes {
            Some(BOX_FIELDS)
        } else if columns == BOX_FIELDS + OBJECTNESS_FIELDS + self.num_classes {
            Some(BOX_FIELDS + OBJECTNESS_FIELDS)
        } else {
            None
        }
    }
}

/// Index and value of the first maximum. NaN ranks above every number, so
/// the first NaN wins.
#[inline]
fn argmax(scores: ArrayView1<f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, best_score)) if best_score.is_nan() => break,
            Some((_, best_score)) if !score.is_nan() && score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

/// Normalized cxcywh to pixel `[ymin, xmin, ymax, xmax]`.
///
/// Center and size are truncated to whole pixels first; the corners are then
/// truncated toward zero, and the max corner is min corner plus size.
#[inline]
fn to_corner_box(cxcywh: [f32; 4], image_width: u32, image_height: u32) -> [i32; 4] {
    let w_img = image_width as f64;
    let h_img = image_height as f64;

    let center_x = (cxcywh[0] as f64 * w_img) as i32;
    let center_y = (cxcywh[1] as f64 * h_img) as i32;
    let width = (cxcywh[2] as f64 * w_img) as i32;
    let height = (cxcywh[3] as f64 * h_img) as i32;

    let xmin = (center_x as f64 - width as f64 / 2.0) as i32;
    let ymin = (center_y as f64 - height as f64 / 2.0) as i32;
    let xmax = xmin.saturating_add(width);
    let ymax = ymin.saturating_add(height);

    [ymin, xmin, ymax, xmax]
}
