use crate::config::InferenceConfig;
use crate::detection::{Detection, Rectangle};
use crate::errors::{DecodeError, LabelError};
use crate::labels::ClassLabelTable;
use crate::tensor::{
    DETECTION_BOXES, DETECTION_CLASSES, DETECTION_SCORES, NamedTensor, TensorData,
};
use ndarray::{Array1, Array2, ArrayD, Axis, Ix1, Ix2};
use std::collections::HashMap;
use std::sync::Arc;

/// Turns the raw TF object-detection outputs into labelled rectangles.
pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub max_boxes: usize,
    labels: Arc<ClassLabelTable>,
}

/// The three required outputs, batch dimension removed.
struct DetectionOutputs {
    boxes: Array2<f32>,
    scores: Array1<f32>,
    class_ids: Array1<i64>,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, max_boxes: usize, labels: Arc<ClassLabelTable>) -> Self {
        Self {
            confidence_threshold,
            max_boxes,
            labels,
        }
    }

    /// Build from configuration, loading the label table eagerly.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, LabelError> {
        let labels = config.load_class_labels()?;
        tracing::info!(
            labels = labels.len(),
            threshold = config.confidence_threshold,
            max_boxes = config.max_boxes,
            "Class label table loaded"
        );
        Ok(Self::new(
            config.confidence_threshold,
            config.max_boxes,
            Arc::new(labels),
        ))
    }

    pub fn labels(&self) -> &ClassLabelTable {
        &self.labels
    }

    /// Decode an unordered set of output tensors.
    ///
    /// Candidates are examined in the order the model emitted them (expected
    /// to be descending score) and at most `max_boxes` of them are looked at.
    /// A candidate is kept iff its class id is positive and its score is
    /// strictly above the threshold.
    #[tracing::instrument(skip_all, fields(outputs = outputs.len()))]
    pub fn decode(&self, outputs: Vec<NamedTensor>) -> Result<Vec<Detection>, DecodeError> {
        let DetectionOutputs {
            boxes,
            scores,
            class_ids,
        } = DetectionOutputs::collect(outputs)?;

        let limit = class_ids.len().min(self.max_boxes);
        let mut detections = Vec::with_capacity(limit);
        let mut previous_score = f32::INFINITY;

        for i in 0..limit {
            let class_id = class_ids[i];
            let probability = scores[i];

            if probability > previous_score {
                tracing::debug!(
                    index = i,
                    probability,
                    previous_score,
                    "Scores are not in descending order"
                );
            }
            previous_score = probability;

            // class ids start at 1, anything else is background
            if class_id <= 0 || probability <= self.confidence_threshold || probability.is_nan() {
                continue;
            }

            let row = boxes.row(i);
            let rect = Rectangle::from_yxyx([row[0], row[1], row[2], row[3]]);
            if rect.is_inverted() {
                tracing::debug!(index = i, ?rect, "Box has inverted corners");
            }

            detections.push(Detection {
                label: self.labels.label(class_id).into_owned(),
                score: f64::from(probability),
                rect,
            });
        }

        tracing::debug!(
            candidates = class_ids.len(),
            examined = limit,
            kept = detections.len(),
            "Decoded detections"
        );

        Ok(detections)
    }
}

impl DetectionOutputs {
    fn collect(outputs: Vec<NamedTensor>) -> Result<Self, DecodeError> {
        let mut by_name: HashMap<String, TensorData> = outputs
            .into_iter()
            .map(NamedTensor::into_parts)
            .collect();

        let boxes = take(&mut by_name, DETECTION_BOXES)?;
        let scores = take(&mut by_name, DETECTION_SCORES)?;
        let classes = take(&mut by_name, DETECTION_CLASSES)?;

        let boxes = float_array(DETECTION_BOXES, boxes)?;
        let boxes = if boxes.is_empty() {
            // An empty box list arrives as `[[]]` from JSON, its row width lost.
            Array2::zeros((0, 4))
        } else {
            strip_batch(DETECTION_BOXES, boxes, 2)?
                .into_dimensionality::<Ix2>()
                .map_err(|e| malformed(DETECTION_BOXES, e.to_string()))?
        };
        let scores = strip_batch(DETECTION_SCORES, float_array(DETECTION_SCORES, scores)?, 1)?
            .into_dimensionality::<Ix1>()
            .map_err(|e| malformed(DETECTION_SCORES, e.to_string()))?;
        let class_ids = strip_batch(DETECTION_CLASSES, class_array(classes)?, 1)?
            .into_dimensionality::<Ix1>()
            .map_err(|e| malformed(DETECTION_CLASSES, e.to_string()))?;

        let count = class_ids.len();
        if boxes.ncols() != 4 {
            return Err(malformed(
                DETECTION_BOXES,
                format!("expected 4 coordinates per box, got {}", boxes.ncols()),
            ));
        }
        if boxes.nrows() != count {
            return Err(malformed(
                DETECTION_BOXES,
                format!("{} boxes for {count} class ids", boxes.nrows()),
            ));
        }
        if scores.len() != count {
            return Err(malformed(
                DETECTION_SCORES,
                format!("{} scores for {count} class ids", scores.len()),
            ));
        }

        Ok(Self {
            boxes,
            scores,
            class_ids,
        })
    }
}

fn take(
    by_name: &mut HashMap<String, TensorData>,
    name: &'static str,
) -> Result<TensorData, DecodeError> {
    by_name
        .remove(name)
        .ok_or(DecodeError::MissingTensor { name })
}

fn float_array(name: &'static str, data: TensorData) -> Result<ArrayD<f32>, DecodeError> {
    match data {
        TensorData::Float(array) => Ok(array),
        other => Err(malformed(
            name,
            format!("expected float32 elements, got {}", other.dtype()),
        )),
    }
}

/// Class ids usually arrive as floats; truncate them to integers.
fn class_array(data: TensorData) -> Result<ArrayD<i64>, DecodeError> {
    match data {
        TensorData::Int(array) => Ok(array),
        TensorData::Float(array) => Ok(array.mapv(|v| v as i64)),
        TensorData::Bytes(_) => Err(malformed(
            DETECTION_CLASSES,
            "expected numeric elements, got string".to_string(),
        )),
    }
}

/// Drop a leading batch dimension of size 1 when present.
fn strip_batch<T>(
    name: &'static str,
    array: ArrayD<T>,
    rank: usize,
) -> Result<ArrayD<T>, DecodeError> {
    let ndim = array.ndim();
    if ndim == rank {
        return Ok(array);
    }
    if ndim == rank + 1 {
        let batch = array.shape()[0];
        if batch != 1 {
            return Err(malformed(
                name,
                format!("batch dimension of size {batch} is not supported"),
            ));
        }
        return Ok(array.index_axis_move(Axis(0), 0));
    }
    Err(malformed(
        name,
        format!("expected rank {rank} or {}, got rank {ndim}", rank + 1),
    ))
}

fn malformed(name: &'static str, reason: String) -> DecodeError {
    DecodeError::MalformedTensor { name, reason }
}
