use inference::{ClassLabelTable, DecodeError, NamedTensor, PostProcessor};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Candidate {
    class_id: i64,
    score: f32,
    bbox: [f32; 4],
}

fn candidate() -> impl Strategy<Value = Candidate> {
    (-2i64..6, 0.0f32..=1.0, prop::array::uniform4(0.0f32..=1.0)).prop_map(
        |(class_id, score, bbox)| Candidate {
            class_id,
            score,
            bbox,
        },
    )
}

fn to_outputs(candidates: &[Candidate]) -> Vec<NamedTensor> {
    let n = candidates.len();
    vec![
        NamedTensor::int(
            "detection_classes",
            &[1, n],
            candidates.iter().map(|c| c.class_id).collect(),
        )
        .unwrap(),
        NamedTensor::float(
            "detection_boxes",
            &[1, n, 4],
            candidates.iter().flat_map(|c| c.bbox).collect(),
        )
        .unwrap(),
        NamedTensor::float(
            "detection_scores",
            &[1, n],
            candidates.iter().map(|c| c.score).collect(),
        )
        .unwrap(),
    ]
}

proptest! {
    #[test]
    fn decode_respects_cap_threshold_and_order(
        candidates in prop::collection::vec(candidate(), 0..120),
        max_boxes in 1usize..60,
        threshold in 0.0f32..1.0,
    ) {
        let post = PostProcessor::new(threshold, max_boxes, Arc::new(ClassLabelTable::default()));
        let detections = post.decode(to_outputs(&candidates)).unwrap();

        prop_assert!(detections.len() <= max_boxes);
        prop_assert!(detections.len() <= candidates.len());

        // The kept candidates, in order, are exactly the passing ones within the cap.
        let expected: Vec<&Candidate> = candidates
            .iter()
            .take(max_boxes)
            .filter(|c| c.class_id > 0 && c.score > threshold)
            .collect();
        prop_assert_eq!(detections.len(), expected.len());

        for (det, source) in detections.iter().zip(expected) {
            prop_assert!(det.score > f64::from(threshold));
            prop_assert_eq!(det.score, f64::from(source.score));
            prop_assert_eq!(det.label.clone(), ClassLabelTable::default_table().label(source.class_id).into_owned());
            prop_assert_eq!(det.rect.x, source.bbox[1]);
            prop_assert_eq!(det.rect.y, source.bbox[0]);
            prop_assert_eq!(det.rect.width, source.bbox[3] - source.bbox[1]);
            prop_assert_eq!(det.rect.height, source.bbox[2] - source.bbox[0]);
        }
    }

    #[test]
    fn decode_fails_without_any_required_output(
        candidates in prop::collection::vec(candidate(), 1..10),
        dropped in 0usize..3,
    ) {
        let post = PostProcessor::new(0.7, 40, Arc::new(ClassLabelTable::default()));
        let mut outputs = to_outputs(&candidates);
        let removed = outputs.remove(dropped);

        match post.decode(outputs) {
            Err(DecodeError::MissingTensor { name }) => prop_assert_eq!(name, removed.name()),
            other => prop_assert!(false, "expected MissingTensor, got {:?}", other),
        }
    }
}
