use image::DynamicImage;

use crate::error::Result;

/// Axis aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }
}

/// One object found by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub score: f32,
}

pub trait Detector {
    /// Run the model on one image. The order of the result is whatever the model gives.
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Turn the raw outputs of an object detection graph into detections.
/// boxes are `ymin xmin ymax xmax`, normalized to 1.
/// Only the first `count` entries are valid, the rest of the tensors is padding.
pub fn detections_from_normalized(
    boxes: &[f32],
    scores: &[f32],
    classes: &[f32],
    count: usize,
    width: u32,
    height: u32,
) -> Vec<Detection> {
    let (width, height) = (width as f32, height as f32);
    boxes.chunks_exact(4)
        .zip(scores.iter())
        .zip(classes.iter())
        .take(count)
        .map(|((v, score), class)| {
            let y1 = (v[0] * height).round() as i32;
            let x1 = (v[1] * width).round() as i32;
            let y2 = (v[2] * height).round() as i32;
            let x2 = (v[3] * width).round() as i32;
            Detection {
                bbox: BoundingBox { x1, y1, x2, y2 },
                class_id: class.max(0.0).round() as u32,
                score: *score,
            }
        })
        .collect()
}

#[cfg(feature = "tensorflow")]
pub use self::tf::TfDetector;

#[cfg(feature = "tensorflow")]
mod tf {
    use tensorflow::{ Tensor, Session, SessionOptions, Graph, SessionRunArgs, ImportGraphDefOptions };
    use image::{ DynamicImage, GenericImageView };
    use log::debug;

    use std::fs;

    use super::{ Detection, Detector, detections_from_normalized };
    use crate::config::DetectorConfig;
    use crate::error::Result;

    /// Frozen tensorflow object detection graph.
    pub struct TfDetector {
        graph: Graph,
        session: Session,
        input_name: String,
        boxes_name: String,
        scores_name: String,
        classes_name: String,
        num_detections_name: String,
    }

    impl TfDetector {

        pub fn new(config: &DetectorConfig) -> Result<Self> {
            let pb = fs::read(&config.model_path)?;
            // import graph def
            let mut graph = Graph::new();
            let graph_def_options = ImportGraphDefOptions::new();
            graph.import_graph_def(&pb, &graph_def_options)?;
            // new session
            let session_option = SessionOptions::new();
            let session = Session::new(&session_option, &graph)?;
            debug!("loaded detection graph from {}", config.model_path.display());
            Ok(Self {
                graph,
                session,
                input_name: config.input_name.clone(),
                boxes_name: config.boxes_name.clone(),
                scores_name: config.scores_name.clone(),
                classes_name: config.classes_name.clone(),
                num_detections_name: config.num_detections_name.clone(),
            })
        }
    }

    impl Detector for TfDetector {

        fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
            let graph = &self.graph;
            let (width, height) = img.dimensions();
            let img_data = img.to_rgb8().into_raw();
            let input: Tensor<u8> = Tensor::new(&[1, height as u64, width as u64, 3])
                .with_values(&img_data)?;

            let mut args = SessionRunArgs::new();
            args.add_feed(&graph.operation_by_name_required(&self.input_name)?, 0, &input);
            let boxes_token = args.request_fetch(&graph.operation_by_name_required(&self.boxes_name)?, 0);
            let scores_token = args.request_fetch(&graph.operation_by_name_required(&self.scores_name)?, 0);
            let classes_token = args.request_fetch(&graph.operation_by_name_required(&self.classes_name)?, 0);
            let num_token = args.request_fetch(&graph.operation_by_name_required(&self.num_detections_name)?, 0);
            self.session.run(&mut args)?;

            let boxes: Tensor<f32> = args.fetch(boxes_token)?;
            let scores: Tensor<f32> = args.fetch(scores_token)?;
            let classes: Tensor<f32> = args.fetch(classes_token)?;
            let num: Tensor<f32> = args.fetch(num_token)?;
            let count = num.first().map(|n| n.max(0.0) as usize).unwrap_or(scores.len());
            debug!("detector returned {} candidates", count);

            Ok(detections_from_normalized(&boxes, &scores, &classes, count, width, height))
        }
    }
}


#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn normalized_boxes_scale_to_pixels() {
        let boxes = [0.1, 0.25, 0.5, 0.75, 0.0, 0.0, 1.0, 1.0];
        let scores = [0.9, 0.3];
        let classes = [1.0, 3.0];
        let res = detections_from_normalized(&boxes, &scores, &classes, 2, 200, 100);
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].bbox, BoundingBox { x1: 50, y1: 10, x2: 150, y2: 50 });
        assert_eq!(res[0].class_id, 1);
        assert!((res[0].score - 0.9).abs() < 1e-6);
        assert_eq!(res[1].bbox, BoundingBox { x1: 0, y1: 0, x2: 200, y2: 100 });
        assert_eq!(res[1].class_id, 3);
    }

    #[test]
    fn padding_after_count_is_ignored() {
        let boxes = [0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4, 0.0, 0.0, 0.0, 0.0];
        let scores = [0.8, 0.7, 0.0];
        let classes = [1.0, 1.0, 0.0];
        let res = detections_from_normalized(&boxes, &scores, &classes, 2, 10, 10);
        assert_eq!(res.len(), 2);
    }

    #[test]
    fn count_larger_than_buffers_is_bounded() {
        let boxes = [0.1, 0.1, 0.2, 0.2];
        let res = detections_from_normalized(&boxes, &[0.5], &[1.0], 100, 10, 10);
        assert_eq!(res.len(), 1);
    }

    #[test]
    fn width_and_height_never_underflow() {
        let inverted = BoundingBox { x1: 8, y1: 8, x2: 2, y2: 2 };
        assert_eq!(inverted.width(), 0);
        assert_eq!(inverted.height(), 0);
    }
}
