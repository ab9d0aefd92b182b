/// Face detector and encoder using ONNX Runtime via `ort`.
///
/// BlazeFace (short-range) finds face boxes; each box is then cropped and
/// passed through an ArcFace model to produce an L2-normalized encoding.
use std::path::Path;

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const DETECTOR_INPUT_SIZE: u32 = 128;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Default detection confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// ArcFace input resolution and normalization.
const ENCODER_INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxFaceDetector {
    detector: ort::session::Session,
    encoder: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxFaceDetector {
    pub fn new(
        detector_model: &Path,
        encoder_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let detector = build_session(detector_model)?;
        let encoder = build_session(encoder_model)?;
        log::info!(
            "Loaded face models {} and {}",
            detector_model.display(),
            encoder_model.display()
        );
        Ok(Self {
            detector,
            encoder,
            confidence,
            anchors: generate_anchors(),
        })
    }

    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let fw = frame.width() as f32;
        let fh = frame.height() as f32;

        let input_value = ort::value::Tensor::from_array(preprocess_detector(frame))?;
        let outputs = self.detector.run(ort::inputs![input_value])?;

        // regressors [1, 896, 16], classificators [1, 896, 1]
        if outputs.len() < 2 {
            return Err(format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let size = DETECTOR_INPUT_SIZE as f32;
        let mut raw_dets = Vec::new();
        for (i, &raw_score) in score_data.iter().enumerate().take(self.anchors.len()) {
            let score = sigmoid(raw_score);
            if (score as f64) < self.confidence {
                continue;
            }
            let offset = i * 16;
            if offset + 4 > reg_data.len() {
                break;
            }
            let anchor = self.anchors[i];
            let cx = anchor[0] + reg_data[offset] / size;
            let cy = anchor[1] + reg_data[offset + 1] / size;
            let w = reg_data[offset + 2] / size;
            let h = reg_data[offset + 3] / size;

            raw_dets.push(RawDet {
                x1: ((cx - w / 2.0) * fw) as f64,
                y1: ((cy - h / 2.0) * fh) as f64,
                x2: ((cx + w / 2.0) * fw) as f64,
                y2: ((cy + h / 2.0) * fh) as f64,
                score: score as f64,
            });
        }

        Ok(nms(&mut raw_dets, NMS_IOU_THRESH)
            .iter()
            .filter_map(|d| {
                BoundingBox::new(
                    d.x1 as i32,
                    d.y1 as i32,
                    (d.x2 - d.x1) as i32,
                    (d.y2 - d.y1) as i32,
                )
                .clamped(frame.width(), frame.height())
            })
            .collect())
    }

    fn encode(&mut self, crop: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(preprocess_encoder(crop))?;
        let outputs = self.encoder.run(ort::inputs![input_value])?;
        let embedding = outputs[0].try_extract_array::<f32>()?;
        let mut encoding = embedding
            .as_slice()
            .ok_or("Cannot get embedding slice")?
            .to_vec();
        l2_normalize(&mut encoding);
        Ok(encoding)
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        let boxes = self.locate(frame)?;
        let mut faces = Vec::with_capacity(boxes.len());
        for bounding_box in boxes {
            let Some(crop) = frame.crop(&bounding_box) else {
                continue;
            };
            let encoding = self.encode(&crop)?;
            faces.push(DetectedFace::unlabeled(encoding, bounding_box));
        }
        log::debug!("Frame {}: {} face(s)", frame.index(), faces.len());
        Ok(faces)
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Platform accelerator when one is compiled in, CPU otherwise.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Nearest-neighbour resize of an RGB frame into a `1x3xSxS` tensor with
/// `(pixel - mean) / std` applied per channel.
fn resize_normalized(frame: &Frame, size: usize, mean: f32, std: f32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    if src_h == 0 || src_w == 0 || frame.channels() < 3 {
        return tensor;
    }
    for y in 0..size {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / size as f64) as usize).min(src_h - 1);
        for x in 0..size {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / size as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - mean) / std;
            }
        }
    }
    tensor
}

fn preprocess_detector(frame: &Frame) -> ndarray::Array4<f32> {
    resize_normalized(frame, DETECTOR_INPUT_SIZE as usize, 0.0, 255.0)
}

fn preprocess_encoder(crop: &Frame) -> ndarray::Array4<f32> {
    resize_normalized(crop, ENCODER_INPUT_SIZE, NORM_MEAN, NORM_STD)
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// Anchors and NMS (BlazeFace short-range)
// ---------------------------------------------------------------------------

/// 16x16 grid with 2 anchors per cell, then 8x8 with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for &(stride, num) in &strides {
        let grid_size = DETECTOR_INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }
    anchors
}

#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDet> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| iou(k, det) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

fn iou(a: &RawDet, b: &RawDet) -> f64 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
