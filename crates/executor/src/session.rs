use crate::backend::{NativeModel, RuntimeDriver};
use crate::error::ExecutorError;
use ndarray::Array3;
use pipeline::classify::{OutputQuant, Ranking, TOP_K, rank};
use pipeline::image::{RgbImage, ScalePolicy};
use pipeline::pose::{KEYPOINT_COUNT, Pose, decode_pose};
use pipeline::tensor::{ElementType, InputQuant, TensorLayout, floats_from_ne_bytes, to_tensor};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

pub const THRESHOLD_MIN: f32 = 0.05;
pub const THRESHOLD_MAX: f32 = 0.95;

/// Confidence threshold shared between the UI thread (writer) and the
/// worker thread (reader). Stored as f32 bits in an atomic so adjustments
/// never tear a read.
#[derive(Debug, Clone)]
pub struct Threshold(Arc<AtomicU32>);

impl Threshold {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(Self::clamp(value).to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Set the threshold, clamped to [0.05, 0.95].
    pub fn set(&self, value: f32) {
        self.0
            .store(Self::clamp(value).to_bits(), Ordering::Release);
    }

    fn clamp(value: f32) -> f32 {
        value.clamp(THRESHOLD_MIN, THRESHOLD_MAX)
    }
}

/// Static model I/O configuration: geometry, layouts, element types and
/// quantization parameters. Loaded once at startup, never mutated by the
/// pipeline.
#[derive(Debug, Clone)]
pub struct ModelIo {
    pub input_width: u32,
    pub input_height: u32,
    pub input_type: ElementType,
    pub input_layout: TensorLayout,
    pub input_quant: InputQuant,
    pub scale_policy: ScalePolicy,
    pub output_type: ElementType,
    pub output_quant: OutputQuant,
}

impl ModelIo {
    /// Quantized MobileNetV2 classifier: 224x224 HWC uint8, shorter-side-256
    /// scaling before the crop.
    pub fn mobilenet_v2_quant() -> Self {
        Self {
            input_width: 224,
            input_height: 224,
            input_type: ElementType::Uint8,
            input_layout: TensorLayout::Hwc,
            input_quant: InputQuant::default(),
            scale_policy: ScalePolicy::ShorterSide { min_side: 256 },
            output_type: ElementType::Uint8,
            output_quant: OutputQuant::default(),
        }
    }

    /// PoseNet MobileNet: 257x353 HWC float32, cover scaling so the frame
    /// fills the input exactly.
    pub fn posenet_mobilenet() -> Self {
        Self {
            input_width: 257,
            input_height: 353,
            input_type: ElementType::Float32,
            input_layout: TensorLayout::Hwc,
            input_quant: InputQuant::default(),
            scale_policy: ScalePolicy::Cover,
            output_type: ElementType::Float32,
            output_quant: OutputQuant::default(),
        }
    }
}

/// A classification pipeline session: preprocess, execute on the native
/// runtime, postprocess into a ranked label mapping.
///
/// Each `process` call is a pure function of (image, configuration,
/// threshold); the threshold is the only state carried between calls.
pub struct ClassifySession<D: RuntimeDriver> {
    model: NativeModel<D>,
    io: ModelIo,
    labels: Vec<String>,
    threshold: Threshold,
}

impl<D: RuntimeDriver> ClassifySession<D> {
    pub fn new(
        driver: D,
        model_path: &Path,
        io: ModelIo,
        labels: Vec<String>,
        initial_threshold: f32,
    ) -> Result<Self, ExecutorError> {
        let model = NativeModel::load(driver, model_path)?;

        Ok(Self {
            model,
            io,
            labels,
            threshold: Threshold::new(initial_threshold),
        })
    }

    /// Handle for adjusting the threshold from another thread.
    pub fn threshold(&self) -> Threshold {
        self.threshold.clone()
    }

    pub fn set_threshold(&self, value: f32) {
        self.threshold.set(value);
    }

    /// Run one frame through the pipeline. Returns the ranked, thresholded,
    /// softmax-normalized labels and the model execution latency in
    /// milliseconds.
    pub fn process(&mut self, image: &RgbImage) -> Result<(Ranking, u64), ExecutorError> {
        let fitted = image.fit_to(self.io.scale_policy, self.io.input_width, self.io.input_height)?;
        let input = to_tensor(
            &fitted,
            self.io.input_layout,
            self.io.input_type,
            self.io.input_quant,
        );

        let start = Instant::now();
        let outputs = self.model.run(&input)?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let raw = outputs
            .first()
            .ok_or_else(|| ExecutorError::Runtime("model produced no output".to_string()))?;

        let scores = pipeline::classify::decode_output(
            raw,
            self.io.output_type,
            self.io.output_quant,
            self.labels.len(),
        )?;

        let ranking = rank(&scores, &self.labels, self.threshold.get())
            .top_k(TOP_K)
            .softmax();

        tracing::debug!(
            latency_ms,
            results = ranking.len(),
            "Frame classified"
        );

        Ok((ranking, latency_ms))
    }
}

/// A pose estimation session producing the single best pose per frame.
pub struct PoseSession<D: RuntimeDriver> {
    model: NativeModel<D>,
    io: ModelIo,
    output_stride: u32,
    threshold: Threshold,
}

impl<D: RuntimeDriver> PoseSession<D> {
    pub fn new(
        driver: D,
        model_path: &Path,
        io: ModelIo,
        output_stride: u32,
        initial_threshold: f32,
    ) -> Result<Self, ExecutorError> {
        if output_stride == 0 {
            return Err(ExecutorError::Runtime(
                "output stride must be positive".to_string(),
            ));
        }

        let model = NativeModel::load(driver, model_path)?;

        Ok(Self {
            model,
            io,
            output_stride,
            threshold: Threshold::new(initial_threshold),
        })
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold.clone()
    }

    pub fn set_threshold(&self, value: f32) {
        self.threshold.set(value);
    }

    /// Heatmap grid dimensions implied by the input size and output stride.
    fn grid(&self) -> (usize, usize) {
        let rows = ((self.io.input_height - 1) / self.output_stride + 1) as usize;
        let cols = ((self.io.input_width - 1) / self.output_stride + 1) as usize;
        (rows, cols)
    }

    /// Run one frame through the pipeline. Returns the decoded pose and the
    /// model execution latency in milliseconds; a pose scoring below the
    /// active threshold is reported as `None`.
    pub fn process(&mut self, image: &RgbImage) -> Result<(Option<Pose>, u64), ExecutorError> {
        let fitted = image.fit_to(self.io.scale_policy, self.io.input_width, self.io.input_height)?;
        let input = to_tensor(
            &fitted,
            self.io.input_layout,
            self.io.input_type,
            self.io.input_quant,
        );

        let start = Instant::now();
        let outputs = self.model.run(&input)?;
        let latency_ms = start.elapsed().as_millis() as u64;

        if outputs.len() < 2 {
            return Err(ExecutorError::Runtime(format!(
                "pose model produced {} outputs, expected heatmaps and offsets",
                outputs.len()
            )));
        }

        let (rows, cols) = self.grid();
        let heatmaps = self.output_grid(&outputs[0], rows, cols, KEYPOINT_COUNT)?;
        let offsets = self.output_grid(&outputs[1], rows, cols, 2 * KEYPOINT_COUNT)?;

        let pose = decode_pose(heatmaps.view(), offsets.view(), self.output_stride)?;

        tracing::debug!(latency_ms, score = pose.score, "Pose decoded");

        if pose.score < self.threshold.get() {
            return Ok((None, latency_ms));
        }

        Ok((Some(pose), latency_ms))
    }

    fn output_grid(
        &self,
        bytes: &[u8],
        rows: usize,
        cols: usize,
        channels: usize,
    ) -> Result<Array3<f32>, ExecutorError> {
        let values = floats_from_ne_bytes(bytes)?;
        Array3::from_shape_vec((rows, cols, channels), values).map_err(|e| {
            ExecutorError::Runtime(format!("unexpected output buffer shape: {e}"))
        })
    }
}
