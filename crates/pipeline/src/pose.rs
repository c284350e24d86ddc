use crate::error::PipelineError;
use ndarray::ArrayView3;

/// Number of keypoints the pose model predicts.
pub const KEYPOINT_COUNT: usize = 17;

/// The 17 COCO keypoints, index-aligned with the model's heatmap channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointKind {
    pub const ALL: [KeypointKind; KEYPOINT_COUNT] = [
        KeypointKind::Nose,
        KeypointKind::LeftEye,
        KeypointKind::RightEye,
        KeypointKind::LeftEar,
        KeypointKind::RightEar,
        KeypointKind::LeftShoulder,
        KeypointKind::RightShoulder,
        KeypointKind::LeftElbow,
        KeypointKind::RightElbow,
        KeypointKind::LeftWrist,
        KeypointKind::RightWrist,
        KeypointKind::LeftHip,
        KeypointKind::RightHip,
        KeypointKind::LeftKnee,
        KeypointKind::RightKnee,
        KeypointKind::LeftAnkle,
        KeypointKind::RightAnkle,
    ];
}

/// Skeleton connectivity for overlay rendering.
pub const SKELETON_EDGES: [(KeypointKind, KeypointKind); 16] = [
    (KeypointKind::Nose, KeypointKind::LeftEye),
    (KeypointKind::Nose, KeypointKind::RightEye),
    (KeypointKind::LeftEye, KeypointKind::LeftEar),
    (KeypointKind::RightEye, KeypointKind::RightEar),
    (KeypointKind::LeftShoulder, KeypointKind::RightShoulder),
    (KeypointKind::LeftShoulder, KeypointKind::LeftElbow),
    (KeypointKind::LeftElbow, KeypointKind::LeftWrist),
    (KeypointKind::RightShoulder, KeypointKind::RightElbow),
    (KeypointKind::RightElbow, KeypointKind::RightWrist),
    (KeypointKind::LeftShoulder, KeypointKind::LeftHip),
    (KeypointKind::RightShoulder, KeypointKind::RightHip),
    (KeypointKind::LeftHip, KeypointKind::RightHip),
    (KeypointKind::LeftHip, KeypointKind::LeftKnee),
    (KeypointKind::LeftKnee, KeypointKind::LeftAnkle),
    (KeypointKind::RightHip, KeypointKind::RightKnee),
    (KeypointKind::RightKnee, KeypointKind::RightAnkle),
];

/// A detected keypoint in input-image coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub kind: KeypointKind,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// The single best pose estimate with its aggregate confidence.
#[derive(Debug, Clone)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    pub score: f32,
}

/// Decode a single pose from model heatmaps and offsets.
///
/// `heatmaps` is `[rows, cols, KEYPOINT_COUNT]`, `offsets` is
/// `[rows, cols, 2 * KEYPOINT_COUNT]` with the y-offset channels first.
/// Each keypoint takes the argmax cell of its heatmap, refined by the
/// offsets at that cell:
/// `position = cell * output_stride + offset`. Keypoint confidence is the
/// sigmoid of the raw heatmap value; the pose score is the mean keypoint
/// confidence.
pub fn decode_pose(
    heatmaps: ArrayView3<f32>,
    offsets: ArrayView3<f32>,
    output_stride: u32,
) -> Result<Pose, PipelineError> {
    let (rows, cols, channels) = heatmaps.dim();
    if channels != KEYPOINT_COUNT {
        return Err(PipelineError::InvalidGeometry(format!(
            "expected {KEYPOINT_COUNT} heatmap channels, got {channels}"
        )));
    }
    if offsets.dim() != (rows, cols, 2 * KEYPOINT_COUNT) {
        return Err(PipelineError::InvalidGeometry(format!(
            "offset shape {:?} does not match heatmap grid {rows}x{cols}",
            offsets.dim()
        )));
    }
    if rows == 0 || cols == 0 {
        return Err(PipelineError::InvalidGeometry(
            "empty heatmap grid".to_string(),
        ));
    }

    let mut keypoints = Vec::with_capacity(KEYPOINT_COUNT);
    let mut score_sum = 0.0f32;

    for (k, kind) in KeypointKind::ALL.into_iter().enumerate() {
        let mut best = f32::NEG_INFINITY;
        let mut best_row = 0usize;
        let mut best_col = 0usize;

        for row in 0..rows {
            for col in 0..cols {
                let value = heatmaps[[row, col, k]];
                if value > best {
                    best = value;
                    best_row = row;
                    best_col = col;
                }
            }
        }

        let y = best_row as f32 * output_stride as f32 + offsets[[best_row, best_col, k]];
        let x = best_col as f32 * output_stride as f32
            + offsets[[best_row, best_col, k + KEYPOINT_COUNT]];
        let score = sigmoid(best);
        score_sum += score;

        keypoints.push(Keypoint { kind, x, y, score });
    }

    Ok(Pose {
        score: score_sum / KEYPOINT_COUNT as f32,
        keypoints,
    })
}

/// Sigmoid activation function
#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    const ROWS: usize = 9;
    const COLS: usize = 9;
    const STRIDE: u32 = 16;

    /// Heatmaps with one hot cell per keypoint, everything else strongly
    /// negative, plus matching offsets.
    fn synthetic_outputs(
        peaks: &[(usize, usize)],
        offset_y: f32,
        offset_x: f32,
    ) -> (Array3<f32>, Array3<f32>) {
        let mut heatmaps = Array3::from_elem((ROWS, COLS, KEYPOINT_COUNT), -10.0f32);
        let mut offsets = Array3::zeros((ROWS, COLS, 2 * KEYPOINT_COUNT));

        for (k, &(row, col)) in peaks.iter().enumerate() {
            heatmaps[[row, col, k]] = 5.0;
            offsets[[row, col, k]] = offset_y;
            offsets[[row, col, k + KEYPOINT_COUNT]] = offset_x;
        }

        (heatmaps, offsets)
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_argmax_and_offset_refinement() {
        let peaks: Vec<(usize, usize)> = (0..KEYPOINT_COUNT).map(|k| (k % ROWS, 3)).collect();
        let (heatmaps, offsets) = synthetic_outputs(&peaks, 2.5, -1.5);

        let pose = decode_pose(heatmaps.view(), offsets.view(), STRIDE).unwrap();

        assert_eq!(pose.keypoints.len(), KEYPOINT_COUNT);
        for (k, keypoint) in pose.keypoints.iter().enumerate() {
            let (row, col) = peaks[k];
            assert!(
                (keypoint.y - (row as f32 * 16.0 + 2.5)).abs() < 1e-5,
                "Keypoint {k} y position should be cell * stride + offset"
            );
            assert!((keypoint.x - (col as f32 * 16.0 - 1.5)).abs() < 1e-5);
        }
        assert_eq!(pose.keypoints[0].kind, KeypointKind::Nose);
    }

    #[test]
    fn test_pose_score_is_mean_keypoint_confidence() {
        let peaks: Vec<(usize, usize)> = (0..KEYPOINT_COUNT).map(|_| (4, 4)).collect();
        let (heatmaps, offsets) = synthetic_outputs(&peaks, 0.0, 0.0);

        let pose = decode_pose(heatmaps.view(), offsets.view(), STRIDE).unwrap();

        // Every peak has raw value 5.0, so every keypoint (and the mean)
        // scores sigmoid(5.0).
        let expected = sigmoid(5.0);
        assert!((pose.score - expected).abs() < 1e-5);
        for keypoint in &pose.keypoints {
            assert!((keypoint.score - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let heatmaps = Array3::<f32>::zeros((ROWS, COLS, 5));
        let offsets = Array3::<f32>::zeros((ROWS, COLS, 10));

        let result = decode_pose(heatmaps.view(), offsets.view(), STRIDE);
        assert!(result.is_err(), "Non-17-channel heatmaps should fail");
    }

    #[test]
    fn test_rejects_mismatched_offset_grid() {
        let heatmaps = Array3::<f32>::zeros((ROWS, COLS, KEYPOINT_COUNT));
        let offsets = Array3::<f32>::zeros((ROWS + 1, COLS, 2 * KEYPOINT_COUNT));

        let result = decode_pose(heatmaps.view(), offsets.view(), STRIDE);
        assert!(result.is_err(), "Offset grid must match the heatmap grid");
    }

    #[test]
    fn test_skeleton_edges_reference_valid_keypoints() {
        for (a, b) in SKELETON_EDGES {
            assert!(KeypointKind::ALL.contains(&a));
            assert!(KeypointKind::ALL.contains(&b));
            assert_ne!(a, b, "An edge must connect two distinct keypoints");
        }
    }
}
