use crate::types::Intrinsics;
use glam::Vec3;

/// Back-project a depth buffer into camera-space 3D points.
///
/// Standard pinhole depth-to-point transform
/// (see <http://nicolas.burrus.name/index.php/Research/KinectCalibration>):
/// for the pixel at row `r`, column `c` with depth `d` in millimeters,
///
/// ```text
/// x = d * (c - cx) / fx
/// y = d * (r - cy) / fy
/// z = d
/// ```
///
/// The output is row-major (index `r * width + c`) with exactly one vertex
/// per pixel. Zero or invalid depths are not filtered; a zero depth falls
/// out of the formula as the origin. Assumes the intrinsics are expressed
/// in the depth image's pixel grid and that no distortion correction is
/// needed.
pub fn project_depth(
    depth_mm: &[f32],
    width: u32,
    height: u32,
    intrinsics: &Intrinsics,
) -> Vec<Vec3> {
    let mut vertices = Vec::with_capacity((width * height) as usize);
    project_depth_into(depth_mm, width, height, intrinsics, &mut vertices);
    vertices
}

/// As [`project_depth`], writing into an existing buffer to reuse its
/// allocation across frames.
pub fn project_depth_into(
    depth_mm: &[f32],
    width: u32,
    height: u32,
    intrinsics: &Intrinsics,
    out: &mut Vec<Vec3>,
) {
    debug_assert_eq!(depth_mm.len(), (width * height) as usize);

    let Intrinsics { fx, fy, cx, cy } = *intrinsics;
    out.clear();
    out.reserve((width * height) as usize);

    for r in 0..height {
        for c in 0..width {
            let depth = depth_mm[(r * width + c) as usize];
            out.push(Vec3::new(
                depth * (c as f32 - cx) / fx,
                depth * (r as f32 - cy) / fy,
                depth,
            ));
        }
    }
}

/// The derived point cloud for the most recently projected depth frame.
///
/// Rebuilt as a whole on every new depth frame; `vertices.len()` always
/// equals `width * height` of that frame.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    width: u32,
    height: u32,
    vertices: Vec<Vec3>,
}

impl PointCloud {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Fully re-project from a new depth buffer, replacing any previous
    /// contents and adopting the new dimensions.
    pub fn reproject(&mut self, depth_mm: &[f32], width: u32, height: u32, intrinsics: &Intrinsics) {
        project_depth_into(depth_mm, width, height, intrinsics, &mut self.vertices);
        self.width = width;
        self.height = height;
    }
}
