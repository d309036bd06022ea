use glam::Mat4;

/// Perspective projection state carried by a camera node.
///
/// The view half of the camera is the owning node's world transform (see
/// [`Scene::view_matrix`](crate::scene::Scene::view_matrix)); this type only holds
/// the lens. The projection is rebuilt lazily: when the field of view or clip planes
/// change, when the owning node's transform is invalidated, or when it is read with
/// an aspect ratio different from the one it was built with.
#[derive(Clone, Debug)]
pub struct Camera {
    fov: f32, // radians, vertical
    z_near: f32,
    z_far: f32,
    projection: Mat4,
    projection_aspect: f32,
    projection_dirty: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(std::f32::consts::FRAC_PI_4)
    }
}

impl Camera {
    pub const DEFAULT_Z_NEAR: f32 = 0.01;
    pub const DEFAULT_Z_FAR: f32 = 100.0;

    /// A camera with the given vertical field of view (radians) and default clip planes.
    pub fn new(fov: f32) -> Self {
        Self::with_clip(fov, Self::DEFAULT_Z_NEAR, Self::DEFAULT_Z_FAR)
    }

    pub fn with_clip(fov: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            fov,
            z_near,
            z_far,
            projection: Mat4::IDENTITY,
            projection_aspect: f32::NAN,
            projection_dirty: true,
        }
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.projection_dirty = true;
    }

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    pub fn set_clip(&mut self, z_near: f32, z_far: f32) {
        self.z_near = z_near;
        self.z_far = z_far;
        self.projection_dirty = true;
    }

    pub fn is_projection_dirty(&self) -> bool {
        self.projection_dirty
    }

    pub(crate) fn mark_projection_dirty(&mut self) {
        self.projection_dirty = true;
    }

    /// Coefficient for logarithmic depth: `2 / log2(far + 1)`.
    pub fn far_coefficient(&self) -> f32 {
        2.0 / (self.z_far + 1.0).log2()
    }

    /// OpenGL-style perspective projection (clip-space Z in [-1, 1]) for `aspect`
    /// (width / height), recomputed if stale.
    pub fn projection_matrix(&mut self, aspect: f32) -> Mat4 {
        if self.projection_dirty || self.projection_aspect != aspect {
            self.projection = Mat4::perspective_rh_gl(self.fov, aspect, self.z_near, self.z_far);
            self.projection_aspect = aspect;
            self.projection_dirty = false;
        }
        self.projection
    }
}
