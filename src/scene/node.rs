use super::NodeId;
use crate::camera::Camera;
use crate::mesh::Mesh;
use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// The active local rotation of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rotation {
    /// Per-axis angles in degrees, applied X then Y then Z.
    Euler(Vec3),
    Quaternion(Quat),
}

/// Rotation for Euler angles in degrees, composed as `Rz * Ry * Rx`.
pub fn euler_to_quat(degrees: Vec3) -> Quat {
    let r = degrees * (std::f32::consts::PI / 180.0);
    Quat::from_rotation_z(r.z) * Quat::from_rotation_y(r.y) * Quat::from_rotation_x(r.x)
}

/// Inverse of [`euler_to_quat`], in degrees.
pub fn quat_to_euler(rotation: Quat) -> Vec3 {
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    Vec3::new(x, y, z) * (180.0 / std::f32::consts::PI)
}

/// Local translation/rotation/scale about a pivot.
///
/// Both rotation stores are kept; `use_quaternions` picks the one that is applied.
/// Switching the flag never converts between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub scale: Vec3,
    /// Pivot for rotation and scale.
    pub center: Vec3,
    pub euler: Vec3,
    pub quaternion: Quat,
    pub use_quaternions: bool,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            center: Vec3::ZERO,
            euler: Vec3::ZERO,
            quaternion: Quat::IDENTITY,
            use_quaternions: false,
        }
    }
}

impl LocalTransform {
    pub fn rotation(&self) -> Rotation {
        if self.use_quaternions {
            Rotation::Quaternion(self.quaternion)
        } else {
            Rotation::Euler(self.euler)
        }
    }

    pub fn rotation_quat(&self) -> Quat {
        match self.rotation() {
            Rotation::Euler(degrees) => euler_to_quat(degrees),
            Rotation::Quaternion(q) => q,
        }
    }

    /// `T(translation + center) * R * S * T(-center)`.
    ///
    /// Scaling and rotation pivot about `center`; the pivot itself lands on
    /// `translation + center`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation + self.center)
            * Mat4::from_quat(self.rotation_quat())
            * Mat4::from_scale(self.scale)
            * Mat4::from_translation(-self.center)
    }
}

/// What a node draws, if anything.
#[derive(Clone, Debug, Default)]
pub enum NodeKind {
    #[default]
    Empty,
    Mesh(Mesh),
    Camera(Camera),
}

/// A scene-graph node. Mutated through [`Scene`](super::Scene), which keeps the
/// cached matrices consistent.
#[derive(Clone, Debug)]
pub struct Node {
    pub(super) name: Option<String>,
    pub(super) local: LocalTransform,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) world: Mat4,
    pub(super) normal: Mat3,
    pub(super) flip_normals: bool,
    pub(super) normal_singular: bool,
    pub(super) dirty: bool,
    pub(super) kind: NodeKind,
}

impl Node {
    pub(super) fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            local: LocalTransform::default(),
            parent: None,
            children: Vec::new(),
            world: Mat4::IDENTITY,
            normal: Mat3::IDENTITY,
            flip_normals: false,
            normal_singular: false,
            dirty: true,
            kind,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn local(&self) -> &LocalTransform {
        &self.local
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// True while the cached world and normal matrices are stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True if the last recomputation hit a singular 3x3 block. The normal matrix
    /// is zero in that case.
    pub fn normal_matrix_singular(&self) -> bool {
        self.normal_singular
    }

    pub(super) fn mark_dirty(&mut self) {
        self.dirty = true;
        if let NodeKind::Camera(camera) = &mut self.kind {
            camera.mark_projection_dirty();
        }
    }

    /// Stores `world` and derives the normal matrix and flip flag from it.
    pub(super) fn resolve(&mut self, world: Mat4) {
        self.world = world;
        let upper = Mat3::from_mat4(world);
        let det = upper.determinant();
        // Near-singular blocks have a tiny nonzero determinant but still overflow
        // on inversion.
        let normal = (det != 0.0 && det.is_finite())
            .then(|| upper.inverse().transpose())
            .filter(|normal| normal.is_finite());
        match normal {
            Some(normal) => {
                self.normal = normal;
                self.flip_normals = normal.determinant() < 0.0;
                self.normal_singular = false;
            }
            None => {
                tracing::trace!("singular world matrix, zeroing normal matrix");
                self.normal = Mat3::ZERO;
                self.flip_normals = false;
                self.normal_singular = true;
            }
        }
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_conversion_round_trips() {
        let degrees = Vec3::new(30.0, -45.0, 60.0);
        let back = quat_to_euler(euler_to_quat(degrees));
        assert!(back.abs_diff_eq(degrees, 1e-3), "{back:?}");
    }

    #[test]
    fn euler_axes_follow_right_hand_rule() {
        let q = euler_to_quat(Vec3::new(0.0, 90.0, 0.0));
        assert!((q * Vec3::X).abs_diff_eq(Vec3::NEG_Z, 1e-6));
        let q = euler_to_quat(Vec3::new(0.0, 0.0, 90.0));
        assert!((q * Vec3::X).abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn center_is_the_pivot() {
        let local = LocalTransform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            center: Vec3::new(0.0, 2.0, 0.0),
            euler: Vec3::new(0.0, 0.0, 90.0),
            scale: Vec3::splat(3.0),
            ..Default::default()
        };
        let m = local.matrix();
        assert!(m.transform_point3(local.center).abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
        // one unit along +X from the pivot: scaled to 3, rotated onto +Y
        let p = m.transform_point3(Vec3::new(1.0, 2.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), 1e-5), "{p:?}");
    }
}
