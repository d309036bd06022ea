//! The transform hierarchy.
//!
//! This module provides [`Scene`], an arena of [`Node`]s addressed by [`NodeId`].
//! Each node carries a local transform (translation, rotation and scale about a
//! pivot), an optional payload ([`NodeKind::Mesh`] or [`NodeKind::Camera`]) and an
//! ordered child list.
//!
//! # Lazy matrices
//!
//! World and normal matrices are cached per node and recomputed on read. Any local
//! transform edit, and any reparenting, marks the node and its whole subtree dirty.
//! Reading a dirty node first resolves its dirty ancestors, so
//! `world(child) == world(parent) * local(child)` always holds for what is returned.
//!
//! The normal matrix is the inverse-transpose of the world matrix's upper 3x3.
//! When its determinant is negative the node is mirrored (an odd number of
//! negative scale axes) and [`Scene::flip_normals`] reports `true`, which the
//! material shader uses to swap front and back faces.
//!
//! # Example
//!
//! ```ignore
//! use glam::Vec3;
//! use sumi::scene::Scene;
//!
//! let mut scene = Scene::new();
//! let root = scene.create_node();
//! let arm = scene.create_node();
//! scene.append_child(root, arm)?;
//!
//! scene.set_translation(arm, Vec3::new(0.0, 1.0, 0.0));
//! scene.set_rotation_euler(root, Vec3::new(0.0, 45.0, 0.0));
//!
//! let world = scene.transform_matrix(arm).unwrap();
//! ```

mod node;

pub use node::{LocalTransform, Node, NodeKind, Rotation, euler_to_quat, quat_to_euler};

use crate::camera::Camera;
use crate::error::SceneError;
use crate::gpu::GraphicsContext;
use crate::mesh::Mesh;
use crate::renderer::Renderer;
use glam::{Mat3, Mat4, Quat, Vec3};
use slotmap::{SlotMap, new_key_type};
use std::ops::Index;

new_key_type! {
    /// Handle to a node in a [`Scene`].
    pub struct NodeId;
}

/// A resolved snapshot of a node's transform, as consumed by draw calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemTransform {
    pub world: Mat4,
    pub normal: Mat3,
    pub flip_normals: bool,
}

/// Selects a child to detach, by position or by handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildRef {
    Index(usize),
    Node(NodeId),
}

impl From<usize> for ChildRef {
    fn from(index: usize) -> Self {
        ChildRef::Index(index)
    }
}

impl From<NodeId> for ChildRef {
    fn from(id: NodeId) -> Self {
        ChildRef::Node(id)
    }
}

/// Arena-backed scene graph.
///
/// Setters on unknown ids are no-ops, and reads return `None`.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    // ---- creation ----

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind))
    }

    /// A plain grouping node.
    pub fn create_node(&mut self) -> NodeId {
        self.add(NodeKind::Empty)
    }

    pub fn create_mesh(&mut self, mesh: Mesh) -> NodeId {
        self.add(NodeKind::Mesh(mesh))
    }

    pub fn create_camera(&mut self, camera: Camera) -> NodeId {
        self.add(NodeKind::Camera(camera))
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.name = Some(name.into());
        }
    }

    // ---- local transform ----

    /// Applies `edit` to the node's local transform and invalidates its subtree.
    pub fn update_local(&mut self, id: NodeId, edit: impl FnOnce(&mut LocalTransform)) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        edit(&mut node.local);
        self.mark_dirty(id);
    }

    pub fn local(&self, id: NodeId) -> Option<&LocalTransform> {
        self.nodes.get(id).map(|node| &node.local)
    }

    pub fn set_translation(&mut self, id: NodeId, translation: Vec3) {
        self.update_local(id, |local| local.translation = translation);
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) {
        self.update_local(id, |local| local.scale = scale);
    }

    pub fn set_center(&mut self, id: NodeId, center: Vec3) {
        self.update_local(id, |local| local.center = center);
    }

    /// Writes the Euler store (degrees). Only visible while not in quaternion mode.
    pub fn set_rotation_euler(&mut self, id: NodeId, degrees: Vec3) {
        self.update_local(id, |local| local.euler = degrees);
    }

    /// Writes the quaternion store. Only visible while in quaternion mode.
    pub fn set_rotation_quat(&mut self, id: NodeId, rotation: Quat) {
        self.update_local(id, |local| local.quaternion = rotation);
    }

    /// The rotation store currently applied.
    pub fn rotation(&self, id: NodeId) -> Option<Rotation> {
        self.nodes.get(id).map(|node| node.local.rotation())
    }

    /// Selects which rotation store is applied, without converting between them.
    ///
    /// Toggling back restores the previous transform exactly. Use
    /// [`Scene::convert_rotation_mode`] to keep the visual rotation instead.
    pub fn set_use_quaternions(&mut self, id: NodeId, use_quaternions: bool) {
        self.update_local(id, |local| local.use_quaternions = use_quaternions);
    }

    /// Turns the node about its parent's Y axis by `degrees`, in whichever
    /// rotation store is active.
    pub fn turn_y(&mut self, id: NodeId, degrees: f32) {
        self.update_local(id, |local| {
            if local.use_quaternions {
                local.quaternion = Quat::from_rotation_y(degrees.to_radians()) * local.quaternion;
            } else {
                local.euler.y += degrees;
            }
        });
    }

    /// Switches rotation mode, converting the current rotation into the newly
    /// selected store so the node does not visibly change.
    pub fn convert_rotation_mode(&mut self, id: NodeId, use_quaternions: bool) {
        self.update_local(id, |local| {
            if local.use_quaternions == use_quaternions {
                return;
            }
            if use_quaternions {
                local.quaternion = euler_to_quat(local.euler);
            } else {
                local.euler = quat_to_euler(local.quaternion);
            }
            local.use_quaternions = use_quaternions;
        });
    }

    // ---- derived matrices ----

    /// Marks `id` and every descendant dirty. Camera nodes also drop their cached
    /// projection.
    pub fn mark_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current) {
                node.mark_dirty();
                stack.extend_from_slice(&node.children);
            }
        }
    }

    pub fn is_dirty(&self, id: NodeId) -> Option<bool> {
        self.nodes.get(id).map(Node::is_dirty)
    }

    /// Recomputes `id` and any dirty ancestors, top-down.
    fn resolve(&mut self, id: NodeId) {
        // A clean node always has clean ancestors, so the dirty chain is a prefix
        // of the path to the root.
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(current) else {
                break;
            };
            if !node.dirty {
                break;
            }
            chain.push(current);
            cursor = node.parent;
        }

        let mut parent_world = chain
            .last()
            .and_then(|top| self.nodes[*top].parent)
            .map(|parent| self.nodes[parent].world);

        for current in chain.into_iter().rev() {
            let node = &mut self.nodes[current];
            let local = node.local.matrix();
            let world = match parent_world {
                Some(parent) => parent * local,
                None => local,
            };
            node.resolve(world);
            parent_world = Some(world);
        }
    }

    /// World matrix of `id`, recomputed if stale.
    pub fn transform_matrix(&mut self, id: NodeId) -> Option<Mat4> {
        self.resolve(id);
        self.nodes.get(id).map(|node| node.world)
    }

    /// Inverse-transpose of the world matrix's upper 3x3, or zero if singular.
    pub fn normal_matrix(&mut self, id: NodeId) -> Option<Mat3> {
        self.resolve(id);
        self.nodes.get(id).map(|node| node.normal)
    }

    pub fn flip_normals(&mut self, id: NodeId) -> Option<bool> {
        self.resolve(id);
        self.nodes.get(id).map(|node| node.flip_normals)
    }

    pub fn item_transform(&mut self, id: NodeId) -> Option<ItemTransform> {
        self.resolve(id);
        self.nodes.get(id).map(|node| ItemTransform {
            world: node.world,
            normal: node.normal,
            flip_normals: node.flip_normals,
        })
    }

    // ---- cameras ----

    pub fn camera(&self, id: NodeId) -> Option<&Camera> {
        self.nodes.get(id).and_then(Node::camera)
    }

    pub fn camera_mut(&mut self, id: NodeId) -> Option<&mut Camera> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// The camera's projection for the live viewport `aspect`.
    pub fn projection_matrix(&mut self, id: NodeId, aspect: f32) -> Option<Mat4> {
        self.camera_mut(id).map(|camera| camera.projection_matrix(aspect))
    }

    /// Inverse of the node's world matrix.
    pub fn view_matrix(&mut self, id: NodeId) -> Option<Mat4> {
        self.transform_matrix(id).map(|world| world.inverse())
    }

    // ---- hierarchy ----

    /// Makes `child` the last child of `parent`.
    ///
    /// A child that already has a parent is detached from it first. Fails with
    /// [`SceneError::Cycle`] if `child` is `parent` or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(SceneError::UnknownNode);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::Cycle);
        }

        if let Some(old_parent) = self.nodes[child].parent {
            self.nodes[old_parent].children.retain(|&c| c != child);
        }
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.mark_dirty(child);
        Ok(())
    }

    /// Detaches a child of `parent`. Out-of-range indices and non-children are
    /// ignored. Returns the detached node.
    pub fn remove_child(&mut self, parent: NodeId, child: impl Into<ChildRef>) -> Option<NodeId> {
        let children = &mut self.nodes.get_mut(parent)?.children;
        let position = match child.into() {
            ChildRef::Index(index) => (index < children.len()).then_some(index)?,
            ChildRef::Node(id) => children.iter().position(|&c| c == id)?,
        };
        let removed = children.remove(position);

        self.nodes[removed].parent = None;
        self.mark_dirty(removed);
        Some(removed)
    }

    /// Detaches `id` from its parent and deletes it with all descendants.
    /// Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        let Some(parent) = self.nodes.get(id).map(|node| node.parent) else {
            return 0;
        };
        if let Some(parent) = parent {
            self.nodes[parent].children.retain(|&c| c != id);
        }
        let doomed = self.descendants(id);
        for node in &doomed {
            self.nodes.remove(*node);
        }
        doomed.len()
    }

    /// Whether `ancestor` is `id` or lies on the path from `id` to its root.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent);
        }
        false
    }

    /// `root` and its descendants in depth-first pre-order (draw order).
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                order.push(current);
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    /// First node in depth-first pre-order under `root` satisfying `pred`.
    pub fn find(&self, root: NodeId, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| pred(&self.nodes[id]))
    }

    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.find(root, |node| node.name() == Some(name))
    }

    // ---- drawing ----

    /// Draws `root` and its subtree: each mesh node issues its primitives in
    /// order, then its children are drawn in list order.
    pub fn draw<C: GraphicsContext>(&mut self, root: NodeId, renderer: &mut Renderer<C>) {
        for id in self.descendants(root) {
            let primitives = match self.nodes[id].mesh() {
                Some(mesh) => mesh.shared_primitives(),
                None => continue,
            };
            let Some(item) = self.item_transform(id) else {
                continue;
            };
            Mesh::shared(primitives).draw(renderer, &item);
        }
    }
}

impl Index<NodeId> for Scene {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn assert_mat4_eq(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, 1e-5), "\n{a:?}\n!=\n{b:?}");
    }

    fn chain(scene: &mut Scene, depth: usize) -> Vec<NodeId> {
        let ids: Vec<_> = (0..depth).map(|_| scene.create_node()).collect();
        for pair in ids.windows(2) {
            scene.append_child(pair[0], pair[1]).unwrap();
        }
        ids
    }

    #[test]
    fn mutation_dirties_every_descendant() {
        let mut scene = Scene::new();
        let ids = chain(&mut scene, 4);
        let leaf = ids[3];
        scene.transform_matrix(leaf).unwrap();
        assert!(ids.iter().all(|&id| scene.is_dirty(id) == Some(false)));

        let edits: [fn(&mut Scene, NodeId); 4] = [
            |s, id| s.set_translation(id, Vec3::X),
            |s, id| s.set_scale(id, Vec3::splat(2.0)),
            |s, id| s.set_rotation_euler(id, Vec3::new(0.0, 10.0, 0.0)),
            |s, id| s.set_center(id, Vec3::Y),
        ];
        for edit in edits {
            let before = scene.transform_matrix(leaf).unwrap();
            edit(&mut scene, ids[1]);
            assert_eq!(scene.is_dirty(ids[0]), Some(false));
            assert!(ids[1..].iter().all(|&id| scene.is_dirty(id) == Some(true)));

            let after = scene.transform_matrix(leaf).unwrap();
            assert_eq!(scene.is_dirty(leaf), Some(false));
            assert_ne!(before, after);
        }
    }

    #[test]
    fn already_dirty_descendants_stay_dirty() {
        let mut scene = Scene::new();
        let ids = chain(&mut scene, 3);
        scene.set_translation(ids[2], Vec3::Z);
        scene.set_translation(ids[0], Vec3::X);
        assert_eq!(scene.is_dirty(ids[2]), Some(true));
    }

    #[test]
    fn default_node_is_identity() {
        let mut scene = Scene::new();
        let node = scene.create_node();
        assert_eq!(scene.transform_matrix(node), Some(Mat4::IDENTITY));
        assert_eq!(scene.normal_matrix(node), Some(Mat3::IDENTITY));
        assert_eq!(scene.flip_normals(node), Some(false));

        scene.set_use_quaternions(node, true);
        assert_eq!(scene.transform_matrix(node), Some(Mat4::IDENTITY));
    }

    #[test]
    fn child_world_is_parent_world_times_local() {
        let mut scene = Scene::new();
        let parent = scene.create_node();
        let child = scene.create_node();
        scene.append_child(parent, child).unwrap();

        scene.set_translation(parent, Vec3::new(1.0, 2.0, 3.0));
        scene.set_rotation_euler(parent, Vec3::new(0.0, 90.0, 0.0));
        scene.set_scale(child, Vec3::new(2.0, 0.5, 1.0));
        scene.set_translation(child, Vec3::new(0.0, 0.0, -4.0));

        let parent_world = scene.transform_matrix(parent).unwrap();
        let child_local = scene.local(child).unwrap().matrix();
        assert_mat4_eq(scene.transform_matrix(child).unwrap(), parent_world * child_local);

        let origin = scene.transform_matrix(child).unwrap().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(-3.0, 2.0, 3.0), 1e-5), "{origin:?}");
    }

    #[test]
    fn reading_a_child_resolves_dirty_ancestors() {
        let mut scene = Scene::new();
        let ids = chain(&mut scene, 3);
        scene.set_translation(ids[0], Vec3::new(5.0, 0.0, 0.0));
        let leaf = scene.transform_matrix(ids[2]).unwrap();
        assert_eq!(scene.is_dirty(ids[0]), Some(false));
        assert_eq!(leaf.w_axis, Vec4::new(5.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn negative_scale_parity_sets_flip() {
        let mut scene = Scene::new();
        let node = scene.create_node();

        scene.set_scale(node, Vec3::new(-1.0, 1.0, 1.0));
        assert_eq!(scene.flip_normals(node), Some(true));

        scene.set_scale(node, Vec3::new(-1.0, -1.0, 1.0));
        assert_eq!(scene.flip_normals(node), Some(false));

        scene.set_scale(node, Vec3::new(-2.0, -1.0, -0.5));
        assert_eq!(scene.flip_normals(node), Some(true));
    }

    #[test]
    fn flip_is_inherited_from_mirrored_parent() {
        let mut scene = Scene::new();
        let ids = chain(&mut scene, 2);
        scene.set_scale(ids[0], Vec3::new(1.0, 1.0, -1.0));
        assert_eq!(scene.flip_normals(ids[1]), Some(true));
    }

    #[test]
    fn normal_matrix_corrects_non_uniform_scale() {
        let mut scene = Scene::new();
        let node = scene.create_node();
        scene.set_scale(node, Vec3::new(2.0, 1.0, 1.0));
        let normal = scene.normal_matrix(node).unwrap();
        assert!(normal.abs_diff_eq(Mat3::from_diagonal(Vec3::new(0.5, 1.0, 1.0)), 1e-6));
    }

    #[test]
    fn singular_scale_zeroes_normal_matrix() {
        let mut scene = Scene::new();
        let node = scene.create_node();
        scene.set_scale(node, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(scene.normal_matrix(node), Some(Mat3::ZERO));
        assert_eq!(scene.flip_normals(node), Some(false));
        assert!(scene[node].normal_matrix_singular());

        scene.set_scale(node, Vec3::ONE);
        assert_eq!(scene.normal_matrix(node), Some(Mat3::IDENTITY));
        assert!(!scene[node].normal_matrix_singular());
    }

    #[test]
    fn near_singular_scale_falls_back_to_zero() {
        let mut scene = Scene::new();
        let node = scene.create_node();
        scene.set_scale(node, Vec3::new(1e-20, 1e-20, 1.0));
        assert_eq!(scene.normal_matrix(node), Some(Mat3::ZERO));
        assert_eq!(scene.flip_normals(node), Some(false));
        assert!(scene[node].normal_matrix_singular());

        let child = scene.create_node();
        scene.append_child(node, child).unwrap();
        scene.set_scale(child, Vec3::new(1e20, 1e20, 1.0));
        let normal = scene.normal_matrix(child).unwrap();
        assert!(normal.is_finite(), "{normal:?}");
    }

    #[test]
    fn turning_edits_the_active_rotation_store() {
        let mut scene = Scene::new();
        let euler = scene.create_node();
        scene.set_rotation_euler(euler, Vec3::new(0.0, 120.0, 0.0));
        scene.turn_y(euler, -0.2);
        assert!(scene.local(euler).unwrap().euler.abs_diff_eq(Vec3::new(0.0, 119.8, 0.0), 1e-4));

        let quat = scene.create_node();
        scene.set_use_quaternions(quat, true);
        scene.set_rotation_quat(quat, Quat::from_rotation_x(0.3));
        let before = scene.transform_matrix(quat).unwrap();
        scene.turn_y(quat, 90.0);
        assert_eq!(scene.local(quat).unwrap().euler, Vec3::ZERO);
        let after = scene.transform_matrix(quat).unwrap();
        let expected = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2) * before;
        assert!(after.abs_diff_eq(expected, 1e-5), "{after:?}");
    }

    #[test]
    fn toggling_quaternion_mode_does_not_convert() {
        let mut scene = Scene::new();
        let node = scene.create_node();
        let euler = Vec3::new(10.0, 20.0, 30.0);
        scene.set_rotation_euler(node, euler);
        let euler_world = scene.transform_matrix(node).unwrap();

        scene.set_use_quaternions(node, true);
        assert_eq!(scene.local(node).unwrap().euler, euler);
        assert_eq!(scene.rotation(node), Some(Rotation::Quaternion(Quat::IDENTITY)));
        assert_eq!(scene.transform_matrix(node), Some(Mat4::IDENTITY));

        scene.set_use_quaternions(node, false);
        assert_eq!(scene.rotation(node), Some(Rotation::Euler(euler)));
        assert_eq!(scene.transform_matrix(node), Some(euler_world));
    }

    #[test]
    fn converting_rotation_mode_preserves_transform() {
        let mut scene = Scene::new();
        let node = scene.create_node();
        scene.set_rotation_euler(node, Vec3::new(15.0, -40.0, 70.0));
        let before = scene.transform_matrix(node).unwrap();

        scene.convert_rotation_mode(node, true);
        assert!(matches!(scene.rotation(node), Some(Rotation::Quaternion(_))));
        assert_mat4_eq(scene.transform_matrix(node).unwrap(), before);

        scene.set_rotation_quat(node, Quat::from_rotation_x(0.3));
        let quat_world = scene.transform_matrix(node).unwrap();
        scene.convert_rotation_mode(node, false);
        assert_mat4_eq(scene.transform_matrix(node).unwrap(), quat_world);
    }

    #[test]
    fn camera_projection_tracks_fov_aspect_and_transform() {
        let mut scene = Scene::new();
        let cam = scene.create_camera(Camera::new(0.69));

        let before = scene.projection_matrix(cam, 1.0).unwrap();
        scene.camera_mut(cam).unwrap().set_fov(0.9);
        let after_fov = scene.projection_matrix(cam, 1.0).unwrap();
        assert_ne!(before, after_fov);

        let after_resize = scene.projection_matrix(cam, 4.0 / 3.0).unwrap();
        assert_ne!(after_fov, after_resize);

        assert!(!scene.camera(cam).unwrap().is_projection_dirty());
        scene.set_translation(cam, Vec3::Z);
        assert!(scene.camera(cam).unwrap().is_projection_dirty());
    }

    #[test]
    fn parent_edit_dirties_child_camera_projection() {
        let mut scene = Scene::new();
        let rig = scene.create_node();
        let cam = scene.create_camera(Camera::default());
        scene.append_child(rig, cam).unwrap();
        scene.projection_matrix(cam, 1.0);

        scene.set_rotation_euler(rig, Vec3::Y);
        assert!(scene.camera(cam).unwrap().is_projection_dirty());
    }

    #[test]
    fn view_matrix_inverts_camera_world() {
        let mut scene = Scene::new();
        let cam = scene.create_camera(Camera::default());
        scene.set_translation(cam, Vec3::new(0.0, 0.0, 5.0));
        let view = scene.view_matrix(cam).unwrap();
        assert!(view.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-6));
    }

    #[test]
    fn append_rejects_cycles() {
        let mut scene = Scene::new();
        let ids = chain(&mut scene, 3);
        assert_eq!(scene.append_child(ids[2], ids[0]), Err(SceneError::Cycle));
        assert_eq!(scene.append_child(ids[1], ids[1]), Err(SceneError::Cycle));
        assert_eq!(scene[ids[0]].parent(), None);
    }

    #[test]
    fn append_reparents() {
        let mut scene = Scene::new();
        let a = scene.create_node();
        let b = scene.create_node();
        let child = scene.create_node();
        scene.append_child(a, child).unwrap();
        scene.append_child(b, child).unwrap();

        assert!(scene[a].children().is_empty());
        assert_eq!(scene[b].children(), &[child]);
        assert_eq!(scene[child].parent(), Some(b));
    }

    #[test]
    fn append_unknown_node_fails() {
        let mut scene = Scene::new();
        let a = scene.create_node();
        let gone = scene.create_node();
        scene.remove_subtree(gone);
        assert_eq!(scene.append_child(a, gone), Err(SceneError::UnknownNode));
    }

    #[test]
    fn remove_child_by_index_and_handle() {
        let mut scene = Scene::new();
        let parent = scene.create_node();
        let kids: Vec<_> = (0..3).map(|_| scene.create_node()).collect();
        for &kid in &kids {
            scene.append_child(parent, kid).unwrap();
        }
        scene.set_translation(parent, Vec3::X);
        scene.transform_matrix(kids[1]);

        assert_eq!(scene.remove_child(parent, 1), Some(kids[1]));
        assert_eq!(scene[kids[1]].parent(), None);
        assert_eq!(scene.is_dirty(kids[1]), Some(true));
        assert_eq!(scene.transform_matrix(kids[1]), Some(Mat4::IDENTITY));

        assert_eq!(scene.remove_child(parent, kids[2]), Some(kids[2]));
        assert_eq!(scene[parent].children(), &[kids[0]]);
    }

    #[test]
    fn remove_child_ignores_bad_references() {
        let mut scene = Scene::new();
        let parent = scene.create_node();
        let stranger = scene.create_node();
        let kid = scene.create_node();
        scene.append_child(parent, kid).unwrap();

        assert_eq!(scene.remove_child(parent, 5), None);
        assert_eq!(scene.remove_child(parent, stranger), None);
        assert_eq!(scene[parent].children(), &[kid]);
    }

    #[test]
    fn remove_subtree_deletes_descendants() {
        let mut scene = Scene::new();
        let root = scene.create_node();
        let ids = chain(&mut scene, 3);
        scene.append_child(root, ids[0]).unwrap();

        assert_eq!(scene.remove_subtree(ids[0]), 3);
        assert_eq!(scene.len(), 1);
        assert!(scene[root].children().is_empty());
    }

    #[test]
    fn find_by_name_searches_depth_first() {
        let mut scene = Scene::new();
        let root = scene.create_node();
        let left = scene.create_node();
        let deep = scene.create_node();
        let right = scene.create_node();
        scene.append_child(root, left).unwrap();
        scene.append_child(left, deep).unwrap();
        scene.append_child(root, right).unwrap();
        scene.set_name(deep, "Cube");
        scene.set_name(right, "Cube");

        assert_eq!(scene.find_by_name(root, "Cube"), Some(deep));
        assert_eq!(scene.find_by_name(right, "Cube"), Some(right));
        assert_eq!(scene.find_by_name(root, "Sphere"), None);
        assert_eq!(scene.descendants(root), vec![root, left, deep, right]);
    }
}
