//! glTF 2.0 import.
//!
//! This module provides [`GltfImporter`], which turns a glTF JSON document with
//! embedded (`data:` URI) buffers into scene nodes, meshes, materials and
//! cameras. Vertex data is uploaded once per buffer, index data once per buffer
//! view, and meshes, materials and textures once per index, so nodes that share a
//! mesh share its primitives.
//!
//! Unsupported content fails the whole import with an [`ImportError`] naming the
//! feature: non-perspective cameras, non-indexed or non-triangle primitives,
//! sparse accessors and non-`data:` URIs. Nodes created by a failed import are
//! removed from the scene again.
//!
//! # Example
//!
//! ```ignore
//! let shader = Rc::new(Shader::material(renderer.context_mut())?);
//! let mut importer = GltfImporter::new(&mut renderer, GLTF_JSON, shader)?;
//! let roots = importer.import_default_scene(&mut scene)?;
//! ```

pub mod document;

use crate::camera::Camera;
use crate::error::ImportError;
use crate::gpu::{BufferId, BufferTarget, ComponentType, GraphicsContext, TextureId};
use crate::material::Material;
use crate::mesh::{IndexBuffer, Mesh, MeshPrimitive, VertexAttribute};
use crate::renderer::Renderer;
use crate::scene::{NodeId, NodeKind, Scene};
use crate::shader::Shader;
use crate::texture;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use document::Document;
use glam::{Mat4, Quat, Vec3, Vec4};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{info, warn};

/// Decodes a `data:<type>/<subtype>;base64,<payload>` URI, where type and subtype
/// are made of lowercase letters, `+` and `-`.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ImportError> {
    let unsupported = || ImportError::UnsupportedUri(uri.chars().take(64).collect());

    let rest = uri.strip_prefix("data:").ok_or_else(unsupported)?;
    let (media_type, payload) = rest.split_once(";base64,").ok_or_else(unsupported)?;
    let (kind, subtype) = media_type.split_once('/').ok_or_else(unsupported)?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b == b'+' || b == b'-')
    };
    if !valid(kind) || !valid(subtype) {
        return Err(unsupported());
    }
    Ok(BASE64.decode(payload)?)
}

/// Whether `count` elements of `element_size` bytes, `stride` bytes apart and
/// starting `offset` bytes in, fit inside a view of `view_length` bytes.
fn fits_in_view(
    offset: u32,
    count: u32,
    element_size: u64,
    stride: u64,
    view_length: usize,
) -> bool {
    let end = match count {
        0 => u64::from(offset),
        n => u64::from(offset) + u64::from(n - 1) * stride + element_size,
    };
    end <= view_length as u64
}

fn fetch<'a, T>(items: &'a [T], kind: &'static str, index: usize) -> Result<&'a T, ImportError> {
    items.get(index).ok_or(ImportError::MissingIndex { kind, index })
}

/// Imports scenes from one glTF document into a [`Scene`], creating GPU resources
/// through the renderer's context.
pub struct GltfImporter<'r, C: GraphicsContext> {
    renderer: &'r mut Renderer<C>,
    document: Document,
    shader: Rc<Shader>,
    buffer_data: HashMap<usize, Rc<[u8]>>,
    vertex_buffers: HashMap<usize, BufferId>,
    element_buffers: HashMap<usize, BufferId>,
    meshes: HashMap<usize, Rc<[MeshPrimitive]>>,
    materials: HashMap<Option<usize>, Rc<Material>>,
    textures: HashMap<usize, TextureId>,
    images: HashMap<usize, (Rc<[u8]>, Option<String>)>,
    created: Vec<NodeId>,
}

impl<'r, C: GraphicsContext> GltfImporter<'r, C> {
    /// Parses `json`. Every material created by this importer uses `shader`, and
    /// vertex attributes are matched to its inputs by semantic name.
    pub fn new(
        renderer: &'r mut Renderer<C>,
        json: &str,
        shader: Rc<Shader>,
    ) -> Result<Self, ImportError> {
        let document = serde_json::from_str(json)?;
        Ok(Self::from_document(renderer, document, shader))
    }

    pub fn from_document(
        renderer: &'r mut Renderer<C>,
        document: Document,
        shader: Rc<Shader>,
    ) -> Self {
        Self {
            renderer,
            document,
            shader,
            buffer_data: HashMap::new(),
            vertex_buffers: HashMap::new(),
            element_buffers: HashMap::new(),
            meshes: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            images: HashMap::new(),
            created: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Imports the document's default scene (`scene`, or scene 0).
    pub fn import_default_scene(&mut self, scene: &mut Scene) -> Result<Vec<NodeId>, ImportError> {
        self.import_scene(scene, self.document.scene.unwrap_or(0))
    }

    /// Imports scene `index` and returns its root nodes, in document order. The
    /// roots are left unparented.
    pub fn import_scene(
        &mut self,
        scene: &mut Scene,
        index: usize,
    ) -> Result<Vec<NodeId>, ImportError> {
        self.created.clear();
        let result = self.import_roots(scene, index);
        if result.is_err() {
            for id in self.created.drain(..) {
                scene.remove_subtree(id);
            }
        }
        result
    }

    fn import_roots(
        &mut self,
        scene: &mut Scene,
        index: usize,
    ) -> Result<Vec<NodeId>, ImportError> {
        let roots = fetch(&self.document.scenes, "scene", index)?.nodes.clone();
        let mut path = Vec::new();
        let mut items = Vec::with_capacity(roots.len());
        for node in roots {
            items.push(self.import_node(scene, node, &mut path)?);
        }
        info!(
            scene = index,
            roots = items.len(),
            nodes = self.created.len(),
            meshes = self.meshes.len(),
            materials = self.materials.len(),
            textures = self.textures.len(),
            "imported glTF scene"
        );
        Ok(items)
    }

    fn import_node(
        &mut self,
        scene: &mut Scene,
        index: usize,
        path: &mut Vec<usize>,
    ) -> Result<NodeId, ImportError> {
        if path.contains(&index) {
            return Err(ImportError::NodeCycle(index));
        }
        let gltf_node = fetch(&self.document.nodes, "node", index)?;
        let (mesh, camera) = (gltf_node.mesh, gltf_node.camera);
        let children = gltf_node.children.clone();

        let kind = if let Some(mesh) = mesh {
            NodeKind::Mesh(Mesh::shared(self.import_mesh(mesh)?))
        } else if let Some(camera) = camera {
            NodeKind::Camera(self.import_camera(camera)?)
        } else {
            NodeKind::Empty
        };
        let id = scene.add(kind);
        self.created.push(id);
        self.apply_transform(scene, id, index)?;

        path.push(index);
        for child in children {
            let child = self.import_node(scene, child, path)?;
            // Fresh nodes cannot form a cycle.
            let _ = scene.append_child(id, child);
        }
        path.pop();
        Ok(id)
    }

    fn apply_transform(
        &self,
        scene: &mut Scene,
        id: NodeId,
        index: usize,
    ) -> Result<(), ImportError> {
        let node = fetch(&self.document.nodes, "node", index)?;
        if let Some(name) = &node.name {
            scene.set_name(id, name.clone());
        }

        if let (false, Some(matrix)) = (node.has_trs(), node.matrix) {
            let (scale, rotation, translation) =
                Mat4::from_cols_array(&matrix).to_scale_rotation_translation();
            scene.update_local(id, |local| {
                local.translation = translation;
                local.scale = scale;
                local.quaternion = rotation;
                local.use_quaternions = true;
            });
            return Ok(());
        }

        if let Some(translation) = node.translation {
            scene.set_translation(id, Vec3::from_array(translation));
        }
        if let Some(scale) = node.scale {
            scene.set_scale(id, Vec3::from_array(scale));
        }
        if let Some(rotation) = node.rotation {
            scene.set_use_quaternions(id, true);
            scene.set_rotation_quat(id, Quat::from_array(rotation));
        }
        Ok(())
    }

    fn import_camera(&self, index: usize) -> Result<Camera, ImportError> {
        let camera = fetch(&self.document.cameras, "camera", index)?;
        match (&camera.perspective, camera.kind.as_str()) {
            (Some(perspective), "perspective") => Ok(Camera::with_clip(
                perspective.yfov,
                perspective.znear,
                perspective.zfar.unwrap_or(Camera::DEFAULT_Z_FAR),
            )),
            _ => Err(ImportError::NonPerspectiveCamera(index)),
        }
    }

    /// Raw bytes of buffer `index`.
    fn buffer_data(&mut self, index: usize) -> Result<Rc<[u8]>, ImportError> {
        if let Some(data) = self.buffer_data.get(&index) {
            return Ok(Rc::clone(data));
        }
        let buffer = fetch(&self.document.buffers, "buffer", index)?;
        let uri = buffer
            .uri
            .as_deref()
            .ok_or_else(|| ImportError::UnsupportedUri(format!("buffer {index} has no URI")))?;
        let data: Rc<[u8]> = decode_data_uri(uri)?.into();
        self.buffer_data.insert(index, Rc::clone(&data));
        Ok(data)
    }

    /// Bytes of buffer view `index`, bounds-checked.
    fn view_data(&mut self, index: usize) -> Result<Vec<u8>, ImportError> {
        let view = fetch(&self.document.buffer_views, "bufferView", index)?;
        let (buffer, start, len) = (view.buffer, view.byte_offset, view.byte_length);
        let data = self.buffer_data(buffer)?;
        start
            .checked_add(len)
            .and_then(|end| data.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or(ImportError::OutOfBounds {
                view: index,
                buffer,
            })
    }

    /// Array buffer holding all of buffer `index`.
    fn vertex_buffer(&mut self, index: usize) -> Result<BufferId, ImportError> {
        if let Some(buffer) = self.vertex_buffers.get(&index) {
            return Ok(*buffer);
        }
        let data = self.buffer_data(index)?;
        let buffer = self
            .renderer
            .context_mut()
            .create_buffer(BufferTarget::Array, &data)?;
        self.vertex_buffers.insert(index, buffer);
        Ok(buffer)
    }

    /// Element buffer holding buffer view `index`.
    fn element_buffer(&mut self, index: usize) -> Result<BufferId, ImportError> {
        if let Some(buffer) = self.element_buffers.get(&index) {
            return Ok(*buffer);
        }
        let data = self.view_data(index)?;
        let buffer = self
            .renderer
            .context_mut()
            .create_buffer(BufferTarget::ElementArray, &data)?;
        self.element_buffers.insert(index, buffer);
        Ok(buffer)
    }

    fn import_mesh(&mut self, index: usize) -> Result<Rc<[MeshPrimitive]>, ImportError> {
        if let Some(primitives) = self.meshes.get(&index) {
            return Ok(Rc::clone(primitives));
        }
        let primitive_count = fetch(&self.document.meshes, "mesh", index)?.primitives.len();
        let mut primitives = Vec::with_capacity(primitive_count);
        for primitive in 0..primitive_count {
            primitives.push(self.import_primitive(index, primitive)?);
        }
        let primitives: Rc<[MeshPrimitive]> = primitives.into();
        self.meshes.insert(index, Rc::clone(&primitives));
        Ok(primitives)
    }

    fn import_primitive(
        &mut self,
        mesh: usize,
        index: usize,
    ) -> Result<MeshPrimitive, ImportError> {
        let gltf_primitive = &self.document.meshes[mesh].primitives[index];
        let mode = gltf_primitive.mode.unwrap_or(document::Primitive::TRIANGLES);
        if mode != document::Primitive::TRIANGLES {
            return Err(ImportError::UnsupportedPrimitiveMode(mode));
        }
        let indices = gltf_primitive.indices.ok_or(ImportError::NonIndexedPrimitive {
            mesh,
            primitive: index,
        })?;
        let material_index = gltf_primitive.material;
        let semantics: Vec<(String, usize)> = gltf_primitive
            .attributes
            .iter()
            .map(|(name, accessor)| (name.clone(), *accessor))
            .collect();

        let material = self.import_material(material_index)?;

        let mut attributes = Vec::with_capacity(semantics.len());
        for (name, accessor) in semantics {
            if let Some(attribute) = self.import_attribute(&name, accessor)? {
                attributes.push(attribute);
            }
        }

        let indices = self.import_indices(indices)?;
        Ok(MeshPrimitive::new(attributes, indices, material))
    }

    /// A vertex attribute binding, or `None` if the shader has no input for it.
    fn import_attribute(
        &mut self,
        name: &str,
        index: usize,
    ) -> Result<Option<VertexAttribute>, ImportError> {
        let accessor = fetch(&self.document.accessors, "accessor", index)?;
        if accessor.sparse.is_some() {
            return Err(ImportError::SparseAccessor(index));
        }
        let view_index = accessor.buffer_view.ok_or(ImportError::MissingBufferView(index))?;
        let component_type = ComponentType::from_gl(accessor.component_type)
            .ok_or(ImportError::UnknownComponentType(accessor.component_type))?;
        let (components, normalized, accessor_offset) =
            (accessor.kind.components(), accessor.normalized, accessor.byte_offset);

        let count = accessor.count;
        let (buffer_index, view_offset, view_length, byte_stride) = self.checked_view(view_index)?;
        let out_of_bounds = ImportError::OutOfBounds {
            view: view_index,
            buffer: buffer_index,
        };

        let element_size = u64::from(components) * component_type.size() as u64;
        let stride = match byte_stride {
            0 => element_size,
            stride => u64::from(stride),
        };
        if !fits_in_view(accessor_offset, count, element_size, stride, view_length) {
            return Err(out_of_bounds);
        }
        let byte_offset = u32::try_from(view_offset)
            .ok()
            .and_then(|offset| offset.checked_add(accessor_offset))
            .ok_or(out_of_bounds)?;

        let Some(location) = self.shader.attribute_location(name) else {
            warn!(attribute = name, "material shader has no input for attribute, skipping");
            return Ok(None);
        };

        let buffer = self.vertex_buffer(buffer_index)?;
        Ok(Some(VertexAttribute {
            buffer,
            name: name.to_string(),
            location,
            components,
            component_type,
            normalized,
            byte_stride,
            byte_offset,
        }))
    }

    /// Buffer index, byte offset, byte length and stride of buffer view `index`,
    /// after checking the view lies inside its buffer.
    fn checked_view(&mut self, index: usize) -> Result<(usize, usize, usize, u32), ImportError> {
        let view = fetch(&self.document.buffer_views, "bufferView", index)?;
        let (buffer, offset, length, stride) = (
            view.buffer,
            view.byte_offset,
            view.byte_length,
            view.byte_stride.unwrap_or(0),
        );
        let data = self.buffer_data(buffer)?;
        match offset.checked_add(length) {
            Some(end) if end <= data.len() => Ok((buffer, offset, length, stride)),
            _ => Err(ImportError::OutOfBounds {
                view: index,
                buffer,
            }),
        }
    }

    fn import_indices(&mut self, index: usize) -> Result<IndexBuffer, ImportError> {
        let accessor = fetch(&self.document.accessors, "accessor", index)?;
        if accessor.sparse.is_some() {
            return Err(ImportError::SparseAccessor(index));
        }
        let view = accessor.buffer_view.ok_or(ImportError::MissingBufferView(index))?;
        let component_type = ComponentType::from_gl(accessor.component_type)
            .ok_or(ImportError::UnknownComponentType(accessor.component_type))?;
        let (count, byte_offset) = (accessor.count, accessor.byte_offset);

        let (buffer_index, _, view_length, _) = self.checked_view(view)?;
        let element_size = component_type.size() as u64;
        if !fits_in_view(byte_offset, count, element_size, element_size, view_length) {
            return Err(ImportError::OutOfBounds {
                view,
                buffer: buffer_index,
            });
        }

        let buffer = self.element_buffer(view)?;
        Ok(IndexBuffer {
            buffer,
            count,
            component_type,
            byte_offset,
        })
    }

    /// Material `index`, or the default material for `None`.
    fn import_material(&mut self, index: Option<usize>) -> Result<Rc<Material>, ImportError> {
        if let Some(material) = self.materials.get(&index) {
            return Ok(Rc::clone(material));
        }
        let (color, texture) = match index {
            None => (Material::DEFAULT_COLOR, None),
            Some(i) => {
                let pbr = fetch(&self.document.materials, "material", i)?
                    .pbr_metallic_roughness
                    .as_ref();
                let color = pbr
                    .and_then(|pbr| pbr.base_color_factor)
                    .map_or(Material::DEFAULT_COLOR, Vec4::from_array);
                let texture = pbr
                    .and_then(|pbr| pbr.base_color_texture.as_ref())
                    .map(|info| info.index);
                (color, texture)
            }
        };
        let texture = texture.map(|t| self.import_texture(t)).transpose()?;

        let material = Rc::new(Material::new(Rc::clone(&self.shader), color, texture));
        self.materials.insert(index, Rc::clone(&material));
        Ok(material)
    }

    /// A placeholder texture whose image decode has been queued.
    fn import_texture(&mut self, index: usize) -> Result<TextureId, ImportError> {
        if let Some(texture) = self.textures.get(&index) {
            return Ok(*texture);
        }
        let source = fetch(&self.document.textures, "texture", index)?.source;
        let image = source.ok_or(ImportError::MissingImageSource(index))?;
        let (bytes, mime_type) = self.import_image(image)?;

        let texture = texture::create_placeholder(self.renderer.context_mut())?;
        self.renderer
            .queue_texture_decode(texture, bytes.to_vec(), mime_type);
        self.textures.insert(index, texture);
        Ok(texture)
    }

    /// Encoded bytes and MIME type of image `index`.
    fn import_image(&mut self, index: usize) -> Result<(Rc<[u8]>, Option<String>), ImportError> {
        if let Some((bytes, mime_type)) = self.images.get(&index) {
            return Ok((Rc::clone(bytes), mime_type.clone()));
        }
        let image = fetch(&self.document.images, "image", index)?;
        let (view, uri, mut mime_type) =
            (image.buffer_view, image.uri.clone(), image.mime_type.clone());

        let bytes: Rc<[u8]> = match (view, uri) {
            (Some(view), _) => self.view_data(view)?.into(),
            (None, Some(uri)) => {
                if mime_type.is_none() {
                    mime_type = uri
                        .strip_prefix("data:")
                        .and_then(|rest| rest.split(';').next())
                        .map(str::to_string);
                }
                decode_data_uri(&uri)?.into()
            }
            (None, None) => return Err(ImportError::MissingImageSource(index)),
        };
        self.images
            .insert(index, (Rc::clone(&bytes), mime_type.clone()));
        Ok((bytes, mime_type))
    }
}
