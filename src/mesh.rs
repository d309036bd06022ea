//! Meshes and their drawable primitives.
//!
//! A [`Mesh`] is the payload of a mesh node: an ordered list of
//! [`MeshPrimitive`]s, each pairing vertex attribute bindings and an index buffer
//! with a [`Material`]. Primitive lists are shared (`Rc`) between every node that
//! instances the same glTF mesh.

use crate::gpu::{BufferId, ComponentType, GraphicsContext};
use crate::material::Material;
use crate::renderer::Renderer;
use crate::scene::ItemTransform;
use std::rc::Rc;

/// Texture unit the material's base-color texture is bound to.
pub const MATERIAL_TEXTURE_UNIT: u32 = 0;

/// One vertex input of a primitive: where its data lives and how to read it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub buffer: BufferId,
    /// Attribute semantic / shader input name, e.g. `POSITION`.
    pub name: String,
    pub location: u32,
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub byte_stride: u32,
    pub byte_offset: u32,
}

/// The element buffer of a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBuffer {
    pub buffer: BufferId,
    pub count: u32,
    pub component_type: ComponentType,
    pub byte_offset: u32,
}

/// An indexed triangle list drawn with one material.
#[derive(Clone, Debug)]
pub struct MeshPrimitive {
    attributes: Vec<VertexAttribute>,
    indices: IndexBuffer,
    material: Rc<Material>,
}

impl MeshPrimitive {
    pub fn new(
        attributes: Vec<VertexAttribute>,
        indices: IndexBuffer,
        material: Rc<Material>,
    ) -> Self {
        Self {
            attributes,
            indices,
            material,
        }
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn indices(&self) -> &IndexBuffer {
        &self.indices
    }

    pub fn material(&self) -> &Rc<Material> {
        &self.material
    }

    /// Draws this primitive with `item`'s transform.
    ///
    /// Activates the material's program, pushes the per-draw uniforms through
    /// [`Renderer::rebind_uniforms`], then the material's color and texture, binds
    /// every vertex attribute, and issues one indexed draw.
    pub fn draw_as_item<C: GraphicsContext>(
        &self,
        renderer: &mut Renderer<C>,
        item: &ItemTransform,
    ) {
        let shader = self.material.shader();
        renderer.context_mut().use_program(shader.program());
        renderer.rebind_uniforms(item, shader);

        let gl = renderer.context_mut();
        gl.uniform_vec4(shader.uniform_location("u_color"), self.material.color().to_array());

        if let Some(texture) = self.material.texture() {
            gl.uniform_i32(shader.uniform_location("u_texture"), MATERIAL_TEXTURE_UNIT as i32);
            gl.bind_texture(MATERIAL_TEXTURE_UNIT, Some(texture));
        }
        gl.uniform_bool(
            shader.uniform_location("u_useTexture"),
            self.material.texture().is_some(),
        );

        for attribute in &self.attributes {
            gl.vertex_attribute(attribute);
        }

        gl.draw_elements(
            self.indices.buffer,
            self.indices.count,
            self.indices.component_type,
            self.indices.byte_offset,
        );
    }
}

/// The drawable payload of a mesh node.
#[derive(Clone, Debug)]
pub struct Mesh {
    primitives: Rc<[MeshPrimitive]>,
}

impl Mesh {
    pub fn new(primitives: Vec<MeshPrimitive>) -> Self {
        Self {
            primitives: primitives.into(),
        }
    }

    /// A mesh sharing an existing primitive list.
    pub fn shared(primitives: Rc<[MeshPrimitive]>) -> Self {
        Self { primitives }
    }

    pub fn primitives(&self) -> &[MeshPrimitive] {
        &self.primitives
    }

    pub fn shared_primitives(&self) -> Rc<[MeshPrimitive]> {
        Rc::clone(&self.primitives)
    }

    /// Draws every primitive, in order.
    pub fn draw<C: GraphicsContext>(&self, renderer: &mut Renderer<C>, item: &ItemTransform) {
        for primitive in self.primitives.iter() {
            primitive.draw_as_item(renderer, item);
        }
    }
}
