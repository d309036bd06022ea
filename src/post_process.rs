use crate::error::ShaderError;
use crate::gpu::{BufferId, BufferTarget, ComponentType, GraphicsContext};
use crate::mesh::VertexAttribute;
use crate::render_target::RenderTarget;
use crate::shader::{OUTLINE_FRAGMENT, OUTLINE_VERTEX, Shader};

/// A vertex of the full-screen quad, in unit-square coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
}

/// Two triangles covering the unit square.
pub const FULLSCREEN_QUAD: [QuadVertex; 6] = [
    QuadVertex { position: [0.0, 0.0] },
    QuadVertex { position: [0.0, 1.0] },
    QuadVertex { position: [1.0, 0.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [0.0, 1.0] },
    QuadVertex { position: [1.0, 0.0] },
];

/// Sampler uniform and texture unit for each scene-pass attachment the outline
/// shader reads.
const INPUTS: [(&str, u32); 3] = [
    ("u_texture", RenderTarget::COLOR),
    ("u_matIndex", RenderTarget::MATERIAL_INDEX),
    ("u_normal", RenderTarget::NORMAL),
];

/// Screen-space outline post-process.
///
/// Copies the scene color to the bound framebuffer and paints black wherever a
/// small neighborhood shows a material-index change or a sharp normal change.
/// Inputs are read with integer texel fetches, so the pass is exact at any
/// drawing-buffer resolution.
#[derive(Debug)]
pub struct OutlinePass {
    shader: Shader,
    quad: BufferId,
}

impl OutlinePass {
    pub fn new<C: GraphicsContext + ?Sized>(gl: &mut C) -> Result<Self, ShaderError> {
        let shader = Shader::compile(gl, OUTLINE_VERTEX, OUTLINE_FRAGMENT)?;
        let quad = gl.create_buffer(BufferTarget::Array, bytemuck::cast_slice(&FULLSCREEN_QUAD))?;
        Ok(Self { shader, quad })
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    /// Draws the pass into the currently bound framebuffer, sampling `source`.
    pub fn draw<C: GraphicsContext + ?Sized>(&self, gl: &mut C, source: &RenderTarget) {
        gl.use_program(self.shader.program());

        if let Some(location) = self.shader.attribute_location("a_position") {
            gl.vertex_attribute(&VertexAttribute {
                buffer: self.quad,
                name: "a_position".to_string(),
                location,
                components: 2,
                component_type: ComponentType::Float,
                normalized: false,
                byte_stride: 0,
                byte_offset: 0,
            });
        }

        for (uniform, slot) in INPUTS {
            gl.uniform_i32(self.shader.uniform_location(uniform), slot as i32);
            gl.bind_texture(slot, source.texture(slot));
        }

        gl.draw_arrays(FULLSCREEN_QUAD.len() as u32);
    }
}
