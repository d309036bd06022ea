//! The graphics-context seam.
//!
//! This module provides [`GraphicsContext`], the trait every GPU-touching part of the
//! crate goes through. It mirrors the slice of WebGL2 the renderer needs: buffers,
//! textures with integer formats, multi-attachment framebuffers, per-attachment
//! clears, program introspection, and indexed draws.
//!
//! GPU objects are referred to by small copyable handles ([`BufferId`],
//! [`TextureId`], ...) handed out by the context. The context owns the real objects;
//! handles are just indices into its tables.
//!
//! # Implementations
//!
//! - `WebGl2Context` (on `wasm32`) drives a browser canvas through `web-sys`.
//! - A recording double in the test suite logs every call in order, so draw and
//!   pass ordering can be asserted without a GPU.
//!
//! # Example
//!
//! ```ignore
//! use sumi::{GraphicsContext, BufferTarget};
//!
//! fn upload_quad(gl: &mut impl GraphicsContext) -> sumi::BufferId {
//!     let quad: [f32; 6] = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0];
//!     gl.create_buffer(BufferTarget::Array, bytemuck::cast_slice(&quad))
//!         .expect("buffer")
//! }
//! ```

use crate::error::ContextError;
use crate::mesh::VertexAttribute;
use glam::{Mat3, Mat4};
use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Index of this handle in the owning context's table.
            pub fn index(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// A vertex or index buffer.
    BufferId
);
handle!(
    /// A 2D texture.
    TextureId
);
handle!(
    /// A renderbuffer (depth and/or stencil storage).
    RenderbufferId
);
handle!(
    /// An off-screen framebuffer object.
    FramebufferId
);
handle!(
    /// A compiled shader stage.
    ShaderId
);
handle!(
    /// A linked program.
    ProgramId
);
handle!(
    /// An introspected uniform location.
    UniformLocation
);

/// Binding target for buffer uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// A programmable pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Storage format of a color texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8 bits per channel RGBA, sampled as normalized floats.
    Rgba8,
    /// Single-channel 32-bit unsigned integer, read with integer texel fetches.
    R32Uint,
}

/// Storage format of a renderbuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderbufferFormat {
    Depth16,
    Depth24,
    Depth32F,
    Stencil8,
    DepthStencil,
    Depth24Stencil8,
    Depth32FStencil8,
}

/// Framebuffer attachment point for depth/stencil storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthAttachment {
    Depth,
    Stencil,
    DepthStencil,
}

impl RenderbufferFormat {
    /// The attachment point a renderbuffer of this format binds to.
    pub fn attachment(self) -> DepthAttachment {
        match self {
            RenderbufferFormat::Depth16
            | RenderbufferFormat::Depth24
            | RenderbufferFormat::Depth32F => DepthAttachment::Depth,
            RenderbufferFormat::Stencil8 => DepthAttachment::Stencil,
            RenderbufferFormat::DepthStencil
            | RenderbufferFormat::Depth24Stencil8
            | RenderbufferFormat::Depth32FStencil8 => DepthAttachment::DepthStencil,
        }
    }
}

/// Component type of vertex attribute and index data.
///
/// The discriminants are the GL enum values, which glTF reuses for
/// `accessor.componentType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ComponentType {
    Byte = 0x1400,
    UnsignedByte = 0x1401,
    Short = 0x1402,
    UnsignedShort = 0x1403,
    UnsignedInt = 0x1405,
    Float = 0x1406,
}

impl ComponentType {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            0x1400 => Some(ComponentType::Byte),
            0x1401 => Some(ComponentType::UnsignedByte),
            0x1402 => Some(ComponentType::Short),
            0x1403 => Some(ComponentType::UnsignedShort),
            0x1405 => Some(ComponentType::UnsignedInt),
            0x1406 => Some(ComponentType::Float),
            _ => None,
        }
    }

    pub fn gl(self) -> u32 {
        self as u32
    }

    pub fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

/// The WebGL2-shaped operations the renderer issues.
///
/// Creation calls can fail (a lost context cannot hand out objects); everything
/// else is fire-and-forget, like the underlying API. Uniform setters take an
/// optional location and do nothing when it is `None`, matching WebGL's handling
/// of uniforms the linker optimized away.
pub trait GraphicsContext {
    /// Actual backing-store size of the default framebuffer.
    fn drawing_buffer_size(&self) -> (u32, u32);

    /// Resizes the drawable surface (canvas pixel size).
    fn set_surface_size(&mut self, width: u32, height: u32);

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    fn enable_depth_test(&mut self);

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<BufferId, ContextError>;

    fn create_texture(&mut self) -> Result<TextureId, ContextError>;

    /// Allocates storage for `texture` (and uploads `pixels` if given), with nearest
    /// filtering and clamp-to-edge wrapping.
    fn texture_image(
        &mut self,
        texture: TextureId,
        format: TextureFormat,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    );

    /// Binds `texture` (or nothing) to texture unit `unit`.
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, ContextError>;

    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    );

    fn create_framebuffer(&mut self) -> Result<FramebufferId, ContextError>;

    /// Binds an off-screen framebuffer, or the default (screen) framebuffer for `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Attaches `texture` as color attachment `slot` of the bound framebuffer.
    fn attach_texture(&mut self, slot: u32, texture: TextureId);

    /// Attaches `renderbuffer` at the point implied by `format`.
    fn attach_renderbuffer(&mut self, renderbuffer: RenderbufferId, format: RenderbufferFormat);

    /// Selects which color attachments fragment outputs are written to.
    fn draw_buffers(&mut self, slots: &[u32]);

    fn clear_color(&mut self, rgba: [f32; 4]);

    /// Clears the color buffers selected by `draw_buffers` and/or depth+stencil.
    fn clear(&mut self, color: bool, depth_stencil: bool);

    /// Clears an unsigned-integer color attachment.
    fn clear_buffer_uint(&mut self, slot: u32, value: [u32; 4]);

    /// Clears a float/normalized color attachment.
    fn clear_buffer_float(&mut self, slot: u32, value: [f32; 4]);

    /// Compiles one stage, returning the info log on failure.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;

    /// Links two stages, returning the info log on failure.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;

    /// Active attribute names and their locations.
    fn active_attributes(&mut self, program: ProgramId) -> Vec<(String, u32)>;

    /// Active uniform names and their locations.
    fn active_uniforms(&mut self, program: ProgramId) -> Vec<(String, UniformLocation)>;

    fn use_program(&mut self, program: ProgramId);

    fn uniform_mat4(&mut self, location: Option<&UniformLocation>, value: &Mat4);

    fn uniform_mat3(&mut self, location: Option<&UniformLocation>, value: &Mat3);

    fn uniform_vec4(&mut self, location: Option<&UniformLocation>, value: [f32; 4]);

    fn uniform_f32(&mut self, location: Option<&UniformLocation>, value: f32);

    fn uniform_i32(&mut self, location: Option<&UniformLocation>, value: i32);

    fn uniform_bool(&mut self, location: Option<&UniformLocation>, value: bool);

    /// Binds `attribute.buffer` and points the attribute's location at it.
    fn vertex_attribute(&mut self, attribute: &VertexAttribute);

    /// Issues an indexed triangle-list draw from `indices`.
    fn draw_elements(
        &mut self,
        indices: BufferId,
        count: u32,
        component_type: ComponentType,
        byte_offset: u32,
    );

    /// Issues a non-indexed triangle-list draw of `count` vertices.
    fn draw_arrays(&mut self, count: u32);
}
