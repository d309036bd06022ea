//! The off-screen framebuffer the scene pass renders into.

use crate::error::ContextError;
use crate::gpu::{
    FramebufferId, GraphicsContext, RenderbufferFormat, RenderbufferId, TextureFormat, TextureId,
};
use tracing::debug;

/// A color attachment of a [`RenderTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub slot: u32,
    pub texture: TextureId,
    pub format: TextureFormat,
}

/// An off-screen framebuffer with several color attachments and one
/// depth/stencil renderbuffer, all sized to the drawing buffer.
///
/// Attachment storage is allocated once and reallocated only by
/// [`RenderTarget::resize`]; rendering into the target never creates GPU objects.
///
/// # Fields
///
/// * `framebuffer` - The framebuffer object all attachments are bound to
/// * `attachments` - Color attachments, indexed by slot
/// * `depth_stencil` - Renderbuffer backing depth and stencil
#[derive(Clone, Debug)]
pub struct RenderTarget {
    framebuffer: FramebufferId,
    attachments: Vec<Attachment>,
    depth_stencil: RenderbufferId,
    depth_format: RenderbufferFormat,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Slot of the shaded color attachment.
    pub const COLOR: u32 = 0;
    /// Slot of the unsigned-integer material-index attachment.
    pub const MATERIAL_INDEX: u32 = 1;
    /// Slot of the encoded-normal attachment.
    pub const NORMAL: u32 = 2;

    /// Creates a framebuffer with one attachment per entry of `formats` (slot =
    /// position) plus a depth/stencil renderbuffer, sized to the current drawing
    /// buffer.
    pub fn new<C: GraphicsContext + ?Sized>(
        gl: &mut C,
        formats: &[TextureFormat],
        depth_format: RenderbufferFormat,
    ) -> Result<Self, ContextError> {
        let framebuffer = gl.create_framebuffer()?;
        gl.bind_framebuffer(Some(framebuffer));

        let mut attachments = Vec::with_capacity(formats.len());
        for (slot, &format) in (0u32..).zip(formats) {
            let texture = gl.create_texture()?;
            gl.attach_texture(slot, texture);
            attachments.push(Attachment {
                slot,
                texture,
                format,
            });
        }

        let depth_stencil = gl.create_renderbuffer()?;
        gl.attach_renderbuffer(depth_stencil, depth_format);

        let (width, height) = gl.drawing_buffer_size();
        let mut target = Self {
            framebuffer,
            attachments,
            depth_stencil,
            depth_format,
            width,
            height,
        };
        target.allocate(gl);
        gl.bind_framebuffer(None);
        Ok(target)
    }

    /// The scene-pass target: RGBA8 color, R32UI material index, RGBA8 normal and
    /// a combined depth/stencil buffer.
    pub fn gbuffer<C: GraphicsContext + ?Sized>(gl: &mut C) -> Result<Self, ContextError> {
        Self::new(
            gl,
            &[TextureFormat::Rgba8, TextureFormat::R32Uint, TextureFormat::Rgba8],
            RenderbufferFormat::DepthStencil,
        )
    }

    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn texture(&self, slot: u32) -> Option<TextureId> {
        self.attachments
            .get(slot as usize)
            .map(|attachment| attachment.texture)
    }

    /// Every color slot, for enabling all attachments as draw buffers.
    pub fn slots(&self) -> Vec<u32> {
        self.attachments.iter().map(|a| a.slot).collect()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocates every attachment at the current drawing-buffer size.
    pub fn resize<C: GraphicsContext + ?Sized>(&mut self, gl: &mut C) {
        let (width, height) = gl.drawing_buffer_size();
        self.width = width;
        self.height = height;
        gl.bind_framebuffer(Some(self.framebuffer));
        self.allocate(gl);
        gl.bind_framebuffer(None);
        debug!(width, height, "resized render target");
    }

    fn allocate<C: GraphicsContext + ?Sized>(&self, gl: &mut C) {
        for attachment in &self.attachments {
            gl.texture_image(
                attachment.texture,
                attachment.format,
                self.width,
                self.height,
                None,
            );
        }
        gl.renderbuffer_storage(self.depth_stencil, self.depth_format, self.width, self.height);
    }
}
