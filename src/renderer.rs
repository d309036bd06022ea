//! Frame orchestration.
//!
//! This module provides [`Renderer`], which owns the graphics context and
//! everything drawn through it every frame: the multi-attachment scene target,
//! the outline pass and the queue of pending texture uploads.
//!
//! # Frame structure
//!
//! Each [`Renderer::render`] call runs two passes:
//!
//! 1. **Scene pass** into the off-screen [`RenderTarget`]: color to slot 0, the
//!    material index (`u32`) to slot 1 and the biased normal to slot 2, with depth
//!    and stencil. The integer and normal slots cannot be cleared with the regular
//!    float clear, so the target is cleared in two stages.
//! 2. **Outline pass** to the screen: a full-screen quad samples the three
//!    attachments and darkens material and normal discontinuities.
//!
//! No GPU objects are created per frame; only contents and bindings change.
//!
//! # Example
//!
//! ```ignore
//! let mut renderer = Renderer::new(gl, RendererConfig::new().size(800, 600))?;
//! let shader = Rc::new(Shader::material(renderer.context_mut())?);
//! let mut scene = Scene::new();
//! let root = scene.create_node();
//! let roots = GltfImporter::new(&mut renderer, json, shader)?.import_default_scene(&mut scene)?;
//! for item in roots {
//!     scene.append_child(root, item)?;
//! }
//! renderer.set_camera(camera);
//! renderer.render(&mut scene, root)?;
//! ```

use crate::clock::{self, RenderClock};
use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::gpu::{GraphicsContext, TextureId};
use crate::post_process::OutlinePass;
use crate::render_target::RenderTarget;
use crate::scene::{ItemTransform, NodeId, Scene};
use crate::shader::Shader;
use crate::texture::TextureUploads;
use glam::Mat4;
use tracing::{debug, info};

pub struct Renderer<C: GraphicsContext> {
    gl: C,
    config: RendererConfig,
    camera: Option<NodeId>,
    view_projection: Mat4,
    far_coefficient: f32,
    clock: RenderClock,
    time: f32,
    target: RenderTarget,
    outline: OutlinePass,
    textures: TextureUploads,
}

impl<C: GraphicsContext> Renderer<C> {
    /// Sets up depth testing, the scene target and the outline pass, then sizes
    /// the surface from `config`.
    pub fn new(mut gl: C, config: RendererConfig) -> Result<Self, RenderError> {
        gl.enable_depth_test();
        let target = RenderTarget::gbuffer(&mut gl)?;
        let outline = OutlinePass::new(&mut gl)?;

        let mut renderer = Self {
            gl,
            config,
            camera: None,
            view_projection: Mat4::IDENTITY,
            far_coefficient: 0.0,
            clock: RenderClock::start(),
            time: 0.0,
            target,
            outline,
            textures: TextureUploads::new(),
        };
        renderer.resize(config.width, config.height);
        info!(
            width = config.width,
            height = config.height,
            "renderer initialized"
        );
        Ok(renderer)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn context(&self) -> &C {
        &self.gl
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.gl
    }

    pub fn render_target(&self) -> &RenderTarget {
        &self.target
    }

    /// Resizes the surface to the logical `width` x `height` and reallocates the
    /// scene target at the resulting drawing-buffer size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        let (surface_w, surface_h) = self.config.physical_size(width, height);
        self.gl.set_surface_size(surface_w, surface_h);

        let (buffer_w, buffer_h) = self.gl.drawing_buffer_size();
        self.gl.viewport(0, 0, buffer_w, buffer_h);
        self.target.resize(&mut self.gl);
        debug!(width, height, buffer_w, buffer_h, "resized renderer");
    }

    /// Drawing-buffer width over height.
    pub fn aspect(&self) -> f32 {
        let (width, height) = self.gl.drawing_buffer_size();
        width as f32 / height.max(1) as f32
    }

    pub fn set_camera(&mut self, camera: NodeId) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<NodeId> {
        self.camera
    }

    /// Seconds since the renderer was created, as of the last frame.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// The camera's projection times view, as of the last frame.
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    /// Starts decoding an image for `texture`; it is uploaded by a later frame.
    pub fn queue_texture_decode(
        &mut self,
        texture: TextureId,
        bytes: Vec<u8>,
        mime_type: Option<String>,
    ) {
        self.textures.queue(texture, bytes, mime_type);
    }

    pub fn pending_textures(&self) -> usize {
        self.textures.pending()
    }

    /// Uploads every texture whose decode has finished. Called by each frame.
    pub fn pump_textures(&mut self) -> usize {
        self.textures.pump(&mut self.gl)
    }

    /// Renders `root` and its subtree through the active camera.
    pub fn render(&mut self, scene: &mut Scene, root: NodeId) -> Result<(), RenderError> {
        self.render_at(scene, root, clock::now_ms())
    }

    /// [`Renderer::render`] with an explicit wall-clock timestamp in milliseconds.
    pub fn render_at(
        &mut self,
        scene: &mut Scene,
        root: NodeId,
        now_ms: f64,
    ) -> Result<(), RenderError> {
        let camera = self.camera.ok_or(RenderError::NoCamera)?;
        let aspect = self.aspect();
        let view = scene.view_matrix(camera).ok_or(RenderError::NoCamera)?;
        let projection = scene
            .projection_matrix(camera, aspect)
            .ok_or(RenderError::NoCamera)?;
        self.view_projection = projection * view;
        self.far_coefficient = scene
            .camera(camera)
            .map_or(0.0, |camera| camera.far_coefficient());

        self.time = self.clock.tick_at(now_ms) as f32;
        self.pump_textures();

        self.begin_scene_pass();
        scene.draw(root, self);

        self.gl.bind_framebuffer(None);
        self.gl.clear(true, true);
        self.outline.draw(&mut self.gl, &self.target);
        Ok(())
    }

    fn begin_scene_pass(&mut self) {
        let gl = &mut self.gl;
        gl.bind_framebuffer(Some(self.target.framebuffer()));
        gl.clear_color(self.config.clear_color);
        gl.draw_buffers(&[RenderTarget::COLOR]);
        gl.clear(true, true);

        gl.draw_buffers(&self.target.slots());
        gl.clear_buffer_uint(RenderTarget::MATERIAL_INDEX, [0; 4]);
        gl.clear_buffer_float(RenderTarget::NORMAL, [0.0; 4]);
        gl.bind_texture(0, None);
    }

    /// Pushes the per-draw uniforms for `item` into `shader`: view-projection,
    /// object and normal matrices, the flip flag, the far-plane log coefficient and
    /// the frame time.
    pub fn rebind_uniforms(&mut self, item: &ItemTransform, shader: &Shader) {
        let gl = &mut self.gl;
        gl.uniform_mat4(shader.uniform_location("u_projMatrix"), &self.view_projection);
        gl.uniform_mat4(shader.uniform_location("u_objMatrix"), &item.world);
        gl.uniform_mat3(shader.uniform_location("u_normalMatrix"), &item.normal);
        gl.uniform_bool(shader.uniform_location("u_flip"), item.flip_normals);
        gl.uniform_f32(shader.uniform_location("u_fcoef"), self.far_coefficient);
        gl.uniform_f32(shader.uniform_location("u_time"), self.time);
    }
}
