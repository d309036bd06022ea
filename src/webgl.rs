//! [`GraphicsContext`] over a browser `WebGL2RenderingContext`.

use crate::error::ContextError;
use crate::gpu::*;
use crate::mesh::VertexAttribute;
use glam::{Mat3, Mat4};
use tracing::debug;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlFramebuffer, WebGlProgram,
    WebGlRenderbuffer, WebGlShader, WebGlTexture, WebGlUniformLocation,
};

/// Objects created through the context, indexed by handle.
struct Table<T>(Vec<T>);

impl<T> Table<T> {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn insert(&mut self, value: T) -> u32 {
        self.0.push(value);
        (self.0.len() - 1) as u32
    }

    fn get(&self, index: u32) -> Option<&T> {
        self.0.get(index as usize)
    }
}

pub struct WebGl2Context {
    canvas: HtmlCanvasElement,
    gl: Gl,
    buffers: Table<WebGlBuffer>,
    textures: Table<WebGlTexture>,
    renderbuffers: Table<WebGlRenderbuffer>,
    framebuffers: Table<WebGlFramebuffer>,
    shaders: Table<WebGlShader>,
    programs: Table<WebGlProgram>,
    uniforms: Table<WebGlUniformLocation>,
}

fn context_error(what: &str) -> ContextError {
    ContextError(format!("could not create {what}"))
}

fn js_error(err: JsValue) -> ContextError {
    ContextError(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

impl WebGl2Context {
    /// Requests a WebGL2 context with depth and stencil buffers from `canvas`.
    pub fn from_canvas(canvas: HtmlCanvasElement, antialias: bool) -> Result<Self, ContextError> {
        let options = js_sys::Object::new();
        for (key, value) in [("antialias", antialias), ("depth", true), ("stencil", true)] {
            js_sys::Reflect::set(&options, &key.into(), &value.into()).map_err(js_error)?;
        }
        let gl = canvas
            .get_context_with_context_options("webgl2", &options)
            .map_err(js_error)?
            .ok_or_else(|| ContextError("WebGL2 is not available".to_string()))?
            .dyn_into::<Gl>()
            .map_err(|_| ContextError("canvas returned a non-WebGL2 context".to_string()))?;

        Ok(Self {
            canvas,
            gl,
            buffers: Table::new(),
            textures: Table::new(),
            renderbuffers: Table::new(),
            framebuffers: Table::new(),
            shaders: Table::new(),
            programs: Table::new(),
            uniforms: Table::new(),
        })
    }

    /// Looks up the canvas element with id `canvas_id` in the current document.
    pub fn from_canvas_id(canvas_id: &str, antialias: bool) -> Result<Self, ContextError> {
        let canvas = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(canvas_id))
            .ok_or_else(|| ContextError(format!("no element with id `{canvas_id}`")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ContextError(format!("`{canvas_id}` is not a canvas")))?;
        Self::from_canvas(canvas, antialias)
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn raw(&self) -> &Gl {
        &self.gl
    }

    fn bind_texture_2d(&self, texture: Option<TextureId>) {
        let texture = texture.and_then(|t| self.textures.get(t.0));
        self.gl.bind_texture(Gl::TEXTURE_2D, texture);
    }
}

fn renderbuffer_internal_format(format: RenderbufferFormat) -> u32 {
    match format {
        RenderbufferFormat::Depth16 => Gl::DEPTH_COMPONENT16,
        RenderbufferFormat::Depth24 => Gl::DEPTH_COMPONENT24,
        RenderbufferFormat::Depth32F => Gl::DEPTH_COMPONENT32F,
        RenderbufferFormat::Stencil8 => Gl::STENCIL_INDEX8,
        RenderbufferFormat::DepthStencil => Gl::DEPTH_STENCIL,
        RenderbufferFormat::Depth24Stencil8 => Gl::DEPTH24_STENCIL8,
        RenderbufferFormat::Depth32FStencil8 => Gl::DEPTH32F_STENCIL8,
    }
}

/// Strips the `[0]` suffix WebGL reports for array uniforms.
fn base_name(name: String) -> String {
    match name.strip_suffix("[0]") {
        Some(base) => base.to_string(),
        None => name,
    }
}

impl GraphicsContext for WebGl2Context {
    fn drawing_buffer_size(&self) -> (u32, u32) {
        (
            self.gl.drawing_buffer_width().max(0) as u32,
            self.gl.drawing_buffer_height().max(0) as u32,
        )
    }

    fn set_surface_size(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.gl.viewport(x, y, width as i32, height as i32);
    }

    fn enable_depth_test(&mut self) {
        self.gl.enable(Gl::DEPTH_TEST);
    }

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<BufferId, ContextError> {
        let buffer = self.gl.create_buffer().ok_or_else(|| context_error("buffer"))?;
        let target = match target {
            BufferTarget::Array => Gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => Gl::ELEMENT_ARRAY_BUFFER,
        };
        self.gl.bind_buffer(target, Some(&buffer));
        self.gl.buffer_data_with_u8_array(target, data, Gl::STATIC_DRAW);
        Ok(BufferId(self.buffers.insert(buffer)))
    }

    fn create_texture(&mut self) -> Result<TextureId, ContextError> {
        let texture = self.gl.create_texture().ok_or_else(|| context_error("texture"))?;
        Ok(TextureId(self.textures.insert(texture)))
    }

    fn texture_image(
        &mut self,
        texture: TextureId,
        format: TextureFormat,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) {
        self.bind_texture_2d(Some(texture));
        let (internal, format, kind) = match format {
            TextureFormat::Rgba8 => (Gl::RGBA8, Gl::RGBA, Gl::UNSIGNED_BYTE),
            TextureFormat::R32Uint => (Gl::R32UI, Gl::RED_INTEGER, Gl::UNSIGNED_INT),
        };
        let result = self
            .gl
            .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                Gl::TEXTURE_2D,
                0,
                internal as i32,
                width as i32,
                height as i32,
                0,
                format,
                kind,
                pixels,
            );
        if let Err(err) = result {
            debug!(texture = texture.0, "texImage2D failed: {err:?}");
        }
        for (parameter, value) in [
            (Gl::TEXTURE_MIN_FILTER, Gl::NEAREST),
            (Gl::TEXTURE_MAG_FILTER, Gl::NEAREST),
            (Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE),
            (Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE),
        ] {
            self.gl
                .tex_parameteri(Gl::TEXTURE_2D, parameter, value as i32);
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.gl.active_texture(Gl::TEXTURE0 + unit);
        self.bind_texture_2d(texture);
    }

    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, ContextError> {
        let renderbuffer = self
            .gl
            .create_renderbuffer()
            .ok_or_else(|| context_error("renderbuffer"))?;
        Ok(RenderbufferId(self.renderbuffers.insert(renderbuffer)))
    }

    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    ) {
        self.gl
            .bind_renderbuffer(Gl::RENDERBUFFER, self.renderbuffers.get(renderbuffer.0));
        self.gl.renderbuffer_storage(
            Gl::RENDERBUFFER,
            renderbuffer_internal_format(format),
            width as i32,
            height as i32,
        );
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, ContextError> {
        let framebuffer = self
            .gl
            .create_framebuffer()
            .ok_or_else(|| context_error("framebuffer"))?;
        Ok(FramebufferId(self.framebuffers.insert(framebuffer)))
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        let framebuffer = framebuffer.and_then(|f| self.framebuffers.get(f.0));
        self.gl.bind_framebuffer(Gl::FRAMEBUFFER, framebuffer);
    }

    fn attach_texture(&mut self, slot: u32, texture: TextureId) {
        self.gl.framebuffer_texture_2d(
            Gl::FRAMEBUFFER,
            Gl::COLOR_ATTACHMENT0 + slot,
            Gl::TEXTURE_2D,
            self.textures.get(texture.0),
            0,
        );
    }

    fn attach_renderbuffer(&mut self, renderbuffer: RenderbufferId, format: RenderbufferFormat) {
        let attachment = match format.attachment() {
            DepthAttachment::Depth => Gl::DEPTH_ATTACHMENT,
            DepthAttachment::Stencil => Gl::STENCIL_ATTACHMENT,
            DepthAttachment::DepthStencil => Gl::DEPTH_STENCIL_ATTACHMENT,
        };
        self.gl.framebuffer_renderbuffer(
            Gl::FRAMEBUFFER,
            attachment,
            Gl::RENDERBUFFER,
            self.renderbuffers.get(renderbuffer.0),
        );
    }

    fn draw_buffers(&mut self, slots: &[u32]) {
        let buffers: js_sys::Array = slots
            .iter()
            .map(|slot| JsValue::from(Gl::COLOR_ATTACHMENT0 + slot))
            .collect();
        self.gl.draw_buffers(&buffers);
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba;
        self.gl.clear_color(r, g, b, a);
    }

    fn clear(&mut self, color: bool, depth_stencil: bool) {
        let mut mask = 0;
        if color {
            mask |= Gl::COLOR_BUFFER_BIT;
        }
        if depth_stencil {
            mask |= Gl::DEPTH_BUFFER_BIT | Gl::STENCIL_BUFFER_BIT;
        }
        self.gl.clear(mask);
    }

    fn clear_buffer_uint(&mut self, slot: u32, value: [u32; 4]) {
        self.gl
            .clear_bufferuiv_with_u32_array(Gl::COLOR, slot as i32, &value);
    }

    fn clear_buffer_float(&mut self, slot: u32, value: [f32; 4]) {
        self.gl
            .clear_bufferfv_with_f32_array(Gl::COLOR, slot as i32, &value);
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let kind = match stage {
            ShaderStage::Vertex => Gl::VERTEX_SHADER,
            ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or_else(|| format!("could not create {stage} shader object"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !compiled {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            return Err(log);
        }
        Ok(ShaderId(self.shaders.insert(shader)))
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let program = self
            .gl
            .create_program()
            .ok_or_else(|| "could not create program object".to_string())?;
        for shader in [vertex, fragment] {
            let shader = self
                .shaders
                .get(shader.0)
                .ok_or_else(|| format!("unknown shader {}", shader.0))?;
            self.gl.attach_shader(&program, shader);
        }
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !linked {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            return Err(log);
        }
        Ok(ProgramId(self.programs.insert(program)))
    }

    fn active_attributes(&mut self, program: ProgramId) -> Vec<(String, u32)> {
        let Some(program) = self.programs.get(program.0) else {
            return Vec::new();
        };
        let count = self
            .gl
            .get_program_parameter(program, Gl::ACTIVE_ATTRIBUTES)
            .as_f64()
            .unwrap_or(0.0) as u32;
        (0..count)
            .filter_map(|index| self.gl.get_active_attrib(program, index))
            .filter_map(|info| {
                let name = info.name();
                let location = self.gl.get_attrib_location(program, &name);
                (location >= 0).then(|| (name, location as u32))
            })
            .collect()
    }

    fn active_uniforms(&mut self, program: ProgramId) -> Vec<(String, UniformLocation)> {
        let Some(program) = self.programs.get(program.0) else {
            return Vec::new();
        };
        let count = self
            .gl
            .get_program_parameter(program, Gl::ACTIVE_UNIFORMS)
            .as_f64()
            .unwrap_or(0.0) as u32;
        let mut uniforms = Vec::with_capacity(count as usize);
        for index in 0..count {
            let Some(info) = self.gl.get_active_uniform(program, index) else {
                continue;
            };
            let name = base_name(info.name());
            if let Some(location) = self.gl.get_uniform_location(program, &name) {
                uniforms.push((name, UniformLocation(self.uniforms.insert(location))));
            }
        }
        uniforms
    }

    fn use_program(&mut self, program: ProgramId) {
        self.gl.use_program(self.programs.get(program.0));
    }

    fn uniform_mat4(&mut self, location: Option<&UniformLocation>, value: &Mat4) {
        if let Some(location) = location.and_then(|l| self.uniforms.get(l.0)) {
            self.gl
                .uniform_matrix4fv_with_f32_array(Some(location), false, &value.to_cols_array());
        }
    }

    fn uniform_mat3(&mut self, location: Option<&UniformLocation>, value: &Mat3) {
        if let Some(location) = location.and_then(|l| self.uniforms.get(l.0)) {
            self.gl
                .uniform_matrix3fv_with_f32_array(Some(location), false, &value.to_cols_array());
        }
    }

    fn uniform_vec4(&mut self, location: Option<&UniformLocation>, value: [f32; 4]) {
        if let Some(location) = location.and_then(|l| self.uniforms.get(l.0)) {
            let [x, y, z, w] = value;
            self.gl.uniform4f(Some(location), x, y, z, w);
        }
    }

    fn uniform_f32(&mut self, location: Option<&UniformLocation>, value: f32) {
        if let Some(location) = location.and_then(|l| self.uniforms.get(l.0)) {
            self.gl.uniform1f(Some(location), value);
        }
    }

    fn uniform_i32(&mut self, location: Option<&UniformLocation>, value: i32) {
        if let Some(location) = location.and_then(|l| self.uniforms.get(l.0)) {
            self.gl.uniform1i(Some(location), value);
        }
    }

    fn uniform_bool(&mut self, location: Option<&UniformLocation>, value: bool) {
        self.uniform_i32(location, value as i32);
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute) {
        self.gl
            .bind_buffer(Gl::ARRAY_BUFFER, self.buffers.get(attribute.buffer.0));
        self.gl.enable_vertex_attrib_array(attribute.location);
        self.gl.vertex_attrib_pointer_with_i32(
            attribute.location,
            attribute.components as i32,
            attribute.component_type.gl(),
            attribute.normalized,
            attribute.byte_stride as i32,
            attribute.byte_offset as i32,
        );
    }

    fn draw_elements(
        &mut self,
        indices: BufferId,
        count: u32,
        component_type: ComponentType,
        byte_offset: u32,
    ) {
        self.gl
            .bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, self.buffers.get(indices.0));
        self.gl.draw_elements_with_i32(
            Gl::TRIANGLES,
            count as i32,
            component_type.gl(),
            byte_offset as i32,
        );
    }

    fn draw_arrays(&mut self, count: u32) {
        self.gl.draw_arrays(Gl::TRIANGLES, 0, count as i32);
    }
}
