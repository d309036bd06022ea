//! A [`GraphicsContext`] that records calls instead of drawing.
//!
//! Handles are handed out sequentially. Program introspection is answered by
//! scanning the linked sources for `in` declarations (vertex stage) and `uniform`
//! declarations (both stages), so shaders behave the way the real driver would
//! report them.

use crate::error::ContextError;
use crate::gpu::*;
use crate::mesh::VertexAttribute;
use glam::{Mat3, Mat4};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum UniformValue {
    Mat4(Mat4),
    Mat3(Mat3),
    Vec4([f32; 4]),
    F32(f32),
    I32(i32),
    Bool(bool),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    SetSurfaceSize(u32, u32),
    Viewport(u32, u32),
    EnableDepthTest,
    CreateBuffer {
        buffer: BufferId,
        target: BufferTarget,
        len: usize,
    },
    CreateTexture(TextureId),
    TextureImage {
        texture: TextureId,
        format: TextureFormat,
        width: u32,
        height: u32,
        uploaded: bool,
    },
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
    },
    CreateRenderbuffer(RenderbufferId),
    RenderbufferStorage {
        renderbuffer: RenderbufferId,
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    },
    CreateFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    AttachTexture {
        slot: u32,
        texture: TextureId,
    },
    AttachRenderbuffer {
        renderbuffer: RenderbufferId,
        attachment: DepthAttachment,
    },
    DrawBuffers(Vec<u32>),
    ClearColor([f32; 4]),
    Clear {
        color: bool,
        depth_stencil: bool,
    },
    ClearBufferUint {
        slot: u32,
        value: [u32; 4],
    },
    ClearBufferFloat {
        slot: u32,
        value: [f32; 4],
    },
    CompileShader(ShaderStage),
    LinkProgram(ProgramId),
    UseProgram(ProgramId),
    Uniform {
        name: String,
        value: UniformValue,
    },
    VertexAttribute(VertexAttribute),
    DrawElements {
        indices: BufferId,
        count: u32,
        component_type: ComponentType,
    },
    DrawArrays(u32),
}

#[derive(Default)]
pub(crate) struct RecordingContext {
    pub calls: Vec<Call>,
    pub pixel_ratio: f32,
    pub compile_failure: Option<(ShaderStage, String)>,
    pub link_failure: Option<String>,
    size: (u32, u32),
    next: u32,
    shader_sources: HashMap<ShaderId, (ShaderStage, String)>,
    programs: HashMap<ProgramId, (ShaderId, ShaderId)>,
    uniform_names: Vec<String>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self {
            pixel_ratio: 1.0,
            size: (300, 150),
            ..Default::default()
        }
    }

    pub fn with_pixel_ratio(ratio: f32) -> Self {
        Self {
            pixel_ratio: ratio,
            ..Self::new()
        }
    }

    pub fn clear_log(&mut self) {
        self.calls.clear();
    }

    /// Index of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Values set for the named uniform, in call order.
    pub fn uniform_values(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Uniform { name: n, value } if n == name => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    fn id(&mut self) -> u32 {
        self.next += 1;
        self.next
    }

    fn record_uniform(&mut self, location: Option<&UniformLocation>, value: UniformValue) {
        if let Some(location) = location {
            let name = self.uniform_names[location.0 as usize].clone();
            self.calls.push(Call::Uniform { name, value });
        }
    }
}

fn declared_name(line: &str) -> Option<String> {
    let decl = line.split(';').next()?;
    let name = decl.split_whitespace().last()?;
    Some(name.split('[').next().unwrap_or(name).to_string())
}

impl GraphicsContext for RecordingContext {
    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn set_surface_size(&mut self, width: u32, height: u32) {
        self.size = (
            (width as f32 * self.pixel_ratio) as u32,
            (height as f32 * self.pixel_ratio) as u32,
        );
        self.calls.push(Call::SetSurfaceSize(width, height));
    }

    fn viewport(&mut self, _x: i32, _y: i32, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn enable_depth_test(&mut self) {
        self.calls.push(Call::EnableDepthTest);
    }

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<BufferId, ContextError> {
        let buffer = BufferId(self.id());
        self.calls.push(Call::CreateBuffer {
            buffer,
            target,
            len: data.len(),
        });
        Ok(buffer)
    }

    fn create_texture(&mut self) -> Result<TextureId, ContextError> {
        let texture = TextureId(self.id());
        self.calls.push(Call::CreateTexture(texture));
        Ok(texture)
    }

    fn texture_image(
        &mut self,
        texture: TextureId,
        format: TextureFormat,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) {
        self.calls.push(Call::TextureImage {
            texture,
            format,
            width,
            height,
            uploaded: pixels.is_some(),
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.calls.push(Call::BindTexture { unit, texture });
    }

    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, ContextError> {
        let renderbuffer = RenderbufferId(self.id());
        self.calls.push(Call::CreateRenderbuffer(renderbuffer));
        Ok(renderbuffer)
    }

    fn renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    ) {
        self.calls.push(Call::RenderbufferStorage {
            renderbuffer,
            format,
            width,
            height,
        });
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, ContextError> {
        let framebuffer = FramebufferId(self.id());
        self.calls.push(Call::CreateFramebuffer(framebuffer));
        Ok(framebuffer)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.calls.push(Call::BindFramebuffer(framebuffer));
    }

    fn attach_texture(&mut self, slot: u32, texture: TextureId) {
        self.calls.push(Call::AttachTexture { slot, texture });
    }

    fn attach_renderbuffer(&mut self, renderbuffer: RenderbufferId, format: RenderbufferFormat) {
        self.calls.push(Call::AttachRenderbuffer {
            renderbuffer,
            attachment: format.attachment(),
        });
    }

    fn draw_buffers(&mut self, slots: &[u32]) {
        self.calls.push(Call::DrawBuffers(slots.to_vec()));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.calls.push(Call::ClearColor(rgba));
    }

    fn clear(&mut self, color: bool, depth_stencil: bool) {
        self.calls.push(Call::Clear {
            color,
            depth_stencil,
        });
    }

    fn clear_buffer_uint(&mut self, slot: u32, value: [u32; 4]) {
        self.calls.push(Call::ClearBufferUint { slot, value });
    }

    fn clear_buffer_float(&mut self, slot: u32, value: [f32; 4]) {
        self.calls.push(Call::ClearBufferFloat { slot, value });
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        self.calls.push(Call::CompileShader(stage));
        if let Some((failing, log)) = &self.compile_failure {
            if *failing == stage {
                return Err(log.clone());
            }
        }
        let shader = ShaderId(self.id());
        self.shader_sources
            .insert(shader, (stage, source.to_string()));
        Ok(shader)
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        if let Some(log) = &self.link_failure {
            return Err(log.clone());
        }
        let program = ProgramId(self.id());
        self.programs.insert(program, (vertex, fragment));
        self.calls.push(Call::LinkProgram(program));
        Ok(program)
    }

    fn active_attributes(&mut self, program: ProgramId) -> Vec<(String, u32)> {
        let Some((vertex, _)) = self.programs.get(&program) else {
            return Vec::new();
        };
        let (_, source) = &self.shader_sources[vertex];
        source
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("in "))
            .filter_map(declared_name)
            .enumerate()
            .map(|(location, name)| (name, location as u32))
            .collect()
    }

    fn active_uniforms(&mut self, program: ProgramId) -> Vec<(String, UniformLocation)> {
        let Some((vertex, fragment)) = self.programs.get(&program).copied() else {
            return Vec::new();
        };
        let mut names: Vec<String> = Vec::new();
        for shader in [vertex, fragment] {
            let (_, source) = &self.shader_sources[&shader];
            for name in source
                .lines()
                .map(str::trim)
                .filter(|line| line.starts_with("uniform "))
                .filter_map(declared_name)
            {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
            .into_iter()
            .map(|name| {
                let location = UniformLocation(self.uniform_names.len() as u32);
                self.uniform_names.push(name.clone());
                (name, location)
            })
            .collect()
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(Call::UseProgram(program));
    }

    fn uniform_mat4(&mut self, location: Option<&UniformLocation>, value: &Mat4) {
        self.record_uniform(location, UniformValue::Mat4(*value));
    }

    fn uniform_mat3(&mut self, location: Option<&UniformLocation>, value: &Mat3) {
        self.record_uniform(location, UniformValue::Mat3(*value));
    }

    fn uniform_vec4(&mut self, location: Option<&UniformLocation>, value: [f32; 4]) {
        self.record_uniform(location, UniformValue::Vec4(value));
    }

    fn uniform_f32(&mut self, location: Option<&UniformLocation>, value: f32) {
        self.record_uniform(location, UniformValue::F32(value));
    }

    fn uniform_i32(&mut self, location: Option<&UniformLocation>, value: i32) {
        self.record_uniform(location, UniformValue::I32(value));
    }

    fn uniform_bool(&mut self, location: Option<&UniformLocation>, value: bool) {
        self.record_uniform(location, UniformValue::Bool(value));
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute) {
        self.calls.push(Call::VertexAttribute(attribute.clone()));
    }

    fn draw_elements(
        &mut self,
        indices: BufferId,
        count: u32,
        component_type: ComponentType,
        _byte_offset: u32,
    ) {
        self.calls.push(Call::DrawElements {
            indices,
            count,
            component_type,
        });
    }

    fn draw_arrays(&mut self, count: u32) {
        self.calls.push(Call::DrawArrays(count));
    }
}
