use crate::gpu::TextureId;
use crate::shader::Shader;
use glam::Vec4;
use std::rc::Rc;

/// Surface appearance shared by mesh primitives: a program, a base color and an
/// optional base-color texture.
///
/// Materials are immutable once built and are shared through `Rc`.
#[derive(Clone, Debug)]
pub struct Material {
    shader: Rc<Shader>,
    color: Vec4,
    texture: Option<TextureId>,
}

impl Material {
    /// glTF's default base color, used when a material or its factor is absent.
    pub const DEFAULT_COLOR: Vec4 = Vec4::new(0.5, 0.5, 0.5, 1.0);

    pub fn new(shader: Rc<Shader>, color: Vec4, texture: Option<TextureId>) -> Self {
        Self {
            shader,
            color,
            texture,
        }
    }

    /// Mid-gray, untextured.
    pub fn default_for(shader: Rc<Shader>) -> Self {
        Self::new(shader, Self::DEFAULT_COLOR, None)
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }
}
