//! GLSL program compilation and introspection.
//!
//! Every stage is compiled with a fixed prelude: the `#version 300 es` pragma, a
//! `highp` float precision statement, and the shared simplex-noise library. After
//! linking, the active attributes and uniforms are recorded by name so that meshes
//! and passes can bind them without querying the driver per draw.
//!
//! # Example
//!
//! ```ignore
//! let shader = Shader::compile(&mut gl, VERTEX_SRC, FRAGMENT_SRC)?;
//! let position = shader.attribute_location("POSITION");
//! gl.uniform_f32(shader.uniform_location("u_time"), 1.5);
//! ```

use crate::error::ShaderError;
use crate::gpu::{GraphicsContext, ProgramId, ShaderStage, UniformLocation};
use std::collections::HashMap;
use tracing::{debug, error};

pub const VERSION: &str = "#version 300 es\n";
pub const PRECISION: &str = "precision highp float;\n";
/// Shared 4D simplex noise (`snoise(vec4)`), available to every stage.
pub const NOISE: &str = include_str!("shaders/noise.glsl");

pub const MATERIAL_VERTEX: &str = include_str!("shaders/material.vert.glsl");
pub const MATERIAL_FRAGMENT: &str = include_str!("shaders/material.frag.glsl");
pub const OUTLINE_VERTEX: &str = include_str!("shaders/outline.vert.glsl");
pub const OUTLINE_FRAGMENT: &str = include_str!("shaders/outline.frag.glsl");

/// A linked program plus its introspected attribute and uniform tables.
#[derive(Debug)]
pub struct Shader {
    program: ProgramId,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
}

impl Shader {
    /// Compiles and links a program from bare stage sources.
    pub fn compile<C: GraphicsContext + ?Sized>(
        gl: &mut C,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, ShaderError> {
        let vs = compile_stage(gl, ShaderStage::Vertex, vertex)?;
        let fs = compile_stage(gl, ShaderStage::Fragment, fragment)?;

        let program = gl.link_program(vs, fs).map_err(|log| {
            error!("program link failed: {log}");
            ShaderError::Link { log }
        })?;

        let attributes: HashMap<_, _> = gl.active_attributes(program).into_iter().collect();
        let uniforms: HashMap<_, _> = gl.active_uniforms(program).into_iter().collect();
        debug!(
            attributes = attributes.len(),
            uniforms = uniforms.len(),
            "linked shader program"
        );

        Ok(Self {
            program,
            attributes,
            uniforms,
        })
    }

    /// The lit, noise-displaced material program used for glTF meshes.
    pub fn material<C: GraphicsContext + ?Sized>(gl: &mut C) -> Result<Self, ShaderError> {
        Self::compile(gl, MATERIAL_VERTEX, MATERIAL_FRAGMENT)
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    /// Location of an active uniform. Inactive or unknown names yield `None`, which
    /// every uniform setter on [`GraphicsContext`] treats as a no-op.
    pub fn uniform_location(&self, name: &str) -> Option<&UniformLocation> {
        self.uniforms.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, u32)> {
        self.attributes.iter().map(|(name, loc)| (name.as_str(), *loc))
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &UniformLocation)> {
        self.uniforms.iter().map(|(name, loc)| (name.as_str(), loc))
    }
}

/// Full source text handed to the driver for one stage.
pub fn with_prelude(source: &str) -> String {
    let mut full =
        String::with_capacity(VERSION.len() + PRECISION.len() + NOISE.len() + source.len() + 1);
    full.push_str(VERSION);
    full.push_str(PRECISION);
    full.push_str(NOISE);
    full.push('\n');
    full.push_str(source);
    full
}

fn compile_stage<C: GraphicsContext + ?Sized>(
    gl: &mut C,
    stage: ShaderStage,
    source: &str,
) -> Result<crate::gpu::ShaderId, ShaderError> {
    gl.compile_shader(stage, &with_prelude(source)).map_err(|log| {
        error!("{stage} shader failed to compile: {log}");
        ShaderError::Compile { stage, log }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingContext};

    #[test]
    fn prelude_order_is_version_precision_noise() {
        let full = with_prelude("void main() {}");
        assert!(full.starts_with("#version 300 es\nprecision highp float;\n"));
        let noise_at = full.find("float snoise(vec4 v)").unwrap();
        let body_at = full.find("void main() {}").unwrap();
        assert!(noise_at < body_at);
    }

    #[test]
    fn material_shader_exposes_conventional_names() {
        let mut gl = RecordingContext::new();
        let shader = Shader::material(&mut gl).unwrap();

        assert_eq!(shader.attribute_location("POSITION"), Some(0));
        assert_eq!(shader.attribute_location("NORMAL"), Some(1));
        assert_eq!(shader.attribute_location("TEXCOORD_0"), Some(2));
        for name in [
            "u_projMatrix",
            "u_objMatrix",
            "u_normalMatrix",
            "u_flip",
            "u_fcoef",
            "u_time",
            "u_color",
            "u_texture",
            "u_useTexture",
        ] {
            assert!(shader.uniform_location(name).is_some(), "missing {name}");
        }
        assert!(shader.uniform_location("u_nope").is_none());
        assert_eq!(shader.attributes().count(), 3);
    }

    #[test]
    fn outline_shader_samples_three_attachments() {
        let mut gl = RecordingContext::new();
        let shader = Shader::compile(&mut gl, OUTLINE_VERTEX, OUTLINE_FRAGMENT).unwrap();
        assert_eq!(shader.attribute_location("a_position"), Some(0));
        for name in ["u_texture", "u_matIndex", "u_normal"] {
            assert!(shader.uniform_location(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn compile_failure_carries_stage_and_log() {
        let mut gl = RecordingContext::new();
        gl.compile_failure = Some((ShaderStage::Fragment, "0:12: 'x' : undeclared".into()));

        let err = Shader::material(&mut gl).unwrap_err();
        match &err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(*stage, ShaderStage::Fragment);
                assert!(log.contains("undeclared"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("fragment"));
        assert_eq!(gl.count(|c| matches!(c, Call::LinkProgram(_))), 0);
    }

    #[test]
    fn link_failure_is_reported() {
        let mut gl = RecordingContext::new();
        gl.link_failure = Some("varying mismatch".into());
        let err = Shader::material(&mut gl).unwrap_err();
        assert!(matches!(err, ShaderError::Link { ref log } if log == "varying mismatch"));
    }
}
