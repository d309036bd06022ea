//! Error types for shader compilation, glTF import, scene edits, and renderer setup.
//!
//! Every error here is raised at construction or import time. The per-frame render
//! path is built so that it cannot fail once setup succeeded; the only per-frame
//! check is that a camera has been selected.

use crate::gpu::ShaderStage;
use thiserror::Error;

/// A failure reported by the graphics context while creating a GPU object.
#[derive(Debug, Clone, Error)]
#[error("graphics context error: {0}")]
pub struct ContextError(pub String);

/// Shader compilation or link failure, carrying the driver's info log.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    #[error("could not compile {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("could not link program:\n{log}")]
    Link { log: String },
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Errors raised while importing a glTF document.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid glTF JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported URI: {0}")]
    UnsupportedUri(String),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("non-perspective cameras are not supported (camera {0})")]
    NonPerspectiveCamera(usize),
    #[error("non-indexed primitives are not supported (mesh {mesh}, primitive {primitive})")]
    NonIndexedPrimitive { mesh: usize, primitive: usize },
    #[error("sparse accessors are not supported (accessor {0})")]
    SparseAccessor(usize),
    #[error("primitive mode {0} is not supported, only triangle lists are")]
    UnsupportedPrimitiveMode(u32),
    #[error("accessor {0} has no buffer view")]
    MissingBufferView(usize),
    #[error("image {0} has neither a buffer view nor a URI")]
    MissingImageSource(usize),
    #[error("{kind} index {index} is out of range")]
    MissingIndex { kind: &'static str, index: usize },
    #[error("unknown accessor component type {0}")]
    UnknownComponentType(u32),
    #[error("buffer view {view} reaches past the end of buffer {buffer}")]
    OutOfBounds { view: usize, buffer: usize },
    #[error("node {0} is its own ancestor")]
    NodeCycle(usize),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Errors raised by scene-graph edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("appending this child would create a cycle in the scene graph")]
    Cycle,
    #[error("node does not exist in this scene")]
    UnknownNode,
}

/// Errors raised by the renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no camera has been set on the renderer")]
    NoCamera,
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Any error this crate can produce.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
