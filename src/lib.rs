//! # Sumi
//!
//! **A small WebGL2 glTF renderer with ink outlines.**
//!
//! Load a glTF scene, point a camera at it, and every frame draws the shaded
//! model into an off-screen G-buffer (color, material index, normal) before an
//! outline pass traces material and crease edges in black.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::rc::Rc;
//! use sumi::*;
//!
//! let gl = WebGl2Context::from_canvas_id("main", false)?;
//! let mut renderer = Renderer::new(gl, RendererConfig::new().size(600, 600))?;
//! let shader = Rc::new(Shader::material(renderer.context_mut())?);
//!
//! let mut scene = Scene::new();
//! let root = scene.create_node();
//! for item in GltfImporter::new(&mut renderer, GLTF, shader)?.import_default_scene(&mut scene)? {
//!     scene.append_child(root, item)?;
//! }
//!
//! let camera = scene.find(root, |n| n.camera().is_some()).unwrap();
//! renderer.set_camera(camera);
//! renderer.render(&mut scene, root)?;
//! ```
//!
//! ## Layout
//!
//! - **Scene graph**: [`Scene`] stores nodes in an arena and caches world and
//!   normal matrices lazily behind dirty flags.
//! - **GPU seam**: everything that talks to the GPU goes through
//!   [`GraphicsContext`]. `WebGl2Context` implements it in the browser.
//! - **Import**: [`GltfImporter`] reads glTF 2.0 JSON with embedded buffers.
//!
//! The crate logs through `tracing` and never installs a subscriber.

#[cfg(target_arch = "wasm32")]
mod app;
mod camera;
mod clock;
mod config;
mod error;
pub mod gltf;
pub mod gpu;
mod material;
mod mesh;
mod post_process;
mod render_target;
mod renderer;
pub mod scene;
pub mod shader;
#[cfg(test)]
mod testing;
mod texture;
#[cfg(target_arch = "wasm32")]
mod webgl;

#[cfg(target_arch = "wasm32")]
pub use app::App;
pub use camera::Camera;
pub use clock::RenderClock;
pub use config::RendererConfig;
pub use error::{ContextError, Error, ImportError, RenderError, SceneError, ShaderError};
pub use gltf::GltfImporter;
pub use gpu::{
    BufferId, BufferTarget, ComponentType, GraphicsContext, ProgramId, TextureFormat, TextureId,
};
pub use material::Material;
pub use mesh::{IndexBuffer, Mesh, MeshPrimitive, VertexAttribute};
pub use post_process::OutlinePass;
pub use render_target::RenderTarget;
pub use renderer::Renderer;
pub use scene::{ItemTransform, Node, NodeId, NodeKind, Scene};
pub use shader::Shader;
pub use texture::{DecodedImage, TextureUploads};
#[cfg(target_arch = "wasm32")]
pub use webgl::WebGl2Context;

// Re-export glam math types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
