//! Browser host application.
//!
//! [`App`] wires the pieces together the way a page embedding the renderer
//! would: one canvas, one glTF document, one camera, and a spinning model. The
//! page owns scheduling and calls [`App::frame`] from `requestAnimationFrame`.
//!
//! ```js
//! import init, { App } from "./pkg/sumi.js";
//!
//! await init();
//! const app = new App("main", await (await fetch("model.gltf")).text());
//! const tick = () => { app.frame(); requestAnimationFrame(tick); };
//! requestAnimationFrame(tick);
//! ```

use crate::config::RendererConfig;
use crate::error::{Error, RenderError};
use crate::gltf::GltfImporter;
use crate::renderer::Renderer;
use crate::scene::{NodeId, Scene};
use crate::shader::Shader;
use crate::webgl::WebGl2Context;
use glam::Vec3;
use std::rc::Rc;
use tracing::info;
use wasm_bindgen::prelude::*;

/// Scale applied to the imported scene's root.
const ROOT_SCALE: f32 = 0.75;
/// Degrees the spin target turns about Y per frame.
const SPIN_STEP: f32 = 0.2;

#[wasm_bindgen]
pub struct App {
    renderer: Renderer<WebGl2Context>,
    scene: Scene,
    root: NodeId,
    spin: Option<NodeId>,
}

#[wasm_bindgen]
impl App {
    /// Renders `gltf_json` (embedded buffers only) into the canvas with id
    /// `canvas_id`, through the document's first camera.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, gltf_json: &str) -> Result<App, JsError> {
        Ok(Self::build(canvas_id, gltf_json)?)
    }

    /// Draws one frame, then advances the spin.
    pub fn frame(&mut self) -> Result<(), JsError> {
        self.renderer.render(&mut self.scene, self.root)?;
        if let Some(spin) = self.spin {
            self.scene.turn_y(spin, -SPIN_STEP);
        }
        Ok(())
    }

    /// Resizes the canvas to the logical `width` x `height`.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }
}

impl App {
    fn build(canvas_id: &str, gltf_json: &str) -> Result<App, Error> {
        let ratio = web_sys::window().map_or(1.0, |window| window.device_pixel_ratio());
        let config = RendererConfig::new().device_pixel_ratio(ratio as f32);
        let gl = WebGl2Context::from_canvas_id(canvas_id, config.antialias)
            .map_err(RenderError::from)?;
        let mut renderer = Renderer::new(gl, config)?;
        let shader = Rc::new(Shader::material(renderer.context_mut()).map_err(RenderError::from)?);

        let mut scene = Scene::new();
        let root = scene.create_node();
        let items = GltfImporter::new(&mut renderer, gltf_json, shader)?
            .import_default_scene(&mut scene)?;
        for &item in &items {
            scene.append_child(root, item)?;
        }
        scene.set_scale(root, Vec3::splat(ROOT_SCALE));

        let camera = scene
            .find(root, |node| node.camera().is_some())
            .ok_or(RenderError::NoCamera)?;
        renderer.set_camera(camera);

        info!(canvas_id, items = items.len(), "app ready");
        Ok(App {
            renderer,
            scene,
            root,
            spin: items.last().copied(),
        })
    }
}
