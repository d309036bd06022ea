/// Renderer construction settings.
///
/// `width` and `height` are logical sizes; the drawing buffer is allocated at
/// `size * device_pixel_ratio`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
    pub antialias: bool,
    /// Clear value for the color attachment of the scene pass.
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
            device_pixel_ratio: 1.0,
            antialias: false,
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    pub fn antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    /// Backing-store size for a logical size under this config's pixel ratio.
    pub fn physical_size(&self, width: u32, height: u32) -> (u32, u32) {
        let ratio = self.device_pixel_ratio.max(0.0);
        (
            ((width as f32 * ratio).round() as u32).max(1),
            ((height as f32 * ratio).round() as u32).max(1),
        )
    }
}
