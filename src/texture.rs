//! Material textures and deferred image decoding.
//!
//! A texture handle is created and usable synchronously: it starts out as a 1x1
//! opaque-white placeholder. The encoded image is decoded off the render path and
//! the real pixels replace the placeholder storage once [`TextureUploads::pump`]
//! sees the decode complete. A failed decode leaves the placeholder in place.

use crate::error::ContextError;
use crate::gpu::{GraphicsContext, TextureFormat, TextureId};
use futures::channel::oneshot;
use image::ImageFormat;
use tracing::{debug, warn};

const PLACEHOLDER_PIXEL: [u8; 4] = [255, 255, 255, 255];

/// Tightly packed RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Decodes an encoded image. `mime_type` selects the codec when known;
    /// otherwise the format is guessed from the data.
    pub fn decode(bytes: &[u8], mime_type: Option<&str>) -> Result<Self, image::ImageError> {
        let image = match mime_type.and_then(ImageFormat::from_mime_type) {
            Some(format) => image::load_from_memory_with_format(bytes, format)?,
            None => image::load_from_memory(bytes)?,
        }
        .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }
}

/// Creates a texture holding a single opaque-white texel.
pub fn create_placeholder<C: GraphicsContext + ?Sized>(
    gl: &mut C,
) -> Result<TextureId, ContextError> {
    let texture = gl.create_texture()?;
    gl.texture_image(texture, TextureFormat::Rgba8, 1, 1, Some(&PLACEHOLDER_PIXEL));
    Ok(texture)
}

type DecodeResult = Result<DecodedImage, String>;

struct PendingUpload {
    texture: TextureId,
    receiver: oneshot::Receiver<DecodeResult>,
}

/// Image decodes in flight, each bound to the texture it will fill.
#[derive(Default)]
pub struct TextureUploads {
    pending: Vec<PendingUpload>,
}

impl TextureUploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts decoding `bytes` for `texture`. Never blocks.
    pub fn queue(&mut self, texture: TextureId, bytes: Vec<u8>, mime_type: Option<String>) {
        let (sender, receiver) = oneshot::channel();
        spawn_decode(sender, bytes, mime_type);
        self.queue_receiver(texture, receiver);
    }

    pub(crate) fn queue_receiver(
        &mut self,
        texture: TextureId,
        receiver: oneshot::Receiver<DecodeResult>,
    ) {
        self.pending.push(PendingUpload { texture, receiver });
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Uploads every decode that has finished. Returns how many textures were
    /// filled.
    pub fn pump<C: GraphicsContext + ?Sized>(&mut self, gl: &mut C) -> usize {
        let mut uploaded = 0;
        self.pending.retain_mut(|upload| match upload.receiver.try_recv() {
            Ok(None) => true,
            Ok(Some(Ok(image))) => {
                gl.texture_image(
                    upload.texture,
                    TextureFormat::Rgba8,
                    image.width,
                    image.height,
                    Some(&image.pixels),
                );
                debug!(
                    texture = upload.texture.index(),
                    width = image.width,
                    height = image.height,
                    "uploaded decoded texture"
                );
                uploaded += 1;
                false
            }
            Ok(Some(Err(err))) => {
                warn!(texture = upload.texture.index(), "image decode failed: {err}");
                false
            }
            Err(oneshot::Canceled) => {
                warn!(texture = upload.texture.index(), "image decode was abandoned");
                false
            }
        });
        uploaded
    }
}

fn decode_into(sender: oneshot::Sender<DecodeResult>, bytes: Vec<u8>, mime_type: Option<String>) {
    let result = DecodedImage::decode(&bytes, mime_type.as_deref()).map_err(|err| err.to_string());
    // The receiver is gone if the renderer was dropped first.
    let _ = sender.send(result);
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_decode(sender: oneshot::Sender<DecodeResult>, bytes: Vec<u8>, mime_type: Option<String>) {
    std::thread::spawn(move || decode_into(sender, bytes, mime_type));
}

#[cfg(target_arch = "wasm32")]
fn spawn_decode(sender: oneshot::Sender<DecodeResult>, bytes: Vec<u8>, mime_type: Option<String>) {
    wasm_bindgen_futures::spawn_local(async move { decode_into(sender, bytes, mime_type) });
}
