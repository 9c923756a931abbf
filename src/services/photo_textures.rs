use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use eframe::egui;
use tracing::{info, warn};

use crate::services::photo::{DecodedImageData, PhotoBackend, PhotoKey};

/// Photo handles backed by egui textures. Releasing a key drops the texture.
pub struct TexturePhotoBackend {
    ctx: egui::Context,
    next_key: Cell<u64>,
    textures: RefCell<HashMap<PhotoKey, egui::TextureHandle>>,
}

impl TexturePhotoBackend {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            next_key: Cell::new(1),
            textures: RefCell::new(HashMap::new()),
        }
    }

    pub fn texture(&self, key: PhotoKey) -> Option<egui::TextureHandle> {
        self.textures.borrow().get(&key).cloned()
    }

    #[cfg(test)]
    fn live_textures(&self) -> usize {
        self.textures.borrow().len()
    }
}

impl PhotoBackend for TexturePhotoBackend {
    fn create(&self, photo: &DecodedImageData) -> Option<PhotoKey> {
        if photo.rgba.len() != photo.width * photo.height * 4 {
            warn!(
                "Photo buffer of {} bytes does not match {}x{}",
                photo.rgba.len(),
                photo.width,
                photo.height
            );
            return None;
        }
        let key = PhotoKey(self.next_key.get());
        self.next_key.set(key.0 + 1);

        let image =
            egui::ColorImage::from_rgba_unmultiplied([photo.width, photo.height], &photo.rgba);
        let texture = self.ctx.load_texture(
            format!("contestant-photo-{}", key.0),
            image,
            egui::TextureOptions::LINEAR,
        );
        self.textures.borrow_mut().insert(key, texture);
        Some(key)
    }

    fn release(&self, key: PhotoKey) {
        if self.textures.borrow_mut().remove(&key).is_none() {
            warn!("Release of unknown photo {:?}", key);
        }
    }
}

impl Drop for TexturePhotoBackend {
    fn drop(&mut self) {
        let remaining = self.textures.get_mut().len();
        if remaining > 0 {
            info!("Dropping {remaining} photo textures still held at shutdown");
        }
    }
}
