use std::fmt;
use std::rc::Rc;

use image::GenericImageView;
use tracing::{debug, warn};

pub const DEFAULT_MAX_PHOTO_DIMENSION: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhotoKey(pub u64);

/// RGBA pixels ready for upload. Produced off the UI thread.
#[derive(Clone, PartialEq)]
pub struct DecodedImageData {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl fmt::Debug for DecodedImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecodedImageData({}x{})", self.width, self.height)
    }
}

/// Decodes an image payload and shrinks it so neither side exceeds `max_dimension`.
pub fn decode_photo(bytes: &[u8], max_dimension: u32) -> Option<DecodedImageData> {
    let mut decoded = match image::load_from_memory(bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("Undecodable photo ({} bytes): {err}", bytes.len());
            return None;
        }
    };
    let (width, height) = decoded.dimensions();
    if width.max(height) > max_dimension {
        decoded = decoded.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        );
    }
    let rgba = decoded.to_rgba8();
    Some(DecodedImageData {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        rgba: rgba.into_raw(),
    })
}

/// Empty or missing bytes decode to nothing without touching the decoder.
pub fn decode_entry(bytes: Option<&[u8]>, max_dimension: u32) -> Option<DecodedImageData> {
    let bytes = bytes.filter(|bytes| !bytes.is_empty())?;
    decode_photo(bytes, max_dimension)
}

/// Owner of display resources created from decoded photos.
pub trait PhotoBackend {
    /// Acquires a display resource for `photo`. `None` when nothing could be created.
    fn create(&self, photo: &DecodedImageData) -> Option<PhotoKey>;
    fn release(&self, key: PhotoKey);
}

/// Scoped photo resource. Released exactly once, when dropped.
pub struct PhotoHandle {
    key: PhotoKey,
    backend: Rc<dyn PhotoBackend>,
}

impl PhotoHandle {
    pub fn acquire(
        backend: &Rc<dyn PhotoBackend>,
        photo: Option<&DecodedImageData>,
    ) -> Option<Self> {
        let photo = photo?;
        let key = backend.create(photo)?;
        debug!(
            "Acquired photo handle {:?} ({}x{})",
            key, photo.width, photo.height
        );
        Some(Self {
            key,
            backend: Rc::clone(backend),
        })
    }

    pub fn key(&self) -> PhotoKey {
        self.key
    }
}

impl Drop for PhotoHandle {
    fn drop(&mut self) {
        debug!("Releasing photo handle {:?}", self.key);
        self.backend.release(self.key);
    }
}

impl fmt::Debug for PhotoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PhotoHandle").field(&self.key.0).finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::io::Cursor;

    use super::*;

    /// Records every create/release so tests can check handle balance.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub created: RefCell<Vec<PhotoKey>>,
        pub released: RefCell<Vec<PhotoKey>>,
        pub sizes: RefCell<Vec<(usize, usize)>>,
    }

    impl RecordingBackend {
        pub fn live(&self) -> usize {
            self.created.borrow().len() - self.released.borrow().len()
        }
    }

    impl PhotoBackend for RecordingBackend {
        fn create(&self, photo: &DecodedImageData) -> Option<PhotoKey> {
            let mut created = self.created.borrow_mut();
            let key = PhotoKey(created.len() as u64 + 1);
            created.push(key);
            self.sizes.borrow_mut().push((photo.width, photo.height));
            Some(key)
        }

        fn release(&self, key: PhotoKey) {
            self.released.borrow_mut().push(key);
        }
    }

    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 90, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    pub fn decoded(width: usize, height: usize) -> DecodedImageData {
        DecodedImageData {
            width,
            height,
            rgba: vec![0; width * height * 4],
        }
    }
}
