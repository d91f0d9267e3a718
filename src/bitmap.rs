// SplashImage: owned splash bitmap. Decoded through the image crate and kept
// as a premultiplied tiny-skia pixmap so frames can be composed without
// decoding again on every paint.

use std::path::Path;

use image::GenericImageView;
use tiny_skia::{Color, ColorU8, Pixmap};

use crate::config::Rgb;
use crate::error::{Result, SplashError};

#[derive(Clone)]
pub struct SplashImage {
    pixmap: Pixmap,
}

impl std::fmt::Debug for SplashImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplashImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl SplashImage {
    /// Straight (non-premultiplied) RGBA8 rows, top to bottom.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(SplashError::InvalidImage(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        let mut pixmap = new_pixmap(width, height)?;
        for (dst, px) in pixmap.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        }
        Ok(Self { pixmap })
    }

    pub fn load_from_memory(bytes: &[u8]) -> Result<Self> {
        let img =
            image::load_from_memory(bytes).map_err(|e| SplashError::InvalidImage(e.to_string()))?;
        let (w, h) = img.dimensions();
        Self::from_rgba(w, h, img.to_rgba8().as_raw())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| SplashError::InvalidImage(format!("{}: {e}", path.display())))?;
        let (w, h) = img.dimensions();
        Self::from_rgba(w, h, img.to_rgba8().as_raw())
    }

    /// Opaque single-color bitmap.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Result<Self> {
        let mut pixmap = new_pixmap(width, height)?;
        pixmap.fill(Color::from_rgba8(color.r, color.g, color.b, 255));
        Ok(Self { pixmap })
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| SplashError::InvalidImage(format!("unusable size {width}x{height}")))
}
