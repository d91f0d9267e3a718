// renderer: composes the splash frame on the CPU (bitmap + customizer drawing)
// and converts it to the BGRA layout GDI expects.

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::warn;
use tiny_skia::Pixmap;

use crate::bitmap::SplashImage;
use crate::config::Rgb;
use crate::geometry::Rect;
use crate::surface::{Customizer, PaintSurface};

/// Copies the bitmap at native resolution and lets the customizer draw on top.
///
/// A failing or panicking customizer is logged and its partial drawing kept;
/// the frame is always returned so the caller can finish its paint sequence.
pub fn compose_frame(image: &SplashImage, customizer: Option<&Customizer>) -> Pixmap {
    let mut canvas = image.pixmap().clone();
    if let Some(customizer) = customizer {
        let bounds = Rect::inclusive_bounds(image.width(), image.height());
        let mut surface = PaintSurface::new(canvas.as_mut(), bounds);
        match catch_unwind(AssertUnwindSafe(|| customizer(&mut surface))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("splash customizer failed: {e:#}"),
            Err(_) => warn!("splash customizer panicked; painting bitmap only"),
        }
    }
    canvas
}

/// Straight-alpha BGRA pixels (little endian u32), top row first.
pub fn to_bgra(pixmap: &Pixmap) -> Vec<u32> {
    pixmap
        .pixels()
        .iter()
        .map(|px| {
            let c = px.demultiply();
            u32::from_le_bytes([c.blue(), c.green(), c.red(), c.alpha()])
        })
        .collect()
}

/// Number of pixels a color-keyed layered window would render transparent.
pub fn count_keyed(frame: &[u32], key: Rgb) -> usize {
    let key = key.to_bgra();
    frame
        .iter()
        .filter(|&&px| px & 0x00FF_FFFF == key)
        .count()
}
