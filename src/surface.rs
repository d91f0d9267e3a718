use std::sync::Arc;

use tiny_skia::PixmapMut;

use crate::geometry::Rect;

/// Paint hook invoked on every repaint, on the splash thread.
pub type Customizer = Arc<dyn Fn(&mut PaintSurface<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Drawing target handed to a splash customizer for one repaint.
///
/// The canvas already holds the splash bitmap; anything drawn on it is
/// presented on top of the image once the customizer returns. The borrow ties
/// the surface to that single call, and the backend releases the native
/// device context afterwards.
pub struct PaintSurface<'a> {
    canvas: PixmapMut<'a>,
    bounds: Rect,
}

impl<'a> PaintSurface<'a> {
    pub(crate) fn new(canvas: PixmapMut<'a>, bounds: Rect) -> Self {
        Self { canvas, bounds }
    }

    /// Window-local drawable rectangle, (0, 0, width - 1, height - 1).
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn canvas(&mut self) -> &mut PixmapMut<'a> {
        &mut self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::{Color, Paint, Pixmap, Transform};

    #[test]
    fn test_surface_draws_into_borrowed_canvas() {
        let mut pixmap = Pixmap::new(8, 6).unwrap();
        {
            let mut surface = PaintSurface::new(pixmap.as_mut(), Rect::inclusive_bounds(8, 6));
            assert_eq!(surface.bounds(), Rect::new(0, 0, 7, 5));
            let mut paint = Paint::default();
            paint.set_color(Color::from_rgba8(200, 0, 0, 255));
            let rect = tiny_skia::Rect::from_xywh(0.0, 0.0, 2.0, 2.0).unwrap();
            surface
                .canvas()
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
        let px = pixmap.pixel(1, 1).unwrap();
        assert_eq!((px.red(), px.alpha()), (200, 255));
        assert_eq!(pixmap.pixel(5, 5).unwrap().alpha(), 0);
    }
}
