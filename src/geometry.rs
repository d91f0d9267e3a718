/// Pixel rectangle in screen or window-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Drawable area of a `width` x `height` window: origin at (0,0), inclusive
    /// bottom-right corner, so each extent is one pixel short of the window's.
    pub fn inclusive_bounds(width: u32, height: u32) -> Self {
        Self::new(0, 0, width.saturating_sub(1), height.saturating_sub(1))
    }
}

/// Top-left corner that centers a `width` x `height` window on `monitor`,
/// never left of or above the monitor origin.
pub fn centered_origin(monitor: Rect, width: u32, height: u32) -> (i32, i32) {
    let dx = (i64::from(monitor.width) - i64::from(width)) / 2;
    let dy = (i64::from(monitor.height) - i64::from(height)) / 2;
    let x = i64::from(monitor.x) + dx.max(0);
    let y = i64::from(monitor.y) + dy.max(0);
    (x as i32, y as i32)
}
