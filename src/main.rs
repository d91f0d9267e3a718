use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{info, warn};
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Stroke, Transform};

use splash_window::{PaintSurface, Settings, SplashImage, SplashWindow};

fn main() -> Result<()> {
    env_logger::init();
    info!("starting splash demo");

    let image = match std::env::args().nth(1) {
        Some(path) => SplashImage::open(&path)?,
        None => gradient(400, 300)?,
    };
    let settings = Settings {
        minimum_duration_ms: 3000,
        show_shadow: true,
        transparency_key: None,
    }
    .apply_env()?;

    let splash = SplashWindow::new();
    splash.set_image(image);
    if let Some((width, height)) = splash.image_size() {
        info!("splash image {width}x{height}");
    }
    splash.configure(&settings)?;
    splash.set_customizer(draw_banner);
    splash.show()?;

    // stand-in for the host application's startup work
    thread::sleep(Duration::from_millis(1000));
    splash.hide();
    splash.join();

    if let Some(e) = splash.last_error() {
        warn!("splash was not shown: {e}");
    }
    info!("main window ready");
    Ok(())
}

fn gradient(width: u32, height: u32) -> Result<SplashImage> {
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| anyhow!("create pixmap failed"))?;
    for (i, px) in pixmap.pixels_mut().iter_mut().enumerate() {
        let x = (i as u32 % width) * 255 / width.max(1);
        let y = (i as u32 / width) * 255 / height.max(1);
        *px = tiny_skia::ColorU8::from_rgba(x as u8, 40, y as u8, 255).premultiply();
    }
    Ok(SplashImage::from_pixmap(pixmap))
}

// Framed band across the splash, redrawn on every repaint.
fn draw_banner(surface: &mut PaintSurface<'_>) -> Result<()> {
    let bounds = surface.bounds();
    let (w, h) = (bounds.width as f32, bounds.height as f32);
    let canvas = surface.canvas();

    let mut band = Paint::default();
    band.set_color(Color::from_rgba8(0, 0, 0, 160));
    let rect = tiny_skia::Rect::from_xywh(0.0, h * 0.5 - 20.0, w, 40.0)
        .ok_or_else(|| anyhow!("splash too small for banner"))?;
    canvas.fill_rect(rect, &band, Transform::identity(), None);

    let mut pb = PathBuilder::new();
    pb.move_to(10.0, 10.0);
    pb.line_to((w - 10.0).max(10.0), 10.0);
    pb.line_to((w - 10.0).max(10.0), (h - 10.0).max(10.0));
    pb.line_to(10.0, (h - 10.0).max(10.0));
    pb.close();
    let path = pb.finish().ok_or_else(|| anyhow!("path build failed"))?;
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(220, 20, 60, 255));
    let stroke = Stroke {
        width: 3.0,
        ..Stroke::default()
    };
    canvas.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    Ok(())
}
