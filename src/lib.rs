//! Borderless, topmost splash window shown while an application starts up.
//!
//! ```no_run
//! use splash_window::{SplashImage, SplashWindow};
//!
//! # fn main() -> anyhow::Result<()> {
//! let splash = SplashWindow::new();
//! splash.set_image(SplashImage::open("splash.png")?);
//! splash.set_minimum_duration(3000)?;
//! splash.set_show_shadow(true)?;
//! splash.show()?;
//! // ... build the main window ...
//! splash.hide();
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod bitmap;
pub mod config;
pub mod error;
pub mod geometry;
pub mod renderer;
mod session;
pub mod splash;
pub mod surface;
pub mod window_proc;
#[cfg(target_os = "windows")]
pub mod windows_util;

pub use backend::{Backend, Capabilities, PlatformBackend};
pub use bitmap::SplashImage;
pub use config::{Rgb, Settings};
pub use error::SplashError;
pub use geometry::Rect;
pub use splash::SplashWindow;
pub use surface::{Customizer, PaintSurface};
