pub mod headless;
#[cfg(target_os = "windows")]
pub mod win32;

use crate::error::{Result, SplashError};
use crate::window_proc::WindowContext;

/// Optional window features the running platform can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub drop_shadow: bool,
    pub layering: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        drop_shadow: true,
        layering: true,
    };
    pub const NONE: Self = Self {
        drop_shadow: false,
        layering: false,
    };

    /// Class drop shadows arrived with NT 5.1, layered windows with NT 5.0.
    pub fn from_version(major: u32, minor: u32) -> Self {
        Self {
            drop_shadow: (major, minor) >= (5, 1),
            layering: major >= 5,
        }
    }
}

/// Native windowing layer driven by the splash thread.
pub trait Backend: Send + Sync + 'static {
    fn capabilities(&self) -> Capabilities;

    /// Creates the splash window and pumps its messages until quit. Runs on the
    /// splash thread; a failure means no window was shown.
    fn run(&self, context: &WindowContext) -> Result<()>;

    /// Asynchronously asks the window behind `handle` to close. Callable from any thread.
    fn post_close(&self, handle: isize) -> bool;
}

#[cfg(target_os = "windows")]
pub type PlatformBackend = win32::Win32Backend;
#[cfg(not(target_os = "windows"))]
pub type PlatformBackend = UnsupportedBackend;

/// Backend for platforms without a native splash implementation: every show
/// degrades to no window.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

impl Backend for UnsupportedBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn run(&self, _context: &WindowContext) -> Result<()> {
        Err(SplashError::Unsupported)
    }

    fn post_close(&self, _handle: isize) -> bool {
        false
    }
}
