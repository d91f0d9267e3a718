// Windows-specific helpers for the splash window: feature detection by OS
// version and disabling DWM show/hide animations so the splash appears and
// disappears instantly.

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Dwm::{DwmSetWindowAttribute, DWMWA_TRANSITIONS_FORCEDISABLED};
use windows::Win32::System::SystemInformation::{GetVersionExW, OSVERSIONINFOW};

use crate::backend::Capabilities;

/// Detects drop-shadow and layering support from the running OS version.
/// Without a version answer the optional features are treated as missing.
pub fn detect_capabilities() -> Capabilities {
    let mut info = OSVERSIONINFOW {
        dwOSVersionInfoSize: std::mem::size_of::<OSVERSIONINFOW>() as u32,
        ..Default::default()
    };
    #[allow(deprecated)]
    let result = unsafe { GetVersionExW(&mut info) };
    match result {
        Ok(()) => {
            log::debug!(
                "windows version {}.{}",
                info.dwMajorVersion,
                info.dwMinorVersion
            );
            Capabilities::from_version(info.dwMajorVersion, info.dwMinorVersion)
        }
        Err(e) => {
            log::warn!("failed to query windows version ({e}); disabling shadow and layering");
            Capabilities::NONE
        }
    }
}

pub fn disable_window_transitions(hwnd: HWND) {
    let value: i32 = 1;
    let hr = unsafe {
        DwmSetWindowAttribute(
            hwnd,
            DWMWA_TRANSITIONS_FORCEDISABLED,
            &value as *const _ as *const _,
            std::mem::size_of_val(&value) as u32,
        )
    };
    if let Err(e) = hr {
        log::debug!("failed to disable DWM transitions ({e}) for splash {hwnd:?}");
    }
}
