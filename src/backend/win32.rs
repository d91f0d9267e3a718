// Win32 splash backend: per-show window class, borderless topmost tool window
// centered on the cursor's monitor, classic GetMessage pump, GDI present.

use std::ffi::c_void;
use std::mem::size_of;

use log::{debug, warn};
use tiny_skia::Pixmap;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{
    GetLastError, COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM,
};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, EndPaint, GetMonitorInfoW, MonitorFromPoint, SetDIBitsToDevice, UpdateWindow,
    BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HDC, MONITORINFO,
    MONITOR_DEFAULTTOPRIMARY, PAINTSTRUCT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DispatchMessageW, GetCursorPos, GetMessageW,
    GetWindowLongPtrW, KillTimer, PostMessageW, PostQuitMessage, RegisterClassW,
    SetLayeredWindowAttributes, SetTimer, SetWindowLongPtrW, ShowWindow, TranslateMessage,
    UnregisterClassW, CREATESTRUCTW, CS_DROPSHADOW, GWLP_USERDATA, LWA_COLORKEY, MSG,
    SW_SHOWNORMAL, WM_CLOSE, WM_CREATE, WM_DESTROY, WM_ERASEBKGND, WM_NCCREATE, WM_NCDESTROY,
    WM_PAINT, WM_TIMER, WNDCLASSW, WNDCLASS_STYLES, WS_EX_LAYERED, WS_EX_TOOLWINDOW,
    WS_EX_TOPMOST, WS_POPUP,
};

use crate::backend::{Backend, Capabilities};
use crate::config::Rgb;
use crate::error::{Result, SplashError};
use crate::geometry::{centered_origin, Rect};
use crate::renderer::to_bgra;
use crate::window_proc::{Dispatch, WindowContext, WindowHost, WindowMessage};
use crate::windows_util::{detect_capabilities, disable_window_transitions};

const CLASS_NAME: PCWSTR = w!("SplashWindow");

pub struct Win32Backend {
    capabilities: Capabilities,
}

impl Win32Backend {
    pub fn new() -> Self {
        Self {
            capabilities: detect_capabilities(),
        }
    }
}

impl Default for Win32Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for Win32Backend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn run(&self, context: &WindowContext) -> Result<()> {
        let plan = context.plan();
        let instance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .map_err(|e| SplashError::ClassRegistration(e.to_string()))?
            .into();
        let _class = WindowClass::register(instance, plan.drop_shadow())?;

        let (x, y) = centered_origin(cursor_monitor(), plan.width(), plan.height());
        let mut ex_style = WS_EX_TOOLWINDOW | WS_EX_TOPMOST;
        if plan.layered() {
            ex_style |= WS_EX_LAYERED;
        }
        // WM_NCCREATE stores `context` in the window's user data; it outlives
        // the window because the pump below returns only after WM_DESTROY.
        let hwnd = unsafe {
            CreateWindowExW(
                ex_style,
                CLASS_NAME,
                w!(""),
                WS_POPUP,
                x,
                y,
                plan.width() as i32,
                plan.height() as i32,
                None,
                None,
                Some(instance),
                Some(context as *const WindowContext as *const c_void),
            )
        }
        .map_err(|e| SplashError::WindowCreation(e.to_string()))?;

        disable_window_transitions(hwnd);
        unsafe {
            let _ = ShowWindow(hwnd, SW_SHOWNORMAL);
            let _ = UpdateWindow(hwnd);
        }
        debug!("splash window {hwnd:?} at ({x}, {y})");

        pump_messages();
        Ok(())
    }

    fn post_close(&self, handle: isize) -> bool {
        let hwnd = HWND(handle as *mut c_void);
        unsafe { PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0)) }.is_ok()
    }
}

/// Registered window class, unregistered on drop so the next show can pick a
/// different class style.
struct WindowClass {
    instance: HINSTANCE,
}

impl WindowClass {
    fn register(instance: HINSTANCE, drop_shadow: bool) -> Result<Self> {
        let mut style = WNDCLASS_STYLES(0);
        if drop_shadow {
            style |= CS_DROPSHADOW;
        }
        let wc = WNDCLASSW {
            style,
            lpfnWndProc: Some(splash_wndproc),
            hInstance: instance,
            lpszClassName: CLASS_NAME,
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wc) } == 0 {
            let code = unsafe { GetLastError() };
            return Err(SplashError::ClassRegistration(format!(
                "RegisterClassW failed with error {}",
                code.0
            )));
        }
        Ok(Self { instance })
    }
}

impl Drop for WindowClass {
    fn drop(&mut self) {
        unsafe {
            let _ = UnregisterClassW(CLASS_NAME, Some(self.instance));
        }
    }
}

fn cursor_monitor() -> Rect {
    unsafe {
        let mut cursor = POINT::default();
        if GetCursorPos(&mut cursor).is_err() {
            debug!("cursor position unavailable; using the primary monitor");
        }
        let monitor = MonitorFromPoint(cursor, MONITOR_DEFAULTTOPRIMARY);
        let mut info = MONITORINFO {
            cbSize: size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !GetMonitorInfoW(monitor, &mut info).as_bool() {
            warn!("monitor geometry unavailable; placing splash at the origin");
            return Rect::new(0, 0, 0, 0);
        }
        let r = info.rcMonitor;
        Rect::new(
            r.left,
            r.top,
            (r.right - r.left).max(0) as u32,
            (r.bottom - r.top).max(0) as u32,
        )
    }
}

fn pump_messages() {
    let mut msg = MSG::default();
    unsafe {
        // GetMessageW returns -1 on error and 0 on WM_QUIT
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

unsafe extern "system" fn splash_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_NCCREATE {
        if let Some(create) = (lparam.0 as *const CREATESTRUCTW).as_ref() {
            let context = create.lpCreateParams as *const WindowContext;
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, context as isize);
            if let Some(context) = context.as_ref() {
                context.attach(hwnd.0 as isize);
            }
        }
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    }

    let context = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const WindowContext;
    let Some(context) = context.as_ref() else {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };
    if msg == WM_NCDESTROY {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    }

    let message = match msg {
        WM_CREATE => WindowMessage::Create,
        WM_ERASEBKGND => WindowMessage::EraseBackground,
        WM_PAINT => WindowMessage::Paint,
        WM_TIMER => WindowMessage::Timer(wparam.0),
        WM_DESTROY => WindowMessage::Destroy,
        _ => WindowMessage::Other,
    };
    match context.dispatch(&Win32Host { hwnd }, message) {
        Dispatch::Handled(result) => LRESULT(result),
        Dispatch::Default => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

struct Win32Host {
    hwnd: HWND,
}

impl WindowHost for Win32Host {
    fn apply_color_key(&self, key: Rgb) -> bool {
        unsafe {
            SetLayeredWindowAttributes(self.hwnd, COLORREF(key.to_colorref()), 0, LWA_COLORKEY)
        }
        .is_ok()
    }

    fn start_timer(&self, id: usize, after: std::time::Duration) -> Option<usize> {
        let ms = u32::try_from(after.as_millis()).unwrap_or(u32::MAX);
        let token = unsafe { SetTimer(Some(self.hwnd), id, ms, None) };
        (token != 0).then_some(token)
    }

    fn stop_timer(&self, id: usize) {
        unsafe {
            let _ = KillTimer(Some(self.hwnd), id);
        }
    }

    fn post_close(&self) {
        unsafe {
            let _ = PostMessageW(Some(self.hwnd), WM_CLOSE, WPARAM(0), LPARAM(0));
        }
    }

    fn post_quit(&self) {
        unsafe { PostQuitMessage(0) };
    }

    fn paint(&self, compose: &mut dyn FnMut() -> Pixmap) {
        let guard = PaintGuard::begin(self.hwnd);
        if guard.hdc.is_invalid() {
            return;
        }
        let frame = compose();
        blit(guard.hdc, &frame);
    }
}

/// BeginPaint/EndPaint pair; EndPaint runs on every exit path.
struct PaintGuard {
    hwnd: HWND,
    ps: PAINTSTRUCT,
    hdc: HDC,
}

impl PaintGuard {
    fn begin(hwnd: HWND) -> Self {
        let mut ps = PAINTSTRUCT::default();
        let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
        Self { hwnd, ps, hdc }
    }
}

impl Drop for PaintGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = EndPaint(self.hwnd, &self.ps);
        }
    }
}

fn blit(hdc: HDC, frame: &Pixmap) {
    let pixels = to_bgra(frame);
    let (w, h) = (frame.width(), frame.height());
    let info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: w as i32,
            // negative height: top-down rows
            biHeight: -(h as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let lines = unsafe {
        SetDIBitsToDevice(
            hdc,
            0,
            0,
            w,
            h,
            0,
            0,
            0,
            h,
            pixels.as_ptr() as *const c_void,
            &info,
            DIB_RGB_COLORS,
        )
    };
    if lines == 0 {
        warn!("failed to draw splash bitmap");
    }
}
