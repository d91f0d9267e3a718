// SplashWindow: the controller the host application owns. Configures the
// splash, starts the dedicated splash thread on `show`, and requests the close
// on `hide`. All cross-thread traffic to the window goes through the backend's
// asynchronous close post; see `session` for which thread writes what.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::backend::{Backend, PlatformBackend};
use crate::bitmap::SplashImage;
use crate::config::{checked_duration, Rgb, Settings};
use crate::error::{Result, SplashError};
use crate::session::Session;
use crate::surface::{Customizer, PaintSurface};
use crate::window_proc::{WindowContext, WindowPlan};

const THREAD_NAME: &str = "splash-window";

pub struct SplashWindow<B: Backend = PlatformBackend> {
    backend: Arc<B>,
    session: Arc<Session>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SplashWindow<PlatformBackend> {
    pub fn new() -> Self {
        Self::with_backend(PlatformBackend::default())
    }
}

impl Default for SplashWindow<PlatformBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> SplashWindow<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            session: Arc::new(Session::default()),
            thread: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replaces the splash bitmap; its size becomes the window size on the next show.
    pub fn set_image(&self, image: SplashImage) {
        self.session.set_image(image);
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.session.image().map(|img| (img.width(), img.height()))
    }

    pub fn set_minimum_duration(&self, ms: i64) -> Result<()> {
        let ms = checked_duration(ms)?;
        self.session
            .update_settings(|s| s.minimum_duration_ms = ms)
    }

    pub fn minimum_duration(&self) -> Duration {
        self.session.settings().minimum_duration()
    }

    pub fn set_show_shadow(&self, show: bool) -> Result<()> {
        self.session.update_settings(|s| s.show_shadow = show)
    }

    pub fn show_shadow(&self) -> bool {
        self.session.settings().show_shadow
    }

    pub fn set_transparency_key(&self, key: Option<Rgb>) -> Result<()> {
        self.session.update_settings(|s| s.transparency_key = key)
    }

    pub fn transparency_key(&self) -> Option<Rgb> {
        self.session.settings().transparency_key
    }

    /// Applies all settings at once, with the same live-window restriction as
    /// the individual setters.
    pub fn configure(&self, settings: &Settings) -> Result<()> {
        self.session.update_settings(|s| *s = settings.clone())
    }

    pub fn settings(&self) -> Settings {
        self.session.settings()
    }

    /// Installs the paint hook. Takes effect on the next repaint, even while shown.
    pub fn set_customizer<F>(&self, customizer: F)
    where
        F: Fn(&mut PaintSurface<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let customizer: Customizer = Arc::new(customizer);
        self.session.set_customizer(Some(customizer));
    }

    pub fn clear_customizer(&self) {
        self.session.set_customizer(None);
    }

    /// True while a native splash window exists.
    pub fn is_visible(&self) -> bool {
        self.session.handle() != 0
    }

    /// Most recent native failure of the splash thread, if the last show failed.
    pub fn last_error(&self) -> Option<SplashError> {
        self.session.last_error()
    }

    /// Starts the splash thread, which creates and runs the window. Returns at
    /// once; a no-op while a splash thread is still alive.
    pub fn show(&self) -> Result<()> {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_visible() || thread.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("splash already showing; ignoring show");
            return Ok(());
        }
        if let Some(finished) = thread.take() {
            let _ = finished.join();
        }

        let image = self.session.image().ok_or(SplashError::MissingImage)?;
        self.session.rearm();
        let plan = WindowPlan {
            image,
            settings: self.session.begin_show(),
            capabilities: self.backend.capabilities(),
        };
        let context = WindowContext::new(Arc::clone(&self.session), plan);
        let backend = Arc::clone(&self.backend);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_splash_thread(&*backend, context));
        match spawned {
            Ok(handle) => {
                *thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.session.detach();
                Err(SplashError::Thread(e.to_string()))
            }
        }
    }

    /// Requests the close. Honors the minimum duration without blocking: if it
    /// has not elapsed yet, the splash thread closes the window when it does.
    pub fn hide(&self) {
        if self.session.request_close() {
            self.post_close();
        } else {
            debug!("splash close deferred until the minimum duration elapses");
        }
    }

    /// Blocks until the splash thread, if any, has torn its window down.
    pub fn join(&self) {
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("splash thread panicked");
            }
        }
    }

    fn post_close(&self) {
        let handle = self.session.handle();
        if handle != 0 && !self.backend.post_close(handle) {
            debug!("close post for splash window {handle:#x} was not delivered");
        }
    }
}

impl<B: Backend> Drop for SplashWindow<B> {
    fn drop(&mut self) {
        self.session.force_close();
        self.post_close();
        self.join();
    }
}

fn run_splash_thread<B: Backend>(backend: &B, context: WindowContext) {
    let plan = context.plan();
    info!(
        "showing splash {}x{} (minimum {} ms, shadow {}, layered {})",
        plan.width(),
        plan.height(),
        plan.settings.minimum_duration_ms,
        plan.drop_shadow(),
        plan.layered()
    );
    let result = backend.run(&context);
    context.session().detach();
    match result {
        Ok(()) => debug!("splash window closed"),
        Err(e) => {
            warn!("splash window unavailable: {e}");
            context.session().record_failure(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBackend;
    use crate::backend::Capabilities;
    use crate::geometry::Rect;
    use std::time::Instant;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn splash_with(backend: HeadlessBackend) -> SplashWindow<HeadlessBackend> {
        init_logger();
        let splash = SplashWindow::with_backend(backend);
        splash.set_image(SplashImage::filled(400, 300, Rgb::new(30, 60, 90)).unwrap());
        splash
    }

    fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_negative_minimum_duration_is_range_error() {
        let splash = splash_with(HeadlessBackend::default());
        assert_eq!(
            splash.set_minimum_duration(-1),
            Err(SplashError::OutOfRange(-1))
        );
        splash.set_minimum_duration(250).unwrap();
        assert_eq!(
            splash.set_minimum_duration(-250),
            Err(SplashError::OutOfRange(-250))
        );
        assert_eq!(splash.minimum_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_show_without_image_fails() {
        init_logger();
        let splash = SplashWindow::with_backend(HeadlessBackend::default());
        assert_eq!(splash.show(), Err(SplashError::MissingImage));
        assert!(splash.backend().windows().is_empty());
    }

    #[test]
    fn test_show_then_immediate_hide_closes_without_delay() {
        let splash = splash_with(HeadlessBackend::default());
        splash.show().unwrap();
        splash.hide();
        splash.join();

        let windows = splash.backend().windows();
        assert_eq!(windows.len(), 1);
        let w = &windows[0];
        assert_eq!((w.width, w.height), (400, 300));
        let closed = w.closed_at.expect("window closed");
        assert!(closed.duration_since(w.created_at) < Duration::from_secs(1));
        assert!(!splash.is_visible());
        assert_eq!(splash.last_error(), None);
    }

    #[test]
    fn test_early_hide_waits_for_minimum_duration() {
        let splash = splash_with(HeadlessBackend::default());
        splash.set_minimum_duration(300).unwrap();
        splash.show().unwrap();
        assert!(wait_until(|| splash.is_visible()));
        thread::sleep(Duration::from_millis(50));
        splash.hide();
        // hide never blocks and the window is still up
        assert!(splash.is_visible());
        splash.join();

        let w = &splash.backend().windows()[0];
        let lifetime = w.closed_at.unwrap().duration_since(w.created_at);
        assert!(lifetime >= Duration::from_millis(300), "closed after {lifetime:?}");
    }

    #[test]
    fn test_late_hide_closes_immediately() {
        let splash = splash_with(HeadlessBackend::default());
        splash.set_minimum_duration(50).unwrap();
        splash.show().unwrap();
        assert!(wait_until(|| splash.is_visible()));
        thread::sleep(Duration::from_millis(250));
        let hidden_at = Instant::now();
        splash.hide();
        splash.join();

        let w = &splash.backend().windows()[0];
        let closed = w.closed_at.unwrap();
        assert!(closed >= hidden_at);
        assert!(closed.duration_since(hidden_at) < Duration::from_millis(200));
    }

    #[test]
    fn test_setters_rejected_while_window_exists() {
        let splash = splash_with(HeadlessBackend::default());
        splash.show().unwrap();
        assert!(wait_until(|| splash.is_visible()));

        assert_eq!(splash.set_minimum_duration(10), Err(SplashError::InvalidState));
        // range check wins over the live-window restriction
        assert_eq!(
            splash.set_minimum_duration(-1),
            Err(SplashError::OutOfRange(-1))
        );
        assert_eq!(splash.set_show_shadow(true), Err(SplashError::InvalidState));
        assert_eq!(
            splash.set_transparency_key(Some(Rgb::new(0, 0, 0))),
            Err(SplashError::InvalidState)
        );
        assert_eq!(
            splash.configure(&Settings::default()),
            Err(SplashError::InvalidState)
        );
        // image and customizer have no such restriction
        splash.set_image(SplashImage::filled(10, 10, Rgb::new(0, 0, 0)).unwrap());
        splash.set_customizer(|_surface: &mut PaintSurface<'_>| Ok(()));

        splash.hide();
        splash.join();
        assert!(!splash.is_visible());
        splash.set_minimum_duration(10).unwrap();
        splash.set_show_shadow(true).unwrap();
        splash.set_transparency_key(Some(Rgb::new(0, 0, 0))).unwrap();
    }

    #[test]
    fn test_setters_rejected_before_window_is_created() {
        for _ in 0..20 {
            let splash = splash_with(HeadlessBackend::default());
            splash.set_show_shadow(true).unwrap();
            splash.show().unwrap();
            // no wait: the splash thread may not have created its window yet
            assert_eq!(splash.set_show_shadow(false), Err(SplashError::InvalidState));
            assert_eq!(splash.set_minimum_duration(500), Err(SplashError::InvalidState));
            splash.hide();
            splash.join();

            assert!(splash.show_shadow());
            assert_eq!(splash.minimum_duration(), Duration::ZERO);
            let w = &splash.backend().windows()[0];
            assert_eq!(w.drop_shadow, splash.show_shadow());
        }
    }

    #[test]
    fn test_show_twice_is_idempotent() {
        let splash = splash_with(HeadlessBackend::default());
        splash.set_minimum_duration(100).unwrap();
        splash.show().unwrap();
        splash.show().unwrap();
        assert!(wait_until(|| splash.is_visible()));
        splash.show().unwrap();
        splash.hide();
        splash.join();

        assert_eq!(splash.backend().windows().len(), 1);
        assert_eq!(splash.backend().max_live_windows(), 1);
    }

    #[test]
    fn test_reshow_with_new_configuration() {
        let splash = splash_with(HeadlessBackend::default());
        splash.show().unwrap();
        splash.hide();
        splash.join();

        splash.set_show_shadow(true).unwrap();
        splash.set_image(SplashImage::filled(64, 48, Rgb::new(0, 0, 0)).unwrap());
        splash.show().unwrap();
        splash.hide();
        splash.join();

        let windows = splash.backend().windows();
        assert_eq!(windows.len(), 2);
        assert!(!windows[0].drop_shadow);
        assert!(windows[1].drop_shadow);
        assert_eq!((windows[1].width, windows[1].height), (64, 48));
        assert_eq!(splash.image_size(), Some((64, 48)));
        assert_ne!(windows[0].handle, windows[1].handle);
    }

    #[test]
    fn test_creation_failure_leaves_no_window() {
        let splash = splash_with(HeadlessBackend::failing());
        splash.show().unwrap();
        splash.join();
        assert!(!splash.is_visible());
        assert!(matches!(
            splash.last_error(),
            Some(SplashError::WindowCreation(_))
        ));
        // hide after a failed show is harmless
        splash.hide();
        splash.set_show_shadow(true).unwrap();
    }

    #[test]
    fn test_transparency_key_with_layering() {
        let splash = splash_with(HeadlessBackend::new(Capabilities::ALL));
        let key = Rgb::new(30, 60, 90);
        splash.set_transparency_key(Some(key)).unwrap();
        splash.show().unwrap();
        splash.hide();
        splash.join();

        let w = &splash.backend().windows()[0];
        assert_eq!(w.color_key, Some(key));
        assert_eq!(w.transparent_pixels, 400 * 300);
    }

    #[test]
    fn test_transparency_key_without_layering_renders_opaque() {
        let splash = splash_with(HeadlessBackend::new(Capabilities::NONE));
        splash.set_transparency_key(Some(Rgb::new(30, 60, 90))).unwrap();
        splash.set_show_shadow(true).unwrap();
        splash.show().unwrap();
        splash.hide();
        splash.join();

        let w = &splash.backend().windows()[0];
        assert_eq!(w.color_key, None);
        assert_eq!(w.transparent_pixels, 0);
        assert!(!w.drop_shadow);
        assert!(w.paints >= 1);
        assert_eq!(splash.last_error(), None);
    }

    #[test]
    fn test_customizer_runs_on_every_repaint_with_inset_bounds() {
        let splash = splash_with(HeadlessBackend::default());
        splash.set_minimum_duration(2000).unwrap();
        let seen: Arc<Mutex<Vec<Rect>>> = Arc::default();
        let seen_in = Arc::clone(&seen);
        splash.set_customizer(move |surface: &mut PaintSurface<'_>| -> anyhow::Result<()> {
            seen_in.lock().unwrap().push(surface.bounds());
            let mut paint = tiny_skia::Paint::default();
            paint.set_color(tiny_skia::Color::from_rgba8(255, 0, 0, 255));
            let label = tiny_skia::Rect::from_xywh(20.0, 150.0, 100.0, 20.0).unwrap();
            surface
                .canvas()
                .fill_rect(label, &paint, tiny_skia::Transform::identity(), None);
            Ok(())
        });
        splash.show().unwrap();
        assert!(wait_until(|| splash.is_visible()));
        assert!(wait_until(|| splash.backend().request_repaint()));
        assert!(wait_until(|| seen.lock().unwrap().len() >= 2));
        // window is still up, so configuration stays locked
        assert!(splash.is_visible());
        drop(splash);

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|r| *r == Rect::new(0, 0, 399, 299)));
    }

    #[test]
    fn test_failing_customizer_does_not_break_window() {
        let splash = splash_with(HeadlessBackend::default());
        splash.set_customizer(|_surface: &mut PaintSurface<'_>| -> anyhow::Result<()> {
            anyhow::bail!("label font unavailable")
        });
        splash.show().unwrap();
        splash.hide();
        splash.join();

        let w = &splash.backend().windows()[0];
        assert!(w.paints >= 1);
        assert!(w.closed_at.is_some());
        assert_eq!(w.last_frame[0], u32::from_le_bytes([90, 60, 30, 255]));
    }

    #[test]
    fn test_drop_closes_despite_minimum_duration() {
        let shared_backend;
        let dropped_at;
        {
            let splash = splash_with(HeadlessBackend::default());
            splash.set_minimum_duration(60_000).unwrap();
            splash.show().unwrap();
            assert!(wait_until(|| splash.is_visible()));
            assert_eq!(splash.backend().armed_timers(), 1);
            shared_backend = Arc::clone(&splash.backend);
            dropped_at = Instant::now();
        }
        assert!(dropped_at.elapsed() < Duration::from_secs(5));
        let w = &shared_backend.windows()[0];
        assert!(w.closed_at.is_some());
        // the pending minimum-duration timer went away with the window
        assert_eq!(shared_backend.armed_timers(), 0);
    }
}
