//! State shared between the controller (caller thread) and the splash thread.
//!
//! Writers per field:
//! - `settings`, `image`, `customizer`, `close_requested`: caller thread.
//! - `handle`, `timer`, `last_error`: splash thread.
//! - `pending`: caller thread sets it in `begin_show`; the splash thread
//!   clears it in `detach` once its window is gone (or `show` does, if the
//!   thread never started).
//! - `minimum_elapsed`: splash thread sets it; the caller thread clears it in
//!   `rearm`, which only runs while no splash thread is alive.
//!
//! The two latches are read crosswise with `SeqCst` so that whichever side
//! flips its latch last observes the other one and posts the close.

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::bitmap::SplashImage;
use crate::config::Settings;
use crate::error::{Result, SplashError};
use crate::surface::Customizer;

#[derive(Default)]
pub(crate) struct Session {
    settings: RwLock<Settings>,
    image: RwLock<Option<Arc<SplashImage>>>,
    customizer: RwLock<Option<Customizer>>,
    handle: AtomicIsize,
    timer: AtomicUsize,
    minimum_elapsed: AtomicBool,
    close_requested: AtomicBool,
    pending: AtomicBool,
    last_error: Mutex<Option<SplashError>>,
}

impl Session {
    pub fn handle(&self) -> isize {
        self.handle.load(Ordering::SeqCst)
    }

    pub fn attach(&self, handle: isize) {
        self.handle.store(handle, Ordering::SeqCst);
    }

    pub fn detach(&self) {
        self.timer.store(0, Ordering::SeqCst);
        self.handle.store(0, Ordering::SeqCst);
        self.pending.store(false, Ordering::SeqCst);
    }

    /// True from `begin_show` until the splash thread detaches, including the
    /// window-less gap before the handle is attached.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Locks the configuration for a new splash thread and returns the
    /// settings it will create its window with.
    pub fn begin_show(&self) -> Settings {
        let settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        self.pending.store(true, Ordering::SeqCst);
        settings.clone()
    }

    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `update` unless a splash thread is running or about to create
    /// its window.
    pub fn update_settings<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if self.is_pending() || self.handle() != 0 {
            return Err(SplashError::InvalidState);
        }
        update(&mut settings);
        Ok(())
    }

    pub fn image(&self) -> Option<Arc<SplashImage>> {
        self.image.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_image(&self, image: SplashImage) {
        *self.image.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(image));
    }

    pub fn customizer(&self) -> Option<Customizer> {
        self.customizer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_customizer(&self, customizer: Option<Customizer>) {
        *self.customizer.write().unwrap_or_else(PoisonError::into_inner) = customizer;
    }

    pub fn timer(&self) -> usize {
        self.timer.load(Ordering::SeqCst)
    }

    pub fn set_timer(&self, id: usize) {
        self.timer.store(id, Ordering::SeqCst);
    }

    /// Clears both latches and the last failure before a new splash thread starts.
    pub fn rearm(&self) {
        self.minimum_elapsed.store(false, Ordering::SeqCst);
        self.close_requested.store(false, Ordering::SeqCst);
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn minimum_elapsed(&self) -> bool {
        self.minimum_elapsed.load(Ordering::SeqCst)
    }

    /// Caller side of `Hide`. Returns true when the close may be posted now.
    pub fn request_close(&self) -> bool {
        self.close_requested.store(true, Ordering::SeqCst);
        self.minimum_elapsed.load(Ordering::SeqCst)
    }

    /// Splash side: the minimum duration is over (or there was none).
    /// Returns true when a close request is already waiting.
    pub fn complete_minimum(&self) -> bool {
        self.minimum_elapsed.store(true, Ordering::SeqCst);
        self.close_requested.load(Ordering::SeqCst)
    }

    /// Close regardless of the minimum duration; used on controller drop.
    pub fn force_close(&self) {
        self.minimum_elapsed.store(true, Ordering::SeqCst);
        self.close_requested.store(true, Ordering::SeqCst);
    }

    pub fn close_ready(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst) && self.minimum_elapsed.load(Ordering::SeqCst)
    }

    pub fn record_failure(&self, error: SplashError) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    pub fn last_error(&self) -> Option<SplashError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_locked_while_window_exists() {
        let session = Session::default();
        session.update_settings(|s| s.show_shadow = true).unwrap();
        session.attach(42);
        assert_eq!(
            session.update_settings(|s| s.show_shadow = false),
            Err(SplashError::InvalidState)
        );
        assert!(session.settings().show_shadow);
        session.detach();
        session.update_settings(|s| s.show_shadow = false).unwrap();
        assert!(!session.settings().show_shadow);
    }

    #[test]
    fn test_settings_locked_before_window_is_attached() {
        let session = Session::default();
        let snapshot = session.begin_show();
        assert!(!snapshot.show_shadow);
        assert_eq!(session.handle(), 0);
        assert_eq!(
            session.update_settings(|s| s.show_shadow = true),
            Err(SplashError::InvalidState)
        );
        assert!(!session.settings().show_shadow);
        session.detach();
        assert!(!session.is_pending());
        session.update_settings(|s| s.show_shadow = true).unwrap();
    }

    #[test]
    fn test_hide_before_minimum_defers() {
        let session = Session::default();
        assert!(!session.request_close());
        assert!(!session.close_ready());
        // timer fires later and finds the waiting request
        assert!(session.complete_minimum());
        assert!(session.close_ready());
    }

    #[test]
    fn test_hide_after_minimum_closes_immediately() {
        let session = Session::default();
        assert!(!session.complete_minimum());
        assert!(session.request_close());
    }

    #[test]
    fn test_rearm_resets_latches() {
        let session = Session::default();
        session.force_close();
        session.record_failure(SplashError::Unsupported);
        assert!(session.close_ready());
        session.rearm();
        assert!(!session.close_ready());
        assert!(!session.minimum_elapsed());
        assert_eq!(session.last_error(), None);
    }
}
