// Splash window procedure. Backends translate their native messages into
// `WindowMessage` and let `WindowContext::dispatch` drive the lifecycle:
// create -> (timer) -> close -> destroy -> quit.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tiny_skia::Pixmap;

use crate::backend::Capabilities;
use crate::bitmap::SplashImage;
use crate::config::Settings;
use crate::renderer::compose_frame;
use crate::session::Session;

/// Timer id used for the minimum-duration one-shot.
pub const MINIMUM_DURATION_TIMER: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMessage {
    Create,
    EraseBackground,
    Paint,
    Timer(usize),
    Destroy,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handled here; the value is the window procedure's result.
    Handled(isize),
    /// Fall through to the platform's default handling.
    Default,
}

/// Per-window native operations the procedure needs. Only called on the splash thread.
pub trait WindowHost {
    fn apply_color_key(&self, key: crate::config::Rgb) -> bool;
    /// Starts a one-shot-style timer; returns the active timer token.
    fn start_timer(&self, id: usize, after: Duration) -> Option<usize>;
    fn stop_timer(&self, id: usize);
    fn post_close(&self);
    fn post_quit(&self);
    /// Runs a full native paint sequence around `compose`, presenting the frame
    /// it returns. The native context must be released on every path.
    fn paint(&self, compose: &mut dyn FnMut() -> Pixmap);
}

/// Everything frozen when `show` spawned the splash thread.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    pub image: Arc<SplashImage>,
    pub settings: Settings,
    pub capabilities: Capabilities,
}

impl WindowPlan {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn layered(&self) -> bool {
        self.settings.transparency_key.is_some() && self.capabilities.layering
    }

    pub fn drop_shadow(&self) -> bool {
        self.settings.show_shadow && self.capabilities.drop_shadow
    }
}

/// The state a backend's window procedure closes over. Backends reach it via
/// their per-window user-data slot (or an equivalent) rather than a global.
pub struct WindowContext {
    session: Arc<Session>,
    plan: WindowPlan,
}

impl WindowContext {
    pub(crate) fn new(session: Arc<Session>, plan: WindowPlan) -> Self {
        Self { session, plan }
    }

    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    /// Records the native handle as soon as the window exists.
    pub fn attach(&self, handle: isize) {
        self.session.attach(handle);
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub fn dispatch(&self, host: &dyn WindowHost, message: WindowMessage) -> Dispatch {
        match message {
            WindowMessage::Create => {
                self.on_create(host);
                Dispatch::Default
            }
            WindowMessage::EraseBackground => Dispatch::Handled(1),
            WindowMessage::Paint => {
                let customizer = self.session.customizer();
                host.paint(&mut || compose_frame(&self.plan.image, customizer.as_ref()));
                Dispatch::Handled(0)
            }
            WindowMessage::Timer(id) if id == MINIMUM_DURATION_TIMER => {
                host.stop_timer(id);
                self.session.set_timer(0);
                debug!("splash minimum duration elapsed");
                if self.session.complete_minimum() {
                    host.post_close();
                }
                Dispatch::Handled(0)
            }
            WindowMessage::Destroy => {
                let timer = self.session.timer();
                if timer != 0 {
                    host.stop_timer(timer);
                    self.session.set_timer(0);
                }
                host.post_quit();
                Dispatch::Handled(0)
            }
            WindowMessage::Timer(_) | WindowMessage::Other => Dispatch::Default,
        }
    }

    fn on_create(&self, host: &dyn WindowHost) {
        if let Some(key) = self.plan.settings.transparency_key {
            if self.plan.capabilities.layering {
                if !host.apply_color_key(key) {
                    warn!("failed to apply splash transparency key {key}");
                }
            } else {
                debug!("layered windows unsupported; ignoring transparency key {key}");
            }
        }

        let minimum = self.plan.settings.minimum_duration();
        if minimum.is_zero() || self.session.minimum_elapsed() {
            self.session.complete_minimum();
        } else {
            match host.start_timer(MINIMUM_DURATION_TIMER, minimum) {
                Some(token) => self.session.set_timer(token),
                None => {
                    warn!("failed to start splash minimum-duration timer; not enforcing it");
                    self.session.complete_minimum();
                }
            }
        }

        if self.session.close_ready() {
            host.post_close();
        }
    }
}
