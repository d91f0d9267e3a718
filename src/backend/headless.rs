//! In-process backend with no display.
//!
//! Emulates the native message queue with a channel and timers with receive
//! deadlines on the pump's own thread, and keeps a log of what a real window would have done. Used by
//! the crate's tests and usable on hosts without a desktop session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use tiny_skia::Pixmap;

use crate::backend::{Backend, Capabilities};
use crate::config::Rgb;
use crate::error::{Result, SplashError};
use crate::renderer::{count_keyed, to_bgra};
use crate::window_proc::{WindowContext, WindowHost, WindowMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Close(isize),
    Paint(isize),
    Quit,
}

/// One emulated splash window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub handle: isize,
    pub width: u32,
    pub height: u32,
    pub drop_shadow: bool,
    pub color_key: Option<Rgb>,
    pub created_at: Instant,
    pub closed_at: Option<Instant>,
    pub paints: usize,
    /// Pixels that matched the applied color key in the last painted frame.
    pub transparent_pixels: usize,
    pub last_frame: Vec<u32>,
}

#[derive(Debug, Default)]
struct State {
    windows: Vec<WindowRecord>,
    live: usize,
    max_live: usize,
    /// Armed timers by (window, id): next due time and period.
    timers: HashMap<(isize, usize), (Instant, Duration)>,
}

pub struct HeadlessBackend {
    capabilities: Capabilities,
    fail_creation: bool,
    next_handle: AtomicIsize,
    queue: Mutex<Option<Sender<Event>>>,
    state: Mutex<State>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(Capabilities::ALL)
    }
}

impl HeadlessBackend {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            fail_creation: false,
            next_handle: AtomicIsize::new(0x100),
            queue: Mutex::new(None),
            state: Mutex::new(State::default()),
        }
    }

    /// A backend whose window creation always fails.
    pub fn failing() -> Self {
        Self {
            fail_creation: true,
            ..Self::default()
        }
    }

    /// Every window created so far, oldest first.
    pub fn windows(&self) -> Vec<WindowRecord> {
        self.lock_state().windows.clone()
    }

    /// Highest number of windows alive at the same time.
    pub fn max_live_windows(&self) -> usize {
        self.lock_state().max_live
    }

    /// Timers still armed on any window.
    pub fn armed_timers(&self) -> usize {
        self.lock_state().timers.len()
    }

    /// Queues a repaint, as a window move or uncover would.
    pub fn request_repaint(&self) -> bool {
        let handle = self.current_handle();
        handle != 0 && self.send(Event::Paint(handle))
    }

    fn current_handle(&self) -> isize {
        let state = self.lock_state();
        if state.live == 0 {
            return 0;
        }
        state
            .windows
            .last()
            .filter(|w| w.closed_at.is_none())
            .map_or(0, |w| w.handle)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: Event) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    fn with_window<F: FnOnce(&mut WindowRecord)>(&self, handle: isize, f: F) {
        if let Some(window) = self
            .lock_state()
            .windows
            .iter_mut()
            .find(|w| w.handle == handle)
        {
            f(window);
        }
    }

    fn next_timer_due(&self, handle: isize) -> Option<Instant> {
        self.lock_state()
            .timers
            .iter()
            .filter(|((h, _), _)| *h == handle)
            .map(|(_, (due, _))| *due)
            .min()
    }

    /// Delivers every timer of `host`'s window that is due, re-arming it for
    /// its next period the way a native timer repeats until killed.
    fn fire_due_timers(&self, context: &WindowContext, host: &HeadlessHost<'_>) {
        let now = Instant::now();
        let due: Vec<usize> = {
            let mut state = self.lock_state();
            state
                .timers
                .iter_mut()
                .filter(|((h, _), (at, _))| *h == host.handle && *at <= now)
                .map(|((_, id), (at, period))| {
                    *at = now + *period;
                    *id
                })
                .collect()
        };
        for id in due {
            context.dispatch(host, WindowMessage::Timer(id));
        }
    }

    fn pump(&self, context: &WindowContext, host: &HeadlessHost<'_>, rx: Receiver<Event>) {
        let mut destroyed = false;
        loop {
            let event = match self.next_timer_due(host.handle) {
                Some(due) => {
                    match rx.recv_timeout(due.saturating_duration_since(Instant::now())) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => {
                            self.fire_due_timers(context, host);
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };
            match event {
                Event::Close(h) if h == host.handle && !destroyed => {
                    // default close handling destroys the window
                    destroyed = true;
                    let now = Instant::now();
                    self.with_window(h, |w| w.closed_at = Some(now));
                    {
                        let mut state = self.lock_state();
                        state.live = state.live.saturating_sub(1);
                        state.timers.retain(|(th, _), _| *th != h);
                    }
                    context.dispatch(host, WindowMessage::Destroy);
                }
                Event::Paint(h) if h == host.handle && !destroyed => {
                    context.dispatch(host, WindowMessage::EraseBackground);
                    context.dispatch(host, WindowMessage::Paint);
                }
                Event::Quit => break,
                stale => debug!("headless: dropping {stale:?} for a destroyed window"),
            }
        }
    }
}

impl Backend for HeadlessBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn run(&self, context: &WindowContext) -> Result<()> {
        if self.fail_creation {
            return Err(SplashError::WindowCreation(
                "headless backend configured to fail".into(),
            ));
        }

        let plan = context.plan();
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel();
        *self.queue.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx.clone());
        {
            let mut state = self.lock_state();
            state.windows.push(WindowRecord {
                handle,
                width: plan.width(),
                height: plan.height(),
                drop_shadow: plan.drop_shadow(),
                color_key: None,
                created_at: Instant::now(),
                closed_at: None,
                paints: 0,
                transparent_pixels: 0,
                last_frame: Vec::new(),
            });
            state.live += 1;
            state.max_live = state.max_live.max(state.live);
        }

        let host = HeadlessHost {
            backend: self,
            handle,
            tx,
        };
        context.attach(handle);
        context.dispatch(&host, WindowMessage::Create);
        // show + immediate update
        context.dispatch(&host, WindowMessage::Paint);

        self.pump(context, &host, rx);
        *self.queue.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn post_close(&self, handle: isize) -> bool {
        handle != 0 && self.send(Event::Close(handle))
    }
}

struct HeadlessHost<'a> {
    backend: &'a HeadlessBackend,
    handle: isize,
    tx: Sender<Event>,
}

impl WindowHost for HeadlessHost<'_> {
    fn apply_color_key(&self, key: Rgb) -> bool {
        self.backend
            .with_window(self.handle, |w| w.color_key = Some(key));
        true
    }

    fn start_timer(&self, id: usize, after: Duration) -> Option<usize> {
        self.backend
            .lock_state()
            .timers
            .insert((self.handle, id), (Instant::now() + after, after));
        Some(id)
    }

    fn stop_timer(&self, id: usize) {
        self.backend
            .lock_state()
            .timers
            .remove(&(self.handle, id));
    }

    fn post_close(&self) {
        let _ = self.tx.send(Event::Close(self.handle));
    }

    fn post_quit(&self) {
        let _ = self.tx.send(Event::Quit);
    }

    fn paint(&self, compose: &mut dyn FnMut() -> Pixmap) {
        let frame = to_bgra(&compose());
        self.backend.with_window(self.handle, |w| {
            w.paints += 1;
            w.transparent_pixels = w.color_key.map_or(0, |key| count_keyed(&frame, key));
            w.last_frame = frame;
        });
    }
}
