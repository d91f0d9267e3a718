//! Splash settings and their environment overrides.
//!
//! The same knobs the controller setters expose can be supplied through
//! `SPLASH_MIN_DURATION_MS`, `SPLASH_SHOW_SHADOW` and `SPLASH_TRANSPARENCY_KEY`.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SplashError};

pub const ENV_MIN_DURATION: &str = "SPLASH_MIN_DURATION_MS";
pub const ENV_SHOW_SHADOW: &str = "SPLASH_SHOW_SHADOW";
pub const ENV_TRANSPARENCY_KEY: &str = "SPLASH_TRANSPARENCY_KEY";

/// Opaque RGB color used as a layered-window color key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Win32 COLORREF layout: 0x00BBGGRR.
    pub fn to_colorref(self) -> u32 {
        u32::from(self.r) | (u32::from(self.g) << 8) | (u32::from(self.b) << 16)
    }

    /// Same color as a BGRA pixel (little endian u32), ignoring alpha.
    pub fn to_bgra(self) -> u32 {
        u32::from_le_bytes([self.b, self.g, self.r, 0])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Window settings. Frozen for the lifetime of each native window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub minimum_duration_ms: u32,
    pub show_shadow: bool,
    pub transparency_key: Option<Rgb>,
}

impl Settings {
    pub fn minimum_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.minimum_duration_ms))
    }

    /// Overlays values from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_lookup(|key| env::var(key).ok())
    }

    /// Overlays values from an arbitrary key lookup; unset keys keep the current value.
    pub fn apply_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MIN_DURATION) {
            let ms = raw.trim().parse::<i64>().map_err(|_| SplashError::Config {
                key: ENV_MIN_DURATION,
                value: raw.clone(),
            })?;
            self.minimum_duration_ms = checked_duration(ms)?;
        }
        if let Some(raw) = lookup(ENV_SHOW_SHADOW) {
            self.show_shadow = parse_flag(&raw).ok_or(SplashError::Config {
                key: ENV_SHOW_SHADOW,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_TRANSPARENCY_KEY) {
            self.transparency_key = if raw.trim().is_empty() {
                None
            } else {
                Some(Rgb::from_hex(&raw).ok_or(SplashError::Config {
                    key: ENV_TRANSPARENCY_KEY,
                    value: raw.clone(),
                })?)
            };
        }
        Ok(self)
    }
}

/// Validates a caller supplied duration against the native timer range.
pub fn checked_duration(ms: i64) -> Result<u32> {
    u32::try_from(ms).map_err(|_| SplashError::OutOfRange(ms))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
