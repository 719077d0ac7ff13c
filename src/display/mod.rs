//! Display surface.
//!
//! The compositor presents composites through this facade and polls it for
//! key presses — the window owns the keyboard, so input arrives wherever the
//! frames go.
//!
//! - `display-minifb` builds present a real window (feature-gated)
//! - the headless backend is always available: it swallows frames, reports
//!   how many it saw, and can be fed scripted key presses, which is how the
//!   control-loop tests drive the input path without a windowing system

#[cfg(feature = "display-minifb")]
mod window;

use anyhow::Result;
use image::RgbImage;
use std::collections::VecDeque;

#[cfg(feature = "display-minifb")]
use window::WindowSurface;

/// Configuration for the preview surface.
#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "stereoscope".to_string(),
            width: 1040,
            height: 400,
        }
    }
}

/// Display facade over a real window or a headless sink.
pub struct DisplaySurface {
    backend: DisplayBackend,
}

enum DisplayBackend {
    Headless(HeadlessSurface),
    #[cfg(feature = "display-minifb")]
    Window(WindowSurface),
}

impl DisplaySurface {
    /// Open the preview surface. Falls back to the headless sink when the
    /// crate was built without a window backend.
    pub fn create(config: &DisplayConfig) -> Result<Self> {
        #[cfg(feature = "display-minifb")]
        {
            Ok(Self {
                backend: DisplayBackend::Window(WindowSurface::open(config)?),
            })
        }
        #[cfg(not(feature = "display-minifb"))]
        {
            log::warn!(
                "built without the display-minifb feature; presenting to a headless sink"
            );
            let _ = config;
            Ok(Self::headless())
        }
    }

    pub fn headless() -> Self {
        Self {
            backend: DisplayBackend::Headless(HeadlessSurface::default()),
        }
    }

    /// Push one composite to the surface.
    pub fn present(&mut self, frame: &RgbImage) -> Result<()> {
        match &mut self.backend {
            DisplayBackend::Headless(surface) => surface.present(frame),
            #[cfg(feature = "display-minifb")]
            DisplayBackend::Window(surface) => surface.present(frame),
        }
    }

    /// Drain the key presses since the last poll. Must not block.
    pub fn poll_keys(&mut self) -> Vec<char> {
        match &mut self.backend {
            DisplayBackend::Headless(surface) => surface.poll_keys(),
            #[cfg(feature = "display-minifb")]
            DisplayBackend::Window(surface) => surface.poll_keys(),
        }
    }

    /// A closed window is an implicit quit request.
    pub fn is_open(&self) -> bool {
        match &self.backend {
            DisplayBackend::Headless(_) => true,
            #[cfg(feature = "display-minifb")]
            DisplayBackend::Window(surface) => surface.is_open(),
        }
    }

    /// Frames presented so far.
    pub fn frames_presented(&self) -> u64 {
        match &self.backend {
            DisplayBackend::Headless(surface) => surface.frames_presented,
            #[cfg(feature = "display-minifb")]
            DisplayBackend::Window(surface) => surface.frames_presented(),
        }
    }

    /// Queue a scripted key press (headless backend only; no-op on a window).
    pub fn push_key(&mut self, key: char) {
        if let DisplayBackend::Headless(surface) = &mut self.backend {
            surface.scripted_keys.push_back(key);
        }
    }

    /// Size of the most recently presented frame, if any.
    pub fn last_frame_size(&self) -> Option<(u32, u32)> {
        match &self.backend {
            DisplayBackend::Headless(surface) => surface.last_size,
            #[cfg(feature = "display-minifb")]
            DisplayBackend::Window(surface) => surface.last_frame_size(),
        }
    }
}

// ----------------------------------------------------------------------------
// Headless sink
// ----------------------------------------------------------------------------

#[derive(Default)]
struct HeadlessSurface {
    frames_presented: u64,
    last_size: Option<(u32, u32)>,
    scripted_keys: VecDeque<char>,
}

impl HeadlessSurface {
    fn present(&mut self, frame: &RgbImage) -> Result<()> {
        self.frames_presented += 1;
        self.last_size = Some(frame.dimensions());
        Ok(())
    }

    fn poll_keys(&mut self) -> Vec<char> {
        self.scripted_keys.drain(..).collect()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
