//! Preview window backed by minifb (feature: display-minifb).

use anyhow::{anyhow, Result};
use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::time::Duration;

use super::DisplayConfig;

pub(crate) struct WindowSurface {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    frames_presented: u64,
}

impl WindowSurface {
    pub(crate) fn open(config: &DisplayConfig) -> Result<Self> {
        let width = config.width as usize;
        let height = config.height as usize;
        let mut window = Window::new(
            &config.title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| anyhow!("failed to create preview window: {}", e))?;

        // ~60 Hz presentation cap; capture pacing is set by the cameras.
        window.limit_update_rate(Some(Duration::from_micros(16_600)));

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
            frames_presented: 0,
        })
    }

    pub(crate) fn present(&mut self, frame: &RgbImage) -> Result<()> {
        let (frame_w, frame_h) = frame.dimensions();
        let frame_w = frame_w as usize;
        let frame_h = frame_h as usize;
        if frame_w != self.width || frame_h != self.height {
            // Composite size follows the live crop margins; track it.
            self.width = frame_w;
            self.height = frame_h;
            self.buffer.resize(frame_w * frame_h, 0);
        }

        for (i, pixel) in frame.pixels().enumerate() {
            let r = pixel[0] as u32;
            let g = pixel[1] as u32;
            let b = pixel[2] as u32;
            self.buffer[i] = (r << 16) | (g << 8) | b;
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| anyhow!("window update failed: {}", e))?;
        self.frames_presented += 1;
        Ok(())
    }

    pub(crate) fn poll_keys(&mut self) -> Vec<char> {
        self.window
            .get_keys_pressed(KeyRepeat::Yes)
            .into_iter()
            .filter_map(key_to_char)
            .collect()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub(crate) fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub(crate) fn last_frame_size(&self) -> Option<(u32, u32)> {
        if self.frames_presented == 0 {
            None
        } else {
            Some((self.width as u32, self.height as u32))
        }
    }
}

/// Map the keys the control loop cares about onto their characters.
/// Everything else returns `None` and is ignored upstream.
fn key_to_char(key: Key) -> Option<char> {
    let c = match key {
        Key::A => 'a',
        Key::B => 'b',
        Key::C => 'c',
        Key::D => 'd',
        Key::E => 'e',
        Key::F => 'f',
        Key::G => 'g',
        Key::H => 'h',
        Key::I => 'i',
        Key::J => 'j',
        Key::K => 'k',
        Key::L => 'l',
        Key::M => 'm',
        Key::N => 'n',
        Key::O => 'o',
        Key::P => 'p',
        Key::Q => 'q',
        Key::R => 'r',
        Key::S => 's',
        Key::T => 't',
        Key::U => 'u',
        Key::V => 'v',
        Key::W => 'w',
        Key::X => 'x',
        Key::Y => 'y',
        Key::Z => 'z',
        Key::Period => '.',
        Key::Comma => ',',
        Key::Semicolon => ';',
        _ => return None,
    };
    Some(c)
}
