// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the dithered camera image with the detection overlay on top.
// 2) A tiny 5x7 bitmap font for box labels and the HUD indicator.
// 3) Keyboard + mouse-drag input turned into RawInput events.

use std::time::Instant;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::error::Error;
use crate::frame_loop::Display;
use crate::gesture::{KeyName, RawInput};
use crate::overlay::OverlaySurface;
use crate::types::FrameBuffer;

const HUD_COLOR: u32 = 0x00_FF_FF_FF;
const HUD_DOT: i64 = 2;
const HUD_MARGIN: i64 = 8;

pub struct WindowDisplay {
    window: Window,         // the on-screen window you see
    composed: FrameBuffer,  // video + overlay + HUD, rebuilt every present
    mouse_down: bool,
    last_mouse: Option<(f32, f32)>,
}

impl WindowDisplay {
    /// Create a window sized to the camera feed.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize, target_fps: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        // Paces the frame loop: update_with_buffer waits for the next refresh slot.
        window.set_target_fps(target_fps);
        Ok(Self {
            window,
            composed: FrameBuffer::new(width, height),
            mouse_down: false,
            last_mouse: None,
        })
    }
}

impl Display for WindowDisplay {
    /// Returns false once the user closes the window or presses ESC.
    fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// Keys pressed since the last update (held keys repeat), plus the left
    /// mouse button acting as a single touch point.
    fn poll_input(&mut self) -> Vec<RawInput> {
        let at = Instant::now();
        let mut events: Vec<RawInput> = self
            .window
            .get_keys_pressed(KeyRepeat::Yes)
            .into_iter()
            .filter_map(key_name)
            .map(|key| RawInput::Key { key, at })
            .collect();

        let pos = self.window.get_mouse_pos(MouseMode::Discard);
        let down = self.window.get_mouse_down(MouseButton::Left);
        let (x, y) = (pos.map(|p| p.0), pos.map(|p| p.1));
        match (self.mouse_down, down) {
            (false, true) => events.push(RawInput::TouchStart { x, y, at }),
            (true, true) if pos != self.last_mouse => events.push(RawInput::TouchMove { x, y, at }),
            (true, false) => events.push(RawInput::TouchEnd { x, y, at }),
            _ => {}
        }
        self.mouse_down = down;
        self.last_mouse = pos;
        events
    }

    /// Push the pixels for this frame to the screen.
    /// Visual: overlay composited over the dithered video, indicator text top-left.
    fn present(
        &mut self,
        video: &FrameBuffer,
        overlay: &OverlaySurface,
        indicator: &str,
    ) -> Result<(), Error> {
        if video.pixels.is_empty() {
            // nothing captured yet: black screen at the current size
            self.composed.pixels.fill(0);
        } else {
            compose(video, overlay, &mut self.composed);
        }
        draw_text_5x7(&mut self.composed, HUD_MARGIN, HUD_MARGIN, indicator, HUD_COLOR, HUD_DOT);
        self.window
            .update_with_buffer(&self.composed.pixels, self.composed.width, self.composed.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }
}

fn key_name(key: Key) -> Option<KeyName> {
    match key {
        Key::Up => Some(KeyName::ArrowUp),
        Key::Down => Some(KeyName::ArrowDown),
        Key::W => Some(KeyName::W),
        Key::S => Some(KeyName::S),
        Key::K => Some(KeyName::K),
        Key::J => Some(KeyName::J),
        Key::F => Some(KeyName::F),
        _ => None,
    }
}

/* ---------- Compositing ---------- */

/// Alpha-blend `overlay` over `video` into `out` (0x00RRGGBB).
/// Overlay pixels outside the video are ignored.
pub fn compose(video: &FrameBuffer, overlay: &OverlaySurface, out: &mut FrameBuffer) {
    out.ensure_size(video.width, video.height);
    out.pixels.copy_from_slice(&video.pixels);

    let w = video.width.min(overlay.width() as usize);
    let h = video.height.min(overlay.height() as usize);
    for y in 0..h {
        for x in 0..w {
            let o = overlay.pixel(x as u32, y as u32);
            let a = o[3] as u32;
            if a == 0 { continue; }
            let idx = y * video.width + x;
            if a == 255 {
                out.pixels[idx] = ((o[0] as u32) << 16) | ((o[1] as u32) << 8) | o[2] as u32;
                continue;
            }
            let px = out.pixels[idx];
            let mix = |over: u8, under: u32| (over as u32 * a + under * (255 - a)) / 255;
            let r = mix(o[0], (px >> 16) & 0xFF);
            let g = mix(o[1], (px >> 8) & 0xFF);
            let b = mix(o[2], px & 0xFF);
            out.pixels[idx] = (r << 16) | (g << 8) | b;
        }
    }
}

/* ---------- Software drawing: pixels + tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
/// Visual: the exact pixel at (x,y) changes color.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i64, y: i64, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Return a 5x7 glyph bitmap. Letters are upper-case only; lower-case maps up.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // Letters A..Z (detector labels are words like "person", "cell phone")
        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        // Punctuation: space, vertical bar, colon, dot, dash, underscore
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '_' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b11111),

        _ => None,
    }
}

/// Walk the lit dots of `text` starting at (x,y); each font dot becomes a
/// `dot × dot` square handed to `plot` pixel by pixel. Unknown characters
/// leave a blank cell.
pub fn draw_glyphs(text: &str, x: i64, y: i64, dot: i64, mut plot: impl FnMut(i64, i64)) {
    let dot = dot.max(1);
    let mut pen_x = x;
    for ch in text.chars() {
        if let Some(rows) = glyph5x7(ch) {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) == 0 {
                        continue;
                    }
                    let px = pen_x + rx as i64 * dot;
                    let py = y + ry as i64 * dot;
                    for dy in 0..dot {
                        for dx in 0..dot {
                            plot(px + dx, py + dy);
                        }
                    }
                }
            }
        }
        pen_x += 6 * dot; // 5 dots glyph width + 1 dot spacing
    }
}

/// Draw a text string using 5x7 glyphs.
/// Visual: a compact HUD string with a black drop shadow for contrast.
pub fn draw_text_5x7(fb: &mut FrameBuffer, x: i64, y: i64, text: &str, color: u32, dot: i64) {
    // Shadow pass: offset by one dot in black to improve readability
    draw_glyphs(text, x + dot, y + dot, dot, |px, py| put_pixel(fb, px, py, 0x0000_0000));
    // Foreground pass: actual glyphs in chosen color
    draw_glyphs(text, x, y, dot, |px, py| put_pixel(fb, px, py, color));
}
