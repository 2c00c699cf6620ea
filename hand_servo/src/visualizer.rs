//! Software-rendered debug view using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────┬──────────────────┐
//! │                                          │  THUMB  ▐███░░░  │
//! │   camera-space view of the tracked hand  │  INDEX  ▐█████░  │
//! │   (skeleton, wrist → index MCP in blue,  │  MIDDLE ▐██░░░░  │
//! │    its midpoint in red)                  │  RING   ▐████░░  │
//! │                                          │  PINKY  ▐█░░░░░  │
//! ├──────────────────────────────────────────┴──────────────────┤
//! │  status line                                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each finger bar runs from the closed end of its interval (left) to the open
//! end (right).  The gold fill is the emitted angle; the white tick is the raw
//! mapped angle before smoothing.

use std::time::Duration;

use finger_pose::{AngleInterval, FingerIndex, LandmarkSnapshot, FINGER_COUNT};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::control::FrameReport;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:      usize = 960;
pub const WIN_H:      usize = 540;
const VIEW_W:         usize = 640;
const VIEW_H:         usize = 480;
const PANEL_X:        usize = VIEW_W + 16;
const BAR_X:          usize = PANEL_X + 56;
const BAR_W:          usize = WIN_W - BAR_X - 16;
const BAR_H:          usize = 14;
const BAR_PITCH:      usize = 40;
const STATUS_Y:       usize = VIEW_H + 8;
const BG_COLOR:       u32   = 0xFF101418;
const VIEW_BG:        u32   = 0xFF1C2430;
const BONE_COLOR:     u32   = 0xFF7FD4A0;
const JOINT_COLOR:    u32   = 0xFFEEEEEE;
const PALM_COLOR:     u32   = 0xFF3C78FF;  // wrist → index MCP
const MID_COLOR:      u32   = 0xFFFF3030;
const BAR_BG:         u32   = 0xFF2A3340;
const BAR_FILL:       u32   = 0xFFFFD700;
const RAW_TICK:       u32   = 0xFFFFFFFF;
const TEXT_COLOR:     u32   = 0xFFCCCCCC;
const DIM_TEXT:       u32   = 0xFF777777;

/// Drawing coordinates are clamped to this many pixels either side of zero.
const CLIP_PX:        i32   = 4096;

/// Knuckle line across the palm.
const KNUCKLES: [u8; 4] = [5, 9, 13, 17];

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
}

impl Visualizer {
    pub fn new() -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "hand_servo",
            WIN_W, WIN_H,
            WindowOptions { resize: false, ..WindowOptions::default() },
        )?;
        window.limit_update_rate(Some(Duration::from_millis(16)));

        Ok(Visualizer { window, canvas: Canvas::new() })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Esc or Q was pressed since the last update.
    pub fn wants_quit(&self) -> bool {
        self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Q, KeyRepeat::No)
    }

    pub fn render(&mut self, report: &FrameReport, intervals: &[AngleInterval; FINGER_COUNT]) {
        self.canvas.draw_frame(report, intervals);
        self.window.update_with_buffer(self.canvas.pixels(), WIN_W, WIN_H).ok();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// The window's framebuffer, drawn without touching the window.
pub struct Canvas {
    buf: Vec<u32>,
}

impl Default for Canvas {
    fn default() -> Self { Canvas::new() }
}

impl Canvas {
    pub fn new() -> Self { Canvas { buf: vec![BG_COLOR; WIN_W * WIN_H] } }

    /// ARGB pixels, row-major, `WIN_W` × `WIN_H`.
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn draw_frame(&mut self, report: &FrameReport, intervals: &[AngleInterval; FINGER_COUNT]) {
        self.buf.fill(BG_COLOR);

        // ── Camera view ───────────────────────────────────────────────────
        self.fill_rect(0, 0, VIEW_W, VIEW_H, VIEW_BG);
        if report.snapshot.is_empty() {
            self.draw_label("NO HAND", VIEW_W / 2 - 14, VIEW_H / 2, DIM_TEXT);
        } else {
            let sx = VIEW_W as f64 / report.width.max(1) as f64;
            let sy = VIEW_H as f64 / report.height.max(1) as f64;
            self.draw_hand(&report.snapshot, sx, sy);
        }

        // ── Finger bars ───────────────────────────────────────────────────
        for finger in FingerIndex::ALL {
            let i = finger.position();
            let y = 24 + i * BAR_PITCH;
            let raw = report.outcome.raw.map(|r| r[i]);
            self.draw_finger_bar(finger, y, &intervals[i], report.outcome.emitted[i], raw);
        }

        // ── Status ────────────────────────────────────────────────────────
        let status = format!("FRAME {}  D={:.1}  SENT {}", report.frame, report.outcome.d, report.line);
        self.draw_label(&status, 10, STATUS_Y + 8, TEXT_COLOR);
        self.draw_label("ESC/Q=QUIT", 10, WIN_H - 14, DIM_TEXT);
    }

    // ── Hand ──────────────────────────────────────────────────────────────

    fn draw_hand(&mut self, snap: &LandmarkSnapshot, sx: f64, sy: f64) {
        let scale = |(x, y): (i32, i32)| ((x as f64 * sx) as i32, (y as f64 * sy) as i32);
        let to_view = |id: u8| snap.get(id).map(|lm| scale(lm.position()));

        for finger in FingerIndex::ALL {
            for pair in finger.chain().windows(2) {
                if let (Some(a), Some(b)) = (to_view(pair[0]), to_view(pair[1])) {
                    self.draw_line(a, b, BONE_COLOR);
                }
            }
        }
        for pair in KNUCKLES.windows(2) {
            if let (Some(a), Some(b)) = (to_view(pair[0]), to_view(pair[1])) {
                self.draw_line(a, b, BONE_COLOR);
            }
        }

        for lm in snap.iter() {
            let (x, y) = scale(lm.position());
            self.fill_square(x, y, 2, JOINT_COLOR);
        }

        if let Some(seg) = finger_pose::reference_segment(snap) {
            self.draw_line(scale(seg.from), scale(seg.to), PALM_COLOR);
            let (mx, my) = scale(seg.midpoint());
            self.fill_square(mx, my, 3, MID_COLOR);
        }
    }

    // ── Angle bars ────────────────────────────────────────────────────────

    fn draw_finger_bar(
        &mut self,
        finger:   FingerIndex,
        y:        usize,
        interval: &AngleInterval,
        emitted:  f64,
        raw:      Option<f64>,
    ) {
        self.draw_label(finger.name(), PANEL_X, y + 4, TEXT_COLOR);
        self.fill_rect(BAR_X, y, BAR_W, BAR_H, BAR_BG);

        let fill = (bar_fraction(interval, emitted) * BAR_W as f64) as usize;
        self.fill_rect(BAR_X, y, fill, BAR_H, BAR_FILL);

        if let Some(raw) = raw {
            let tx = BAR_X + (bar_fraction(interval, raw) * (BAR_W - 1) as f64) as usize;
            self.fill_rect(tx, y.saturating_sub(3), 2, BAR_H + 6, RAW_TICK);
        }

        self.draw_label(&format!("{}", emitted.trunc() as i64), BAR_X, y + BAR_H + 4, DIM_TEXT);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(WIN_H) {
            for col in x..(x + w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < WIN_W && (y as usize) < WIN_H {
            self.buf[y as usize * WIN_W + x as usize] = color;
        }
    }

    fn fill_square(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        let (cx, cy) = clip((cx, cy));
        for y in cy - r..=cy + r {
            for x in cx - r..=cx + r {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Bresenham line.  Endpoints further than `CLIP_PX` off the canvas are
    /// pulled in to it.
    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: u32) {
        let ((x0, y0), (x1, y1)) = (clip(from), clip(to));
        let dx =  (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel(x, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// 3×5 bitmap text, 4px advance.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        for (n, ch) in text.chars().enumerate() {
            let cx = x + n * 4;
            if cx + 3 > WIN_W { break; }
            let glyph = glyph(ch);
            for row in 0..5 {
                for col in 0..3 {
                    if glyph & (1 << (14 - row * 3 - col)) != 0 {
                        self.set_pixel((cx + col) as i32, (y + row) as i32, color);
                    }
                }
            }
        }
    }
}

/// Clamp a point to within `CLIP_PX` of the canvas.
fn clip((x, y): (i32, i32)) -> (i32, i32) {
    (x.clamp(-CLIP_PX, CLIP_PX), y.clamp(-CLIP_PX, CLIP_PX))
}

/// Position of `v` along the bar, 0 at the closed end and 1 at the open end.
fn bar_fraction(interval: &AngleInterval, v: f64) -> f64 {
    let span = interval.high - interval.low;
    if span == 0.0 {
        return 0.5;
    }
    ((v - interval.low) / span).clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 font, five 3-bit rows packed top row first
// ────────────────────────────────────────────────────────────────────────────

fn glyph(c: char) -> u16 {
    match c.to_ascii_uppercase() {
        '0' => 0b111_101_101_101_111,
        '1' => 0b010_110_010_010_111,
        '2' => 0b111_001_111_100_111,
        '3' => 0b111_001_011_001_111,
        '4' => 0b101_101_111_001_001,
        '5' => 0b111_100_111_001_111,
        '6' => 0b111_100_111_101_111,
        '7' => 0b111_001_010_010_010,
        '8' => 0b111_101_111_101_111,
        '9' => 0b111_101_111_001_111,
        'A' => 0b010_101_111_101_101,
        'B' => 0b110_101_110_101_110,
        'C' => 0b011_100_100_100_011,
        'D' => 0b110_101_101_101_110,
        'E' => 0b111_100_110_100_111,
        'F' => 0b111_100_110_100_100,
        'G' => 0b011_100_101_101_011,
        'H' => 0b101_101_111_101_101,
        'I' => 0b111_010_010_010_111,
        'K' => 0b101_110_100_110_101,
        'L' => 0b100_100_100_100_111,
        'M' => 0b101_111_111_101_101,
        'N' => 0b110_101_101_101_101,
        'O' => 0b010_101_101_101_010,
        'P' => 0b110_101_110_100_100,
        'Q' => 0b010_101_101_110_011,
        'R' => 0b110_101_110_101_101,
        'S' => 0b011_100_010_001_110,
        'T' => 0b111_010_010_010_010,
        'U' => 0b101_101_101_101_111,
        'X' => 0b101_101_010_101_101,
        'Y' => 0b101_101_010_010_010,
        '/' => 0b001_001_010_100_100,
        '-' => 0b000_000_111_000_000,
        '.' => 0b000_000_000_000_010,
        '=' => 0b000_111_000_111_000,
        ' ' => 0,
        _   => 0b000_000_010_000_000,
    }
}
