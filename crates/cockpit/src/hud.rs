//! HUD composer
//!
//! Clears a fixed-size canvas, blits the latest frame of every camera slot at
//! its screen placement and lays out the text overlays. Empty slots are
//! skipped; nothing here waits for a camera.

use capture::{FrameSlots, RgbFrame};
use contracts::{CameraConfig, Gear, HudConfig};

/// Overlay colors
pub const WHITE: [u8; 3] = [255, 255, 255];
pub const YELLOW: [u8; 3] = [255, 255, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];

/// Packed RGB drawing surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    /// Black canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; RgbFrame::byte_len(width, height)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Copy `frame` with its top-left corner at (x, y), clipped to the canvas
    pub fn blit(&mut self, frame: &RgbFrame, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = frame.width.min(self.width - x) as usize;
        let rows = frame.height.min(self.height - y) as usize;
        let src_stride = frame.width as usize * 3;
        let dst_stride = self.width as usize * 3;

        for row in 0..rows {
            let src = row * src_stride;
            let dst = (y as usize + row) * dst_stride + x as usize * 3;
            self.data[dst..dst + cols * 3].copy_from_slice(&frame.data[src..src + cols * 3]);
        }
    }
}

/// Text drawn on top of the camera regions
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub x: u32,
    pub y: u32,
    pub color: [u8; 3],
}

impl TextOverlay {
    fn new(text: impl Into<String>, x: u32, y: u32, color: [u8; 3]) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            color,
        }
    }
}

/// Per-tick vehicle status shown on the HUD
#[derive(Debug, Clone, Copy)]
pub struct HudStatus<'a> {
    pub gear: Gear,
    pub speed_kmh: f64,
    pub driver: &'a str,
}

/// One composed display frame
#[derive(Debug, Clone)]
pub struct HudFrame {
    pub canvas: Canvas,
    pub overlays: Vec<TextOverlay>,
    /// Camera regions drawn this tick
    pub cameras_drawn: usize,
}

/// Builds a [`HudFrame`] every tick, reusing its canvas
pub struct HudComposer {
    frame: HudFrame,
}

impl HudComposer {
    pub fn new(config: &HudConfig) -> Self {
        Self {
            frame: HudFrame {
                canvas: Canvas::new(config.width, config.height),
                overlays: Vec::new(),
                cameras_drawn: 0,
            },
        }
    }

    /// Compose the display from the current slots
    ///
    /// Slot `i` belongs to `cameras[i]`. Speed and driver greeting travel with
    /// the primary (first) camera; the gear indicator is always drawn.
    pub fn compose(
        &mut self,
        slots: &FrameSlots,
        cameras: &[CameraConfig],
        status: HudStatus<'_>,
    ) -> &HudFrame {
        let frame = &mut self.frame;
        frame.canvas.clear();
        frame.overlays.clear();
        frame.cameras_drawn = 0;

        for (index, camera) in cameras.iter().enumerate() {
            let Some(image) = slots.latest(index) else {
                continue;
            };
            frame
                .canvas
                .blit(&image, camera.screen.x, camera.screen.y);
            frame.cameras_drawn += 1;

            if !camera.label.is_empty() {
                frame.overlays.push(TextOverlay::new(
                    camera.label.clone(),
                    camera.screen.label_x,
                    camera.screen.label_y,
                    YELLOW,
                ));
            }
            if index == 0 {
                frame.overlays.push(TextOverlay::new(
                    format!("Speed: {:.1} km/h", status.speed_kmh),
                    10,
                    40,
                    WHITE,
                ));
                frame.overlays.push(TextOverlay::new(
                    format!("Hi,Virtual Driver: {}", status.driver),
                    10,
                    80,
                    GREEN,
                ));
            }
        }

        frame
            .overlays
            .push(TextOverlay::new(format!("Gear: {}", status.gear), 10, 10, WHITE));
        &self.frame
    }

    /// Last composed frame
    pub fn frame(&self) -> &HudFrame {
        &self.frame
    }
}
