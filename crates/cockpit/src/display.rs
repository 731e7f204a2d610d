//! Display surfaces

use std::fs;
use std::path::PathBuf;

use metrics::counter;
use tracing::{debug, info, instrument};

use crate::error::{CockpitError, Result};
use crate::hud::HudFrame;

/// Presents composed HUD frames
pub trait DisplaySurface: Send {
    /// Show one frame
    fn present(&mut self, frame: &HudFrame) -> Result<()>;

    /// Frames presented so far
    fn frames_presented(&self) -> u64;
}

/// Snapshot settings for [`HeadlessDisplay`]
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub dir: PathBuf,
    /// Write every Nth presented frame
    pub every: u64,
}

/// Display without a window; optionally snapshots the canvas to PNG
pub struct HeadlessDisplay {
    presented: u64,
    snapshots: Option<SnapshotOptions>,
    snapshots_written: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            presented: 0,
            snapshots: None,
            snapshots_written: 0,
        }
    }

    /// Enable PNG snapshots; creates the directory
    pub fn with_snapshots(mut self, options: SnapshotOptions) -> Result<Self> {
        fs::create_dir_all(&options.dir)?;
        info!(dir = %options.dir.display(), every = options.every, "HUD snapshots enabled");
        self.snapshots = Some(SnapshotOptions {
            every: options.every.max(1),
            ..options
        });
        Ok(self)
    }

    pub fn snapshots_written(&self) -> u64 {
        self.snapshots_written
    }

    #[instrument(name = "hud_snapshot", skip(self, frame))]
    fn snapshot(&mut self, frame: &HudFrame, path: PathBuf) -> Result<()> {
        image::save_buffer(
            &path,
            frame.canvas.as_bytes(),
            frame.canvas.width(),
            frame.canvas.height(),
            image::ColorType::Rgb8,
        )
        .map_err(|source| CockpitError::Snapshot {
            path: path.clone(),
            source,
        })?;
        self.snapshots_written += 1;
        debug!(path = %path.display(), "HUD snapshot written");
        Ok(())
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn present(&mut self, frame: &HudFrame) -> Result<()> {
        self.presented += 1;
        counter!("carla_cockpit_frames_presented_total").increment(1);

        let due = self
            .snapshots
            .as_ref()
            .filter(|s| self.presented % s.every == 0)
            .map(|s| s.dir.join(format!("hud_{:06}.png", self.presented)));
        if let Some(path) = due {
            self.snapshot(frame, path)?;
        }
        Ok(())
    }

    fn frames_presented(&self) -> u64 {
        self.presented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hud::Canvas;

    fn frame() -> HudFrame {
        HudFrame {
            canvas: Canvas::new(4, 3),
            overlays: Vec::new(),
            cameras_drawn: 0,
        }
    }

    #[test]
    fn test_counts_presented_frames() {
        let mut display = HeadlessDisplay::new();
        for _ in 0..5 {
            display.present(&frame()).unwrap();
        }
        assert_eq!(display.frames_presented(), 5);
        assert_eq!(display.snapshots_written(), 0);
    }

    #[test]
    fn test_snapshot_every_n_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = HeadlessDisplay::new()
            .with_snapshots(SnapshotOptions {
                dir: dir.path().join("hud"),
                every: 2,
            })
            .unwrap();
        for _ in 0..5 {
            display.present(&frame()).unwrap();
        }
        assert_eq!(display.snapshots_written(), 2);
        let png = dir.path().join("hud").join("hud_000002.png");
        let decoded = image::open(png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }
}
