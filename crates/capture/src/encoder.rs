//! Per-camera video encoder
//!
//! Frames are written as YUV4MPEG2 (4:4:4) on a dedicated writer thread fed by
//! a bounded queue. The queue applies backpressure instead of dropping, so
//! every frame handed to the encoder is written exactly once.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use async_channel::{bounded, Receiver, Sender};
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use crate::decode::RgbFrame;
use crate::error::{CaptureError, Result};

/// Y4M stream writer
pub struct Y4mWriter<W: Write> {
    out: W,
    width: u32,
    height: u32,
    planes: Vec<u8>,
}

impl<W: Write> Y4mWriter<W> {
    /// Write the stream header and return the writer
    pub fn new(mut out: W, width: u32, height: u32, frame_rate: f64) -> std::io::Result<Self> {
        let (num, den) = frame_rate_ratio(frame_rate);
        writeln!(out, "YUV4MPEG2 W{width} H{height} F{num}:{den} Ip A1:1 C444")?;
        Ok(Self {
            out,
            width,
            height,
            planes: Vec::with_capacity(width as usize * height as usize * 3),
        })
    }

    /// Append one frame
    pub fn write_frame(&mut self, frame: &RgbFrame) -> std::io::Result<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "frame is {}x{}, stream is {}x{}",
                    frame.width, frame.height, self.width, self.height
                ),
            ));
        }

        rgb_to_yuv444_planar(&frame.data, &mut self.planes);
        self.out.write_all(b"FRAME\n")?;
        self.out.write_all(&self.planes)
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Express a frame rate as a reduced integer ratio (millihertz precision)
pub fn frame_rate_ratio(frame_rate: f64) -> (u64, u64) {
    let num = (frame_rate * 1000.0).round().max(1.0) as u64;
    let den = 1000;
    let g = gcd(num, den);
    (num / g, den / g)
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Packed RGB to planar BT.601 studio-range YUV 4:4:4
fn rgb_to_yuv444_planar(rgb: &[u8], planes: &mut Vec<u8>) {
    let pixels = rgb.len() / 3;
    planes.clear();
    planes.resize(pixels * 3, 0);
    let (y_plane, rest) = planes.split_at_mut(pixels);
    let (u_plane, v_plane) = rest.split_at_mut(pixels);

    for (i, px) in rgb.chunks_exact(3).enumerate() {
        let (r, g, b) = (px[0] as i32, px[1] as i32, px[2] as i32);
        y_plane[i] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8;
        u_plane[i] = (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128) as u8;
        v_plane[i] = (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128) as u8;
    }
}

/// Encoder totals reported on close
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub frames_written: u64,
    pub frames_failed: u64,
}

/// Handle to a running encoder thread
pub struct EncoderHandle {
    camera: String,
    path: PathBuf,
    tx: Sender<Arc<RgbFrame>>,
    worker: Option<JoinHandle<EncoderStats>>,
}

impl EncoderHandle {
    /// Create the output file, write the header and start the writer thread
    ///
    /// # Errors
    /// `EncoderOpen` if the file cannot be created.
    #[instrument(name = "encoder_open", skip(camera, path), fields(camera = %camera, path = %path.display()))]
    pub fn open(
        camera: &str,
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: f64,
        queue_capacity: usize,
    ) -> Result<Self> {
        let open_error = |source| CaptureError::EncoderOpen {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(open_error)?;
        let writer = Y4mWriter::new(BufWriter::new(file), width, height, frame_rate)
            .map_err(open_error)?;

        let (tx, rx) = bounded(queue_capacity.max(1));
        let worker_camera = camera.to_string();
        let worker = std::thread::Builder::new()
            .name(format!("encoder-{camera}"))
            .spawn(move || encoder_worker(writer, rx, worker_camera))
            .map_err(open_error)?;

        info!(width, height, frame_rate, "video encoder opened");
        Ok(Self {
            camera: camera.to_string(),
            path: path.to_path_buf(),
            tx,
            worker: Some(worker),
        })
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue sender, for use from sensor callbacks
    pub fn sender(&self) -> Sender<Arc<RgbFrame>> {
        self.tx.clone()
    }

    /// Queue a frame, blocking while the queue is full
    ///
    /// # Errors
    /// `EncoderClosed` once `finish` has been called.
    pub fn submit(&self, frame: Arc<RgbFrame>) -> Result<()> {
        self.tx
            .send_blocking(frame)
            .map_err(|_| CaptureError::EncoderClosed {
                camera: self.camera.clone(),
            })
    }

    /// Close the queue, drain it, flush the file and join the writer
    #[instrument(name = "encoder_finish", skip(self), fields(camera = %self.camera))]
    pub fn finish(mut self) -> EncoderStats {
        self.close_and_join()
    }

    fn close_and_join(&mut self) -> EncoderStats {
        self.tx.close();
        let Some(worker) = self.worker.take() else {
            return EncoderStats::default();
        };
        match worker.join() {
            Ok(stats) => {
                debug!(
                    camera = %self.camera,
                    frames_written = stats.frames_written,
                    "video encoder closed"
                );
                stats
            }
            Err(_) => {
                error!(camera = %self.camera, "encoder thread panicked");
                EncoderStats::default()
            }
        }
    }
}

impl Drop for EncoderHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.close_and_join();
        }
    }
}

fn encoder_worker(
    mut writer: Y4mWriter<BufWriter<File>>,
    rx: Receiver<Arc<RgbFrame>>,
    camera: String,
) -> EncoderStats {
    let mut stats = EncoderStats::default();

    while let Ok(frame) = rx.recv_blocking() {
        match writer.write_frame(&frame) {
            Ok(()) => {
                stats.frames_written += 1;
                counter!("carla_cockpit_frames_encoded_total", "camera" => camera.clone())
                    .increment(1);
            }
            Err(e) => {
                stats.frames_failed += 1;
                counter!("carla_cockpit_frames_encode_failed_total", "camera" => camera.clone())
                    .increment(1);
                warn!(camera = %camera, error = %e, "frame encode failed");
            }
        }
    }

    if let Err(e) = writer.flush() {
        error!(camera = %camera, error = %e, "flush failed on close");
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, rgb: [u8; 3]) -> Arc<RgbFrame> {
        Arc::new(RgbFrame {
            width,
            height,
            data: rgb.repeat((width * height) as usize),
        })
    }

    #[test]
    fn test_frame_rate_ratio() {
        assert_eq!(frame_rate_ratio(20.0), (20, 1));
        assert_eq!(frame_rate_ratio(29.97), (2997, 100));
    }

    #[test]
    fn test_y4m_header_and_frame_size() {
        let mut writer = Y4mWriter::new(Vec::new(), 4, 2, 20.0).unwrap();
        writer.write_frame(&frame(4, 2, [255, 255, 255])).unwrap();
        let bytes = writer.into_inner();

        let header = b"YUV4MPEG2 W4 H2 F20:1 Ip A1:1 C444\n";
        assert!(bytes.starts_with(header));
        assert_eq!(bytes.len(), header.len() + 6 + 4 * 2 * 3);
        // white maps to studio-range peak luma
        assert_eq!(bytes[header.len() + 6], 235);
    }

    #[test]
    fn test_y4m_rejects_wrong_dimensions() {
        let mut writer = Y4mWriter::new(Vec::new(), 4, 2, 20.0).unwrap();
        assert!(writer.write_frame(&frame(2, 2, [0, 0, 0])).is_err());
    }

    #[test]
    fn test_encoder_writes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera_0.y4m");
        let encoder = EncoderHandle::open("front", &path, 2, 2, 20.0, 1).unwrap();

        for _ in 0..10 {
            encoder.submit(frame(2, 2, [10, 20, 30])).unwrap();
        }
        let stats = encoder.finish();
        assert_eq!(stats.frames_written, 10);

        let bytes = std::fs::read(&path).unwrap();
        let frames = bytes.windows(6).filter(|w| w == b"FRAME\n").count();
        assert_eq!(frames, 10);
    }

    #[test]
    fn test_encoder_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("camera_0.y4m");
        let result = EncoderHandle::open("front", &path, 2, 2, 20.0, 4);
        assert!(matches!(result, Err(CaptureError::EncoderOpen { .. })));
    }

    #[test]
    fn test_submit_after_finish_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = EncoderHandle::open("rear", &dir.path().join("c.y4m"), 1, 1, 20.0, 2).unwrap();
        let sender = encoder.sender();
        encoder.finish();
        assert!(sender.send_blocking(frame(1, 1, [0, 0, 0])).is_err());
    }
}
