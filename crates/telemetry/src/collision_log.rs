//! Collision log
//!
//! Collision events arrive on the simulator's callback threads. They are
//! turned into records in the callback (so the ego location is the one at
//! impact time) and appended in arrival order by a single writer thread.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use async_channel::{unbounded, Receiver, Sender};
use chrono::Local;
use contracts::{
    CollisionEvent, CollisionRecord, SensorDataCallback, SensorPacket, SensorPayload,
    LOG_TIMESTAMP_FORMAT,
};
use csv::Writer;
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, TelemetryError};

/// File name inside the session directory
pub const COLLISION_LOG_FILE: &str = "collision_log.csv";

/// Header row
pub const COLLISION_LOG_HEADER: [&str; 6] = [
    "Driver",
    "Timestamp",
    "Other Actor",
    "Location X",
    "Location Y",
    "Location Z",
];

/// Collision counters shared by the handles and the writer
#[derive(Debug, Default)]
pub struct CollisionStats {
    logged: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl CollisionStats {
    /// Rows written
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }

    /// Events discarded (no ego alive, no location, writer closed)
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Rows that failed to write
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        counter!("carla_cockpit_collisions_dropped_total").increment(1);
    }
}

/// Owner of the collision log file and its writer thread
pub struct CollisionLogger {
    path: PathBuf,
    handle: CollisionLogHandle,
    worker: Option<JoinHandle<()>>,
}

impl CollisionLogger {
    /// Create the file, write the header and start the writer thread
    ///
    /// `ego_alive` is cleared by the session before the ego is destroyed;
    /// events arriving after that are dropped.
    #[instrument(name = "collision_log_open", skip(path, ego_alive), fields(path = %path.display()))]
    pub fn open(path: &Path, driver: &str, ego_alive: Arc<AtomicBool>) -> Result<Self> {
        let mut writer = Writer::from_path(path).map_err(|source| TelemetryError::LogOpen {
            path: path.to_path_buf(),
            source,
        })?;
        writer
            .write_record(COLLISION_LOG_HEADER)
            .map_err(|e| TelemetryError::write("collision", e))?;
        writer.flush()?;

        let (tx, rx) = unbounded();
        let stats = Arc::new(CollisionStats::default());
        let worker_stats = stats.clone();
        let worker = std::thread::Builder::new()
            .name("collision-log".to_string())
            .spawn(move || collision_writer(writer, rx, worker_stats))?;

        Ok(Self {
            path: path.to_path_buf(),
            handle: CollisionLogHandle {
                driver: Arc::from(driver),
                tx,
                ego_alive,
                stats,
                echo: false,
            },
            worker: Some(worker),
        })
    }

    /// Clonable handle for callbacks
    pub fn handle(&self) -> CollisionLogHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> Arc<CollisionStats> {
        self.handle.stats.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the queue, drain it and join the writer; returns rows written
    #[instrument(name = "collision_log_close", skip(self), fields(path = %self.path.display()))]
    pub fn close(mut self) -> u64 {
        self.close_and_join();
        self.handle.stats.logged()
    }

    fn close_and_join(&mut self) {
        self.handle.tx.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("collision log writer panicked");
            }
        }
    }
}

impl Drop for CollisionLogger {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

/// Producer side of the collision log
#[derive(Clone)]
pub struct CollisionLogHandle {
    driver: Arc<str>,
    tx: Sender<CollisionRecord>,
    ego_alive: Arc<AtomicBool>,
    stats: Arc<CollisionStats>,
    echo: bool,
}

impl CollisionLogHandle {
    /// Also print each collision on stdout
    pub fn with_console_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Queue a record for the writer. Returns `false` if the log is closed.
    pub fn log_collision(&self, record: CollisionRecord) -> bool {
        if self.tx.try_send(record).is_err() {
            self.stats.inc_dropped();
            return false;
        }
        true
    }

    /// Turn a collision event into a record stamped now and queue it
    ///
    /// The event is dropped when no controlled vehicle is alive or its
    /// location could not be sampled.
    pub fn on_event(&self, event: &CollisionEvent) -> bool {
        if !self.ego_alive.load(Ordering::Acquire) {
            debug!(other = %event.other_actor_type_id, "collision without live ego dropped");
            self.stats.inc_dropped();
            return false;
        }
        let Some(location) = event.ego_location else {
            warn!(other = %event.other_actor_type_id, "collision without ego location dropped");
            self.stats.inc_dropped();
            return false;
        };

        info!(
            other = %event.other_actor_type_id,
            x = location.x,
            y = location.y,
            z = location.z,
            "collision"
        );
        if self.echo {
            println!(
                "[COLLISION] with {} at ({:.2}, {:.2}, {:.2})",
                event.other_actor_type_id, location.x, location.y, location.z
            );
        }

        self.log_collision(CollisionRecord {
            driver: self.driver.to_string(),
            timestamp: Local::now(),
            other_actor: event.other_actor_type_id.clone(),
            location,
        })
    }

    /// Sensor callback feeding this log
    pub fn callback(&self) -> SensorDataCallback {
        let handle = self.clone();
        Arc::new(move |packet: SensorPacket| {
            if let SensorPayload::Collision(event) = &packet.payload {
                handle.on_event(event);
            }
        })
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }
}

fn collision_writer(
    mut writer: Writer<File>,
    rx: Receiver<CollisionRecord>,
    stats: Arc<CollisionStats>,
) {
    while let Ok(record) = rx.recv_blocking() {
        let row = [
            record.driver,
            record.timestamp.format(LOG_TIMESTAMP_FORMAT).to_string(),
            record.other_actor,
            format!("{:?}", record.location.x),
            format!("{:?}", record.location.y),
            format!("{:?}", record.location.z),
        ];
        let written = writer
            .write_record(&row)
            .map_err(|e| TelemetryError::write("collision", e))
            .and_then(|()| writer.flush().map_err(TelemetryError::from));

        match written {
            Ok(()) => {
                stats.logged.fetch_add(1, Ordering::Relaxed);
                counter!("carla_cockpit_collisions_logged_total").increment(1);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "collision row write failed");
            }
        }
    }
    debug!(rows = stats.logged(), "collision writer stopped");
}
