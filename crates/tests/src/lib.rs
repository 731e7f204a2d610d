//! # Integration Tests
//!
//! Cross-crate and end-to-end tests against the mock simulator.
//!
//! Covers:
//! - input script -> control mapper behaviour
//! - session rebuilds, recording switches and both log files
//! - full drive runs through the CLI orchestrator (no CARLA required)

#[cfg(test)]
mod support {
    use std::path::{Path, PathBuf};

    use contracts::CockpitBlueprint;
    use session::SessionOptions;

    pub const DRIVER: &str = "Tester";

    /// Default blueprint with light traffic and a fast tick rate
    pub fn blueprint() -> CockpitBlueprint {
        let mut blueprint = CockpitBlueprint::default();
        blueprint.simulator.timeout_secs = 1.0;
        blueprint.traffic.vehicles = 3;
        blueprint.traffic.pedestrians = 2;
        blueprint.traffic.seed = Some(42);
        blueprint.controls.tick_hz = 200.0;
        blueprint
    }

    pub fn options(dir: &Path, record: bool) -> SessionOptions {
        SessionOptions {
            driver: DRIVER.to_string(),
            output_dir: dir.to_path_buf(),
            record,
            echo_collisions: false,
        }
    }

    /// Rows of a session log, header excluded
    pub fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.records().map(|r| r.unwrap()).collect()
    }

    /// Session directories under `root`, oldest first
    pub fn session_dirs(root: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_empty_config_is_complete() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            "",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(blueprint.world.towns[blueprint.world.start_town_index], "Town02");
        assert_eq!(blueprint.cameras.len(), 5);
        assert_eq!(blueprint.controls.tick_hz, 60.0);
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/cockpit.toml");
        let sample = config_loader::ConfigLoader::load_from_path(&path).unwrap();
        let defaults = contracts::CockpitBlueprint::default();
        assert_eq!(sample.cameras, defaults.cameras);
        assert_eq!(sample.world.towns, defaults.world.towns);
        assert_eq!(sample.world.weather_presets, defaults.world.weather_presets);
    }

    #[test]
    fn test_sample_drive_script_parses() {
        let path =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/drive_script.toml");
        let input = cockpit::ScriptedInput::from_path(&path).unwrap();
        assert_eq!(input.remaining_ticks(), 635);
    }
}

#[cfg(test)]
mod input_tests {
    use cockpit::{Action, ControlMapper, InputDevice, ScriptedInput, DEFAULT_DEADZONE};
    use contracts::Gear;

    fn mapped(script: &str) -> Vec<cockpit::TickInput> {
        let mut input = ScriptedInput::from_toml(script).unwrap();
        let mut mapper = ControlMapper::new(DEFAULT_DEADZONE);
        (0..input.remaining_ticks())
            .map(|_| mapper.map(&input.poll().unwrap()))
            .collect()
    }

    #[test]
    fn test_deadzone_scenarios() {
        let ticks = mapped(
            r#"
[[step]]
steer = 0.05

[[step]]
steer = 0.3

[[step]]
steer = -0.3
"#,
        );
        // below threshold -> exactly zero
        assert_eq!(ticks[0].control.steer, 0.0);
        // above threshold -> unchanged
        assert_eq!(ticks[1].control.steer, 0.3);
        assert_eq!(ticks[2].control.steer, -0.3);
        // pedals at rest (+1.0) -> zero after remap
        assert!(ticks.iter().all(|t| t.control.throttle == 0.0 && t.control.brake == 0.0));
    }

    #[test]
    fn test_reverse_toggle_parity() {
        let ticks = mapped(
            r#"
[[step]]
ticks = 3
press = ["reverse"]

[[step]]
press = ["reverse"]

[[step]]
press = ["reverse"]
"#,
        );
        let gears: Vec<Gear> = ticks
            .iter()
            .flat_map(|t| t.actions.iter())
            .filter_map(|a| match a {
                Action::GearChanged(gear) => Some(*gear),
                _ => None,
            })
            .collect();
        // a held button is one edge; three edges end in reverse
        assert_eq!(gears, vec![Gear::Reverse, Gear::Drive, Gear::Reverse]);
        assert!(ticks.last().unwrap().control.reverse);
    }
}

#[cfg(test)]
mod session_tests {
    use actor_factory::{MockCarlaClient, MockEvent, MockSensor};
    use chrono::NaiveTime;
    use cockpit::{HudComposer, HudStatus};
    use contracts::{Gear, Location, SensorKind, VehicleControl};
    use session::SessionManager;
    use telemetry::{COLLISION_LOG_FILE, DRIVE_LOG_FILE};

    use crate::support::{blueprint, options, read_rows, DRIVER};

    #[tokio::test]
    async fn test_reloads_never_overlap_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockCarlaClient::new();
        let mut manager = SessionManager::connect(mock.clone(), blueprint(), options(dir.path(), false))
            .await
            .unwrap();
        manager.load_session().await.unwrap();

        manager.advance_town().await.unwrap();
        manager.advance_town().await.unwrap();
        assert_eq!(manager.town_index(), 3);
        manager.shutdown().await;

        let leaked: Vec<usize> = mock
            .journal()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::MapLoaded { leaked, .. } => Some(leaked),
                _ => None,
            })
            .collect();
        assert_eq!(leaked, vec![0, 0, 0]);
        assert_eq!(mock.actor_count(), 0);

        // one directory and log pair per session
        let dirs: Vec<_> = manager.history().iter().map(|s| s.dir.clone()).collect();
        assert_eq!(dirs.len(), 3);
        assert!(dirs.iter().all(|d| d.join(DRIVE_LOG_FILE).is_file()));
        assert_ne!(dirs[0], dirs[1]);
    }

    #[tokio::test]
    async fn test_unrecorded_camera_still_displays() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockCarlaClient::new();
        let mut blueprint = blueprint();
        blueprint.cameras[1].record = false;
        let cameras = blueprint.cameras.clone();
        let hud = blueprint.hud.clone();
        let mut manager = SessionManager::connect(mock.clone(), blueprint, options(dir.path(), true))
            .await
            .unwrap();
        manager.load_session().await.unwrap();

        let session = manager.session().unwrap();
        let rear = session
            .registry()
            .sensors()
            .iter()
            .find(|s| s.sensor_id == "rear")
            .unwrap()
            .actor_id;
        let mut composer = HudComposer::new(&hud);
        for frame_id in 1..=3 {
            assert!(mock.emit_image(rear, MockSensor::generate_image(400, 300, frame_id)));
            let status = HudStatus {
                gear: Gear::Drive,
                speed_kmh: 0.0,
                driver: DRIVER,
            };
            let frame = composer.compose(session.slots(), &cameras, status);
            assert_eq!(frame.cameras_drawn, 1);
            assert!(frame.overlays.iter().any(|o| o.text == "Rear Camera"));
            // BGRA [frame, y, x, 255] -> RGB [x, y, frame] at the rear region origin
            assert_eq!(frame.canvas.pixel(800, 0), Some([0, 0, frame_id as u8]));
        }
        let session_dir = session.dir().to_path_buf();

        let summary = manager.shutdown().await.unwrap();
        assert!(!session_dir.join("camera_1.y4m").exists());
        assert!(session_dir.join("camera_0.y4m").is_file());
        let rear_report = &summary.capture.cameras[1];
        assert_eq!(rear_report.stats.frames_delivered, 3);
        assert!(rear_report.encoder.is_none());
    }

    #[tokio::test]
    async fn test_collision_row_literal_values() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockCarlaClient::new();
        let mut manager = SessionManager::connect(mock.clone(), blueprint(), options(dir.path(), false))
            .await
            .unwrap();
        manager.load_session().await.unwrap();

        let session = manager.session().unwrap();
        let ego = session.ego().unwrap();
        let sensor = session
            .registry()
            .sensors()
            .iter()
            .find(|s| s.kind == SensorKind::Collision)
            .unwrap()
            .actor_id;
        let session_dir = session.dir().to_path_buf();
        mock.set_actor_location(ego, Location::new(10.0, 5.0, 0.0));
        assert!(mock.emit_collision(sensor, "static.pole"));
        manager.shutdown().await;

        let rows = read_rows(&session_dir.join(COLLISION_LOG_FILE));
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], DRIVER);
        assert!(NaiveTime::parse_from_str(&row[1], "%H:%M:%S%.6f").is_ok());
        assert_eq!(&row[2], "static.pole");
        assert_eq!((&row[3], &row[4], &row[5]), ("10.0", "5.0", "0.0"));
    }

    #[tokio::test]
    async fn test_drive_log_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockCarlaClient::new();
        let mut manager = SessionManager::connect(mock.clone(), blueprint(), options(dir.path(), false))
            .await
            .unwrap();
        manager.load_session().await.unwrap();
        let session_dir = manager.session().unwrap().dir().to_path_buf();

        let controls = [
            VehicleControl {
                throttle: 0.5,
                brake: 0.25,
                ..Default::default()
            },
            VehicleControl {
                throttle: 0.333,
                ..Default::default()
            },
            VehicleControl::default(),
        ];
        let mut samples = Vec::new();
        for control in controls {
            samples.push(manager.tick(control).await.unwrap());
        }
        manager.shutdown().await;

        let rows = read_rows(&session_dir.join(DRIVE_LOG_FILE));
        assert_eq!(rows.len(), samples.len());
        for (row, sample) in rows.iter().zip(&samples) {
            assert_eq!(&row[0], DRIVER);
            let speed: f64 = row[2].parse().unwrap();
            let throttle: f64 = row[3].parse().unwrap();
            let brake: f64 = row[4].parse().unwrap();
            assert!((speed - sample.speed_kmh).abs() < 0.05);
            assert!((throttle - sample.control.throttle).abs() < 0.005);
            assert!((brake - sample.control.brake).abs() < 0.005);
        }
        // (0.5 - 0.25) * 20 m/s
        assert_eq!(&rows[0][2], "18.00");
        assert_eq!(&rows[0][4], "0.25");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::future::pending;
    use std::time::Duration;

    use actor_factory::{MockCarlaClient, MockConfig};
    use carla_cockpit::{Drive, DriveConfig, DriveError};
    use cockpit::{CockpitError, HeadlessDisplay, HeadlessHorn, ScriptedInput, SnapshotOptions};
    use session::SessionError;
    use telemetry::DRIVE_LOG_FILE;

    use crate::support::{blueprint, options, read_rows, session_dirs};

    const DRIVE_SCRIPT: &str = r#"
[[step]]
ticks = 10
throttle = 0.5

[[step]]
ticks = 2
throttle = 0.5
press = ["reverse"]

[[step]]
commands = ["advance_weather"]

[[step]]
press = ["horn"]

[[step]]
commands = ["advance_town"]

[[step]]
ticks = 5
throttle = 0.25
"#;

    fn drive(
        mock: &MockCarlaClient,
        script: &str,
        dir: &std::path::Path,
        max_ticks: Option<u64>,
    ) -> Drive<MockCarlaClient> {
        let config = DriveConfig {
            blueprint: blueprint(),
            options: options(dir, false),
            max_ticks,
        };
        Drive::new(
            config,
            mock.clone(),
            Box::new(ScriptedInput::from_toml(script).unwrap()),
            Box::new(HeadlessDisplay::new()),
            Box::new(HeadlessHorn::new()),
        )
    }

    fn camera_mock() -> MockCarlaClient {
        MockCarlaClient::with_config(MockConfig {
            camera_frequency_hz: Some(100.0),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_e2e_scripted_drive() {
        let dir = tempfile::tempdir().unwrap();
        let mock = camera_mock();

        let stats = drive(&mock, DRIVE_SCRIPT, dir.path(), None)
            .run(pending())
            .await
            .unwrap();

        assert_eq!(stats.ticks(), 20);
        assert_eq!(stats.drive_rows, 20);
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.town_changes, 1);
        assert_eq!(stats.weather_changes, 1);
        assert_eq!(stats.drive_metrics.gear_changes, 1);
        assert_eq!(stats.drive_metrics.horn_presses, 1);
        assert_eq!(stats.horns_sounded, 1);
        assert_eq!(stats.frames_presented, 20);
        assert_eq!(stats.leaked, 0);
        assert_eq!(stats.cameras.len(), 5);
        assert_eq!(mock.actor_count(), 0);
        assert_eq!(mock.current_map().as_deref(), Some("Town03"));

        let dirs = session_dirs(dir.path());
        assert_eq!(dirs.len(), 2);
        let first = read_rows(&dirs[0].join(DRIVE_LOG_FILE));
        let second = read_rows(&dirs[1].join(DRIVE_LOG_FILE));
        // the town change happens after its tick is logged
        assert_eq!(first.len(), 15);
        assert_eq!(second.len(), 5);
        assert_eq!(&first[0][2], "36.00");
        assert_eq!(&second[0][3], "0.25");
    }

    #[tokio::test]
    async fn test_e2e_max_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let mock = camera_mock();

        let stats = drive(&mock, DRIVE_SCRIPT, dir.path(), Some(4))
            .run(pending())
            .await
            .unwrap();

        assert_eq!(stats.ticks(), 4);
        assert_eq!(stats.sessions, 1);
        assert_eq!(mock.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_shutdown_signal_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let mock = camera_mock();
        let endless = "quit_at_end = false\n\n[[step]]\nticks = 1000000\nthrottle = 0.3\n";

        let stats = drive(&mock, endless, dir.path(), None)
            .run(tokio::time::sleep(Duration::from_millis(150)))
            .await
            .unwrap();

        assert!(stats.ticks() > 0);
        assert_eq!(stats.drive_rows, stats.ticks());
        assert_eq!(mock.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_hud_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = dir.path().join("hud");
        let mock = camera_mock();
        let config = DriveConfig {
            blueprint: blueprint(),
            options: options(&dir.path().join("out"), false),
            max_ticks: Some(10),
        };
        let display = HeadlessDisplay::new()
            .with_snapshots(SnapshotOptions {
                dir: snapshots.clone(),
                every: 5,
            })
            .unwrap();
        let input = ScriptedInput::from_toml("[[step]]\nticks = 100\n").unwrap();

        let stats = Drive::new(
            config,
            mock,
            Box::new(input),
            Box::new(display),
            Box::new(HeadlessHorn::new()),
        )
            .run(pending())
            .await
            .unwrap();

        assert_eq!(stats.frames_presented, 10);
        assert!(snapshots.join("hud_000005.png").is_file());
        assert!(snapshots.join("hud_000010.png").is_file());
    }

    #[tokio::test]
    async fn test_e2e_unreachable_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockCarlaClient::with_config(MockConfig {
            unreachable: true,
            ..Default::default()
        });

        let err = drive(&mock, DRIVE_SCRIPT, dir.path(), None)
            .run(pending())
            .await
            .unwrap_err();

        assert!(matches!(err, DriveError::Session(SessionError::Connectivity { .. })));
        assert!(err.is_fatal());
        assert!(session_dirs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_e2e_failed_town_change_releases_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockCarlaClient::with_config(MockConfig {
            maps: vec!["Town02".to_string()],
            ..Default::default()
        });

        let err = drive(&mock, DRIVE_SCRIPT, dir.path(), None)
            .run(pending())
            .await
            .unwrap_err();

        assert!(matches!(err, DriveError::Session(SessionError::MapLoad { .. })));
        assert!(!err.is_fatal());
        assert_eq!(mock.actor_count(), 0);
        // the first session's log was closed with every tick before the failure
        let dirs = session_dirs(dir.path());
        assert_eq!(dirs.len(), 1);
        assert_eq!(read_rows(&dirs[0].join(DRIVE_LOG_FILE)).len(), 15);
    }

    #[test]
    fn test_no_input_device_is_fatal() {
        let err = cockpit::open_input_device(None).err().unwrap();
        assert!(matches!(err, CockpitError::NoInputDevice));
        assert!(DriveError::from(err).is_fatal());
    }
}
