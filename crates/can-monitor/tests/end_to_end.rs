//! Boot, capture and reconfiguration against the simulated controller

use can_monitor::{CanMonitor, HostModule, ManualClock, Outcome, Settings, RECENT_FRAMES};
use serde_json::{json, Map, Value};
use twai_driver::mock::HalCall;
use twai_driver::{Alerts, DriverError, ErrorCode, MockTwai, RxMessage};

fn boot(settings: Settings) -> (MockTwai, ManualClock, CanMonitor<MockTwai, ManualClock>) {
    let mock = MockTwai::new();
    let clock = ManualClock::new(0);
    let mut module = CanMonitor::with_settings(mock.clone(), clock.clone(), settings);
    module.setup();
    (mock, clock, module)
}

fn enabled() -> Settings {
    Settings {
        enabled: true,
        ..Default::default()
    }
}

#[test]
fn test_disabled_at_boot_touches_no_hardware() {
    let (mock, _clock, mut module) = boot(Settings::default());

    for _ in 0..5 {
        module.tick();
    }

    assert_eq!(module.status().status.label(), "Disabled");
    assert!(mock.calls().is_empty());
}

#[test]
fn test_invalid_pin_at_boot() {
    let (mock, _clock, module) = boot(Settings {
        rx_pin: -1,
        ..enabled()
    });

    assert_eq!(module.status().status.label(), "Error - Failed to start");
    assert!(!module.settings().enabled);
    assert!(mock.calls().is_empty());
}

#[test]
fn test_forty_frames_into_empty_buffer() {
    let (mock, clock, mut module) = boot(enabled());

    for i in 0..40u32 {
        clock.advance(10);
        mock.inject(RxMessage::data_frame(0x100 + i, false, &i.to_be_bytes()));
        module.tick();
    }

    assert_eq!(module.stats().rx_frames, 40);
    assert_eq!(module.recent_frames(usize::MAX).len(), 32);
    assert_eq!(module.buffer_overruns(), 8);
    assert_eq!(module.stats().queue_overruns, 0);

    let recent = module.recent_frames(RECENT_FRAMES);
    let ids: Vec<u32> = recent.iter().map(|f| f.id).collect();
    assert_eq!(ids, (0x100 + 20..0x100 + 40).collect::<Vec<_>>());
    assert!(recent.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));

    let state = module.state(false);
    assert_eq!(state.overruns, 8);
    assert_eq!(state.recent_frames.map(|f| f.len()), Some(RECENT_FRAMES));
}

#[test]
fn test_error_storm_keeps_polling() {
    let (mock, _clock, mut module) = boot(Settings {
        rx_queue_len: 8,
        ..enabled()
    });

    for _ in 0..50 {
        mock.raise(Alerts::ERR_PASS | Alerts::BUS_ERROR);
        for id in 0..12 {
            mock.inject(RxMessage::data_frame(id, false, &[]));
        }
        module.tick();
    }

    assert!(module.is_running());
    assert_eq!(module.stats().bus_errors, 100);
    assert_eq!(module.stats().queue_overruns, 50);
    assert_eq!(module.stats().rx_frames, 400);

    let status = module.status();
    assert_eq!(status.bus_errors, Some(100));
    assert_eq!(status.overruns, Some(50 + (400 - 32)));
}

#[test]
fn test_config_update_restarts_only_for_bus_fields() {
    let (mock, _clock, mut module) = boot(enabled());

    let mut doc = Map::new();
    module.add_to_config(&mut doc);
    doc["CAN_TWAI"]["uiEffect"] = json!(2);
    assert!(module.read_from_config(&Value::Object(doc.clone())));
    assert_eq!(mock.calls(), vec![HalCall::Install, HalCall::Start]);

    doc["CAN_TWAI"]["filterEnabled"] = json!(true);
    doc["CAN_TWAI"]["filterId"] = json!(0x7E8);
    assert!(module.read_from_config(&Value::Object(doc)));
    assert_eq!(mock.calls().len(), 6);

    // Filtered-out traffic never reaches the buffer
    mock.inject(RxMessage::data_frame(0x7E0, false, &[1]));
    mock.inject(RxMessage::data_frame(0x7E8, false, &[2]));
    module.tick();
    let frames = module.recent_frames(RECENT_FRAMES);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].id, 0x7E8);
}

#[test]
fn test_stats_survive_reconfiguration() {
    let (mock, _clock, mut module) = boot(enabled());
    mock.inject(RxMessage::data_frame(0x1, false, &[]));
    module.tick();

    let outcome = module.apply_settings(Settings {
        bitrate: 250_000,
        ..enabled()
    });

    assert_eq!(outcome, Outcome::Restarted);
    assert_eq!(module.stats().rx_frames, 1);
    assert_eq!(module.recent_frames(RECENT_FRAMES).len(), 1);
}

#[test]
fn test_failed_restart_while_running() {
    let (mock, _clock, mut module) = boot(enabled());
    mock.inject(RxMessage::data_frame(0x1, false, &[]));
    module.tick();

    mock.fail_start(Some(ErrorCode::InvalidState));
    let outcome = module.apply_settings(Settings {
        bitrate: 250_000,
        ..enabled()
    });

    assert_eq!(outcome, Outcome::StartFailed(DriverError::Start(ErrorCode::InvalidState)));
    assert!(!mock.is_installed());
    assert!(!module.is_running());
    assert!(!module.settings().enabled);
    assert_eq!(module.last_error(), Some(&DriverError::Start(ErrorCode::InvalidState)));
    assert_eq!(module.status().status.label(), "Error - Failed to start");
    assert_eq!(module.stats().rx_frames, 1);

    // Ticks with the controller down are harmless
    let calls = mock.calls().len();
    module.tick();
    assert_eq!(mock.calls().len(), calls);
}

#[test]
fn test_partial_config_reports_incomplete() {
    let (_mock, _clock, mut module) = boot(Settings::default());

    let complete = module.read_from_config(&json!({ "CAN_TWAI": { "enabled": true } }));

    assert!(!complete);
    assert!(module.is_running());
    assert_eq!(module.settings().bitrate, 500_000);
}
