//! Frame Polling
//!
//! Drains controller alerts and the RX queue once per host tick. All reads
//! are zero-wait, and one tick never takes more frames than the configured
//! queue depth, so a busy bus cannot stall the host scheduler.

use crate::clock::Clock;
use crate::stats::RuntimeStats;
use metrics::counter;
use ring_buffer::{CapturedFrame, FrameRingBuffer};
use tracing::{debug, trace};
use twai_driver::{clamp_queue_len, Alerts, RxMessage, TwaiDriver, TwaiHal};

/// What one tick observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Alerts read at the start of the tick
    pub alerts: Alerts,
    /// Frames moved into the ring buffer
    pub received: usize,
}

/// Convert a controller message into a stored frame
pub fn capture(msg: &RxMessage, timestamp_ms: u64) -> CapturedFrame {
    CapturedFrame::new(
        msg.identifier,
        msg.data_length_code,
        &msg.data,
        msg.extd,
        msg.rtr,
        timestamp_ms,
    )
}

/// Count error alerts into `stats`
pub fn record_alerts(alerts: Alerts, stats: &mut RuntimeStats) {
    if alerts.contains(Alerts::ERR_PASS) {
        stats.record_bus_error();
        counter!("can_bus_errors_total").increment(1);
    }
    if alerts.contains(Alerts::BUS_ERROR) {
        stats.record_bus_error();
        counter!("can_bus_errors_total").increment(1);
    }
    if alerts.contains(Alerts::RX_QUEUE_FULL) {
        stats.record_queue_overrun();
        counter!("can_queue_overruns_total").increment(1);
    }
}

/// Run one polling pass. Does nothing unless the driver is running.
pub fn poll_once<H, C, const N: usize>(
    driver: &mut TwaiDriver<H>,
    ring: &mut FrameRingBuffer<N>,
    stats: &mut RuntimeStats,
    clock: &C,
) -> PollSummary
where
    H: TwaiHal,
    C: Clock,
{
    let Some(config) = driver.active_config() else {
        return PollSummary::default();
    };
    let budget = clamp_queue_len(config.rx_queue_len) as usize;

    let alerts = driver.read_alerts();
    if !alerts.is_empty() {
        debug!("CAN: alerts 0x{:08X}", alerts.0);
        record_alerts(alerts, stats);
    }

    let ring_overruns = ring.overruns();
    let mut received = 0;
    while received < budget {
        let Some(msg) = driver.receive() else {
            break;
        };
        let now = clock.now_ms();
        stats.record_frame(now);
        ring.push(capture(&msg, now));
        received += 1;
        trace!("CAN: rx id=0x{:X} dlc={}", msg.identifier, msg.data_length_code);
    }

    if received > 0 {
        counter!("can_rx_frames_total").increment(received as u64);
        let dropped = ring.overruns() - ring_overruns;
        if dropped > 0 {
            counter!("can_buffer_overruns_total").increment(dropped as u64);
        }
    }

    PollSummary { alerts, received }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use twai_driver::{BusConfig, MockTwai};

    fn running(rx_queue_len: u16) -> (MockTwai, TwaiDriver<MockTwai>) {
        let mock = MockTwai::new();
        let mut driver = TwaiDriver::new(mock.clone());
        driver
            .start(&BusConfig {
                rx_pin: 4,
                tx_pin: 5,
                bitrate: 500_000,
                listen_only: true,
                rx_queue_len,
                filter_enabled: false,
                filter_ext: false,
                filter_id: 0,
                filter_mask: 0x7FF,
            })
            .unwrap();
        (mock, driver)
    }

    #[test]
    fn test_drains_queue_and_stamps_time() {
        let (mock, mut driver) = running(128);
        let clock = ManualClock::new(5_000);
        let mut ring: FrameRingBuffer = FrameRingBuffer::new();
        let mut stats = RuntimeStats::default();

        mock.inject(RxMessage::data_frame(0x100, false, &[1, 2, 3]));
        mock.inject(RxMessage::remote_frame(0x1ABCDE, true, 4));

        let summary = poll_once(&mut driver, &mut ring, &mut stats, &clock);

        assert_eq!(summary.received, 2);
        assert!(summary.alerts.contains(Alerts::RX_DATA));
        assert_eq!(stats.rx_frames, 2);
        assert_eq!(stats.last_frame_ms, Some(5_000));
        assert_eq!(mock.pending(), 0);

        let frames = ring.snapshot(10);
        assert_eq!(frames[0].payload(), &[1, 2, 3]);
        assert!(frames[1].rtr && frames[1].extended);
        assert!(frames[1].payload().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_error_alerts_counted_separately() {
        let (mock, mut driver) = running(8);
        let clock = ManualClock::new(0);
        let mut ring: FrameRingBuffer = FrameRingBuffer::new();
        let mut stats = RuntimeStats::default();

        mock.raise(Alerts::ERR_PASS | Alerts::BUS_ERROR);
        for i in 0..9 {
            mock.inject(RxMessage::data_frame(i, false, &[]));
        }

        let summary = poll_once(&mut driver, &mut ring, &mut stats, &clock);

        assert_eq!(stats.bus_errors, 2);
        assert_eq!(stats.queue_overruns, 1);
        assert_eq!(ring.overruns(), 0);
        assert_eq!(summary.received, 8);
    }

    #[test]
    fn test_work_per_tick_is_bounded() {
        let (mock, mut driver) = running(8);
        let clock = ManualClock::new(0);
        let mut ring: FrameRingBuffer = FrameRingBuffer::new();
        let mut stats = RuntimeStats::default();

        for i in 0..8 {
            mock.inject(RxMessage::data_frame(i, false, &[]));
        }
        let first = poll_once(&mut driver, &mut ring, &mut stats, &clock);
        let second = poll_once(&mut driver, &mut ring, &mut stats, &clock);

        assert_eq!(first.received, 8);
        assert_eq!(second.received, 0);
        assert!(second.alerts.is_empty());
    }

    #[test]
    fn test_idle_when_stopped() {
        let mock = MockTwai::new();
        let mut driver = TwaiDriver::new(mock.clone());
        let clock = ManualClock::new(0);
        let mut ring: FrameRingBuffer = FrameRingBuffer::new();
        let mut stats = RuntimeStats::default();

        let summary = poll_once(&mut driver, &mut ring, &mut stats, &clock);

        assert_eq!(summary, PollSummary::default());
        assert!(mock.calls().is_empty());
    }
}
