use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use streamdmx_core::transport::loopback::LoopbackNetwork;
use streamdmx_core::{
    LogLevel, Logger, NoopLogger, ReceiverConfig, SacnPacket, SacnUniverseReceiver,
    SacnUniverseSender, SenderConfig,
};

#[derive(Default)]
struct Collect(Mutex<Vec<(LogLevel, String)>>);

impl Collect {
    fn count(&self, level: LogLevel) -> usize {
        self.0
            .lock()
            .expect("log lock")
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl Logger for Collect {
    fn log(&self, level: LogLevel, message: &str) {
        self.0
            .lock()
            .expect("log lock")
            .push((level, message.to_string()));
    }
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn sender_survives_failing_transport() {
    let network = LoopbackNetwork::new();
    let mut receiver =
        SacnUniverseReceiver::new(2, ReceiverConfig::default(), Arc::new(NoopLogger))
            .expect("receiver");
    receiver
        .start_with(network.receiver())
        .expect("start receiver");

    let logs = Arc::new(Collect::default());
    let tx = Arc::new(network.sender());
    tx.set_failing(true);
    let mut sender =
        SacnUniverseSender::new(2, SenderConfig::default(), logs.clone()).expect("sender");
    sender.dmx().set(7, 70).expect("channel 7");
    sender.start_with(Arc::clone(&tx)).expect("start sender");

    std::thread::sleep(Duration::from_millis(50));
    assert!(sender.is_running());
    assert_eq!(tx.sent(), 0);
    // One warning per outage, not one per tick.
    assert_eq!(logs.count(LogLevel::Warning), 1);

    tx.set_failing(false);
    assert!(wait_until(|| receiver.dmx().get(7).unwrap_or(0) == 70));
    assert!(wait_until(|| logs.count(LogLevel::Info) >= 2));

    sender.stop();
    receiver.stop();
}

#[test]
fn unchanged_universe_keeps_alive_at_refresh_rate() {
    let network = LoopbackNetwork::new();
    let tx = Arc::new(network.sender());
    let config = SenderConfig {
        unchanged_refresh_rate: 20,
        terminate_on_stop: false,
        ..SenderConfig::default()
    };
    let mut sender = SacnUniverseSender::new(1, config, Arc::new(NoopLogger)).expect("sender");
    sender.start_with(Arc::clone(&tx)).expect("start sender");
    std::thread::sleep(Duration::from_millis(500));
    sender.stop();

    // 50 ms keep-alive over 500 ms: about ten packets, never one per tick.
    let sent = tx.sent();
    assert!((5..=12).contains(&sent), "sent {sent} packets");
}

#[test]
fn receiver_drops_malformed_datagrams() {
    let network = LoopbackNetwork::new();
    let logs = Arc::new(Collect::default());
    let mut receiver =
        SacnUniverseReceiver::new(9, ReceiverConfig::default(), logs.clone()).expect("receiver");
    receiver
        .start_with(network.receiver())
        .expect("start receiver");

    let mut packet = SacnPacket::new(9).expect("packet");
    packet.set_dmx(0, 99).expect("channel 0");
    let mut corrupt = packet.raw_bytes().to_vec();
    corrupt[117] = 0x03;
    network.inject(&corrupt, 9);
    network.inject(&[0u8; 40], 9);

    assert!(wait_until(|| logs.count(LogLevel::Warning) == 2));
    assert!(!receiver.is_receiving());
    assert_eq!(receiver.dmx().get(0).expect("channel 0"), 0);

    network.inject(packet.raw_bytes(), 9);
    assert!(wait_until(|| receiver.is_receiving()));
    assert_eq!(receiver.dmx().get(0).expect("channel 0"), 99);
    receiver.stop();
}

#[test]
fn start_is_idempotent_and_restartable() {
    let network = LoopbackNetwork::new();
    let tx = Arc::new(network.sender());
    let mut sender =
        SacnUniverseSender::new(4, SenderConfig::default(), Arc::new(NoopLogger)).expect("sender");

    sender.start_with(Arc::clone(&tx)).expect("first start");
    sender.start_with(Arc::clone(&tx)).expect("second start is a no-op");
    assert!(sender.is_running());
    sender.stop();
    sender.stop();
    assert!(!sender.is_running());

    let before = tx.sent();
    sender.start_with(Arc::clone(&tx)).expect("restart");
    assert!(wait_until(|| tx.sent() > before));
    sender.stop();
}
