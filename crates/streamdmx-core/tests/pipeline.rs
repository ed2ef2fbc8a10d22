use std::sync::Arc;
use std::time::{Duration, Instant};

use streamdmx_core::logging::NoopLogger;
use streamdmx_core::transport::loopback::LoopbackNetwork;
use streamdmx_core::{
    ReceiverConfig, SacnInput, SacnOutput, SacnPacket, SacnUniverseReceiver, SacnUniverseSender,
    SenderConfig, UniverseData,
};

fn ramp() -> Vec<u8> {
    (0..512).map(|i| (i % 256) as u8).collect()
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
fn encode_decode_preserves_levels_and_source_name() {
    let source = UniverseData::new();
    source.write_from(&ramp()).expect("ramp fits");

    let mut packet = SacnPacket::new(5).expect("valid universe");
    packet.set_source_name("Test").expect("short name");
    packet.copy_universe_data_in(&source);
    let wire = packet.raw_bytes().to_vec();

    let mut decoded = SacnPacket::default();
    decoded.load(&wire).expect("full-size packet");
    decoded.validate().expect("valid packet");
    let sink = UniverseData::new();
    decoded.copy_universe_data_out(&sink);

    assert_eq!(decoded.universe(), 5);
    assert_eq!(decoded.source_name(), "Test");
    assert_eq!(sink.snapshot(), source.snapshot());
}

#[test]
fn sender_to_receiver_over_loopback() {
    let network = LoopbackNetwork::new();
    let mut receiver =
        SacnUniverseReceiver::new(5, ReceiverConfig::default(), Arc::new(NoopLogger))
            .expect("receiver");
    receiver
        .start_with(network.receiver())
        .expect("start receiver");

    let config = SenderConfig {
        source_name: "Test".to_string(),
        ..SenderConfig::default()
    };
    let mut sender = SacnUniverseSender::new(5, config, Arc::new(NoopLogger)).expect("sender");
    sender.dmx().write_from(&ramp()).expect("ramp fits");
    sender.start_with(network.sender()).expect("start sender");

    let expected = sender.dmx().snapshot();
    assert!(wait_until(|| receiver.dmx().snapshot() == expected));
    assert!(receiver.is_receiving());
    assert_eq!(receiver.current_source(), "Test");

    sender.dmx().write_fine_value(0.5, 100, 2).expect("fine value");
    assert!(wait_until(|| receiver.dmx().get(100).unwrap_or(0) == 127));
    assert_eq!(receiver.dmx().get(101).expect("in range"), 255);

    let source = receiver.source().expect("source recorded");
    assert_eq!(source.cid, sender.cid());
    assert_eq!(source.priority, 100);

    sender.stop();
    // Stream termination reaches the receiver before the sender thread exits.
    assert!(wait_until(|| !receiver.is_receiving()));
    receiver.stop();
}

#[test]
fn multi_universe_output_and_input() {
    let network = LoopbackNetwork::new();
    let mut input = SacnInput::new(ReceiverConfig::default(), Arc::new(NoopLogger)).expect("input");
    let one = input.add_universe(1).expect("register 1");
    let three = input.add_universe(3).expect("register 3");
    input.start_with(network.receiver()).expect("start input");

    let mut output =
        SacnOutput::new(SenderConfig::default(), Arc::new(NoopLogger)).expect("output");
    for universe in 1..=3 {
        let handle = output.add_universe(universe).expect("register output");
        handle.dmx().set(0, universe as u8 * 10).expect("channel 0");
    }
    output.start_with(network.sender()).expect("start output");

    assert!(wait_until(|| one.dmx().get(0).unwrap_or(0) == 10
        && three.dmx().get(0).unwrap_or(0) == 30));
    // Universe 2 is sent but nobody registered it.
    assert!(!input.has_universe(2));
    assert_eq!(input.universes(), vec![1, 3]);

    // Added while running: joined immediately.
    let two = input.add_universe(2).expect("register 2");
    assert!(wait_until(|| two.dmx().get(0).unwrap_or(0) == 20));

    output.stop();
    input.stop();
}
