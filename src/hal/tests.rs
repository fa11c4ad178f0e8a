// src/hal/tests.rs
//! Unit tests for HAL components

use crate::config::EngineConfig;
use crate::error::BoardError;
use crate::hal::*;
use std::time::Duration;

#[test]
fn test_board_id_lookup() {
    assert_eq!(BoardId::from_id(-1).unwrap(), BoardId::Synthetic);
    assert_eq!(BoardId::try_from(0).unwrap(), BoardId::Cyton);

    match BoardId::from_id(42) {
        Err(BoardError::UnsupportedBoard { board_id }) => assert_eq!(board_id, 42),
        other => panic!("expected unsupported board, got {other:?}"),
    }
}

#[test]
fn test_descriptor_table() {
    let synthetic = BoardId::Synthetic.descriptor();
    assert_eq!(synthetic.board_id, -1);
    assert_eq!(synthetic.sample_rate_hz, 250);
    assert_eq!(synthetic.num_channels, 8);
    assert_eq!(synthetic.package_length, SyntheticDecoder::frame_length(8));

    let cyton = BoardId::Cyton.descriptor();
    assert_eq!(cyton.board_id, 0);
    assert_eq!(cyton.sample_rate_hz, 250);
    assert_eq!(cyton.num_channels, 12);
    assert_eq!(cyton.package_length, 33);

    for board in BoardId::ALL {
        assert_eq!(board.descriptor().board, board);
        assert_eq!(board.descriptor().board_id, board.id());
    }
}

#[test]
fn test_samples_for_retention() {
    let descriptor = BoardId::Synthetic.descriptor();
    assert_eq!(descriptor.samples_for(3600), 900_000);
    assert_eq!(descriptor.samples_for(0), 0);
}

#[test]
fn test_raw_frame_accessors() {
    let frame = RawFrame::new(vec![1, 2, 3], 9.5);
    assert_eq!(frame.len(), 3);
    assert!(!frame.is_empty());
    assert_eq!(frame.bytes(), &[1, 2, 3]);
    assert_eq!(frame.captured_at(), 9.5);
    assert!(RawFrame::new(Vec::new(), 0.0).is_empty());
}

#[test]
fn test_default_factory_matches_board() {
    let config = EngineConfig::default();
    for board in BoardId::ALL {
        let transport = DefaultTransportFactory.create(board, &config);
        assert_eq!(transport.descriptor().board, board);
    }
}

#[test]
fn test_closure_factory() {
    let factory = |_board: BoardId, config: &EngineConfig| -> Box<dyn DeviceTransport> {
        Box::new(SyntheticTransport::new(config.synthetic.clone()))
    };
    let mut transport = factory.create(BoardId::Cyton, &EngineConfig::default());
    assert_eq!(transport.descriptor().board, BoardId::Synthetic);

    transport.open("").unwrap();
    transport.start().unwrap();
    let frame = transport.read_frame(Duration::from_secs(1)).unwrap();
    let sample = decoder_for(BoardId::Synthetic).decode(&frame).unwrap();
    assert_eq!(sample.width(), 8);
}

#[test]
fn test_transient_transport_errors() {
    assert!(TransportError::Timeout { timeout_ms: 1 }.is_transient());
    assert!(TransportError::Io(std::io::Error::other("glitch")).is_transient());
    assert!(!TransportError::NotOpen.is_transient());
    assert!(!TransportError::Connection {
        connection: "x".into(),
        reason: "y".into()
    }
    .is_transient());
}
