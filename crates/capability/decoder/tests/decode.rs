use domain::{DecodeError, FrameDecoder};
use iregul_decoder::{TextFrameDecoder, decode_text};

#[test]
fn decodes_header_and_groups() {
    let frame = decode_text("START;T=2024-01-01T00:00:00;G=2;A.1=20.5;A.2=on;B.7=3;END")
        .expect("decode");

    assert_eq!(
        frame.timestamp.map(|ts| ts.to_string()).as_deref(),
        Some("2024-01-01 00:00:00")
    );
    assert_eq!(frame.count, 2);
    assert!(!frame.is_old);
    assert_eq!(frame.groups.len(), 2);
    assert_eq!(frame.groups[0].name, "A");
    assert_eq!(frame.groups[0].get("2"), Some("on"));
    assert_eq!(frame.groups[1].get("7"), Some("3"));
}

#[test]
fn tolerates_unknown_segments() {
    let frame = TextFrameDecoder::new()
        .decode("START;T=2024-01-01T00:00:00;G=2;...")
        .expect("decode");
    assert_eq!(frame.count, 2);
    assert!(frame.groups.is_empty());
}

#[test]
fn count_defaults_to_decoded_groups() {
    let frame = decode_text("START;OLD=1;A.1=1;B.1=2;C.1=3").expect("decode");
    assert!(frame.is_old);
    assert!(frame.timestamp.is_none());
    assert_eq!(frame.count, 3);
}

#[test]
fn ignores_segments_after_end() {
    let frame = decode_text("START;A.1=1;END;B.1=2").expect("decode");
    assert_eq!(frame.groups.len(), 1);
}

#[test]
fn rejects_invalid_frames() {
    assert_eq!(decode_text("GARBAGE"), Err(DecodeError::MissingStart));
    assert_eq!(decode_text(""), Err(DecodeError::MissingStart));
    assert_eq!(decode_text("START;G=1"), Err(DecodeError::Empty));
    assert_eq!(
        decode_text("START;T=yesterday"),
        Err(DecodeError::InvalidTimestamp("yesterday".to_string()))
    );
    assert_eq!(
        decode_text("START;G=two;A.1=1"),
        Err(DecodeError::InvalidCount("two".to_string()))
    );
}
