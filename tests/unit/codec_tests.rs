//! Unit tests for the NDJSON frame codec.

use bytes::BytesMut;
use futures_util::StreamExt;
use tokio_util::codec::{Decoder, FramedRead};

use claude_app_server::rpc::codec::{Frame, FrameCodec, MAX_LINE_BYTES};

fn line(text: &str) -> Option<Frame> {
    Some(Frame::Line(text.to_owned()))
}

#[test]
fn single_line_decodes_without_newline() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"method\":\"initialize\"}\n");

    let frame = codec.decode(&mut buf).expect("decode must succeed");
    assert_eq!(frame, line("{\"method\":\"initialize\"}"));
}

#[test]
fn batched_lines_decode_in_order() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"a\":1}\n{\"b\":2}\n");

    assert_eq!(codec.decode(&mut buf).unwrap(), line("{\"a\":1}"));
    assert_eq!(codec.decode(&mut buf).unwrap(), line("{\"b\":2}"));
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
}

#[test]
fn partial_line_is_buffered_until_newline() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"id\":1,");

    assert_eq!(codec.decode(&mut buf).unwrap(), None);
    buf.extend_from_slice(b"\"method\":\"x\"}\n");
    assert_eq!(codec.decode(&mut buf).unwrap(), line("{\"id\":1,\"method\":\"x\"}"));
}

#[test]
fn oversized_line_is_rejected_once_and_decoding_recovers() {
    let mut codec = FrameCodec::with_max_length(16);
    let mut buf = BytesMut::from(format!("{}\n{{\"ok\":true}}\n", "x".repeat(64)).as_str());

    let frame = codec.decode(&mut buf).expect("rejection is not an error");
    assert!(matches!(frame, Some(Frame::Rejected(ref reason)) if reason.contains("line too long")));
    assert_eq!(codec.decode(&mut buf).unwrap(), line("{\"ok\":true}"));
}

#[tokio::test]
async fn framed_stream_continues_past_oversized_line() {
    let input = format!("{}\n{{\"ok\":true}}\n", "x".repeat(64));
    let frames: Vec<_> = FramedRead::new(input.as_bytes(), FrameCodec::with_max_length(16))
        .collect()
        .await;

    assert_eq!(frames.len(), 2);
    assert!(matches!(frames[0], Ok(Frame::Rejected(_))));
    assert_eq!(frames[1].as_ref().ok(), Some(&Frame::Line("{\"ok\":true}".into())));
}

#[tokio::test]
async fn framed_stream_continues_past_invalid_utf8() {
    let mut input = b"{\"a\":1}\n".to_vec();
    input.extend_from_slice(&[0xff, 0xfe, b'\n']);
    input.extend_from_slice(b"{\"b\":2}\n");
    let frames: Vec<_> = FramedRead::new(input.as_slice(), FrameCodec::new())
        .collect()
        .await;

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].as_ref().ok(), Some(&Frame::Line("{\"a\":1}".into())));
    assert!(matches!(frames[1], Ok(Frame::Rejected(ref reason)) if reason.contains("utf-8")));
    assert_eq!(frames[2].as_ref().ok(), Some(&Frame::Line("{\"b\":2}".into())));
}

#[tokio::test]
async fn oversized_line_split_across_reads_is_rejected_once() {
    let (mut tx, rx) = tokio::io::duplex(64);
    let writer = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        tx.write_all("y".repeat(1000).as_bytes()).await.unwrap();
        tx.write_all(b"\n{\"ok\":1}\n").await.unwrap();
    });

    let frames: Vec<_> = FramedRead::new(rx, FrameCodec::with_max_length(100))
        .collect()
        .await;
    writer.await.unwrap();

    let rejected = frames
        .iter()
        .filter(|f| matches!(f, Ok(Frame::Rejected(_))))
        .count();
    assert_eq!(rejected, 1);
    assert_eq!(
        frames.last().and_then(|f| f.as_ref().ok()),
        Some(&Frame::Line("{\"ok\":1}".into()))
    );
}

#[test]
fn default_limit_is_one_mebibyte() {
    assert_eq!(MAX_LINE_BYTES, 1024 * 1024);
}
