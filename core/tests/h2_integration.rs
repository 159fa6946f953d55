/*
 * h2_integration.rs
 * Copyright (C) 2026 The Rapidray Authors
 *
 * Integration test for the h2c server engine. Starts a server in-process
 * and drives a full prior-knowledge HTTP/2 exchange over a real socket:
 * preface, SETTINGS handshake, request dispatch, HPACK across frames, and
 * a flow-controlled response body.
 *
 * Run with:
 *   cargo test -p rapidray_core --test h2_integration -- --nocapture
 */

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BufMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use rapidray_core::{Request, Response, Server, ServerConfig, StatusCode};

const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

const TYPE_DATA: u8 = 0x0;
const TYPE_HEADERS: u8 = 0x1;
const TYPE_SETTINGS: u8 = 0x4;
const FLAG_ACK: u8 = 0x1;
const FLAG_END_STREAM: u8 = 0x1;
const FLAG_END_HEADERS: u8 = 0x4;

fn route(request: &Request) -> Response {
    match request.path() {
        Some("/hello") => Response::builder()
            .status_code(StatusCode::Ok)
            .header("content-type", "text/plain")
            .body(&b"hello from rapidray"[..])
            .build(),
        _ => Response::builder()
            .status_code(StatusCode::NotFound)
            .header("server", "rapidray/1")
            .header("content-length", "0")
            .build(),
    }
}

async fn start_server() -> SocketAddr {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let config = ServerConfig::default().port(0).dump_frames(true);
    let server = Server::bind(config, Arc::new(route)).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

fn frame(frame_type: u8, flags: u8, stream_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.put_u8((payload.len() >> 16) as u8);
    out.put_u8((payload.len() >> 8) as u8);
    out.put_u8(payload.len() as u8);
    out.put_u8(frame_type);
    out.put_u8(flags);
    out.put_u32(stream_id);
    out.extend_from_slice(payload);
    out
}

async fn read_frame(stream: &mut TcpStream) -> (u8, u8, u32, Vec<u8>) {
    let mut head = [0u8; 9];
    stream.read_exact(&mut head).await.unwrap();
    let len = (head[0] as usize) << 16 | (head[1] as usize) << 8 | (head[2] as usize);
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    let stream_id = u32::from_be_bytes([head[5], head[6], head[7], head[8]]) & 0x7fff_ffff;
    (head[3], head[4], stream_id, payload)
}

#[tokio::test]
async fn full_request_cycle_with_body() {
    let addr = start_server().await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    let mut encoder = hpack::Encoder::new();
    let mut decoder = hpack::Decoder::new();

    let mut bytes = PREFACE.to_vec();
    bytes.extend_from_slice(&frame(TYPE_SETTINGS, 0, 0, &[]));
    let block = encoder.encode(vec![
        (&b":method"[..], &b"GET"[..]),
        (&b":scheme"[..], &b"http"[..]),
        (&b":path"[..], &b"/hello"[..]),
        (&b":authority"[..], &b"localhost"[..]),
        (&b"accept"[..], &b"*/*"[..]),
    ]);
    bytes.extend_from_slice(&frame(
        TYPE_HEADERS,
        FLAG_END_HEADERS | FLAG_END_STREAM,
        1,
        &block,
    ));
    client.write_all(&bytes).await.unwrap();

    // server SETTINGS, SETTINGS ACK, response HEADERS, response DATA
    let (frame_type, flags, stream_id, _) = read_frame(&mut client).await;
    assert_eq!((frame_type, flags, stream_id), (TYPE_SETTINGS, 0, 0));
    let (frame_type, flags, _, _) = read_frame(&mut client).await;
    assert_eq!((frame_type, flags), (TYPE_SETTINGS, FLAG_ACK));

    let (frame_type, flags, stream_id, payload) = read_frame(&mut client).await;
    assert_eq!(frame_type, TYPE_HEADERS);
    assert_eq!(flags, FLAG_END_HEADERS);
    assert_eq!(stream_id, 1);
    let headers = decoder.decode(&payload).unwrap();
    assert_eq!(headers[0], (b":status".to_vec(), b"200".to_vec()));
    assert!(headers.contains(&(b"content-type".to_vec(), b"text/plain".to_vec())));

    let (frame_type, flags, stream_id, body) = read_frame(&mut client).await;
    assert_eq!(frame_type, TYPE_DATA);
    assert_eq!(flags, FLAG_END_STREAM);
    assert_eq!(stream_id, 1);
    assert_eq!(body, b"hello from rapidray");
}

#[tokio::test]
async fn second_request_reuses_the_hpack_tables() {
    let addr = start_server().await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    let mut encoder = hpack::Encoder::new();
    let mut decoder = hpack::Decoder::new();

    let mut bytes = PREFACE.to_vec();
    bytes.extend_from_slice(&frame(TYPE_SETTINGS, 0, 0, &[]));
    client.write_all(&bytes).await.unwrap();
    let (frame_type, _, _, _) = read_frame(&mut client).await;
    assert_eq!(frame_type, TYPE_SETTINGS);
    let (frame_type, flags, _, _) = read_frame(&mut client).await;
    assert_eq!((frame_type, flags), (TYPE_SETTINGS, FLAG_ACK));

    // two sequential requests; the second header block leans on the
    // dynamic table entries installed by the first
    for (stream_id, path) in [(1u32, &b"/miss-a"[..]), (3u32, &b"/miss-b"[..])] {
        let block = encoder.encode(vec![
            (&b":method"[..], &b"GET"[..]),
            (&b":scheme"[..], &b"http"[..]),
            (&b":path"[..], path),
            (&b":authority"[..], &b"localhost"[..]),
            (&b"x-request-id"[..], &b"fixed-value"[..]),
        ]);
        client
            .write_all(&frame(
                TYPE_HEADERS,
                FLAG_END_HEADERS | FLAG_END_STREAM,
                stream_id,
                &block,
            ))
            .await
            .unwrap();

        let (frame_type, flags, id, payload) = read_frame(&mut client).await;
        assert_eq!(frame_type, TYPE_HEADERS);
        assert_eq!(flags, FLAG_END_HEADERS | FLAG_END_STREAM);
        assert_eq!(id, stream_id);
        let headers = decoder.decode(&payload).unwrap();
        assert_eq!(headers[0], (b":status".to_vec(), b"404".to_vec()));
        assert!(headers.contains(&(b"server".to_vec(), b"rapidray/1".to_vec())));
    }
}
