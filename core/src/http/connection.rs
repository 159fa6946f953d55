/*
 * connection.rs
 * Copyright (C) 2026 The Rapidray Authors
 *
 * This file is part of Rapidray, an HTTP/2 server engine.
 *
 * Rapidray is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Rapidray is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Rapidray.  If not, see <http://www.gnu.org/licenses/>.
 */

//! The HTTP/2 connection engine and its terminal channel handler.
//!
//! [`Http2Connection`] is sans-io: it consumes inbound bytes and produces
//! outbound bytes, ready-to-dispatch requests, and a close signal.
//! [`Http2Handler`] wires it into a pipeline, holding the one
//! per-connection mutex. The dispatcher runs strictly outside that mutex:
//! requests are captured under the lock, dispatched unlocked, and the lock
//! is re-taken to emit each response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::{Buf, Bytes, BytesMut};

use super::dispatcher::Dispatcher;
use super::h2::flow::Window;
use super::h2::frame::*;
use super::h2::parser::{FrameHandler, H2Parser};
use super::h2::stream::Http2Stream;
use super::h2::writer::H2Writer;
use super::h2::CONNECTION_PREFACE;
use super::headers::Headers;
use super::hpack::HeaderCodec;
use super::request::Request;
use super::response::Response;
use crate::config::ServerConfig;
use crate::error::{Error, ErrorCode, H2Error};
use crate::net::{ChannelHandler, HandlerContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connection,
    Reading,
    Failed,
}

/// A header block still waiting for its END_HEADERS flag. While one is
/// pending, only CONTINUATION frames on the same stream are legal. The
/// refusal decision is made when the HEADERS frame arrives but acted on
/// only once the block is complete.
struct PartialHeaders {
    stream_id: u32,
    end_stream: bool,
    refused: bool,
    block: BytesMut,
}

/// What one engine call produced: bytes to put on the wire, requests ready
/// for the dispatcher, and whether the connection should be torn down.
#[derive(Debug, Default)]
pub struct Outcome {
    pub out: Bytes,
    pub dispatch: Vec<(u32, Request)>,
    pub close: bool,
}

struct ConnState {
    writer: H2Writer,
    codec: HeaderCodec,
    streams: HashMap<u32, Http2Stream>,
    max_client_stream_id: u32,
    conn_recv: Window,
    conn_send: Window,
    /// INITIAL_WINDOW_SIZE we announced; basis for stream receive windows.
    initial_recv_window: u32,
    /// MAX_FRAME_SIZE we announced; bound for inbound frames.
    announced_max_frame_size: u32,
    /// Peer's INITIAL_WINDOW_SIZE; basis for stream send windows.
    peer_initial_window: u32,
    /// Peer's MAX_FRAME_SIZE; bound for outbound DATA splitting.
    peer_max_frame_size: u32,
    max_concurrent_streams: u32,
    goaway_received: bool,
    close: bool,
    dispatch: Vec<(u32, Request)>,
    partial_headers: Option<PartialHeaders>,
}

/// Per-connection HTTP/2 protocol engine.
pub struct Http2Connection {
    phase: Phase,
    rx: BytesMut,
    recv_buffer_limit: usize,
    parser: H2Parser,
    state: ConnState,
}

impl Http2Connection {
    pub fn new(config: &ServerConfig) -> Http2Connection {
        Http2Connection {
            phase: Phase::Connection,
            rx: BytesMut::with_capacity(8192),
            recv_buffer_limit: config.recv_buffer_limit,
            parser: H2Parser::new(config.max_frame_size),
            state: ConnState {
                writer: H2Writer::new(),
                codec: HeaderCodec::new(),
                streams: HashMap::new(),
                max_client_stream_id: 0,
                conn_recv: Window::new(DEFAULT_INITIAL_WINDOW_SIZE),
                conn_send: Window::new(DEFAULT_INITIAL_WINDOW_SIZE),
                initial_recv_window: config.initial_window_size,
                announced_max_frame_size: config.max_frame_size,
                peer_initial_window: DEFAULT_INITIAL_WINDOW_SIZE,
                peer_max_frame_size: DEFAULT_MAX_FRAME_SIZE,
                max_concurrent_streams: config.max_concurrent_streams,
                goaway_received: false,
                close: false,
                dispatch: Vec::new(),
                partial_headers: None,
            },
        }
    }

    /// Feed inbound bytes through the preface state machine and the frame
    /// parser.
    pub fn receive(&mut self, data: &[u8]) -> Outcome {
        if self.phase == Phase::Failed {
            return Outcome::default();
        }
        self.rx.extend_from_slice(data);
        if self.rx.len() > self.recv_buffer_limit {
            tracing::warn!("receive buffer limit exceeded, closing connection");
            return self.fail(H2Error::connection(
                ErrorCode::EnhanceYourCalm,
                "receive buffer limit exceeded",
            ));
        }

        if self.phase == Phase::Connection {
            if self.rx.len() < CONNECTION_PREFACE.len() {
                return Outcome::default();
            }
            if &self.rx[..CONNECTION_PREFACE.len()] != CONNECTION_PREFACE {
                tracing::info!("protocol is not http/2, closing connection");
                self.phase = Phase::Failed;
                return self.finish(true);
            }
            tracing::info!("protocol is http/2");
            self.rx.advance(CONNECTION_PREFACE.len());
            let settings = [
                (SETTINGS_ENABLE_PUSH, 0),
                (
                    SETTINGS_MAX_CONCURRENT_STREAMS,
                    self.state.max_concurrent_streams,
                ),
                (SETTINGS_INITIAL_WINDOW_SIZE, self.state.initial_recv_window),
                (SETTINGS_MAX_FRAME_SIZE, self.state.announced_max_frame_size),
            ];
            self.state.writer.write_settings(&settings);
            self.phase = Phase::Reading;
        }

        match self.parser.receive(&mut self.rx, &mut self.state) {
            Ok(()) => {
                let close = self.state.close;
                self.finish(close)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Emit a dispatcher response on a stream. Body bytes that exceed the
    /// send windows are parked and drained by later WINDOW_UPDATEs.
    pub fn send_response(&mut self, stream_id: u32, response: &Response) -> Outcome {
        if self.phase == Phase::Failed {
            return Outcome::default();
        }
        if !self.state.streams.contains_key(&stream_id) {
            tracing::debug!("response for stream {stream_id} dropped, stream is gone");
            return Outcome::default();
        }
        let mut headers = Headers::new();
        headers.insert(":status", response.status_code().as_u16().to_string());
        for (name, value) in response.headers().iter() {
            if !name.starts_with(':') {
                headers.insert(name, value);
            }
        }
        let block = self.state.codec.encode(&headers);
        let body = response.body().filter(|body| !body.is_empty()).cloned();
        match body {
            None => {
                self.state
                    .writer
                    .write_headers(stream_id, &block, true, true);
                self.state.finish_local(stream_id);
            }
            Some(body) => {
                self.state
                    .writer
                    .write_headers(stream_id, &block, false, true);
                if let Some(stream) = self.state.streams.get_mut(&stream_id) {
                    stream.pending_body = Some(body);
                }
                self.state.drain_stream(stream_id);
            }
        }
        let close = self.state.close;
        self.finish(close)
    }

    fn fail(&mut self, err: H2Error) -> Outcome {
        match err {
            H2Error::Connection { code, message } => {
                tracing::warn!("connection error {code}: {message}");
                self.state.dispatch.clear();
                self.state
                    .writer
                    .write_goaway(self.state.max_client_stream_id, code.as_u32(), b"");
                self.phase = Phase::Failed;
                self.finish(true)
            }
            H2Error::Stream { id, code, message } => {
                tracing::debug!("stream {id} error {code}: {message}");
                self.state.reset_stream(id, code);
                let close = self.state.close;
                self.finish(close)
            }
        }
    }

    fn finish(&mut self, close: bool) -> Outcome {
        Outcome {
            out: self.state.writer.take_buffer(),
            dispatch: std::mem::take(&mut self.state.dispatch),
            close,
        }
    }

    #[cfg(test)]
    fn stream_send_window(&self, stream_id: u32) -> Option<i64> {
        self.state
            .streams
            .get(&stream_id)
            .map(|stream| stream.send_window.size())
    }
}

impl ConnState {
    fn ensure_no_partial_headers(&self) -> Result<(), H2Error> {
        if self.partial_headers.is_some() {
            return Err(H2Error::connection(
                ErrorCode::ProtocolError,
                "expected CONTINUATION frame",
            ));
        }
        Ok(())
    }

    fn open_stream_count(&self) -> usize {
        self.streams.values().filter(|s| !s.is_closed()).count()
    }

    /// Decode a complete header block, open the stream, and queue the
    /// request for dispatch. A refused stream still goes through the
    /// decoder: the HPACK dynamic table is connection state, and the next
    /// accepted stream may reference entries this block inserts.
    fn begin_stream(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        refused: bool,
        block: &[u8],
    ) -> Result<(), H2Error> {
        let headers = self.codec.decode(block)?;
        if refused {
            tracing::debug!("refusing stream {stream_id}");
            self.writer
                .write_rst_stream(stream_id, ErrorCode::RefusedStream.as_u32());
            return Ok(());
        }
        let mut stream =
            Http2Stream::new(stream_id, self.initial_recv_window, self.peer_initial_window);
        stream.open();
        if end_stream {
            stream.close_remote();
        }
        tracing::debug!("stream {stream_id} opened");
        self.streams.insert(stream_id, stream);
        self.dispatch.push((stream_id, Request::new(headers)));
        Ok(())
    }

    fn remove_stream(&mut self, stream_id: u32) {
        if self.streams.remove(&stream_id).is_some() {
            tracing::debug!("stream {stream_id} closed");
            self.maybe_drained();
        }
    }

    fn reset_stream(&mut self, stream_id: u32, code: ErrorCode) {
        self.writer.write_rst_stream(stream_id, code.as_u32());
        self.remove_stream(stream_id);
    }

    /// We emitted END_STREAM on this stream without a parked body.
    fn finish_local(&mut self, stream_id: u32) {
        let closed = match self.streams.get_mut(&stream_id) {
            Some(stream) => {
                stream.close_local();
                stream.is_closed()
            }
            None => false,
        };
        if closed {
            self.remove_stream(stream_id);
        }
    }

    /// After GOAWAY, the connection closes once every stream has finished.
    fn maybe_drained(&mut self) {
        if self.goaway_received && self.streams.values().all(|s| s.is_closed()) {
            self.close = true;
        }
    }

    /// Send as much of the stream's parked body as the send windows and
    /// the peer's frame size allow.
    fn drain_stream(&mut self, stream_id: u32) {
        let max_frame = self.peer_max_frame_size as usize;
        let mut fully_closed = false;
        if let Some(stream) = self.streams.get_mut(&stream_id) {
            if let Some(mut body) = stream.pending_body.take() {
                while !body.is_empty() {
                    let credit = (stream.send_window.available() as usize)
                        .min(self.conn_send.available() as usize)
                        .min(max_frame);
                    if credit == 0 {
                        break;
                    }
                    let n = credit.min(body.len());
                    let chunk = body.split_to(n);
                    self.writer.write_data(stream_id, &chunk, body.is_empty());
                    stream.send_window.take(n as u32);
                    self.conn_send.take(n as u32);
                }
                if body.is_empty() {
                    stream.close_local();
                    fully_closed = stream.is_closed();
                } else {
                    stream.pending_body = Some(body);
                }
            }
        }
        if fully_closed {
            self.remove_stream(stream_id);
        }
    }

    fn drain_all_streams(&mut self) {
        let parked: Vec<u32> = self
            .streams
            .iter()
            .filter(|(_, s)| s.pending_body.is_some())
            .map(|(id, _)| *id)
            .collect();
        for stream_id in parked {
            self.drain_stream(stream_id);
        }
    }
}

impl FrameHandler for ConnState {
    fn on_data(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        _data: Bytes,
        flow_len: u32,
    ) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        // the connection window covers every DATA octet, padding included
        if self.conn_recv.consume(flow_len).is_err() {
            return Err(H2Error::connection(
                ErrorCode::FlowControlError,
                "connection receive window underflow",
            ));
        }
        if self.conn_recv.needs_refill() {
            let increment = self.conn_recv.refill();
            if increment > 0 {
                self.writer.write_window_update(0, increment);
            }
        }
        let mut finished = false;
        match self.streams.get_mut(&stream_id) {
            Some(stream) => {
                if stream.recv_window.consume(flow_len).is_err() {
                    return Err(H2Error::connection(
                        ErrorCode::FlowControlError,
                        "stream receive window underflow",
                    ));
                }
                if !end_stream && stream.recv_window.needs_refill() {
                    let increment = stream.recv_window.refill();
                    if increment > 0 {
                        self.writer.write_window_update(stream_id, increment);
                    }
                }
                if end_stream {
                    stream.close_remote();
                    finished = stream.is_closed();
                }
            }
            None => {
                if stream_id > self.max_client_stream_id {
                    return Err(H2Error::connection(
                        ErrorCode::ProtocolError,
                        "DATA frame for an idle stream",
                    ));
                }
                // stream already reset or finished; connection-level
                // accounting above is all that remains
            }
        }
        if finished {
            self.remove_stream(stream_id);
        }
        Ok(())
    }

    fn on_headers(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        end_headers: bool,
        block: Bytes,
    ) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        if stream_id % 2 == 0 {
            return Err(H2Error::connection(
                ErrorCode::ProtocolError,
                "client stream ID must be odd",
            ));
        }
        if stream_id <= self.max_client_stream_id {
            return Err(H2Error::connection(
                ErrorCode::ProtocolError,
                "HEADERS stream ID not greater than any previously seen",
            ));
        }
        self.max_client_stream_id = stream_id;
        let refused = self.goaway_received
            || self.open_stream_count() >= self.max_concurrent_streams as usize;
        if !end_headers {
            self.partial_headers = Some(PartialHeaders {
                stream_id,
                end_stream,
                refused,
                block: BytesMut::from(&block[..]),
            });
            return Ok(());
        }
        self.begin_stream(stream_id, end_stream, refused, &block)
    }

    fn on_continuation(
        &mut self,
        stream_id: u32,
        end_headers: bool,
        fragment: Bytes,
    ) -> Result<(), H2Error> {
        let mut partial = match self.partial_headers.take() {
            Some(partial) => partial,
            None => {
                return Err(H2Error::connection(
                    ErrorCode::ProtocolError,
                    "unexpected CONTINUATION frame",
                ));
            }
        };
        if partial.stream_id != stream_id {
            return Err(H2Error::connection(
                ErrorCode::ProtocolError,
                "CONTINUATION stream ID does not match HEADERS",
            ));
        }
        partial.block.extend_from_slice(&fragment);
        if !end_headers {
            self.partial_headers = Some(partial);
            return Ok(());
        }
        self.begin_stream(
            partial.stream_id,
            partial.end_stream,
            partial.refused,
            &partial.block,
        )
    }

    fn on_settings(&mut self, ack: bool, settings: Vec<(u16, u32)>) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        if ack {
            tracing::debug!("received SETTINGS ACK");
            return Ok(());
        }
        for (id, value) in settings {
            match id {
                SETTINGS_INITIAL_WINDOW_SIZE => {
                    if value > MAX_WINDOW_SIZE {
                        return Err(H2Error::connection(
                            ErrorCode::FlowControlError,
                            "INITIAL_WINDOW_SIZE exceeds 2^31-1",
                        ));
                    }
                    let delta = i64::from(value) - i64::from(self.peer_initial_window);
                    for stream in self.streams.values_mut() {
                        stream.send_window.adjust(delta);
                    }
                    self.peer_initial_window = value;
                }
                SETTINGS_MAX_FRAME_SIZE => {
                    if !(MIN_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&value) {
                        return Err(H2Error::connection(
                            ErrorCode::ProtocolError,
                            "MAX_FRAME_SIZE out of range",
                        ));
                    }
                    self.peer_max_frame_size = value;
                }
                _ => {
                    tracing::trace!("ignoring setting {id}={value}");
                }
            }
        }
        self.writer.write_settings_ack();
        self.drain_all_streams();
        Ok(())
    }

    fn on_ping(&mut self, ack: bool, payload: [u8; 8]) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        if !ack {
            self.writer.write_ping(payload, true);
        }
        Ok(())
    }

    fn on_window_update(&mut self, stream_id: u32, increment: u32) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        if stream_id == 0 {
            if self.conn_send.grant(increment).is_err() {
                return Err(H2Error::connection(
                    ErrorCode::FlowControlError,
                    "connection send window overflow",
                ));
            }
            self.drain_all_streams();
            return Ok(());
        }
        let overflow = match self.streams.get_mut(&stream_id) {
            Some(stream) => stream.send_window.grant(increment).is_err(),
            None => {
                tracing::trace!("WINDOW_UPDATE for unknown stream {stream_id}");
                return Ok(());
            }
        };
        if overflow {
            self.reset_stream(stream_id, ErrorCode::FlowControlError);
        } else {
            self.drain_stream(stream_id);
        }
        Ok(())
    }

    fn on_rst_stream(&mut self, stream_id: u32, error_code: u32) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        let name = ErrorCode::from_u32(error_code)
            .map(ErrorCode::name)
            .unwrap_or("UNKNOWN");
        tracing::debug!("stream {stream_id} reset by peer: {name}");
        self.remove_stream(stream_id);
        Ok(())
    }

    fn on_goaway(
        &mut self,
        last_stream_id: u32,
        error_code: u32,
        _debug_data: Bytes,
    ) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        let name = ErrorCode::from_u32(error_code)
            .map(ErrorCode::name)
            .unwrap_or("UNKNOWN");
        tracing::info!("GOAWAY received: last_stream_id={last_stream_id} code={name}");
        self.goaway_received = true;
        self.maybe_drained();
        Ok(())
    }

    fn on_ignored(&mut self, frame_type: u8, stream_id: u32) -> Result<(), H2Error> {
        self.ensure_no_partial_headers()?;
        tracing::trace!("ignoring frame type {frame_type:#x} on stream {stream_id}");
        Ok(())
    }
}

/// Terminal inbound handler: the bridge between the byte pipeline and the
/// HTTP/2 engine.
pub struct Http2Handler {
    connection: Mutex<Http2Connection>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Http2Handler {
    pub fn new(config: &ServerConfig, dispatcher: Arc<dyn Dispatcher>) -> Http2Handler {
        Http2Handler {
            connection: Mutex::new(Http2Connection::new(config)),
            dispatcher,
        }
    }

    /// Write engine output, run dispatches off-lock, and report whether
    /// the connection should be torn down.
    fn flush(&self, ctx: &HandlerContext, outcome: Outcome) -> bool {
        let mut close = outcome.close;
        if !outcome.out.is_empty() {
            ctx.write(outcome.out);
        }
        for (stream_id, request) in outcome.dispatch {
            // no engine lock held here
            let response = self.dispatcher.dispatch(&request);
            let next = self
                .connection
                .lock()
                .unwrap()
                .send_response(stream_id, &response);
            if !next.out.is_empty() {
                ctx.write(next.out);
            }
            close |= next.close;
        }
        close
    }
}

impl ChannelHandler for Http2Handler {
    fn on_read(&self, ctx: &HandlerContext, buf: &Bytes) -> Result<(), Error> {
        let outcome = self.connection.lock().unwrap().receive(buf);
        if self.flush(ctx, outcome) {
            if let Some(pipeline) = ctx.pipeline() {
                pipeline.channel().shutdown();
                pipeline.channel().close();
            }
        }
        Ok(())
    }
}
