/*
 * parser.rs
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

//! HTTP/2 frame push parser: consumes complete frames from a buffer and
//! dispatches typed callbacks. Partial frame data is left in the buffer.
//!
//! Shape validation lives here (stream-id zero checks, fixed payload
//! sizes, padding bounds); stream-state decisions belong to the
//! [`FrameHandler`]. All errors are connection-scoped.

use bytes::{Buf, Bytes, BytesMut};

use super::frame::*;
use crate::error::{ErrorCode, H2Error};

/// Callbacks for parsed frames. `flow_len` on DATA is the full payload
/// length including padding, which is what flow control accounts.
pub trait FrameHandler {
    fn on_data(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        data: Bytes,
        flow_len: u32,
    ) -> Result<(), H2Error>;
    fn on_headers(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        end_headers: bool,
        block: Bytes,
    ) -> Result<(), H2Error>;
    fn on_continuation(
        &mut self,
        stream_id: u32,
        end_headers: bool,
        fragment: Bytes,
    ) -> Result<(), H2Error>;
    fn on_settings(&mut self, ack: bool, settings: Vec<(u16, u32)>) -> Result<(), H2Error>;
    fn on_ping(&mut self, ack: bool, payload: [u8; 8]) -> Result<(), H2Error>;
    fn on_window_update(&mut self, stream_id: u32, increment: u32) -> Result<(), H2Error>;
    fn on_rst_stream(&mut self, stream_id: u32, error_code: u32) -> Result<(), H2Error>;
    fn on_goaway(
        &mut self,
        last_stream_id: u32,
        error_code: u32,
        debug_data: Bytes,
    ) -> Result<(), H2Error>;
    /// PRIORITY, PUSH_PROMISE, ALT_SVC, ORIGIN, and unknown types.
    fn on_ignored(&mut self, frame_type: u8, stream_id: u32) -> Result<(), H2Error> {
        let _ = (frame_type, stream_id);
        Ok(())
    }
}

/// Push parser for HTTP/2 frames. Feed bytes via `receive`; the handler is
/// invoked for each complete frame.
pub struct H2Parser {
    max_frame_size: u32,
}

impl H2Parser {
    pub fn new(max_frame_size: u32) -> H2Parser {
        H2Parser { max_frame_size }
    }

    /// Consume as many complete frames as possible from `buf`.
    pub fn receive<H: FrameHandler>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), H2Error> {
        while buf.len() >= FRAME_HEADER_LENGTH {
            let length = (buf[0] as usize) << 16 | (buf[1] as usize) << 8 | (buf[2] as usize);
            if length as u32 > self.max_frame_size {
                return Err(H2Error::connection(
                    ErrorCode::FrameSizeError,
                    format!("frame size {length} exceeds max {}", self.max_frame_size),
                ));
            }
            if buf.len() < FRAME_HEADER_LENGTH + length {
                return Ok(());
            }
            let frame_type = buf[3];
            let flags = buf[4];
            let stream_id = ((buf[5] & 0x7f) as u32) << 24
                | (buf[6] as u32) << 16
                | (buf[7] as u32) << 8
                | (buf[8] as u32);

            buf.advance(FRAME_HEADER_LENGTH);
            let payload = buf.split_to(length).freeze();

            tracing::trace!(
                "frame: len={length} type={frame_type:#x} id={stream_id} flags={flags:#04x}"
            );
            dispatch_frame(frame_type, flags, stream_id, payload, handler)?;
        }
        Ok(())
    }
}

fn dispatch_frame<H: FrameHandler>(
    frame_type: u8,
    flags: u8,
    stream_id: u32,
    payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    match frame_type {
        TYPE_DATA => parse_data_frame(flags, stream_id, payload, handler),
        TYPE_HEADERS => parse_headers_frame(flags, stream_id, payload, handler),
        TYPE_RST_STREAM => parse_rst_stream_frame(stream_id, payload, handler),
        TYPE_SETTINGS => parse_settings_frame(flags, stream_id, payload, handler),
        TYPE_PING => parse_ping_frame(flags, stream_id, payload, handler),
        TYPE_GOAWAY => parse_goaway_frame(stream_id, payload, handler),
        TYPE_WINDOW_UPDATE => parse_window_update_frame(stream_id, payload, handler),
        TYPE_CONTINUATION => parse_continuation_frame(flags, stream_id, payload, handler),
        // PRIORITY, PUSH_PROMISE, ALT_SVC, ORIGIN, and anything unknown
        _ => handler.on_ignored(frame_type, stream_id),
    }
}

fn parse_data_frame<H: FrameHandler>(
    flags: u8,
    stream_id: u32,
    mut payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if stream_id == 0 {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "DATA frame with stream ID 0",
        ));
    }
    let flow_len = payload.len() as u32;
    let end_stream = (flags & FLAG_END_STREAM) != 0;
    let data = if (flags & FLAG_PADDED) != 0 {
        if payload.is_empty() {
            return Err(H2Error::connection(
                ErrorCode::ProtocolError,
                "padded DATA frame without pad length",
            ));
        }
        let pad_len = payload.get_u8() as usize;
        if pad_len >= flow_len as usize {
            return Err(H2Error::connection(
                ErrorCode::ProtocolError,
                "DATA frame padding exceeds payload",
            ));
        }
        payload.split_to(payload.len() - pad_len)
    } else {
        payload
    };
    handler.on_data(stream_id, end_stream, data, flow_len)
}

fn parse_headers_frame<H: FrameHandler>(
    flags: u8,
    stream_id: u32,
    mut payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if stream_id == 0 {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "HEADERS frame with stream ID 0",
        ));
    }
    let end_stream = (flags & FLAG_END_STREAM) != 0;
    let end_headers = (flags & FLAG_END_HEADERS) != 0;

    let pad_len = if (flags & FLAG_PADDED) != 0 {
        if payload.is_empty() {
            return Err(H2Error::connection(
                ErrorCode::ProtocolError,
                "padded HEADERS frame without pad length",
            ));
        }
        payload.get_u8() as usize
    } else {
        0
    };
    if (flags & FLAG_PRIORITY) != 0 {
        // exclusive(1) + dependency(31) + weight(8), ignored by this core
        if payload.len() < 5 {
            return Err(H2Error::connection(
                ErrorCode::FrameSizeError,
                "HEADERS frame too short for priority fields",
            ));
        }
        payload.advance(5);
    }
    if pad_len > payload.len() {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "HEADERS frame padding exceeds payload",
        ));
    }
    let block = payload.split_to(payload.len() - pad_len);
    handler.on_headers(stream_id, end_stream, end_headers, block)
}

fn parse_rst_stream_frame<H: FrameHandler>(
    stream_id: u32,
    mut payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if stream_id == 0 {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "RST_STREAM frame with stream ID 0",
        ));
    }
    if payload.len() != 4 {
        return Err(H2Error::connection(
            ErrorCode::FrameSizeError,
            "RST_STREAM frame must be 4 bytes",
        ));
    }
    let error_code = payload.get_u32();
    handler.on_rst_stream(stream_id, error_code)
}

fn parse_settings_frame<H: FrameHandler>(
    flags: u8,
    stream_id: u32,
    mut payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if stream_id != 0 {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "SETTINGS frame with non-zero stream ID",
        ));
    }
    let ack = (flags & FLAG_ACK) != 0;
    if ack && !payload.is_empty() {
        return Err(H2Error::connection(
            ErrorCode::FrameSizeError,
            "SETTINGS ACK frame must be empty",
        ));
    }
    if payload.len() % 6 != 0 {
        return Err(H2Error::connection(
            ErrorCode::FrameSizeError,
            "SETTINGS frame size must be a multiple of 6",
        ));
    }
    let mut settings = Vec::with_capacity(payload.len() / 6);
    while payload.len() >= 6 {
        let id = payload.get_u16();
        let value = payload.get_u32();
        settings.push((id, value));
    }
    handler.on_settings(ack, settings)
}

fn parse_ping_frame<H: FrameHandler>(
    flags: u8,
    stream_id: u32,
    payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if stream_id != 0 {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "PING frame with non-zero stream ID",
        ));
    }
    if payload.len() != 8 {
        return Err(H2Error::connection(
            ErrorCode::FrameSizeError,
            "PING frame must be 8 bytes",
        ));
    }
    let mut opaque = [0u8; 8];
    opaque.copy_from_slice(&payload);
    handler.on_ping((flags & FLAG_ACK) != 0, opaque)
}

fn parse_goaway_frame<H: FrameHandler>(
    stream_id: u32,
    mut payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if stream_id != 0 {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "GOAWAY frame with non-zero stream ID",
        ));
    }
    if payload.len() < 8 {
        return Err(H2Error::connection(
            ErrorCode::FrameSizeError,
            "GOAWAY frame must be at least 8 bytes",
        ));
    }
    let last_stream_id = payload.get_u32() & 0x7fff_ffff;
    let error_code = payload.get_u32();
    handler.on_goaway(last_stream_id, error_code, payload)
}

fn parse_window_update_frame<H: FrameHandler>(
    stream_id: u32,
    mut payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if payload.len() != 4 {
        return Err(H2Error::connection(
            ErrorCode::FrameSizeError,
            "WINDOW_UPDATE frame must be 4 bytes",
        ));
    }
    let increment = payload.get_u32() & 0x7fff_ffff;
    if increment == 0 {
        return Err(H2Error::connection(
            ErrorCode::FlowControlError,
            "WINDOW_UPDATE increment must be non-zero",
        ));
    }
    handler.on_window_update(stream_id, increment)
}

fn parse_continuation_frame<H: FrameHandler>(
    flags: u8,
    stream_id: u32,
    payload: Bytes,
    handler: &mut H,
) -> Result<(), H2Error> {
    if stream_id == 0 {
        return Err(H2Error::connection(
            ErrorCode::ProtocolError,
            "CONTINUATION frame with stream ID 0",
        ));
    }
    handler.on_continuation(stream_id, (flags & FLAG_END_HEADERS) != 0, payload)
}
