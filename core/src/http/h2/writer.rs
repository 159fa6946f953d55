/*
 * writer.rs
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

//! HTTP/2 frame writer: serializes frames into a buffer. The caller hands
//! the accumulated buffer to the outbound pipeline.

use bytes::{BufMut, Bytes, BytesMut};

use super::frame::*;

pub struct H2Writer {
    buf: BytesMut,
}

impl H2Writer {
    pub fn new() -> H2Writer {
        H2Writer {
            buf: BytesMut::with_capacity(DEFAULT_MAX_FRAME_SIZE as usize + FRAME_HEADER_LENGTH),
        }
    }

    fn write_frame_header(&mut self, length: usize, frame_type: u8, flags: u8, stream_id: u32) {
        self.buf.put_u8((length >> 16) as u8);
        self.buf.put_u8((length >> 8) as u8);
        self.buf.put_u8(length as u8);
        self.buf.put_u8(frame_type);
        self.buf.put_u8(flags);
        // reserved bit is always zero on write
        self.buf.put_u32(stream_id & 0x7fff_ffff);
    }

    pub fn write_data(&mut self, stream_id: u32, data: &[u8], end_stream: bool) {
        debug_assert_ne!(stream_id, 0);
        let flags = if end_stream { FLAG_END_STREAM } else { 0 };
        self.write_frame_header(data.len(), TYPE_DATA, flags, stream_id);
        self.buf.extend_from_slice(data);
    }

    /// HEADERS frame (no priority, no padding). The block must already be
    /// HPACK-encoded.
    pub fn write_headers(
        &mut self,
        stream_id: u32,
        header_block: &[u8],
        end_stream: bool,
        end_headers: bool,
    ) {
        debug_assert_ne!(stream_id, 0);
        let mut flags = 0u8;
        if end_stream {
            flags |= FLAG_END_STREAM;
        }
        if end_headers {
            flags |= FLAG_END_HEADERS;
        }
        self.write_frame_header(header_block.len(), TYPE_HEADERS, flags, stream_id);
        self.buf.extend_from_slice(header_block);
    }

    pub fn write_rst_stream(&mut self, stream_id: u32, error_code: u32) {
        debug_assert_ne!(stream_id, 0);
        self.write_frame_header(4, TYPE_RST_STREAM, 0, stream_id);
        self.buf.put_u32(error_code);
    }

    pub fn write_settings(&mut self, settings: &[(u16, u32)]) {
        self.write_frame_header(settings.len() * 6, TYPE_SETTINGS, 0, 0);
        for &(id, value) in settings {
            self.buf.put_u16(id);
            self.buf.put_u32(value);
        }
    }

    pub fn write_settings_ack(&mut self) {
        self.write_frame_header(0, TYPE_SETTINGS, FLAG_ACK, 0);
    }

    pub fn write_ping(&mut self, payload: [u8; 8], ack: bool) {
        let flags = if ack { FLAG_ACK } else { 0 };
        self.write_frame_header(8, TYPE_PING, flags, 0);
        self.buf.extend_from_slice(&payload);
    }

    pub fn write_goaway(&mut self, last_stream_id: u32, error_code: u32, debug_data: &[u8]) {
        self.write_frame_header(8 + debug_data.len(), TYPE_GOAWAY, 0, 0);
        self.buf.put_u32(last_stream_id & 0x7fff_ffff);
        self.buf.put_u32(error_code);
        self.buf.extend_from_slice(debug_data);
    }

    pub fn write_window_update(&mut self, stream_id: u32, increment: u32) {
        debug_assert!(increment > 0 && increment <= MAX_WINDOW_SIZE);
        self.write_frame_header(4, TYPE_WINDOW_UPDATE, 0, stream_id);
        self.buf.put_u32(increment);
    }

    /// Take the accumulated bytes. The writer stays usable.
    pub fn take_buffer(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for H2Writer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_ack_bytes_are_exact() {
        let mut writer = H2Writer::new();
        writer.write_settings_ack();
        assert_eq!(
            &writer.take_buffer()[..],
            &[0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn ping_ack_echoes_payload() {
        let mut writer = H2Writer::new();
        writer.write_ping([0, 1, 2, 3, 4, 5, 6, 7], true);
        assert_eq!(
            &writer.take_buffer()[..],
            &[
                0x00, 0x00, 0x08, 0x06, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03,
                0x04, 0x05, 0x06, 0x07
            ]
        );
    }

    #[test]
    fn goaway_masks_the_reserved_bit() {
        let mut writer = H2Writer::new();
        writer.write_goaway(0xffff_ffff, 3, b"");
        let bytes = writer.take_buffer();
        assert_eq!(&bytes[9..13], &[0x7f, 0xff, 0xff, 0xff]);
        assert_eq!(&bytes[13..17], &[0x00, 0x00, 0x00, 0x03]);
    }

    #[test]
    fn headers_flags_combine() {
        let mut writer = H2Writer::new();
        writer.write_headers(1, b"\x82", true, true);
        let bytes = writer.take_buffer();
        assert_eq!(bytes[3], TYPE_HEADERS);
        assert_eq!(bytes[4], FLAG_END_STREAM | FLAG_END_HEADERS);
        assert_eq!(&bytes[5..9], &[0, 0, 0, 1]);
        assert_eq!(&bytes[9..], &b"\x82"[..]);
    }

    #[test]
    fn take_buffer_leaves_the_writer_usable() {
        let mut writer = H2Writer::new();
        writer.write_settings(&[(SETTINGS_INITIAL_WINDOW_SIZE, 65_535)]);
        let first = writer.take_buffer();
        assert_eq!(first.len(), FRAME_HEADER_LENGTH + 6);
        assert!(writer.is_empty());
        writer.write_settings_ack();
        assert_eq!(writer.take_buffer().len(), FRAME_HEADER_LENGTH);
    }
}
