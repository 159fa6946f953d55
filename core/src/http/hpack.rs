/*
 * hpack.rs
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

//! Thin adapter over the external `hpack` codec.
//!
//! The decoder and encoder each keep a dynamic table that is connection
//! state, so one `HeaderCodec` lives exactly as long as its connection;
//! creating a fresh decoder per frame would break indexed references.

use bytes::Bytes;

use super::headers::Headers;
use crate::error::{ErrorCode, H2Error};

pub struct HeaderCodec {
    decoder: hpack::Decoder<'static>,
    encoder: hpack::Encoder<'static>,
}

impl HeaderCodec {
    pub fn new() -> HeaderCodec {
        HeaderCodec {
            decoder: hpack::Decoder::new(),
            encoder: hpack::Encoder::new(),
        }
    }

    /// Decode one complete header block into an ordered, duplicate-
    /// preserving list.
    pub fn decode(&mut self, block: &[u8]) -> Result<Headers, H2Error> {
        let raw = self.decoder.decode(block).map_err(|e| {
            H2Error::connection(
                ErrorCode::CompressionError,
                format!("HPACK decoding failed: {e:?}"),
            )
        })?;
        let mut headers = Headers::new();
        for (name, value) in raw {
            let name = String::from_utf8(name).map_err(|_| {
                H2Error::connection(ErrorCode::ProtocolError, "header name is not UTF-8")
            })?;
            let value = String::from_utf8(value).map_err(|_| {
                H2Error::connection(ErrorCode::ProtocolError, "header value is not UTF-8")
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Encode a header list, pseudo-headers first as RFC 7540 requires.
    pub fn encode(&mut self, headers: &Headers) -> Bytes {
        let mut ordered: Vec<(&[u8], &[u8])> = Vec::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            if name.starts_with(':') {
                ordered.push((name.as_bytes(), value.as_bytes()));
            }
        }
        for (name, value) in headers.iter() {
            if !name.starts_with(':') {
                ordered.push((name.as_bytes(), value.as_bytes()));
            }
        }
        Bytes::from(self.encoder.encode(ordered))
    }
}

impl Default for HeaderCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_order_and_duplicates() {
        let mut codec = HeaderCodec::new();
        let mut headers = Headers::new();
        headers.insert(":status", "200");
        headers.insert("set-cookie", "a=1");
        headers.insert("set-cookie", "b=2");
        headers.insert("server", "rapidray/1");
        let block = codec.encode(&headers);
        let decoded = codec.decode(&block).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn pseudo_headers_are_reordered_first() {
        let mut codec = HeaderCodec::new();
        let mut headers = Headers::new();
        headers.insert("server", "rapidray/1");
        headers.insert(":status", "404");
        let block = codec.encode(&headers);
        let decoded = codec.decode(&block).unwrap();
        let entries: Vec<_> = decoded.iter().collect();
        assert_eq!(entries, vec![(":status", "404"), ("server", "rapidray/1")]);
    }

    #[test]
    fn dynamic_table_state_spans_blocks() {
        let mut server = HeaderCodec::new();
        let mut client = HeaderCodec::new();
        let mut headers = Headers::new();
        headers.insert("x-request-id", "abc123");
        // second block can reference the first block's dynamic table entry
        let first = client.encode(&headers);
        let second = client.encode(&headers);
        assert_eq!(server.decode(&first).unwrap(), headers);
        assert_eq!(server.decode(&second).unwrap(), headers);
    }

    #[test]
    fn garbage_block_is_a_compression_error() {
        let mut codec = HeaderCodec::new();
        // indexed-field reference far beyond any table entry
        let err = codec.decode(&[0xff, 0xff, 0xff, 0xff, 0x0f]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CompressionError);
    }
}
