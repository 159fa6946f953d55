/*
 * dump.rs
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

//! Hex-dump handler: logs every inbound (`<`) and outbound (`>`) byte
//! block and forwards it unchanged.

use std::fmt::Write as _;

use bytes::Bytes;

use super::handler::ChannelHandler;
use super::pipeline::HandlerContext;
use crate::error::Error;

pub struct DumpHandler;

fn hex_dump_lines(prefix: &str, buf: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    for offset in (0..buf.len()).step_by(16) {
        let row = &buf[offset..buf.len().min(offset + 16)];
        let mut line = format!("{prefix} {offset:04x} ");
        for i in 0..16 {
            match row.get(i) {
                Some(byte) => {
                    let _ = write!(line, "{byte:02x} ");
                }
                None => line.push_str("   "),
            }
        }
        line.push(' ');
        for &byte in row {
            line.push(if (b' '..=0x7e).contains(&byte) {
                byte as char
            } else {
                '.'
            });
        }
        lines.push(line);
    }
    lines
}

fn log_hex_dump(prefix: &str, buf: &[u8]) {
    for line in hex_dump_lines(prefix, buf) {
        tracing::debug!(target: "rapidray::dump", "{line}");
    }
}

impl ChannelHandler for DumpHandler {
    fn on_read(&self, ctx: &HandlerContext, buf: &Bytes) -> Result<(), Error> {
        log_hex_dump("<", buf);
        ctx.next(buf)
    }

    fn write(&self, ctx: &HandlerContext, buf: Bytes) {
        log_hex_dump(">", &buf);
        ctx.write_next(buf);
    }
}
