/*
 * config.rs
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

//! Server configuration: listen port, scatter-read count, and the HTTP/2
//! settings the server announces after the preface.

use crate::http::h2::frame::{DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE};

/// Configuration for a rapidray server and its per-connection engines.
///
/// Construct with `ServerConfig::default()` and chain setters:
///
/// ```
/// use rapidray_core::ServerConfig;
///
/// let config = ServerConfig::default().port(9000).dump_frames(true);
/// assert_eq!(config.port, 9000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP listen port. Port 0 binds an ephemeral port.
    pub port: u16,
    /// Number of concurrent scatter reads per channel (K). The gather heap
    /// reorders completions, so any K >= 1 preserves byte order.
    pub scatter_reads: usize,
    /// INITIAL_WINDOW_SIZE announced to the peer (per-stream receive window).
    pub initial_window_size: u32,
    /// MAX_FRAME_SIZE announced to the peer.
    pub max_frame_size: u32,
    /// MAX_CONCURRENT_STREAMS announced to the peer, and enforced.
    pub max_concurrent_streams: u32,
    /// Upper bound on the per-connection receive buffer; overflowing it
    /// closes the connection.
    pub recv_buffer_limit: usize,
    /// Install the hex-dump handler in each pipeline.
    pub dump_frames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            scatter_reads: 1,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_concurrent_streams: 100,
            recv_buffer_limit: 1 << 20,
            dump_frames: false,
        }
    }
}

impl ServerConfig {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn scatter_reads(mut self, count: usize) -> Self {
        self.scatter_reads = count.max(1);
        self
    }

    pub fn initial_window_size(mut self, size: u32) -> Self {
        self.initial_window_size = size;
        self
    }

    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    pub fn max_concurrent_streams(mut self, max: u32) -> Self {
        self.max_concurrent_streams = max;
        self
    }

    pub fn recv_buffer_limit(mut self, limit: usize) -> Self {
        self.recv_buffer_limit = limit;
        self
    }

    pub fn dump_frames(mut self, enabled: bool) -> Self {
        self.dump_frames = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_announced_settings() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.scatter_reads, 1);
        assert_eq!(config.initial_window_size, 65_535);
        assert_eq!(config.max_frame_size, 16_384);
        assert_eq!(config.max_concurrent_streams, 100);
    }

    #[test]
    fn scatter_reads_is_at_least_one() {
        let config = ServerConfig::default().scatter_reads(0);
        assert_eq!(config.scatter_reads, 1);
    }
}
