/*
 * stream.rs
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

//! Per-stream state: identifier, lifecycle state, windows, and any
//! response body parked while waiting for send-window credit.

use bytes::Bytes;

use super::flow::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    HalfClosedRemote,
    HalfClosedLocal,
    Closed,
}

#[derive(Debug)]
pub struct Http2Stream {
    id: u32,
    state: StreamState,
    pub recv_window: Window,
    pub send_window: Window,
    /// Response body bytes not yet covered by send-window credit. The
    /// final chunk of a parked body always carries END_STREAM.
    pub pending_body: Option<Bytes>,
}

impl Http2Stream {
    pub fn new(id: u32, recv_initial: u32, send_initial: u32) -> Http2Stream {
        Http2Stream {
            id,
            state: StreamState::Idle,
            recv_window: Window::new(recv_initial),
            send_window: Window::new(send_initial),
            pending_body: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// HEADERS received: the stream leaves IDLE.
    pub fn open(&mut self) {
        if self.state == StreamState::Idle {
            self.state = StreamState::Open;
        }
    }

    /// The peer finished sending (END_STREAM received).
    pub fn close_remote(&mut self) {
        self.state = match self.state {
            StreamState::Idle | StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal | StreamState::Closed => StreamState::Closed,
            StreamState::HalfClosedRemote => StreamState::HalfClosedRemote,
        };
    }

    /// We finished sending (END_STREAM emitted).
    pub fn close_local(&mut self) {
        self.state = match self.state {
            StreamState::Idle | StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote | StreamState::Closed => StreamState::Closed,
            StreamState::HalfClosedLocal => StreamState::HalfClosedLocal,
        };
    }

    pub fn close(&mut self) {
        self.state = StreamState::Closed;
        self.pending_body = None;
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_response_lifecycle() {
        let mut stream = Http2Stream::new(1, 65_535, 65_535);
        assert_eq!(stream.state(), StreamState::Idle);
        stream.open();
        assert_eq!(stream.state(), StreamState::Open);
        stream.close_remote();
        assert_eq!(stream.state(), StreamState::HalfClosedRemote);
        stream.close_local();
        assert!(stream.is_closed());
    }

    #[test]
    fn local_half_close_then_remote() {
        let mut stream = Http2Stream::new(3, 65_535, 65_535);
        stream.open();
        stream.close_local();
        assert_eq!(stream.state(), StreamState::HalfClosedLocal);
        stream.close_remote();
        assert!(stream.is_closed());
    }

    #[test]
    fn reset_discards_pending_body() {
        let mut stream = Http2Stream::new(5, 65_535, 65_535);
        stream.open();
        stream.pending_body = Some(Bytes::from_static(b"tail"));
        stream.close();
        assert!(stream.is_closed());
        assert!(stream.pending_body.is_none());
    }
}
