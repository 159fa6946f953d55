/*
 * flow.rs
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

//! Flow-control window accounting.
//!
//! Each scope (connection, stream) carries two independent windows: a
//! receive window consumed by inbound DATA and replenished by the
//! WINDOW_UPDATE frames we emit, and a send window consumed by outbound
//! DATA and replenished by the WINDOW_UPDATE frames the peer sends.

use super::frame::MAX_WINDOW_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    /// The window went negative after accounting inbound data.
    Underflow,
    /// An increment pushed the window past 2^31 - 1.
    Overflow,
}

/// One direction of one flow-control scope. The size is signed: an
/// INITIAL_WINDOW_SIZE decrease can legally push a send window negative.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    size: i64,
    initial: i64,
}

impl Window {
    pub fn new(initial: u32) -> Window {
        Window {
            size: i64::from(initial),
            initial: i64::from(initial),
        }
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    /// Capacity currently usable for sending.
    pub fn available(&self) -> u32 {
        self.size.clamp(0, i64::from(MAX_WINDOW_SIZE)) as u32
    }

    /// Account `n` octets of inbound data against a receive window.
    pub fn consume(&mut self, n: u32) -> Result<(), FlowError> {
        self.size -= i64::from(n);
        if self.size < 0 {
            return Err(FlowError::Underflow);
        }
        Ok(())
    }

    /// Apply a WINDOW_UPDATE increment to a send window.
    pub fn grant(&mut self, n: u32) -> Result<(), FlowError> {
        self.size += i64::from(n);
        if self.size > i64::from(MAX_WINDOW_SIZE) {
            return Err(FlowError::Overflow);
        }
        Ok(())
    }

    /// Deduct sent data from a send window. The caller checks `available`.
    pub fn take(&mut self, n: u32) {
        self.size -= i64::from(n);
    }

    /// Shift the window by an INITIAL_WINDOW_SIZE delta.
    pub fn adjust(&mut self, delta: i64) {
        self.size += delta;
    }

    /// True when a receive window has dropped below half its initial value
    /// and should be replenished.
    pub fn needs_refill(&self) -> bool {
        self.size < self.initial / 2
    }

    /// Restore a receive window to its initial value, returning the
    /// WINDOW_UPDATE increment to emit.
    pub fn refill(&mut self) -> u32 {
        let increment = (self.initial - self.size).clamp(0, i64::from(MAX_WINDOW_SIZE)) as u32;
        self.size = self.initial;
        increment
    }
}
