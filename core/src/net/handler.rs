/*
 * handler.rs
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

//! Channel handler trait: a unit in a pipeline that may transform,
//! observe, or consume bytes.

use bytes::Bytes;

use super::pipeline::HandlerContext;
use crate::error::Error;

/// One behavior unit in a [`super::Pipeline`].
///
/// Inbound bytes arrive through `on_read`; a handler decides whether to
/// forward them with `ctx.next(buf)`. Outbound bytes pass through the
/// `write` hook on their way toward the channel; the default propagates
/// them unchanged. An `Err` from `on_read` is trapped by the pipeline,
/// which logs it and closes the channel.
pub trait ChannelHandler: Send + Sync + 'static {
    fn on_read(&self, ctx: &HandlerContext, buf: &Bytes) -> Result<(), Error> {
        ctx.next(buf)
    }

    fn write(&self, ctx: &HandlerContext, buf: Bytes) {
        ctx.write_next(buf);
    }
}
