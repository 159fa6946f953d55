/*
 * dispatcher.rs
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

//! Dispatcher contract: the user-supplied function mapping a decoded
//! request to a response. It is never invoked with an engine lock held,
//! so it may block or perform its own I/O.

use super::request::Request;
use super::response::Response;

pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, request: &Request) -> Response;
}

impl<F> Dispatcher for F
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    fn dispatch(&self, request: &Request) -> Response {
        self(request)
    }
}
