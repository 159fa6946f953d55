/*
 * mod.rs
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

//! HTTP layer: request/response types, dispatcher contract, HPACK
//! adapter, and the HTTP/2 connection engine.

pub mod connection;
pub mod dispatcher;
pub mod h2;
pub mod headers;
pub mod hpack;
pub mod request;
pub mod response;

pub use connection::{Http2Connection, Http2Handler, Outcome};
pub use dispatcher::Dispatcher;
pub use headers::Headers;
pub use hpack::HeaderCodec;
pub use request::Request;
pub use response::{Response, ResponseBuilder, StatusCode};
