/*
 * lib.rs
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

//! Rapidray core: a cleartext (h2c, prior-knowledge) HTTP/2 server engine.
//!
//! The crate is layered leaves-first: a [`net::Channel`] turns one TCP
//! socket into an ordered byte stream, a [`net::Pipeline`] routes those
//! bytes through a chain of named handlers, and the terminal
//! [`http::Http2Handler`] speaks RFC 7540: preface, frame codec, per-stream
//! state, flow control, and request dispatch to a user-supplied
//! [`Dispatcher`].

pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod server;

pub use config::ServerConfig;
pub use error::{Error, ErrorCode, H2Error};
pub use http::dispatcher::Dispatcher;
pub use http::headers::Headers;
pub use http::request::Request;
pub use http::response::{Response, ResponseBuilder, StatusCode};
pub use server::Server;
