/*
 * request.rs
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

//! HTTP request as seen by a dispatcher: the decoded header list, with
//! accessors for the RFC 7540 pseudo-headers.

use super::headers::Headers;

#[derive(Debug, Clone)]
pub struct Request {
    headers: Headers,
}

impl Request {
    pub fn new(headers: Headers) -> Request {
        Request { headers }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn method(&self) -> Option<&str> {
        self.headers.get(":method")
    }

    pub fn scheme(&self) -> Option<&str> {
        self.headers.get(":scheme")
    }

    pub fn authority(&self) -> Option<&str> {
        self.headers.get(":authority")
    }

    pub fn path(&self) -> Option<&str> {
        self.headers.get(":path")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_header_accessors() {
        let mut headers = Headers::new();
        headers.insert(":method", "GET");
        headers.insert(":scheme", "http");
        headers.insert(":path", "/index.html");
        headers.insert(":authority", "example.test");
        headers.insert("accept", "*/*");
        let request = Request::new(headers);
        assert_eq!(request.method(), Some("GET"));
        assert_eq!(request.scheme(), Some("http"));
        assert_eq!(request.path(), Some("/index.html"));
        assert_eq!(request.authority(), Some("example.test"));
        assert_eq!(request.headers().get("accept"), Some("*/*"));
    }
}
