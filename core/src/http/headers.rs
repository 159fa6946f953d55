/*
 * headers.rs
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

//! Ordered header list. HPACK hands headers back in order and may repeat
//! names, so this preserves both; lookups are case-insensitive per HTTP.

/// An ordered list of header name/value pairs, duplicates preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Headers {
        Headers::default()
    }

    /// Append a header; existing entries with the same name are kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Headers {
        Headers {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = std::vec::IntoIter<(&'a str, &'a str)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Length", "0");
        assert_eq!(headers.get("content-length"), Some("0"));
    }

    #[test]
    fn duplicates_and_order_are_preserved() {
        let mut headers = Headers::new();
        headers.insert("set-cookie", "a=1");
        headers.insert("server", "rapidray/1");
        headers.insert("set-cookie", "b=2");
        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(entries, vec![
            ("set-cookie", "a=1"),
            ("server", "rapidray/1"),
            ("set-cookie", "b=2"),
        ]);
        assert_eq!(headers.get("set-cookie"), Some("a=1"));
    }
}
