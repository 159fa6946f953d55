/*
 * pipeline.rs
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

//! Pipeline: an ordered chain of named channel handlers over one channel.
//!
//! Inbound bytes flow head to tail; outbound writes flow tail to head and
//! past the head into the channel. The pipeline owns the handler contexts;
//! contexts hold only a weak back-reference to the pipeline, upgraded for
//! the duration of a single write, so the node graph carries no strong
//! cycle.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use bytes::Bytes;

use super::channel::Channel;
use super::handler::ChannelHandler;
use crate::error::Error;

/// A handler's position in the pipeline: its routing links plus the
/// handler itself.
pub struct HandlerContext {
    pipeline: Weak<Pipeline>,
    handler: Box<dyn ChannelHandler>,
    next: OnceLock<Arc<HandlerContext>>,
    prev: OnceLock<Weak<HandlerContext>>,
}

impl HandlerContext {
    fn on_read(&self, buf: &Bytes) -> Result<(), Error> {
        self.handler.on_read(self, buf)
    }

    /// Forward inbound bytes to the next handler, if any.
    pub fn next(&self, buf: &Bytes) -> Result<(), Error> {
        match self.next.get() {
            Some(next) => next.on_read(buf),
            None => Ok(()),
        }
    }

    /// Send bytes outbound through this handler's own write hook.
    pub fn write(&self, buf: Bytes) {
        self.handler.write(self, buf);
    }

    /// Propagate outbound bytes toward the head; past the head they reach
    /// the channel through the pipeline.
    pub fn write_next(&self, buf: Bytes) {
        if let Some(prev) = self.prev.get().and_then(Weak::upgrade) {
            prev.write(buf);
        } else if let Some(pipeline) = self.pipeline.upgrade() {
            pipeline.write(buf);
        }
    }

    /// The owning pipeline, while it is still alive.
    pub fn pipeline(&self) -> Option<Arc<Pipeline>> {
        self.pipeline.upgrade()
    }
}

type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct PipelineInner {
    handlers: Vec<(String, Arc<HandlerContext>)>,
    on_close: Option<CloseCallback>,
}

/// Ordered list of named handlers wrapping one [`Channel`].
pub struct Pipeline {
    channel: Channel,
    inner: Mutex<PipelineInner>,
}

impl Pipeline {
    pub fn new(channel: Channel) -> Arc<Pipeline> {
        Arc::new(Pipeline {
            channel,
            inner: Mutex::new(PipelineInner::default()),
        })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Append a handler under a unique name.
    pub fn add_last(
        self: &Arc<Self>,
        name: &str,
        handler: Box<dyn ChannelHandler>,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.handlers.iter().any(|(n, _)| n == name) {
            return Err(Error::DuplicateHandlerName(name.to_string()));
        }
        let context = Arc::new(HandlerContext {
            pipeline: Arc::downgrade(self),
            handler,
            next: OnceLock::new(),
            prev: OnceLock::new(),
        });
        if let Some((_, last)) = inner.handlers.last() {
            let _ = last.next.set(context.clone());
            let _ = context.prev.set(Arc::downgrade(last));
        }
        inner.handlers.push((name.to_string(), context));
        Ok(())
    }

    /// Register the hook invoked once when the channel reports EOF.
    pub fn on_close(&self, callback: impl FnOnce() + Send + 'static) {
        self.inner.lock().unwrap().on_close = Some(Box::new(callback));
    }

    /// Bind to the channel's read callback and begin inbound flow.
    pub fn start_read(self: &Arc<Self>) {
        let pipeline = self.clone();
        self.channel.start_read(move |buf| {
            if buf.is_empty() {
                let callback = pipeline.inner.lock().unwrap().on_close.take();
                if let Some(callback) = callback {
                    callback();
                }
                return;
            }
            let head = pipeline
                .inner
                .lock()
                .unwrap()
                .handlers
                .first()
                .map(|(_, context)| context.clone());
            if let Some(head) = head {
                if let Err(e) = head.on_read(&buf) {
                    tracing::warn!(
                        "connection {}: handler error, closing: {e}",
                        pipeline.channel.id()
                    );
                    pipeline.channel.close();
                }
            }
        });
    }

    /// Terminal sink for outbound flow.
    pub fn write(&self, buf: Bytes) {
        self.channel.write(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, H2Error};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    async fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) =
            tokio::join!(TcpStream::connect(addr), async { listener.accept().await });
        (client.unwrap(), accepted.unwrap().0)
    }

    /// Records inbound traffic with a tag, forwards, and echoes outbound
    /// writes through its own hook with the tag appended.
    struct Tagging {
        tag: &'static str,
        seen: mpsc::UnboundedSender<(&'static str, Bytes)>,
    }

    impl ChannelHandler for Tagging {
        fn on_read(&self, ctx: &HandlerContext, buf: &Bytes) -> Result<(), Error> {
            let _ = self.seen.send((self.tag, buf.clone()));
            ctx.next(buf)
        }
    }

    /// Terminal handler that writes a fixed reply for every inbound chunk.
    struct Replying;

    impl ChannelHandler for Replying {
        fn on_read(&self, ctx: &HandlerContext, _buf: &Bytes) -> Result<(), Error> {
            ctx.write(Bytes::from_static(b"reply"));
            Ok(())
        }
    }

    /// Terminal handler that always fails.
    struct Failing;

    impl ChannelHandler for Failing {
        fn on_read(&self, _ctx: &HandlerContext, _buf: &Bytes) -> Result<(), Error> {
            Err(Error::Protocol(H2Error::connection(
                ErrorCode::ProtocolError,
                "boom",
            )))
        }
    }

    #[tokio::test]
    async fn duplicate_handler_name_is_rejected() {
        let (_client, server) = tcp_pair().await;
        let pipeline = Pipeline::new(Channel::new(server, 1));
        let (tx, _rx) = mpsc::unbounded_channel();
        pipeline
            .add_last("tag", Box::new(Tagging { tag: "a", seen: tx.clone() }))
            .unwrap();
        let err = pipeline
            .add_last("tag", Box::new(Tagging { tag: "b", seen: tx }))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateHandlerName(name) if name == "tag"));
    }

    #[tokio::test]
    async fn inbound_flows_head_to_tail() {
        let (mut client, server) = tcp_pair().await;
        let pipeline = Pipeline::new(Channel::new(server, 1));
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline
            .add_last("first", Box::new(Tagging { tag: "first", seen: tx.clone() }))
            .unwrap();
        pipeline
            .add_last("second", Box::new(Tagging { tag: "second", seen: tx }))
            .unwrap();
        pipeline.start_read();

        client.write_all(b"ping").await.unwrap();
        let (tag, buf) = rx.recv().await.unwrap();
        assert_eq!((tag, &buf[..]), ("first", &b"ping"[..]));
        let (tag, buf) = rx.recv().await.unwrap();
        assert_eq!((tag, &buf[..]), ("second", &b"ping"[..]));
    }

    #[tokio::test]
    async fn terminal_write_reaches_the_socket() {
        let (mut client, server) = tcp_pair().await;
        let pipeline = Pipeline::new(Channel::new(server, 1));
        let (tx, _rx) = mpsc::unbounded_channel();
        pipeline
            .add_last("tag", Box::new(Tagging { tag: "tag", seen: tx }))
            .unwrap();
        pipeline.add_last("replier", Box::new(Replying)).unwrap();
        pipeline.start_read();

        client.write_all(b"ping").await.unwrap();
        let mut reply = [0u8; 5];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"reply");
    }

    #[tokio::test]
    async fn handler_error_closes_the_channel() {
        let (mut client, server) = tcp_pair().await;
        let pipeline = Pipeline::new(Channel::new(server, 1));
        pipeline.add_last("failing", Box::new(Failing)).unwrap();
        pipeline.start_read();

        client.write_all(b"ping").await.unwrap();
        let mut buf = Vec::new();
        // peer observes the close as EOF
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn on_close_fires_once_at_eof() {
        let (mut client, server) = tcp_pair().await;
        let pipeline = Pipeline::new(Channel::new(server, 1));
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline.on_close(move || {
            let _ = tx.send(());
        });
        pipeline.start_read();

        client.shutdown().await.unwrap();
        assert!(rx.recv().await.is_some());
    }
}
