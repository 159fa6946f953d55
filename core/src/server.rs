/*
 * server.rs
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

//! Accept loop: one pipeline per accepted connection, registered in a
//! live set so pipelines stay alive until their channel closes.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::http::connection::Http2Handler;
use crate::http::dispatcher::Dispatcher;
use crate::net::{Channel, DumpHandler, Pipeline};

/// An h2c server: accepts TCP connections and speaks HTTP/2 to each,
/// handing every decoded request to the dispatcher.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    dispatcher: Arc<dyn Dispatcher>,
    pipelines: Arc<Mutex<HashMap<u64, Arc<Pipeline>>>>,
}

impl Server {
    pub async fn bind(config: ServerConfig, dispatcher: Arc<dyn Dispatcher>) -> io::Result<Server> {
        let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        Ok(Server {
            listener,
            config,
            dispatcher,
            pipelines: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> io::Result<()> {
        tracing::info!("listening on {}", self.listener.local_addr()?);
        loop {
            let (socket, peer) = self.listener.accept().await?;
            tracing::debug!("accepted connection from {peer}");
            if let Err(e) = self.attach(socket) {
                tracing::warn!("failed to set up pipeline: {e}");
            }
        }
    }

    fn attach(&self, socket: TcpStream) -> Result<(), Error> {
        let channel = Channel::new(socket, self.config.scatter_reads);
        let id = channel.id();
        let pipeline = Pipeline::new(channel);
        if self.config.dump_frames {
            pipeline.add_last("dump", Box::new(DumpHandler))?;
        }
        pipeline.add_last(
            "http2",
            Box::new(Http2Handler::new(&self.config, self.dispatcher.clone())),
        )?;
        self.pipelines.lock().unwrap().insert(id, pipeline.clone());
        let registry = Arc::downgrade(&self.pipelines);
        pipeline.on_close(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().unwrap().remove(&id);
            }
        });
        pipeline.start_read();
        Ok(())
    }
}
