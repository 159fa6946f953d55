/*
 * channel.rs
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

//! Channel: one TCP socket presented as a single in-order byte stream.
//!
//! Reads are issued with a monotone submission index and reassembled
//! through a min-heap keyed by that index, so completions may be processed
//! on any worker in any order without reordering the stream. Writes are
//! funneled through one FIFO writer task, so on-wire order matches
//! submission order.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

const READ_CHUNK_SIZE: usize = 8192;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type ReadCallback = Box<dyn FnMut(Bytes) + Send + 'static>;

enum OutMsg {
    Data(Bytes),
    Shutdown,
    Close,
}

/// One entry awaiting in-order delivery: the read submission index and the
/// bytes that read produced (empty for EOF).
#[derive(Debug)]
struct Gather {
    index: u64,
    buf: Bytes,
}

impl PartialEq for Gather {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Gather {}

impl PartialOrd for Gather {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Gather {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // reversed so the heap keeps the lowest index on top
        other.index.cmp(&self.index)
    }
}

/// Reorders read completions by submission index and releases contiguous
/// runs. After an empty (EOF) entry is released nothing further comes out.
#[derive(Debug, Default)]
struct GatherBuffer {
    next_index: u64,
    awaiting_index: u64,
    heap: BinaryHeap<Gather>,
    finished: bool,
}

impl GatherBuffer {
    fn submit(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn complete(&mut self, index: u64, buf: Bytes) -> Vec<Bytes> {
        let mut ready = Vec::new();
        if self.finished {
            return ready;
        }
        self.heap.push(Gather { index, buf });
        while let Some(top) = self.heap.peek() {
            if top.index != self.awaiting_index {
                break;
            }
            let entry = match self.heap.pop() {
                Some(entry) => entry,
                None => break,
            };
            self.awaiting_index += 1;
            let eof = entry.buf.is_empty();
            ready.push(entry.buf);
            if eof {
                self.finished = true;
                break;
            }
        }
        ready
    }
}

struct Shared {
    // Set once the read side is done: EOF observed, read error, or close().
    done: AtomicBool,
    notify: Notify,
}

/// Owns one TCP socket. `start_read` begins delivering the in-order byte
/// stream to a callback; `write` enqueues outbound bytes; `shutdown` and
/// `close` are the two-phase teardown.
pub struct Channel {
    id: u64,
    scatter_reads: usize,
    out_tx: UnboundedSender<OutMsg>,
    shared: Arc<Shared>,
    read_half: Mutex<Option<OwnedReadHalf>>,
}

impl Channel {
    pub fn new(stream: TcpStream, scatter_reads: usize) -> Channel {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let (read_half, write_half) = stream.into_split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(id, out_rx, write_half));
        tracing::debug!("TCP connection {id} opened");
        Channel {
            id,
            scatter_reads: scatter_reads.max(1),
            out_tx,
            shared: Arc::new(Shared {
                done: AtomicBool::new(false),
                notify: Notify::new(),
            }),
            read_half: Mutex::new(Some(read_half)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Begin reading. `callback` receives each contiguous in-order chunk;
    /// one empty chunk signals EOF, after which no further calls occur.
    pub fn start_read(&self, callback: impl FnMut(Bytes) + Send + 'static) {
        let half = match self.read_half.lock().unwrap().take() {
            Some(half) => half,
            None => {
                tracing::warn!("connection {}: start_read called twice", self.id);
                return;
            }
        };
        let half = Arc::new(tokio::sync::Mutex::new(half));
        let gather = Arc::new(Mutex::new(GatherBuffer::default()));
        let callback: Arc<Mutex<ReadCallback>> = Arc::new(Mutex::new(Box::new(callback)));
        for _ in 0..self.scatter_reads {
            tokio::spawn(read_loop(
                self.id,
                self.shared.clone(),
                half.clone(),
                gather.clone(),
                callback.clone(),
            ));
        }
    }

    /// Enqueue an outbound write. Silently dropped once the socket is closed.
    pub fn write(&self, data: Bytes) {
        if self.out_tx.send(OutMsg::Data(data)).is_err() {
            tracing::trace!("connection {}: dropping write after close", self.id);
        }
    }

    /// Half-close: drain pending writes, then shut down the write direction.
    pub fn shutdown(&self) {
        let _ = self.out_tx.send(OutMsg::Shutdown);
    }

    /// Full close: stop the reader and release the socket after pending
    /// writes have drained.
    pub fn close(&self) {
        if !self.shared.done.swap(true, Ordering::AcqRel) {
            self.shared.notify.notify_waiters();
        }
        let _ = self.out_tx.send(OutMsg::Close);
    }
}

/// One of the K concurrent readers. The socket read itself is serialized by
/// the read-half lock, with the submission index taken under that lock; the
/// completion is then pushed through the gather buffer, which restores
/// delivery order however the tasks get scheduled afterwards.
async fn read_loop(
    id: u64,
    shared: Arc<Shared>,
    half: Arc<tokio::sync::Mutex<OwnedReadHalf>>,
    gather: Arc<Mutex<GatherBuffer>>,
    callback: Arc<Mutex<ReadCallback>>,
) {
    loop {
        let (index, data) = {
            let mut half = half.lock().await;
            let index = gather.lock().unwrap().submit();
            if shared.done.load(Ordering::Acquire) {
                // closed before this read was issued; flows through the
                // gather buffer as an EOF completion
                (index, Bytes::new())
            } else {
                let notified = shared.notify.notified();
                let mut tmp = [0u8; READ_CHUNK_SIZE];
                let data = tokio::select! {
                    _ = notified => Bytes::new(),
                    res = half.read(&mut tmp) => match res {
                        Ok(n) => Bytes::copy_from_slice(&tmp[..n]),
                        Err(e) => {
                            tracing::debug!("connection {id}: read error treated as EOF: {e}");
                            Bytes::new()
                        }
                    },
                };
                (index, data)
            }
        };

        let eof = data.is_empty();
        if eof && !shared.done.swap(true, Ordering::AcqRel) {
            shared.notify.notify_waiters();
            tracing::info!("TCP connection {id} closed");
        }

        {
            // Heap and delivery stay under the channel mutex so in-order
            // runs from racing completions cannot interleave.
            let mut gather = gather.lock().unwrap();
            let ready = gather.complete(index, data);
            if !ready.is_empty() {
                let mut callback = callback.lock().unwrap();
                for chunk in ready {
                    (*callback)(chunk);
                }
            }
        }

        if eof {
            return;
        }
    }
}

async fn write_loop(id: u64, mut rx: UnboundedReceiver<OutMsg>, mut half: OwnedWriteHalf) {
    while let Some(msg) = rx.recv().await {
        match msg {
            OutMsg::Data(buf) => {
                tracing::trace!("connection {id}: writing {} bytes", buf.len());
                if let Err(e) = half.write_all(&buf).await {
                    tracing::warn!("connection {id}: write failed: {e}");
                    return;
                }
            }
            OutMsg::Shutdown => {
                if let Err(e) = half.shutdown().await {
                    tracing::debug!("connection {id}: shutdown failed: {e}");
                }
            }
            OutMsg::Close => return,
        }
    }
}
