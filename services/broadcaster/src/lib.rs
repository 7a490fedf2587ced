//! Broadcaster service
//!
//! Fans serialized trade and top-of-book frames out to all connected
//! WebSocket subscribers. The simulation core stays synchronous: producers
//! enqueue frames under a condvar-backed queue, a dedicated worker thread
//! drains it to the per-session send queues, and a small tokio runtime in
//! the background owns the accept loop and socket I/O.

pub mod messages;
mod server;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use axum::extract::ws::{Message, Utf8Bytes};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use types::instrument::Instrument;
use types::now_nanos;
use types::transaction::Transaction;

pub use messages::BroadcastMessage;

#[derive(Error, Debug)]
pub enum BroadcasterError {
    #[error("Failed to start broadcaster: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Default)]
struct OutboundQueue {
    messages: VecDeque<String>,
    stop: bool,
}

/// State shared between the enqueueing side, the fan-out worker, and the
/// session tasks.
pub(crate) struct Shared {
    queue: Mutex<OutboundQueue>,
    available: Condvar,
    pub(crate) sessions: Mutex<Vec<UnboundedSender<Message>>>,
    order_counter: AtomicU64,
    broadcast_interval: u64,
}

/// Whether the n-th processed order is due for a book snapshot.
fn due_for_broadcast(count: u64, interval: u64) -> bool {
    count % interval == 0
}

/// Handle owning the server runtime and the fan-out worker.
pub struct Broadcaster {
    shared: Arc<Shared>,
    runtime: Option<tokio::runtime::Runtime>,
    worker: Option<thread::JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl Broadcaster {
    /// Bind the WebSocket listener and start the fan-out worker. Pass port
    /// zero to let the OS choose (tests).
    pub fn start(port: u16, broadcast_interval: u64) -> Result<Self, BroadcasterError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(OutboundQueue::default()),
            available: Condvar::new(),
            sessions: Mutex::new(Vec::new()),
            order_counter: AtomicU64::new(0),
            broadcast_interval: broadcast_interval.max(1),
        });

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let listener =
            runtime.block_on(tokio::net::TcpListener::bind(("0.0.0.0", port)))?;
        let local_addr = listener.local_addr()?;
        runtime.spawn(server::serve(listener, Arc::clone(&shared)));

        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || fanout_worker(worker_shared));

        tracing::info!(%local_addr, "broadcaster listening");

        Ok(Self { shared, runtime: Some(runtime), worker: Some(worker), local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Queue a trade frame for every connected session.
    pub fn broadcast_trade(&self, transaction: &Transaction) {
        self.enqueue(BroadcastMessage::trade(transaction).to_json());
    }

    /// Queue a top-of-book frame, sampled one in every `broadcast_interval`
    /// processed orders. Skips the frame rather than stalling the worker
    /// when the queue is contended.
    pub fn broadcast_book(
        &self,
        instrument: Instrument,
        best_bid: Option<f64>,
        best_ask: Option<f64>,
    ) {
        let count = self.shared.order_counter.fetch_add(1, Ordering::Relaxed);
        if !due_for_broadcast(count, self.shared.broadcast_interval) {
            return;
        }

        let frame = BroadcastMessage::book(instrument, best_bid, best_ask, now_nanos()).to_json();
        if let Some(mut queue) = self.shared.queue.try_lock() {
            queue.messages.push_back(frame);
            drop(queue);
            self.shared.available.notify_one();
        }
    }

    fn enqueue(&self, frame: String) {
        {
            let mut queue = self.shared.queue.lock();
            queue.messages.push_back(frame);
        }
        self.shared.available.notify_one();
    }

    /// Number of sessions currently registered.
    pub fn session_count(&self) -> usize {
        self.shared.sessions.lock().len()
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock();
            queue.stop = true;
        }
        self.shared.available.notify_all();

        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Drain queued frames and fan each one to every open session; sessions
/// whose receiving task has gone away are dropped on the way through.
fn fanout_worker(shared: Arc<Shared>) {
    loop {
        let frame = {
            let mut queue = shared.queue.lock();
            while queue.messages.is_empty() && !queue.stop {
                shared.available.wait(&mut queue);
            }
            if queue.stop && queue.messages.is_empty() {
                return;
            }
            queue.messages.pop_front()
        };

        if let Some(frame) = frame {
            let message = Message::Text(Utf8Bytes::from(frame));
            let mut sessions = shared.sessions.lock();
            sessions.retain(|session| session.send(message.clone()).is_ok());
        }
    }
}
