//! Condvar-backed work queue
//!
//! The producer pushes synthesized orders; workers block on `pop` until an
//! order arrives or the queue is closed and drained. Closing is idempotent
//! and wakes every waiter so the pool can exit cleanly.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use types::order::Order;

#[derive(Default)]
struct QueueState {
    orders: VecDeque<Order>,
    done: bool,
}

/// Multi-producer multi-consumer order queue.
#[derive(Default)]
pub struct OrderQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, order: Order) {
        {
            let mut state = self.state.lock();
            state.orders.push_back(order);
        }
        self.available.notify_one();
    }

    /// Block until an order is available. Returns None once the queue has
    /// been closed and fully drained.
    pub fn pop(&self) -> Option<Order> {
        let mut state = self.state.lock();
        while state.orders.is_empty() && !state.done {
            self.available.wait(&mut state);
        }
        state.orders.pop_front()
    }

    /// Signal the end of production and wake every waiting worker.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            state.done = true;
        }
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
