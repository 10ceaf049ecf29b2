//! Bounded connection queue
//!
//! The classic bounded producer/consumer buffer between the registrar and
//! the session manager pool: a fixed circular slot array guarded by two
//! counting semaphores (empty slots, filled slots) plus a mutex for the
//! slot accesses themselves. The registrar blocks when every slot is
//! filled, which is how backpressure reaches the registration channel;
//! managers block while the queue is empty.

use parking_lot::{Condvar, Mutex};

use crate::protocol::ConnectRequest;

// =============================================================================
// Counting Semaphore
// =============================================================================

/// A counting semaphore on a Mutex/Condvar pair
///
/// `close()` wakes every waiter; a closed semaphore still hands out the
/// permits that were outstanding at close time, so consumers drain what
/// was already produced before observing the close.
struct Semaphore {
    state: Mutex<SemState>,
    available: Condvar,
}

struct SemState {
    permits: usize,
    closed: bool,
}

impl Semaphore {
    fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(SemState {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Take one permit, blocking while none are available
    ///
    /// Returns `false` once the semaphore is closed and drained.
    fn acquire(&self) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.permits > 0 {
                state.permits -= 1;
                return true;
            }
            if state.closed {
                return false;
            }
            self.available.wait(&mut state);
        }
    }

    /// Hand back one permit and wake a waiter
    fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        self.available.notify_one();
    }

    /// Wake every waiter and make further empty acquires fail
    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.available.notify_all();
    }
}

// =============================================================================
// Connection Queue
// =============================================================================

/// Fixed-capacity FIFO of connection requests
pub struct ConnectionQueue {
    slots: Mutex<Slots>,
    empty: Semaphore,
    filled: Semaphore,
    capacity: usize,
}

struct Slots {
    buf: Box<[Option<ConnectRequest>]>,
    head: usize,
    tail: usize,
}

impl ConnectionQueue {
    /// Create a queue with `capacity` slots
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; `Config::validate` rejects that
    /// before a queue is ever built.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be nonzero");
        Self {
            slots: Mutex::new(Slots {
                buf: (0..capacity).map(|_| None).collect(),
                head: 0,
                tail: 0,
            }),
            empty: Semaphore::new(capacity),
            filled: Semaphore::new(0),
            capacity,
        }
    }

    /// Enqueue one request, blocking while the queue is full
    ///
    /// Returns `false` if the queue was closed instead.
    pub fn push(&self, request: ConnectRequest) -> bool {
        if !self.empty.acquire() {
            return false;
        }
        {
            let mut slots = self.slots.lock();
            let tail = slots.tail;
            debug_assert!(slots.buf[tail].is_none());
            slots.buf[tail] = Some(request);
            slots.tail = (tail + 1) % self.capacity;
        }
        self.filled.release();
        true
    }

    /// Dequeue one request, blocking while the queue is empty
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub fn pop(&self) -> Option<ConnectRequest> {
        if !self.filled.acquire() {
            return None;
        }
        let request = {
            let mut slots = self.slots.lock();
            let head = slots.head;
            let request = slots.buf[head].take();
            debug_assert!(request.is_some());
            slots.head = (head + 1) % self.capacity;
            request
        };
        self.empty.release();
        request
    }

    /// Close the queue: blocked producers give up, consumers drain the
    /// remaining requests and then receive `None`
    pub fn close(&self) {
        self.empty.close();
        self.filled.close();
    }

    /// Queue capacity in slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of requests currently queued
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .buf
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// True when no requests are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
