use futures::future::{AbortHandle, AbortRegistration};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation handle for one in-flight request.
///
/// Cancelling aborts the transport future registered with the ticket and marks
/// the ticket so that code settling the request can tell its outcome is stale.
#[derive(Clone, Debug)]
pub struct Ticket {
    cancelled: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl Ticket {
    fn new() -> (Ticket, AbortRegistration) {
        let (abort, registration) = AbortHandle::new_pair();
        let ticket = Ticket {
            cancelled: Arc::new(AtomicBool::new(false)),
            abort,
        };
        (ticket, registration)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Tracks the single live request of some kind.
///
/// Starting a request cancels the one before it, and dropping the slot cancels
/// whatever is still outstanding.
#[derive(Debug, Default)]
pub struct RequestSlot {
    current: Option<Ticket>,
}

impl RequestSlot {
    pub fn begin(&mut self) -> (Ticket, AbortRegistration) {
        self.cancel();
        let (ticket, registration) = Ticket::new();
        self.current = Some(ticket.clone());
        (ticket, registration)
    }

    pub fn cancel(&mut self) {
        if let Some(ticket) = self.current.take() {
            ticket.cancel();
        }
    }
}

impl Drop for RequestSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs a cleanup action if a request future is dropped before it settles.
pub struct Unsettled<F: FnOnce()> {
    on_abandon: Option<F>,
}

impl<F: FnOnce()> Unsettled<F> {
    pub fn new(on_abandon: F) -> Unsettled<F> {
        Unsettled {
            on_abandon: Some(on_abandon),
        }
    }

    pub fn settle(&mut self) {
        self.on_abandon = None;
    }
}

impl<F: FnOnce()> Drop for Unsettled<F> {
    fn drop(&mut self) {
        if let Some(on_abandon) = self.on_abandon.take() {
            on_abandon();
        }
    }
}
