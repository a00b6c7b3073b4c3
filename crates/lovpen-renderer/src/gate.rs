//! Render supersession.
//!
//! Every render request takes a [`RenderTicket`] from the shared
//! [`RenderGate`]. When the render finishes, [`RenderGate::complete`] only
//! passes the result through if no newer ticket was issued meanwhile, so a
//! slow render can never overwrite the output of a later one.
//!
//! This is API for long-lived hosts such as an editor preview that re-renders
//! on every keystroke. The one-shot `lovpen render` command has a single
//! request per process and does not take tickets.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number of one render request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderTicket(u64);

impl RenderTicket {
    #[must_use]
    pub fn sequence(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RenderGate {
    latest: AtomicU64,
}

impl RenderGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket newer than every ticket issued before.
    pub fn issue(&self) -> RenderTicket {
        RenderTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is still the newest one.
    #[must_use]
    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Pass `output` through if `ticket` is current; drop it otherwise.
    pub fn complete<T>(&self, ticket: RenderTicket, output: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(output)
        } else {
            tracing::debug!(ticket = ticket.0, "dropping superseded render");
            None
        }
    }
}
