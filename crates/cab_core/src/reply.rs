//! Typed, addressable reply handles.
//!
//! A [ReplyHandle] is the capability a caller hands to a cab so the cab can answer later,
//! from its own task, without any call stack linking the two. Handles are cheap to clone
//! and compare by [Address], so a recipient identity survives being stored in cab state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

static NEXT_ADDRESS: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u64);

impl Address {
    fn next() -> Self {
        Self(NEXT_ADDRESS.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Receiving side of a [ReplyHandle].
pub type Mailbox<T> = mpsc::UnboundedReceiver<T>;

pub struct ReplyHandle<T> {
    address: Address,
    sender: mpsc::UnboundedSender<T>,
}

impl<T> ReplyHandle<T> {
    /// Creates a fresh mailbox and the handle that delivers into it.
    pub fn channel() -> (Self, Mailbox<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                address: Address::next(),
                sender,
            },
            receiver,
        )
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// One-way send. Never blocks; returns `false` when the mailbox has been dropped.
    pub fn tell(&self, message: T) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<T> Clone for ReplyHandle<T> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            sender: self.sender.clone(),
        }
    }
}

impl<T> PartialEq for ReplyHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl<T> Eq for ReplyHandle<T> {}

impl<T> fmt::Debug for ReplyHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyHandle")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_address() {
        let (a, _rx_a) = ReplyHandle::<u32>::channel();
        let (b, _rx_b) = ReplyHandle::<u32>::channel();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn tell_reports_dropped_mailbox() {
        let (handle, mut mailbox) = ReplyHandle::<u32>::channel();
        assert!(handle.tell(7));
        assert_eq!(mailbox.try_recv().expect("delivered"), 7);

        drop(mailbox);
        assert!(handle.is_closed());
        assert!(!handle.tell(8));
    }
}
