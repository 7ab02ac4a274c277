use std::sync::{mpsc, Mutex, PoisonError};

bitflags::bitflags! {
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PgraphIntr: u32 {
        const NOTIFY         = 1 << 0;
        const CONTEXT_SWITCH = 1 << 12;
        const ERROR          = 1 << 20;
    }
}

/// The interrupt controller of the device, asked to re-evaluate its line
/// whenever the graphics engine sets a pending bit.
///
/// Implementations must not call back into the graphics engine while
/// handling `raise`, acknowledgement happens later through the `INTR` register.
pub trait InterruptRequester: Send + Sync {
    fn raise(&self, pending: PgraphIntr);
}

/// Drops every request, for setups where nothing waits on interrupts
#[derive(Default)]
pub struct NoInterrupts;

impl InterruptRequester for NoInterrupts {
    fn raise(&self, _pending: PgraphIntr) {}
}

/// Forwards interrupt requests to another thread over a channel
pub struct InterruptChannel {
    sender: Mutex<mpsc::Sender<PgraphIntr>>,
}

impl InterruptChannel {
    pub fn new() -> (Self, mpsc::Receiver<PgraphIntr>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl InterruptRequester for InterruptChannel {
    fn raise(&self, pending: PgraphIntr) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.send(pending).is_err() {
            log::warn!("interrupt receiver gone, dropping {:?}", pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_forwards_requests() {
        let (channel, receiver) = InterruptChannel::new();
        channel.raise(PgraphIntr::ERROR);
        assert_eq!(receiver.recv().unwrap(), PgraphIntr::ERROR);
    }
}
