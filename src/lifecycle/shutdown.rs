//! Stop signal shared by the listener and the signal handler.
//!
//! `main` hands one receiver to `HttpServer::run`; the signal task fires it.
//! Integration tests use the same handle to stop each ephemeral proxy.

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to every running server.
///
/// Firing it makes `axum::serve` stop accepting connections; blob transfers
/// already streaming run to completion.
pub struct Shutdown {
    notify: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self { notify }
    }

    /// Receiver to pass to a server before it starts accepting.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    /// Fire the signal. A server that already stopped is not an error.
    pub fn trigger(&self) {
        let _ = self.notify.send(());
    }

    /// Servers that have not yet dropped their receiver.
    pub fn receiver_count(&self) -> usize {
        self.notify.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_without_servers_is_harmless() {
        let shutdown = Shutdown::default();
        shutdown.trigger();

        let rx = shutdown.subscribe();
        drop(rx);
        assert_eq!(shutdown.receiver_count(), 0);
        shutdown.trigger();
    }
}
