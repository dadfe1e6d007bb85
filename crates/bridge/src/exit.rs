use tokio::sync::watch;

/// Resolves when the service tears down after the message that produced it.
///
/// The host keeps its background execution alive (foreground service,
/// notification extension) until this resolves.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    rx: watch::Receiver<u64>,
    start: u64,
}

impl ExitSignal {
    pub(crate) fn new(rx: watch::Receiver<u64>) -> Self {
        let start = *rx.borrow();
        Self { rx, start }
    }

    pub fn is_signaled(&self) -> bool {
        *self.rx.borrow() > self.start
    }

    pub async fn wait(mut self) {
        let start = self.start;
        // a closed channel means the controller is gone, which is an exit too
        let _ = self.rx.wait_for(|teardowns| *teardowns > start).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_on_next_teardown_only() {
        let (tx, rx) = watch::channel(3);
        let signal = ExitSignal::new(rx);
        assert!(!signal.is_signaled());

        tx.send_modify(|teardowns| *teardowns += 1);
        assert!(signal.is_signaled());
        signal.clone().wait().await;

        let later = ExitSignal::new(tx.subscribe());
        assert!(!later.is_signaled());
        drop(tx);
        later.wait().await;
    }
}
