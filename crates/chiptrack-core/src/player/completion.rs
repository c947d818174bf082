//! One-shot completion signal, armed once per played track.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Pending,
    Finished,
}

/// How a playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The stream played to its end.
    Finished,
    /// The stream was released first (closed or replaced by another track).
    Released,
}

/// Sending half, owned by the rendering side of one playback.
#[derive(Debug)]
pub(crate) struct Notifier {
    tx: Option<watch::Sender<Signal>>,
}

impl Notifier {
    /// Fires at most once; later calls are ignored.
    pub(crate) fn finish(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Signal::Finished);
        }
    }
}

/// Creates an armed notifier and the matching waiter.
pub(crate) fn channel() -> (Notifier, Done) {
    let (tx, rx) = watch::channel(Signal::Pending);
    (Notifier { tx: Some(tx) }, Done { rx })
}

/// Waiter for the completion of one playback. Cloning shares the same signal.
#[derive(Debug, Clone)]
pub struct Done {
    rx: watch::Receiver<Signal>,
}

impl Done {
    /// Resolves when the stream finishes or its playback is released.
    pub async fn wait(mut self) -> Completion {
        match self.rx.wait_for(|s| *s == Signal::Finished).await {
            Ok(_) => Completion::Finished,
            Err(_) => Completion::Released,
        }
    }

    /// Non-blocking check: `Some` once the outcome is known.
    pub fn poll(&self) -> Option<Completion> {
        if *self.rx.borrow() == Signal::Finished {
            Some(Completion::Finished)
        } else if self.rx.has_changed().is_err() {
            Some(Completion::Released)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finish_resolves_every_clone_once() {
        let (mut notifier, done) = channel();
        let other = done.clone();
        assert_eq!(done.poll(), None);
        notifier.finish();
        notifier.finish();
        assert_eq!(done.clone().wait().await, Completion::Finished);
        assert_eq!(other.wait().await, Completion::Finished);
    }

    #[tokio::test]
    async fn dropping_the_notifier_releases_waiters() {
        let (notifier, done) = channel();
        drop(notifier);
        assert_eq!(done.poll(), Some(Completion::Released));
        assert_eq!(done.wait().await, Completion::Released);
    }
}
