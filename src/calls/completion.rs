//! Per-call completion values
//!
//! Each issuing operation hands back a [`Completion`]: a one-shot slot the
//! completion callback fills. Callers that drive the tick loop themselves poll
//! it with [`Completion::try_take`]; async callers simply `.await` it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

pub use futures::channel::oneshot::Canceled;

/// Receiving side of a call's eventual result
#[derive(Debug)]
#[must_use = "a completion carries the only result of the call"]
pub struct Completion<T> {
    rx: oneshot::Receiver<T>,
    buffered: Option<T>,
    taken: bool,
    abandoned: bool,
}

// The buffered value is never pinned.
impl<T> Unpin for Completion<T> {}

/// Sending side, owned by the completion callback
#[derive(Debug)]
pub(crate) struct Completer<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Completer<T> {
    /// Deliver the result; a dropped [`Completion`] is not an error
    pub(crate) fn complete(self, value: T) {
        let _ = self.tx.send(value);
    }
}

impl<T> Completion<T> {
    pub(crate) fn pair() -> (Completer<T>, Completion<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Completer { tx },
            Completion {
                rx,
                buffered: None,
                taken: false,
                abandoned: false,
            },
        )
    }

    /// A completion that is already resolved
    pub fn ready(value: T) -> Self {
        let (completer, completion) = Self::pair();
        completer.complete(value);
        completion
    }

    fn refresh(&mut self) {
        if self.taken || self.abandoned || self.buffered.is_some() {
            return;
        }
        match self.rx.try_recv() {
            Ok(Some(value)) => self.buffered = Some(value),
            Ok(None) => {}
            Err(Canceled) => self.abandoned = true,
        }
    }

    /// Take the result if it has arrived; never blocks
    ///
    /// Returns `None` while the call is in flight, once the result has been
    /// taken, and when the call was abandoned (see [`Completion::is_abandoned`]).
    pub fn try_take(&mut self) -> Option<T> {
        self.refresh();
        let value = self.buffered.take();
        if value.is_some() {
            self.taken = true;
        }
        value
    }

    /// Whether the result has arrived and is waiting to be taken
    pub fn is_ready(&mut self) -> bool {
        self.refresh();
        self.buffered.is_some()
    }

    /// Whether the call was dropped without ever producing a result
    pub fn is_abandoned(&mut self) -> bool {
        self.refresh();
        self.abandoned
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, Canceled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(value) = this.buffered.take() {
            this.taken = true;
            return Poll::Ready(Ok(value));
        }
        if this.abandoned || this.taken {
            return Poll::Ready(Err(Canceled));
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(value)) => {
                this.taken = true;
                Poll::Ready(Ok(value))
            }
            Poll::Ready(Err(canceled)) => {
                this.abandoned = true;
                Poll::Ready(Err(canceled))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_take_before_and_after_completion() {
        let (completer, mut completion) = Completion::<u32>::pair();
        assert_eq!(completion.try_take(), None);
        completer.complete(7);
        assert_eq!(completion.try_take(), Some(7));
    }

    #[test]
    fn test_dropped_completer_marks_abandoned() {
        let (completer, mut completion) = Completion::<u32>::pair();
        assert!(!completion.is_abandoned());
        drop(completer);
        assert!(completion.is_abandoned());
        assert_eq!(completion.try_take(), None);
    }

    #[test]
    fn test_readiness_check_keeps_value() {
        let (completer, mut completion) = Completion::<u32>::pair();
        completer.complete(3);
        assert!(completion.is_ready());
        assert!(!completion.is_abandoned());
        assert_eq!(completion.try_take(), Some(3));
        assert!(!completion.is_abandoned());
        assert_eq!(completion.try_take(), None);
    }

    #[test]
    fn test_await_ready_completion() {
        let completion = Completion::ready("done");
        assert_eq!(futures::executor::block_on(completion), Ok("done"));
    }
}
