//! The downstream capability that receives routed events
use crate::{Event, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A destination for routed events
///
/// The router calls [`Sink::deliver`] once per semantic change and awaits it before the
/// subscription moves on to the next notification, so a slow sink slows down the watch.
///
/// # Concurrency
///
/// Implementations take `&self` and must be `Send + Sync`: one sink handle may be shared
/// by several handler invocations that run concurrently for distinct events.
/// Any internal buffering, locking or fan-out is the implementation's business.
///
/// # Errors
///
/// A failed delivery is reported back to the router, which logs it. It is never retried.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Deliver one routed pair
    ///
    /// `previous` is `None` for creations and the prior state for updates.
    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<()>;

    /// Release any resources held by the sink
    ///
    /// Called once when the router shuts down. The default does nothing.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<()> {
        (**self).deliver(current, previous).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn deliver(&self, current: &Event, previous: Option<&Event>) -> Result<()> {
        (**self).deliver(current, previous).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Sink for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn deliver(&self, _current: &Event, _previous: Option<&Event>) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn shared_sink_delegates_to_inner() {
        let inner = Arc::new(Counting::default());
        let shared: Arc<dyn Sink> = inner.clone();
        let boxed: Box<dyn Sink> = Box::new(shared.clone());
        boxed.deliver(&Event::default(), None).await.unwrap();
        shared.deliver(&Event::default(), None).await.unwrap();
        assert_eq!(boxed.name(), "counting");
        assert!(boxed.close().await.is_ok());
        assert_eq!(inner.0.load(Ordering::SeqCst), 2);
    }
}
