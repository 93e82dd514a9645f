//! Values resolved on demand rather than at construction.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use stevedore_common::error::Result;

/// Boxed future yielded by a [`Deferred`] thunk.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// A value whose concrete contents are looked up each time it is resolved.
///
/// The thunk is captured once and invoked fresh on every [`Deferred::resolve`];
/// results are never cached.
pub struct Deferred<T> {
    thunk: Arc<dyn Fn() -> BoxFuture<T> + Send + Sync>,
}

impl<T: 'static> Deferred<T> {
    /// Wraps a thunk producing the value.
    pub fn new<F, Fut>(thunk: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            thunk: Arc::new(move || -> BoxFuture<T> { Box::pin(thunk()) }),
        }
    }

    /// A deferred that always resolves to a copy of `value`.
    pub fn ready(value: T) -> Self
    where
        T: Clone + Send + Sync,
    {
        Self::new(move || {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// Invokes the thunk and awaits its value.
    ///
    /// # Errors
    ///
    /// Returns whatever error the thunk produces.
    pub async fn resolve(&self) -> Result<T> {
        (self.thunk)().await
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            thunk: Arc::clone(&self.thunk),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}
