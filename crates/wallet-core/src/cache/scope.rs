use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::CoreError;

/// Lifetime of one view's pending work.
///
/// Queries run through [`ViewScope::run`] are dropped when the scope is
/// cancelled, releasing their interest in the cache entry. When the last
/// interested view is gone the fetch itself is cancelled and never
/// writes to the cache.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` until it completes or the scope is cancelled.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(CoreError::Cancelled),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_scope_short_circuits() {
        let scope = ViewScope::new();
        let child = scope.child();
        scope.cancel();
        assert!(child.is_cancelled());

        let result = child.run(async { Ok::<_, CoreError>(1) }).await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }
}
