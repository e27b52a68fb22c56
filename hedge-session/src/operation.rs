use hedge_engine::HedgeError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Where an external call stands. `Pending` is the only unsettled state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Operation<T> {
    #[default]
    Idle,
    Pending,
    Resolved(T),
    Failed(HedgeError),
    Cancelled,
}

impl<T> Operation<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Operation::Pending)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Operation::Resolved(_) | Operation::Failed(_) | Operation::Cancelled)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Operation::Resolved(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&HedgeError> {
        match self {
            Operation::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// A spawned call whose status can be read, awaited or cancelled from any
/// number of places. The first settlement wins: a cancel after completion
/// changes nothing, and a completion after cancel is discarded.
pub struct Tracked<T> {
    state: Arc<watch::Sender<Operation<T>>>,
    handle: JoinHandle<()>,
}

impl<T> Tracked<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<T, HedgeError>> + Send + 'static,
    {
        let (tx, _) = watch::channel(Operation::Pending);
        let state = Arc::new(tx);
        let task_state = state.clone();
        let handle = tokio::spawn(async move {
            let outcome = fut.await;
            task_state.send_if_modified(move |op| {
                if !op.is_pending() {
                    return false;
                }
                *op = match outcome {
                    Ok(v) => Operation::Resolved(v),
                    Err(e) => Operation::Failed(e),
                };
                true
            });
        });
        Self { state, handle }
    }

    pub fn status(&self) -> Operation<T> {
        self.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().is_pending()
    }

    /// Abort the task. Returns false if it had already settled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.state.send_if_modified(|op| {
            if !op.is_pending() {
                return false;
            }
            *op = Operation::Cancelled;
            true
        });
        self.handle.abort();
        cancelled
    }

    /// Wait for the call to settle and return its final state.
    pub async fn wait(&self) -> Operation<T> {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|op| op.is_settled()).await {
            Ok(op) => Some(op.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves() {
        let op = Tracked::spawn(async { Ok::<_, HedgeError>(7u32) });
        assert_eq!(op.wait().await, Operation::Resolved(7));
        assert!(!op.cancel());
        assert_eq!(op.status(), Operation::Resolved(7));
    }

    #[tokio::test]
    async fn fails() {
        let op: Tracked<u32> = Tracked::spawn(async { Err(HedgeError::GatewayUnavailable("down".into())) });
        let settled = op.wait().await;
        assert!(settled.error().map(|e| e.is_retryable()).unwrap_or(false));
    }

    #[tokio::test]
    async fn cancel_wins_over_late_result() {
        let op = Tracked::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, HedgeError>(1u32)
        });
        assert!(op.is_pending());
        assert!(op.cancel());
        assert_eq!(op.wait().await, Operation::Cancelled);
        assert!(!op.cancel());
    }
}
