use futures_util::future::{join_all, BoxFuture};
use std::future::Future;
use uuid::Uuid;

/// key: payments-side-effects -> fire-and-isolate task list
///
/// A named post-transition action. Side effects are not part of the payment
/// correctness contract: each one is independently retryable through its own
/// logs, so a failure is recorded and absorbed rather than propagated.
pub struct SideEffect {
    pub name: &'static str,
    task: BoxFuture<'static, anyhow::Result<()>>,
}

impl SideEffect {
    pub fn new<F>(name: &'static str, task: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name,
            task: Box::pin(task),
        }
    }
}

#[derive(Debug)]
pub struct SideEffectFailure {
    pub name: &'static str,
    pub error: anyhow::Error,
}

/// Run every side effect concurrently, log each failure with enough context
/// for manual reconciliation, and return the failures without propagating.
pub async fn run_isolated(
    event_id: &str,
    booking_id: Option<Uuid>,
    effects: Vec<SideEffect>,
) -> Vec<SideEffectFailure> {
    let results = join_all(
        effects
            .into_iter()
            .map(|effect| async move { (effect.name, effect.task.await) }),
    )
    .await;

    let mut failures = Vec::new();
    for (name, result) in results {
        if let Err(error) = result {
            tracing::error!(
                ?error,
                %event_id,
                booking_id = ?booking_id,
                action = name,
                "post-transition side effect failed",
            );
            failures.push(SideEffectFailure { name, error });
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn failures_do_not_prevent_sibling_effects() {
        let ran = Arc::new(AtomicU32::new(0));

        let a = ran.clone();
        let b = ran.clone();
        let effects = vec![
            SideEffect::new("first", async move {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            SideEffect::new("failing", async move { Err(anyhow!("smtp outage")) }),
            SideEffect::new("last", async move {
                b.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ];

        let failures = run_isolated("evt_test", None, effects).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "failing");
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_task_list_is_a_no_op() {
        let failures = run_isolated("evt_test", None, Vec::new()).await;
        assert!(failures.is_empty());
    }
}
