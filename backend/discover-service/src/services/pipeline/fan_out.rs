use crate::error::{RecommendError, Result};
use crate::models::{RecommendRequest, ResultGroup};
use crate::services::recall::Recaller;
use crate::services::{CancelHandle, RequestContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Output of one recaller, tagged with its name.
pub(crate) type RecallSlot = (String, ResultGroup);

/// Runs every recaller concurrently and gathers their groups in configuration order.
///
/// Each task owns a copy of the request and reports its result into its own
/// slot. The first failure cancels `ctx`, aborts the remaining tasks and is
/// returned as-is; results that already arrived are discarded.
pub(crate) async fn fan_out(
    recallers: &[Arc<dyn Recaller>],
    ctx: &RequestContext,
    cancel: &CancelHandle,
    request: &RecommendRequest,
    per_recaller_timeout: Duration,
) -> Result<Vec<RecallSlot>> {
    let mut tasks = JoinSet::new();

    for (slot, recaller) in recallers.iter().enumerate() {
        let recaller = Arc::clone(recaller);
        let ctx = ctx.clone();
        let request = request.clone();

        tasks.spawn(async move {
            let name = recaller.name().to_string();
            let outcome = tokio::select! {
                res = tokio::time::timeout(per_recaller_timeout, recaller.recall(&ctx, &request)) => {
                    match res {
                        Ok(result) => result,
                        Err(_) => Err(RecommendError::RecallTimeout {
                            recaller: name.clone(),
                            elapsed: per_recaller_timeout,
                        }),
                    }
                }
                _ = ctx.cancelled() => Err(RecommendError::Cancelled),
            };
            (slot, name, outcome)
        });
    }

    let mut slots: Vec<Option<RecallSlot>> = vec![None; recallers.len()];

    while let Some(joined) = tasks.join_next().await {
        let (slot, name, outcome) = match joined {
            Ok(done) => done,
            Err(join_err) => {
                cancel.cancel();
                tasks.abort_all();
                return Err(RecommendError::Retrieval {
                    recaller: "recall task".to_string(),
                    message: join_err.to_string(),
                });
            }
        };

        match outcome {
            Ok(group) => {
                debug!(recaller = %name, candidates = group.len(), "Recaller finished");
                slots[slot] = Some((name, group));
            }
            Err(err) => {
                warn!(recaller = %name, error = %err, "Recaller failed, cancelling request");
                cancel.cancel();
                tasks.abort_all();
                return Err(err);
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
