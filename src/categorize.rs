use std::time::Duration;

use crate::claude::{CategorizeBatch, CategorizeError};
use crate::models::{CategoryAssignment, TransactionView};
use crate::retry::{run_with_retry, Clock, RetryPolicy};

/// Pause before the single same-batch retry after a rate limit.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Category assigned when the service fails for a non-rate-limit reason, so
/// the batch is marked processed instead of being re-attempted every run.
#[derive(Debug, Clone)]
pub struct Fallback {
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub assignments: Vec<CategoryAssignment>,
    /// Assigned by the service.
    pub categorized: usize,
    /// Assigned the fallback category after a non-rate-limit failure.
    pub fallback: usize,
    /// Left uncategorized after rate-limit exhaustion; retried next run.
    pub abandoned: usize,
}

/// Categorize `views` in consecutive batches of at most `batch_size`.
///
/// A rate-limited batch sleeps out the cooldown and is retried exactly once;
/// if the retry fails too the batch is abandoned and processing moves on, so
/// progress on earlier batches is preserved. Non-rate-limit failures assign
/// the fallback category without a retry.
pub fn categorize_in_batches(
    client: &dyn CategorizeBatch,
    clock: &dyn Clock,
    views: &[TransactionView],
    batch_size: usize,
    fallback: &Fallback,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    if views.is_empty() {
        return outcome;
    }

    let batch_size = batch_size.max(1);
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: RATE_LIMIT_COOLDOWN,
        max_delay: RATE_LIMIT_COOLDOWN,
    };
    let total_batches = views.len().div_ceil(batch_size);
    log::info!(
        "categorizing {} transaction(s) in {} batch(es) of up to {}",
        views.len(),
        total_batches,
        batch_size
    );

    for (index, batch) in views.chunks(batch_size).enumerate() {
        let mut attempts = 0u32;
        let result = run_with_retry(
            &policy,
            clock,
            |err| matches!(err, CategorizeError::RateLimited(_)),
            || {
                attempts += 1;
                client.categorize_batch(batch)
            },
        );

        match result {
            Ok(assignments) => {
                log::info!(
                    "batch {}/{}: {} of {} categorized",
                    index + 1,
                    total_batches,
                    assignments.len(),
                    batch.len()
                );
                outcome.categorized += assignments.len();
                outcome.assignments.extend(assignments);
            }
            Err(err) if attempts > 1 => {
                // The post-cooldown retry failed as well; leave the batch
                // uncategorized so the next run picks it up.
                log::warn!(
                    "batch {}/{} abandoned after retry: {err}",
                    index + 1,
                    total_batches
                );
                outcome.abandoned += batch.len();
            }
            Err(err) => {
                log::warn!(
                    "batch {}/{} failed, assigning fallback '{}': {err}",
                    index + 1,
                    total_batches,
                    fallback.category
                );
                for view in batch {
                    outcome.assignments.push(CategoryAssignment {
                        transaction_id: view.id.clone(),
                        category: fallback.category.clone(),
                        confidence: fallback.confidence,
                    });
                }
                outcome.fallback += batch.len();
            }
        }
    }

    outcome
}
