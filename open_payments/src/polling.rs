use std::{future::Future, time::Duration};

use log::*;

use crate::{
    config::SigningConfig, error::OpenPaymentsError, incoming_payment::IncomingPayment, OpenPaymentsClient,
};

/// Poll `fetch` until `is_complete` says the resource is done, sleeping `interval` between attempts.
///
/// Fetch errors abort the poll immediately. If `max_attempts` fetches all return an incomplete resource, the
/// result is `PollTimeout` carrying the attempt count.
pub async fn wait_for_completion<T, F, Fut, P>(
    mut fetch: F,
    is_complete: P,
    max_attempts: u32,
    interval: Duration,
) -> Result<T, OpenPaymentsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OpenPaymentsError>>,
    P: Fn(&T) -> bool,
{
    for attempt in 1..=max_attempts {
        let resource = fetch().await?;
        if is_complete(&resource) {
            return Ok(resource);
        }
        trace!("Poll attempt {attempt}/{max_attempts}: not complete yet");
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(OpenPaymentsError::PollTimeout { attempts: max_attempts })
}

impl OpenPaymentsClient {
    /// Poll an incoming payment until it reports completion, or give up after `max_attempts`.
    pub async fn wait_for_incoming_payment(
        &self,
        incoming_payment_url: &str,
        access_token: &str,
        config: &SigningConfig,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<IncomingPayment, OpenPaymentsError> {
        wait_for_completion(
            || self.get_incoming_payment(incoming_payment_url, access_token, config),
            IncomingPayment::is_complete,
            max_attempts,
            interval,
        )
        .await
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn completes_once_the_predicate_passes() {
        let calls = AtomicU32::new(0);
        let result = wait_for_completion(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n) }
            },
            |n| *n >= 3,
            10,
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn times_out_with_the_attempt_count() {
        let result = wait_for_completion(|| async { Ok(0u32) }, |_| false, 4, Duration::from_millis(1)).await;
        assert!(matches!(result, Err(OpenPaymentsError::PollTimeout { attempts: 4 })));
    }

    #[tokio::test]
    async fn fetch_errors_abort_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = wait_for_completion(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(OpenPaymentsError::Transport("connection refused".into())) }
            },
            |_| true,
            10,
            Duration::from_millis(1),
        )
        .await;
        assert!(matches!(result, Err(OpenPaymentsError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
