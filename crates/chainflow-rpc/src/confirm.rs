//! Transaction confirmation waiter.
//!
//! Polls the chain until a submitted transaction has enough block
//! confirmations, the configured timeout elapses, or the chain reports the
//! execution reverted. Receipt absence means "not yet included" and is
//! retried; a reverted execution is definitive and never retried here,
//! since resubmission risk is the caller's decision.

use std::time::Duration;

use chainflow_core::{ChainflowError, Result};
use tokio::time::{interval, sleep, timeout};
use tracing::{debug, info, warn};

use crate::client::RpcClient;

/// Delay used when no chain endpoint is configured and confirmations are
/// simulated.
const SIMULATED_CONFIRMATION_DELAY: Duration = Duration::from_secs(5);

/// Confirmation requirements.
#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
    /// Blocks the transaction must be buried under, inclusive.
    pub required_confirmations: u64,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// Overall deadline for the wait.
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            required_confirmations: 1,
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
        }
    }
}

/// A confirmed transaction.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction_hash: String,
    pub block_number: u64,
    /// True when the confirmation was simulated because no chain endpoint is
    /// configured. Callers must be able to tell these apart from chain
    /// receipts.
    pub simulated: bool,
}

/// Waits for chain-level confirmation of submitted transactions.
#[derive(Debug, Clone)]
pub struct ConfirmationWaiter {
    client: Option<RpcClient>,
    policy: ConfirmationPolicy,
}

impl ConfirmationWaiter {
    /// Create a waiter backed by a chain endpoint.
    pub fn new(client: RpcClient, policy: ConfirmationPolicy) -> Self {
        Self {
            client: Some(client),
            policy,
        }
    }

    /// Create a waiter with no endpoint: confirmations are simulated after a
    /// fixed delay.
    pub fn simulated() -> Self {
        Self {
            client: None,
            policy: ConfirmationPolicy::default(),
        }
    }

    /// The policy this waiter applies.
    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// Block the current task until `tx_hash` is confirmed.
    pub async fn wait(&self, tx_hash: &str) -> Result<Receipt> {
        let Some(client) = &self.client else {
            debug!(tx = %tx_hash, "no chain endpoint configured, simulating confirmation");
            sleep(SIMULATED_CONFIRMATION_DELAY).await;
            info!(tx = %tx_hash, "simulated confirmation complete");
            return Ok(Receipt {
                transaction_hash: tx_hash.to_string(),
                block_number: 0,
                simulated: true,
            });
        };

        timeout(self.policy.timeout, self.poll_until_confirmed(client, tx_hash))
            .await
            .map_err(|_| ChainflowError::ConfirmationTimeout {
                tx_hash: tx_hash.to_string(),
                timeout_secs: self.policy.timeout.as_secs(),
            })?
    }

    async fn poll_until_confirmed(&self, client: &RpcClient, tx_hash: &str) -> Result<Receipt> {
        let mut ticker = interval(self.policy.poll_interval);
        // the first tick fires immediately; skip it so every poll is spaced
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let receipt = match client.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => {
                    debug!(tx = %tx_hash, "transaction not yet included");
                    continue;
                }
                Err(e) => {
                    warn!(tx = %tx_hash, error = %e, "receipt lookup failed, retrying");
                    continue;
                }
            };

            if !receipt.success() {
                return Err(ChainflowError::TransactionReverted {
                    tx_hash: tx_hash.to_string(),
                });
            }

            let tx_block = match receipt.block_height() {
                Ok(h) => h,
                Err(e) => {
                    warn!(tx = %tx_hash, error = %e, "bad block number in receipt, retrying");
                    continue;
                }
            };
            let current = match client.block_number().await {
                Ok(h) => h,
                Err(e) => {
                    warn!(tx = %tx_hash, error = %e, "height lookup failed, retrying");
                    continue;
                }
            };

            let confirmations = current.saturating_sub(tx_block) + 1;
            debug!(
                tx = %tx_hash,
                confirmations,
                required = self.policy.required_confirmations,
                "confirmation progress"
            );

            if confirmations >= self.policy.required_confirmations {
                info!(tx = %tx_hash, block = tx_block, "transaction confirmed");
                return Ok(Receipt {
                    transaction_hash: tx_hash.to_string(),
                    block_number: tx_block,
                    simulated: false,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_confirmation_is_marked() {
        let waiter = ConfirmationWaiter::simulated();
        let receipt = waiter.wait("0xfeed").await.unwrap();
        assert!(receipt.simulated);
        assert_eq!(receipt.transaction_hash, "0xfeed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_endpoint_times_out() {
        let policy = ConfirmationPolicy {
            required_confirmations: 1,
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        };
        // nothing listens here; every poll fails as transient and the
        // deadline converts the wait into a timeout error
        let waiter = ConfirmationWaiter::new(RpcClient::new("http://127.0.0.1:1"), policy);
        let err = waiter.wait("0xdead").await.unwrap_err();
        assert!(matches!(err, ChainflowError::ConfirmationTimeout { .. }));
    }
}
