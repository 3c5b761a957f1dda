use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use starbridge_types::chain::ChainId;
use starbridge_types::envelope::body_hash;
use starbridge_types::operation::BridgeTransaction;
use starbridge_types::primitives::{short_hex, ContentHash, WitnessSignature};
use starbridge_types::registry::ChainRegistry;
use tracing::{debug, info};

use crate::error::SubmitError;

/// What a backend hands back after accepting a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub chain: ChainId,
    pub content_hash: ContentHash,
    /// Backend-specific reference, e.g. a transaction hash.
    pub reference: String,
}

/// Chain submission boundary. Called at most once per body.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        chain: ChainId,
        body: &[u8],
        signatures: &[WitnessSignature],
    ) -> Result<SubmissionReceipt, SubmitError>;
}

/// Logs each quorum body instead of submitting it. Used when no chain backend is
/// configured.
pub struct LoggingSubmitter {
    registry: Arc<ChainRegistry>,
}

impl LoggingSubmitter {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Submitter for LoggingSubmitter {
    async fn submit(
        &self,
        chain: ChainId,
        body: &[u8],
        signatures: &[WitnessSignature],
    ) -> Result<SubmissionReceipt, SubmitError> {
        let content_hash = body_hash(body);
        info!(
            %chain,
            hash = %short_hex(&content_hash),
            signatures = signatures.len(),
            bytes = body.len(),
            "release ready for submission"
        );

        match BridgeTransaction::from_body(body) {
            Ok(tx) => {
                for line in tx.describe(&self.registry, chain) {
                    info!(%chain, hash = %short_hex(&content_hash), "  {}", line);
                }
            }
            Err(e) => debug!("body is not a bridge transaction: {}", e),
        }

        Ok(SubmissionReceipt {
            chain,
            content_hash,
            reference: format!("logged:{}", short_hex(&content_hash)),
        })
    }
}

/// One call recorded by `RecordingSubmitter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub chain: ChainId,
    pub body: Vec<u8>,
    pub signatures: Vec<WitnessSignature>,
}

/// Keeps every call in memory. Optionally rejects all of them.
#[derive(Default)]
pub struct RecordingSubmitter {
    calls: Mutex<Vec<RecordedSubmission>>,
    reject_with: Option<String>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A submitter that records every call and then fails it with `reason`.
    pub fn rejecting(reason: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reject_with: Some(reason.to_string()),
        }
    }

    /// Snapshot of the calls so far.
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.submissions().len()
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(
        &self,
        chain: ChainId,
        body: &[u8],
        signatures: &[WitnessSignature],
    ) -> Result<SubmissionReceipt, SubmitError> {
        let record = RecordedSubmission {
            chain,
            body: body.to_vec(),
            signatures: signatures.to_vec(),
        };
        match self.calls.lock() {
            Ok(mut calls) => calls.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }

        if let Some(reason) = &self.reject_with {
            return Err(SubmitError::Rejected {
                reason: reason.clone(),
            });
        }

        let content_hash = body_hash(body);
        Ok(SubmissionReceipt {
            chain,
            content_hash,
            reference: format!("recorded:{}", short_hex(&content_hash)),
        })
    }
}
