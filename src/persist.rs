//! Persistence helpers over a [`Space`]
//!
//! Thin wrappers that add the policy the rest of the crate relies on: single
//! gets fail with `NotFound`, deletes are best-effort, and a transform result
//! is written as one data batch followed by one dna batch.

use tracing::{debug, warn};

use crate::error::{GibError, Result};
use crate::ibgib::{Address, IbGib};
use crate::space::{Bucket, PutReceipt, Space};
use crate::transform::TransformResult;

/// Fetch a single ibgib. No retries.
pub async fn get_from_space(space: &dyn Space, addr: &Address, bucket: Option<Bucket>) -> Result<IbGib> {
    let mut found = space.get(std::slice::from_ref(addr), bucket).await?;
    match found.pop() {
        Some(ibgib) if found.is_empty() => Ok(ibgib),
        _ => Err(GibError::SpaceFailure {
            message: format!("expected exactly one ibgib for {}", addr),
            warnings: Vec::new(),
            partial: Vec::new(),
        }),
    }
}

/// Store a batch, preserving order.
pub async fn put_in_space(space: &dyn Space, ibgibs: &[IbGib], bucket: Bucket, force: bool) -> Result<PutReceipt> {
    if ibgibs.is_empty() {
        return Ok(PutReceipt::default());
    }
    let receipt = space.put(ibgibs, bucket, force).await?;
    if !receipt.skipped.is_empty() {
        debug!(space = space.name(), bucket = %bucket, skipped = receipt.skipped.len(), "Already stored");
    }
    Ok(receipt)
}

/// Best-effort delete: failures and missing addresses are logged, never
/// returned. Reports whether the address was actually removed.
pub async fn delete_from_space(space: &dyn Space, addr: &Address, bucket: Bucket) -> bool {
    match space.delete(std::slice::from_ref(addr), bucket).await {
        Ok(receipt) => {
            for warning in &receipt.warnings {
                warn!(space = space.name(), addr = %addr, "{}", warning);
            }
            receipt.deleted.contains(addr)
        }
        Err(e) => {
            warn!(space = space.name(), addr = %addr, error = %e, "Delete failed");
            false
        }
    }
}

/// Persist `new_ibgib + intermediate_ibgibs` in one batch (meta or data),
/// then the dnas in a second batch. A dna failure is returned as-is; the
/// first batch stays written.
pub async fn persist_transform_result(
    space: &dyn Space,
    result: &TransformResult,
    is_meta: bool,
    force: bool,
) -> Result<()> {
    let mut batch = Vec::with_capacity(1 + result.intermediate_ibgibs.len());
    batch.push(result.new_ibgib.clone());
    batch.extend(result.intermediate_ibgibs.iter().cloned());

    put_in_space(space, &batch, Bucket::from_flags(is_meta, false), force).await?;

    if !result.dnas.is_empty() {
        put_in_space(space, &result.dnas, Bucket::Dna, force)
            .await
            .map_err(|e| GibError::SpaceFailure {
                message: format!("dna write failed after storing {}: {}", result.new_ibgib.addr(), e),
                warnings: Vec::new(),
                partial: batch.iter().map(IbGib::addr).collect(),
            })?;
    }
    Ok(())
}
