//! Decoding of subdocument responses back into caller order.

use super::request::EncodedSpecs;
use crate::protocol::SubdocResponse;
use crate::result::{document_error, ConflictContext, LookupInResult, MutateInResult, MutationResult, SpecResult};
use crate::status::Status;
use crate::{error::Result, Error};

/// Whether the aggregate status still carries per-spec results.
fn has_spec_results(status: Status) -> bool {
    status.is_success() || status == Status::MultiPathFailure
}

fn document_failure(response: &SubdocResponse, key: &str, ctx: ConflictContext) -> Error {
    let applied = (response.cas != 0).then(|| MutationResult {
        cas: response.cas,
        token: response.token.clone(),
    });
    document_error(response.status, key, ctx, applied)
}

/// Slot for each caller position, filled from wire-indexed entries.
fn place_entries(
    response: &SubdocResponse,
    encoded: &EncodedSpecs,
) -> Result<Vec<Option<(Status, Vec<u8>)>>> {
    let mut slots: Vec<Option<(Status, Vec<u8>)>> = vec![None; encoded.len()];
    for entry in &response.entries {
        let caller = encoded
            .order
            .get(usize::from(entry.index))
            .copied()
            .ok_or_else(|| {
                Error::Transport(format!(
                    "response entry {} beyond {} specs",
                    entry.index,
                    encoded.len()
                ))
            })?;
        slots[caller] = Some((entry.status, entry.value.clone()));
    }
    Ok(slots)
}

/// Caller-order paths, recovered from the wire order.
fn caller_paths(encoded: &EncodedSpecs) -> Vec<String> {
    let mut paths = vec![String::new(); encoded.len()];
    for (wire, &caller) in encoded.order.iter().enumerate() {
        paths[caller] = encoded.specs[wire].path.clone();
    }
    paths
}

/// Decode a lookupIn response. Every spec must have an entry.
pub fn decode_lookup(
    key: &str,
    encoded: &EncodedSpecs,
    response: SubdocResponse,
) -> Result<LookupInResult> {
    let ctx = ConflictContext {
        cas_supplied: false,
        add_semantics: false,
    };
    if !has_spec_results(response.status) {
        return Err(document_failure(&response, key, ctx));
    }

    let slots = place_entries(&response, encoded)?;
    let paths = caller_paths(encoded);
    let entries = slots
        .into_iter()
        .zip(paths)
        .enumerate()
        .map(|(index, (slot, path))| match slot {
            Some((status, value)) => Ok(SpecResult::new(path, status, value)),
            None => Err(Error::Transport(format!("no result for lookup spec {index}"))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LookupInResult::new(response.cas, response.status, entries))
}

/// Decode a mutateIn response. Specs without an entry succeeded without
/// producing a value.
pub fn decode_mutation(
    key: &str,
    encoded: &EncodedSpecs,
    response: SubdocResponse,
    ctx: ConflictContext,
) -> Result<MutateInResult> {
    if !has_spec_results(response.status) {
        return Err(document_failure(&response, key, ctx));
    }

    let slots = place_entries(&response, encoded)?;
    let paths = caller_paths(encoded);
    let entries = slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            let (status, value) = slot.unwrap_or((Status::Success, Vec::new()));
            SpecResult::new(path, status, value)
        })
        .collect();

    Ok(MutateInResult::new(
        response.cas,
        response.token,
        response.status,
        entries,
    ))
}
