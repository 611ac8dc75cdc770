//! Two-tier caller lookup shared by both execution contexts.
//!
//! Tier 1 is the durable contact cache, Tier 2 the remote directory. Neither
//! tier raises: a cache fault reads as empty and a directory timeout or error
//! reads as a miss. No retries; a late answer is worse than none.

use std::time::Duration;

use chrono::Utc;

use crate::cache::ContactCache;
use crate::directory::Directory;
use crate::error::CallerIdError;
use crate::normalize::NormalizedNumber;
use crate::types::Contact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Cache,
    Directory,
}

impl std::fmt::Display for LookupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupSource::Cache => f.write_str("cache"),
            LookupSource::Directory => f.write_str("directory"),
        }
    }
}

/// What a single resolve did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Alert displayed and still showing when resolve returned.
    Presented {
        client_id: String,
        source: LookupSource,
    },
    /// Match found but the call ended first, so nothing was displayed.
    Vetoed { source: LookupSource },
    /// Displayed, then cancelled because the call ended during display.
    Retracted { source: LookupSource },
    /// Neither tier knows the number.
    NoMatch,
    /// The number had no digits.
    Unmatchable,
}

/// Tier 1.
pub fn lookup_cached(cache: &ContactCache, number: &NormalizedNumber) -> Option<Contact> {
    let hit = cache.find_by_digits(&number.digits);
    match &hit {
        Some(contact) => {
            tracing::info!(digits = %number.digits, client_id = %contact.id, "Cache hit")
        }
        None => tracing::debug!(digits = %number.digits, "Cache miss"),
    }
    hit
}

/// Tier 2, bounded by `timeout` end to end (session check included).
/// Timeouts and faults are misses.
pub async fn query_directory(
    directory: &dyn Directory,
    number: &NormalizedNumber,
    raw: &str,
    timeout: Duration,
) -> Option<Contact> {
    let candidates = number.candidates(raw);
    let query = async {
        match directory.current_session().await {
            Some(session) => tracing::debug!(user_id = %session.user_id, "Directory session"),
            None => tracing::debug!("No directory session; row-level security may hide rows"),
        }
        directory.find_contact_by_phone(&candidates).await
    };

    match tokio::time::timeout(timeout, query).await {
        Ok(Ok(Some(contact))) => {
            tracing::info!(digits = %number.digits, client_id = %contact.id, "Directory hit");
            Some(contact)
        }
        Ok(Ok(None)) => {
            tracing::info!(digits = %number.digits, "Directory miss");
            None
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Directory query failed; treating as miss");
            None
        }
        Err(_) => {
            let err = CallerIdError::DirectoryTimeout(timeout);
            tracing::warn!(error = %err, "Treating directory timeout as miss");
            None
        }
    }
}

/// Writes a directory hit into the cache so the next ring resolves locally.
pub fn self_heal(cache: &ContactCache, contact: &Contact) {
    if !contact.is_cacheable() {
        tracing::debug!(client_id = %contact.id, "Directory row not cacheable; skipping self-heal");
        return;
    }

    let mut cached = contact.clone();
    if cached.updated_at.is_none() {
        cached.updated_at = Some(Utc::now().to_rfc3339());
    }

    match cache.upsert(cached) {
        Ok(()) => tracing::debug!(client_id = %contact.id, "Cache self-healed"),
        Err(err) => tracing::warn!(error = %err, "Failed to self-heal contact cache"),
    }
}
