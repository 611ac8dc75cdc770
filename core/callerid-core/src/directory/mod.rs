//! Remote contact directory capability.
//!
//! The directory is the authority on contacts; this crate only asks it two
//! questions. Implementations must tolerate being wrapped in a timeout (the
//! future may be dropped mid-request).

mod rest;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CallerIdError, Result};
use crate::types::{Contact, Session};

pub use rest::{phone_filter, RestDirectory, RestDirectoryConnector};

#[async_trait]
pub trait Directory: Send + Sync {
    /// Returns the first contact whose stored phone exactly equals any candidate.
    async fn find_contact_by_phone(&self, candidates: &[String]) -> Result<Option<Contact>>;

    /// The session the directory is querying as, if any.
    async fn current_session(&self) -> Option<Session>;
}

/// Builds a directory client for a session read from durable storage.
///
/// The background task calls this on every invocation; it never reuses a
/// client from an earlier run.
pub trait DirectoryConnector: Send + Sync {
    fn connect(&self, session: Option<Session>) -> Result<Arc<dyn Directory>>;
}

/// Stand-in when no directory is configured; every query is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDirectory;

#[async_trait]
impl Directory for UnavailableDirectory {
    async fn find_contact_by_phone(&self, _candidates: &[String]) -> Result<Option<Contact>> {
        Err(CallerIdError::DirectoryNotConfigured)
    }

    async fn current_session(&self) -> Option<Session> {
        None
    }
}
