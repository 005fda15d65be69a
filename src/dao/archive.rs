use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::dao::{
    models::ArchivedResult,
    storage::{StorageError, StorageResult},
};

/// Abstraction over the storage of final session results.
pub trait ResultArchive: Send + Sync {
    /// Store `result`, refusing a second entry for the same join code.
    fn save(&self, result: ArchivedResult) -> BoxFuture<'static, StorageResult<()>>;
    /// Archived result for `code`, if any.
    fn find(&self, code: String) -> BoxFuture<'static, StorageResult<Option<ArchivedResult>>>;
    /// Whether `code` was ever archived.
    fn contains(&self, code: String) -> BoxFuture<'static, StorageResult<bool>>;
}

/// Process-local archive. Entries live as long as the server does.
#[derive(Clone, Default)]
pub struct InMemoryArchive {
    results: Arc<DashMap<String, ArchivedResult>>,
}

impl InMemoryArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultArchive for InMemoryArchive {
    fn save(&self, result: ArchivedResult) -> BoxFuture<'static, StorageResult<()>> {
        let results = self.results.clone();
        Box::pin(async move {
            match results.entry(result.code.clone()) {
                Entry::Occupied(_) => Err(StorageError::AlreadyArchived(result.code)),
                Entry::Vacant(slot) => {
                    slot.insert(result);
                    Ok(())
                }
            }
        })
    }

    fn find(&self, code: String) -> BoxFuture<'static, StorageResult<Option<ArchivedResult>>> {
        let results = self.results.clone();
        Box::pin(async move { Ok(results.get(&code).map(|entry| entry.value().clone())) })
    }

    fn contains(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        let results = self.results.clone();
        Box::pin(async move { Ok(results.contains_key(&code)) })
    }
}
