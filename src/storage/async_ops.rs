//! Async wrappers for gateway operations.
//!
//! These methods wrap the synchronous operations in `spawn_blocking` to
//! avoid blocking the async runtime. Use these when calling from async
//! contexts (IPC handlers, etc.).

use tokio::task::JoinError;

use super::gateway::Gateway;
use super::id::EntryId;
use super::types::{Resolved, Stat};
use crate::error::{Error, Result};

fn join_error(e: JoinError) -> Error {
    Error::io("join blocking gateway task", e.into())
}

impl Gateway {
    /// Creates an entry asynchronously.
    ///
    /// Async version of `create` that uses `spawn_blocking`.
    pub async fn create_async(
        &self,
        name: Option<String>,
        content_type: Option<String>,
    ) -> Result<EntryId> {
        let gateway = self.clone();
        tokio::task::spawn_blocking(move || {
            gateway.create(name.as_deref(), content_type.as_deref())
        })
        .await
        .map_err(join_error)?
    }

    /// Resolves an entry asynchronously.
    ///
    /// Async version of `resolve` that uses `spawn_blocking`.
    pub async fn resolve_async(&self, id: String) -> Result<Resolved> {
        let gateway = self.clone();
        tokio::task::spawn_blocking(move || gateway.resolve(&id))
            .await
            .map_err(join_error)?
    }

    /// Stats an entry asynchronously.
    pub async fn stat_async(&self, id: String) -> Result<Stat> {
        let gateway = self.clone();
        tokio::task::spawn_blocking(move || gateway.stat(&id))
            .await
            .map_err(join_error)?
    }

    /// Reads an entry's content type asynchronously.
    pub async fn content_type_async(&self, id: String) -> Result<String> {
        let gateway = self.clone();
        tokio::task::spawn_blocking(move || gateway.content_type(&id))
            .await
            .map_err(join_error)?
    }

    /// Sets an entry's content type asynchronously.
    pub async fn update_content_type_async(&self, id: String, content_type: String) -> Result<()> {
        let gateway = self.clone();
        tokio::task::spawn_blocking(move || gateway.update_content_type(&id, &content_type))
            .await
            .map_err(join_error)?
    }

    /// Deletes an entry asynchronously.
    ///
    /// Async version of `delete_one` that uses `spawn_blocking`.
    pub async fn delete_one_async(&self, id: String) -> Result<usize> {
        let gateway = self.clone();
        tokio::task::spawn_blocking(move || gateway.delete_one(&id))
            .await
            .map_err(join_error)?
    }
}
