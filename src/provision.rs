//! Idempotent get-or-create for a single view.
//!
//! Resolution order is fixed: run cache, then a backend probe by name, then a
//! create followed by convergence polling on the returned id. A name reaches
//! the create path at most once per run because every successful resolution
//! lands in the cache.
use crate::cache::ProvisionCache;
use crate::error::{BackendError, ProvisionError};
use crate::namespace::{NamespaceService, ViewHandle, ViewId, ROOT_VIEW_ID};
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::time::Instant;

/// How a view handle was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Cached,
    Existing,
    Created,
}

#[derive(Clone, Debug)]
pub struct Resolved {
    pub handle: ViewHandle,
    pub source: ResolutionSource,
}

pub struct Provisioner<'a, S: NamespaceService + ?Sized> {
    service: &'a S,
    cache: &'a mut ProvisionCache,
    policy: RetryPolicy,
    root: Option<ViewHandle>,
}

impl<'a, S: NamespaceService + ?Sized> Provisioner<'a, S> {
    pub fn new(service: &'a S, cache: &'a mut ProvisionCache, policy: RetryPolicy) -> Self {
        Self {
            service,
            cache,
            policy,
            root: None,
        }
    }

    /// Resolve `name` to a live view, creating it under `parent` (or the
    /// implicit root) only when neither the cache nor the backend has it.
    pub fn resolve(
        &mut self,
        name: &str,
        parent: Option<&ViewHandle>,
    ) -> Result<Resolved, ProvisionError> {
        let backend = |source: BackendError| ProvisionError::Backend {
            name: name.to_string(),
            source,
        };
        let expected_parent = parent.map_or(ROOT_VIEW_ID, |parent| parent.id);

        if let Some(handle) = self.cache.get(name) {
            tracing::debug!(name, id = %handle.id, "view cache hit");
            warn_on_parent_mismatch(name, handle, expected_parent);
            return Ok(Resolved {
                handle: handle.clone(),
                source: ResolutionSource::Cached,
            });
        }

        if self.service.view_exists_by_name(name).map_err(backend)? {
            let handle = self.service.view_by_name(name).map_err(backend)?;
            tracing::info!(name, id = %handle.id, "reusing existing view");
            warn_on_parent_mismatch(name, &handle, expected_parent);
            self.cache.insert(name, handle.clone());
            return Ok(Resolved {
                handle,
                source: ResolutionSource::Existing,
            });
        }

        let parent = match parent {
            Some(parent) => parent.clone(),
            None => self.root_handle().map_err(backend)?,
        };
        let start = Instant::now();
        let view_id = self.service.create_view(name, &parent).map_err(backend)?;
        if !self.await_visible(name, view_id).map_err(backend)? {
            return Err(ProvisionError::Timeout {
                name: name.to_string(),
                view_id,
                timeout: self.policy.timeout,
            });
        }
        let handle = self.service.view_by_id(view_id).map_err(backend)?;
        tracing::info!(
            name,
            id = %handle.id,
            parent = %parent.id,
            elapsed_ms = start.elapsed().as_millis(),
            "view created"
        );
        self.cache.insert(name, handle.clone());
        Ok(Resolved {
            handle,
            source: ResolutionSource::Created,
        })
    }

    fn root_handle(&mut self) -> Result<ViewHandle, BackendError> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let root = self.service.root()?;
        self.root = Some(root.clone());
        Ok(root)
    }

    /// Poll until the created view is visible. Transport failures count as
    /// "not yet"; any other backend error stops polling and is returned.
    fn await_visible(&self, name: &str, view_id: ViewId) -> Result<bool, BackendError> {
        let service = self.service;
        let mut fatal = None;
        let visible = self.policy.attempt(|| match service.view_exists_by_id(view_id) {
            Ok(exists) => exists,
            Err(err @ BackendError::Transport(_)) => {
                tracing::warn!(name, id = %view_id, error = %err, "existence probe failed");
                false
            }
            Err(err) => {
                fatal = Some(err);
                true
            }
        });
        match fatal {
            Some(err) => Err(err),
            None => Ok(visible),
        }
    }
}

fn warn_on_parent_mismatch(name: &str, handle: &ViewHandle, expected: ViewId) {
    if handle.parent != Some(expected) {
        tracing::warn!(
            name,
            id = %handle.id,
            expected_parent = %expected,
            "view already resolved under a different parent"
        );
    }
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod tests;
