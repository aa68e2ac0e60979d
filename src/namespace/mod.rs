//! Hierarchical namespace service boundary.
//!
//! The provisioner only ever talks to the backend through [`NamespaceService`].
//! Creation is allowed to be asynchronous: `create_view` returns an identifier
//! that may not resolve until some time later.
mod http;
mod memory;
mod store;

pub use http::{HttpNamespace, DEFAULT_REQUEST_TIMEOUT};
pub use memory::{InMemoryNamespace, NamespaceCall};
pub use store::StateFileNamespace;

use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the implicit top-level view every root record attaches to.
pub const ROOT_VIEW_ID: ViewId = ViewId(0);

/// Backend-assigned view identifier (distinct from record ids in the input).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Live representation of a view as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewHandle {
    pub id: ViewId,
    pub name: String,
    /// `None` only for the root view itself.
    #[serde(default)]
    pub parent: Option<ViewId>,
}

impl ViewHandle {
    pub fn is_root(&self) -> bool {
        self.id == ROOT_VIEW_ID
    }
}

/// Operations the provisioner consumes from the namespace backend.
pub trait NamespaceService {
    fn view_exists_by_name(&self, name: &str) -> Result<bool, BackendError>;

    fn view_exists_by_id(&self, id: ViewId) -> Result<bool, BackendError>;

    fn view_by_name(&self, name: &str) -> Result<ViewHandle, BackendError>;

    fn view_by_id(&self, id: ViewId) -> Result<ViewHandle, BackendError>;

    /// Request a new view under `parent`. The view may not be visible yet
    /// when this returns.
    fn create_view(&self, name: &str, parent: &ViewHandle) -> Result<ViewId, BackendError>;

    /// The well-known top-level view.
    fn root(&self) -> Result<ViewHandle, BackendError> {
        self.view_by_id(ROOT_VIEW_ID)
    }
}
