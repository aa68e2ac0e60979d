//! Namespace persisted in a local JSON state file.
//!
//! Lets the CLI provision without a remote service while still keeping state
//! between runs, so a second run over the same input reuses every view.
use super::{NamespaceService, ViewHandle, ViewId, ROOT_VIEW_ID};
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StateDocument {
    schema_version: u32,
    next_id: u64,
    views: Vec<ViewHandle>,
}

impl StateDocument {
    fn empty() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            next_id: ROOT_VIEW_ID.0 + 1,
            views: vec![root_view()],
        }
    }
}

fn root_view() -> ViewHandle {
    ViewHandle {
        id: ROOT_VIEW_ID,
        name: String::new(),
        parent: None,
    }
}

#[derive(Debug)]
pub struct StateFileNamespace {
    path: PathBuf,
    state: RefCell<StateDocument>,
}

impl StateFileNamespace {
    /// Default state location under the user's data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("view-provision").join("state.json"))
    }

    /// Open the state file at `path`; a missing file is an empty namespace.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let state = if path.is_file() {
            let bytes = fs::read(path)
                .map_err(|err| BackendError::io(format!("read {}", path.display()), err))?;
            let mut doc: StateDocument = serde_json::from_slice(&bytes).map_err(|err| {
                BackendError::Malformed(format!("parse {}: {err}", path.display()))
            })?;
            if doc.schema_version != STATE_SCHEMA_VERSION {
                return Err(BackendError::Malformed(format!(
                    "unsupported state schema_version {} in {}",
                    doc.schema_version,
                    path.display()
                )));
            }
            if !doc.views.iter().any(ViewHandle::is_root) {
                doc.views.insert(0, root_view());
            }
            doc
        } else {
            StateDocument::empty()
        };
        tracing::debug!(
            path = %path.display(),
            views = state.views.len(),
            "namespace state loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            state: RefCell::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, doc: &StateDocument) -> Result<(), BackendError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|err| BackendError::io(format!("create {}", parent.display()), err))?;
        let text = serde_json::to_string_pretty(doc)
            .map_err(|err| BackendError::Malformed(format!("serialize state: {err}")))?;
        let mut file = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|err| BackendError::io("create temp state file", err))?;
        file.write_all(text.as_bytes())
            .map_err(|err| BackendError::io("write temp state file", err))?;
        file.persist(&self.path).map_err(|err| {
            BackendError::io(format!("replace {}", self.path.display()), err.error)
        })?;
        Ok(())
    }
}

impl NamespaceService for StateFileNamespace {
    fn view_exists_by_name(&self, name: &str) -> Result<bool, BackendError> {
        Ok(self
            .state
            .borrow()
            .views
            .iter()
            .any(|view| !view.is_root() && view.name == name))
    }

    fn view_exists_by_id(&self, id: ViewId) -> Result<bool, BackendError> {
        Ok(self.state.borrow().views.iter().any(|view| view.id == id))
    }

    fn view_by_name(&self, name: &str) -> Result<ViewHandle, BackendError> {
        self.state
            .borrow()
            .views
            .iter()
            .find(|view| !view.is_root() && view.name == name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    fn view_by_id(&self, id: ViewId) -> Result<ViewHandle, BackendError> {
        self.state
            .borrow()
            .views
            .iter()
            .find(|view| view.id == id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    fn create_view(&self, name: &str, parent: &ViewHandle) -> Result<ViewId, BackendError> {
        let mut doc = self.state.borrow().clone();
        if !doc.views.iter().any(|view| view.id == parent.id) {
            return Err(BackendError::NotFound(parent.id.to_string()));
        }
        let id = ViewId(doc.next_id);
        doc.next_id += 1;
        doc.views.push(ViewHandle {
            id,
            name: name.to_string(),
            parent: Some(parent.id),
        });
        // Memory only moves forward once the file on disk agrees.
        self.persist(&doc)?;
        *self.state.borrow_mut() = doc;
        Ok(id)
    }
}
