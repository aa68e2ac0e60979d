//! In-process namespace with controllable visibility lag.
//!
//! Used by tests to observe exactly which calls a provisioning run makes.
//! Created views stay hidden until `view_exists_by_id` has been asked about
//! them `visibility_lag` times, mimicking a backend that applies changes
//! asynchronously.
use super::{NamespaceService, ViewHandle, ViewId, ROOT_VIEW_ID};
use crate::error::BackendError;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One call observed by [`InMemoryNamespace`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceCall {
    ExistsByName(String),
    ExistsById(ViewId),
    ByName(String),
    ById(ViewId),
    Create { name: String, parent: ViewId },
}

#[derive(Debug)]
struct PendingView {
    handle: ViewHandle,
    /// Remaining id probes before the view becomes visible; `None` never does.
    remaining: Option<usize>,
}

#[derive(Debug)]
struct State {
    views: BTreeMap<ViewId, ViewHandle>,
    pending: HashMap<ViewId, PendingView>,
    next_id: u64,
    calls: Vec<NamespaceCall>,
}

#[derive(Debug)]
pub struct InMemoryNamespace {
    state: RefCell<State>,
    visibility_lag: Option<usize>,
    rejected_names: BTreeSet<String>,
    unreachable: bool,
}

impl Default for InMemoryNamespace {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNamespace {
    /// A namespace holding only the root view; creations are visible at once.
    pub fn new() -> Self {
        let mut views = BTreeMap::new();
        views.insert(
            ROOT_VIEW_ID,
            ViewHandle {
                id: ROOT_VIEW_ID,
                name: String::new(),
                parent: None,
            },
        );
        Self {
            state: RefCell::new(State {
                views,
                pending: HashMap::new(),
                next_id: 1,
                calls: Vec::new(),
            }),
            visibility_lag: Some(0),
            rejected_names: BTreeSet::new(),
            unreachable: false,
        }
    }

    /// Hide each created view until it has been probed by id `polls` times.
    pub fn with_visibility_lag(mut self, polls: usize) -> Self {
        self.visibility_lag = Some(polls);
        self
    }

    /// Accept creates but never let them become visible.
    pub fn never_converging(mut self) -> Self {
        self.visibility_lag = None;
        self
    }

    /// Reject any create request for `name`.
    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejected_names.insert(name.to_string());
        self
    }

    /// Fail every call with a transport error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Insert an already-visible view, as if created by an earlier run.
    pub fn seed(&self, name: &str, parent: ViewId) -> ViewId {
        let mut state = self.state.borrow_mut();
        let id = ViewId(state.next_id);
        state.next_id += 1;
        state.views.insert(
            id,
            ViewHandle {
                id,
                name: name.to_string(),
                parent: Some(parent),
            },
        );
        id
    }

    pub fn calls(&self) -> Vec<NamespaceCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Names passed to `create_view`, in call order.
    pub fn created_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                NamespaceCall::Create { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Visible view with `name`, if any.
    pub fn find(&self, name: &str) -> Option<ViewHandle> {
        let state = self.state.borrow();
        find_visible(&state, name).cloned()
    }

    fn record(&self, call: NamespaceCall) -> Result<(), BackendError> {
        self.state.borrow_mut().calls.push(call);
        if self.unreachable {
            return Err(BackendError::Transport("namespace unreachable".to_string()));
        }
        Ok(())
    }
}

fn find_visible<'a>(state: &'a State, name: &str) -> Option<&'a ViewHandle> {
    state
        .views
        .values()
        .find(|view| !view.is_root() && view.name == name)
}

impl NamespaceService for InMemoryNamespace {
    fn view_exists_by_name(&self, name: &str) -> Result<bool, BackendError> {
        self.record(NamespaceCall::ExistsByName(name.to_string()))?;
        Ok(find_visible(&self.state.borrow(), name).is_some())
    }

    fn view_exists_by_id(&self, id: ViewId) -> Result<bool, BackendError> {
        self.record(NamespaceCall::ExistsById(id))?;
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.views.contains_key(&id) {
            return Ok(true);
        }
        let visible = match state.pending.get_mut(&id) {
            None => return Ok(false),
            Some(PendingView {
                remaining: None, ..
            }) => false,
            Some(PendingView {
                remaining: Some(0),
                ..
            }) => true,
            Some(PendingView {
                remaining: Some(remaining),
                ..
            }) => {
                *remaining -= 1;
                false
            }
        };
        if visible {
            if let Some(pending) = state.pending.remove(&id) {
                state.views.insert(id, pending.handle);
            }
        }
        Ok(visible)
    }

    fn view_by_name(&self, name: &str) -> Result<ViewHandle, BackendError> {
        self.record(NamespaceCall::ByName(name.to_string()))?;
        find_visible(&self.state.borrow(), name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    fn view_by_id(&self, id: ViewId) -> Result<ViewHandle, BackendError> {
        self.record(NamespaceCall::ById(id))?;
        self.state
            .borrow()
            .views
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    fn create_view(&self, name: &str, parent: &ViewHandle) -> Result<ViewId, BackendError> {
        self.record(NamespaceCall::Create {
            name: name.to_string(),
            parent: parent.id,
        })?;
        if self.rejected_names.contains(name) {
            return Err(BackendError::Rejected(format!(
                "view {name:?} is not allowed here"
            )));
        }
        let mut state = self.state.borrow_mut();
        if !state.views.contains_key(&parent.id) {
            return Err(BackendError::NotFound(parent.id.to_string()));
        }
        let id = ViewId(state.next_id);
        state.next_id += 1;
        state.pending.insert(
            id,
            PendingView {
                handle: ViewHandle {
                    id,
                    name: name.to_string(),
                    parent: Some(parent.id),
                },
                remaining: self.visibility_lag,
            },
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_view_stays_hidden_until_lag_is_spent() {
        let ns = InMemoryNamespace::new().with_visibility_lag(2);
        let root = ns.root().expect("root");
        let id = ns.create_view("Apps", &root).expect("create");

        assert!(!ns.view_exists_by_name("Apps").expect("probe"));
        assert!(!ns.view_exists_by_id(id).expect("poll 1"));
        assert!(!ns.view_exists_by_id(id).expect("poll 2"));
        assert!(ns.view_exists_by_id(id).expect("poll 3"));
        assert!(ns.view_exists_by_name("Apps").expect("probe"));
        assert_eq!(ns.view_by_id(id).expect("fetch").parent, Some(ROOT_VIEW_ID));
    }

    #[test]
    fn never_converging_views_are_never_visible() {
        let ns = InMemoryNamespace::new().never_converging();
        let root = ns.root().expect("root");
        let id = ns.create_view("Apps", &root).expect("create");
        for _ in 0..5 {
            assert!(!ns.view_exists_by_id(id).expect("poll"));
        }
        assert!(matches!(
            ns.view_by_id(id),
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn create_under_unknown_parent_is_rejected() {
        let ns = InMemoryNamespace::new();
        let ghost = ViewHandle {
            id: ViewId(42),
            name: "ghost".to_string(),
            parent: Some(ROOT_VIEW_ID),
        };
        assert!(matches!(
            ns.create_view("Apps", &ghost),
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn calls_are_logged_in_order() {
        let ns = InMemoryNamespace::new();
        let seeded = ns.seed("Existing", ROOT_VIEW_ID);
        let _ = ns.view_exists_by_name("Existing");
        let _ = ns.view_by_name("Existing");
        assert_eq!(
            ns.calls(),
            vec![
                NamespaceCall::ExistsByName("Existing".to_string()),
                NamespaceCall::ByName("Existing".to_string()),
            ]
        );
        assert_eq!(ns.find("Existing").map(|view| view.id), Some(seeded));
    }
}
