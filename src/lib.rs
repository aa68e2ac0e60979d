//! Provision a hierarchy of named views from flat `id,name,parentId` records.
//!
//! Records are parsed and validated ([`record`]), assembled into a forest
//! ([`tree`]), and provisioned parents-first ([`run`]) through an idempotent
//! get-or-create ([`provision`]) against any [`namespace::NamespaceService`].
pub mod cache;
pub mod config;
pub mod error;
pub mod input;
pub mod namespace;
pub mod provision;
pub mod record;
pub mod retry;
pub mod run;
pub mod tree;

pub use error::{BackendError, InputError, ProvisionError};
pub use run::{plan_batch, provision_batch, PlanReport, RunContext, RunReport};
