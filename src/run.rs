//! Top-down provisioning of an assembled forest.
//!
//! Each run owns its cache through a [`RunContext`]; nothing survives the run
//! except what the backend itself stores.
use crate::cache::ProvisionCache;
use crate::error::ProvisionError;
use crate::namespace::{NamespaceService, ViewHandle, ViewId};
use crate::provision::{Provisioner, ResolutionSource, Resolved};
use crate::record::{NodeDescriptor, ParsedBatch, SkippedRecord};
use crate::retry::RetryPolicy;
use crate::tree::{assemble_forest, Forest};
use serde::Serialize;

/// Mutable state for one provisioning run.
#[derive(Debug)]
pub struct RunContext {
    pub cache: ProvisionCache,
    pub policy: RetryPolicy,
}

impl RunContext {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            cache: ProvisionCache::new(),
            policy,
        }
    }
}

/// One record after provisioning, in resolution order.
#[derive(Clone, Debug, Serialize)]
pub struct ProvisionedView {
    pub record_id: i64,
    pub name: String,
    pub view_id: ViewId,
    pub parent_view_id: Option<ViewId>,
    pub source: ResolutionSource,
}

/// Outcome of a successful run. Failed runs produce no report.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub views: Vec<ProvisionedView>,
    pub created: usize,
    pub existing: usize,
    pub cached: usize,
    pub skipped_records: usize,
    pub orphans: usize,
    pub detached: usize,
    pub duplicates: usize,
}

impl RunReport {
    fn record(&mut self, node: &NodeDescriptor, resolved: &Resolved) {
        match resolved.source {
            ResolutionSource::Created => self.created += 1,
            ResolutionSource::Existing => self.existing += 1,
            ResolutionSource::Cached => self.cached += 1,
        }
        self.views.push(ProvisionedView {
            record_id: node.id,
            name: node.name.clone(),
            view_id: resolved.handle.id,
            parent_view_id: resolved.handle.parent,
            source: resolved.source,
        });
    }
}

/// Provision every node of `forest`, each parent strictly before its children.
///
/// Roots are handled in forest order and each subtree depth-first. The first
/// failure aborts the run; nothing after it is attempted.
pub fn provision_forest<S: NamespaceService + ?Sized>(
    service: &S,
    forest: &Forest,
    ctx: &mut RunContext,
) -> Result<RunReport, ProvisionError> {
    let mut provisioner = Provisioner::new(service, &mut ctx.cache, ctx.policy);
    let mut report = RunReport::default();
    let mut stack: Vec<(&NodeDescriptor, Option<ViewHandle>)> =
        forest.roots.iter().rev().map(|root| (root, None)).collect();

    while let Some((node, parent)) = stack.pop() {
        let resolved = provisioner.resolve(&node.name, parent.as_ref())?;
        report.record(node, &resolved);
        stack.extend(
            node.children
                .iter()
                .rev()
                .map(|child| (child, Some(resolved.handle.clone()))),
        );
    }

    report.orphans = forest.orphans.len();
    report.detached = forest.detached.len();
    report.duplicates = forest.duplicates;
    Ok(report)
}

/// What a run would touch, without calling the backend.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub forest: Forest,
    pub skipped: Vec<SkippedRecord>,
}

pub fn plan_batch(batch: ParsedBatch) -> PlanReport {
    PlanReport {
        forest: assemble_forest(batch.descriptors),
        skipped: batch.skipped,
    }
}

/// Assemble and provision a parsed batch in a fresh run context.
pub fn provision_batch<S: NamespaceService + ?Sized>(
    service: &S,
    batch: ParsedBatch,
    policy: RetryPolicy,
) -> Result<RunReport, ProvisionError> {
    let plan = plan_batch(batch);
    tracing::info!(
        roots = plan.forest.roots.len(),
        nodes = plan.forest.node_count(),
        skipped = plan.skipped.len(),
        orphans = plan.forest.orphans.len(),
        "forest assembled"
    );
    let mut ctx = RunContext::new(policy);
    let mut report = provision_forest(service, &plan.forest, &mut ctx)?;
    report.skipped_records = plan.skipped.len();
    Ok(report)
}
