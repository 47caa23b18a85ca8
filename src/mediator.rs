//! The generalized mediation protocol shared by every hook.
//!
//! Per call:
//!
//! 1. Resolve the subject's and the object's security identity. If either
//!    cannot be resolved the call allows without auditing; entities not yet
//!    under mediation are not evaluated.
//! 2. Fast path: the subject's VSS and VSW must both intersect the object's
//!    VS, otherwise deny.
//! 3. If the access type is monitored for the triggering side, build the
//!    descriptors, mark the object live and ask the decision authority. Its
//!    answer is final.
//! 4. Emit exactly one audit record and return the answer.
//!
//! Only step 3 may block.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::access::{AccessHeader, AccessType};
use crate::audit::{AuditRecord, AuditSink, AuditTarget};
use crate::decision::{DecisionAuthority, DecisionEngine, DecisionError};
use crate::kobject::{FileKobject, IdentityCache, Inode, Mount, ProcessKobject, Task};
use crate::live::LivenessTable;
use crate::registry::{self, AccessTypeRegistry, RegistryError, TriggerMode};
use crate::types::{Answer, EscalationStatus};
use crate::vs;

/// Mediation errors surfaced to the hook caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediationError {
    /// The hook's access type was never registered.
    #[error("access type '{0}' is not registered")]
    UnknownAccessType(&'static str),
    /// The decision could not be obtained; the caller chooses the policy.
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

/// Subject, object and audit target of one mediated call.
#[derive(Debug, Clone)]
pub struct Operation<'a> {
    /// Calling task.
    pub task: &'a Task,
    /// Target inode.
    pub inode: &'a Inode,
    /// Mount the inode was reached through, used for revalidation.
    pub mount: Option<&'a Mount>,
    /// Target as written to the audit record.
    pub target: AuditTarget,
}

/// Runs the mediation protocol against shared collaborators.
pub struct Mediator {
    registry: Arc<AccessTypeRegistry>,
    identity: Arc<IdentityCache>,
    engine: DecisionEngine,
    liveness: Arc<LivenessTable>,
    audit: Arc<dyn AuditSink>,
}

impl Mediator {
    /// Mediator over the given registry, identity cache, authority and audit sink.
    pub fn new(
        registry: Arc<AccessTypeRegistry>,
        identity: Arc<IdentityCache>,
        authority: Arc<dyn DecisionAuthority>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            identity,
            engine: DecisionEngine::new(authority),
            liveness: Arc::new(LivenessTable::new()),
            audit,
        }
    }

    /// Mediator over the process-wide registry installed at startup.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotInstalled`] if
    /// [`install_global`](registry::install_global) has not run yet.
    pub fn from_global(
        identity: Arc<IdentityCache>,
        authority: Arc<dyn DecisionAuthority>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, RegistryError> {
        let registry = registry::global().ok_or(RegistryError::NotInstalled)?;
        Ok(Self::new(registry, identity, authority, audit))
    }

    /// Use a liveness table shared with the host, e.g. to check for
    /// pending decisions before reclaiming an inode.
    #[must_use]
    pub fn with_liveness(mut self, liveness: Arc<LivenessTable>) -> Self {
        self.liveness = liveness;
        self
    }

    /// Registered access types.
    pub fn registry(&self) -> &AccessTypeRegistry {
        &self.registry
    }

    /// Identity cache used for validation.
    pub fn identity(&self) -> &IdentityCache {
        &self.identity
    }

    /// Live markers of objects with pending decisions.
    pub fn liveness(&self) -> &LivenessTable {
        &self.liveness
    }

    /// Mediate one operation of access type `A`.
    ///
    /// `build` creates the access descriptor; it only runs when the
    /// decision authority is consulted.
    ///
    /// # Errors
    ///
    /// [`MediationError::UnknownAccessType`] if `A` is not registered, and
    /// [`MediationError::Decision`] if the authority could not answer. The
    /// latter is audited before it is returned.
    pub fn mediate<A, F>(&self, op: Operation<'_>, build: F) -> Result<Answer, MediationError>
    where
        A: AccessType<Subject = ProcessKobject, Object = FileKobject>,
        F: FnOnce(AccessHeader) -> A,
    {
        let def = self
            .registry
            .lookup(A::NAME)
            .ok_or(MediationError::UnknownAccessType(A::NAME))?;

        let Ok(subject_ctx) = self.identity.ensure_task(op.task) else {
            debug!(acctype = A::NAME, pid = op.task.pid, "unidentifiable subject, allowing");
            return Ok(Answer::Allow);
        };
        let Ok(object_ctx) = self.identity.ensure_inode(op.inode, op.mount) else {
            debug!(acctype = A::NAME, object = %op.inode.id(), "unidentifiable object, allowing");
            return Ok(Answer::Allow);
        };

        let mut record = AuditRecord {
            timestamp: Utc::now(),
            function: A::NAME,
            pid: op.task.pid,
            target: op.target,
            answer: Some(Answer::Allow),
            status: EscalationStatus::NoRequest,
            vs: None,
            error: None,
        };

        let result = match vs::check(&subject_ctx, &object_ctx) {
            Err(denial) => {
                debug!(acctype = A::NAME, ?denial, "virtual spaces disjoint, denying");
                record.answer = Some(Answer::Deny);
                record.status = EscalationStatus::FastPath;
                record.vs = Some(denial);
                Ok(Answer::Deny)
            }
            Ok(()) => {
                let trigger_ctx = match A::TRIGGER {
                    TriggerMode::Subject => &subject_ctx,
                    TriggerMode::Object => &object_ctx,
                };
                if self.registry.is_monitored(def.id, trigger_ctx) {
                    record.status = EscalationStatus::Request;
                    let access = build(AccessHeader::new(def.id));
                    let subject = ProcessKobject::from_task(op.task, &subject_ctx);
                    let object = FileKobject::from_inode(op.inode, &object_ctx);
                    let decided = {
                        let _live = self.liveness.acquire(object.id());
                        self.engine.decide(def, &access, &subject, &object)
                    };
                    record.answer = decided.as_ref().ok().copied();
                    record.error = decided.as_ref().err().map(ToString::to_string);
                    decided.map_err(MediationError::from)
                } else {
                    Ok(Answer::Allow)
                }
            }
        };

        if let Err(e) = self.audit.emit(&record) {
            warn!(acctype = A::NAME, error = %e, "failed to emit audit record");
        }
        result
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("registry", &self.registry)
            .field("identity", &self.identity)
            .field("engine", &self.engine)
            .field("liveness", &self.liveness)
            .field("audit", &"<dyn AuditSink>")
            .finish()
    }
}
