//! Decision Engine: the one blocking step of mediation.
//!
//! Encodes the access descriptor and the subject/object snapshots by their
//! registered schemas and asks the decision authority for an answer. The
//! authority's answer supersedes the fast path. Authority failures are
//! returned unchanged; this layer never substitutes a default answer.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::AccessType;
use crate::registry::AccessTypeDef;
use crate::schema::{encode, SchemaError};
use crate::types::Answer;

/// Failures reported by a decision authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorityError {
    /// The authority is not reachable.
    #[error("decision authority disconnected")]
    Disconnected,
    /// The authority accepted the request but never answered it.
    #[error("decision authority dropped request {0}")]
    NoAnswer(Uuid),
    /// The authority answered with something other than allow/deny.
    #[error("malformed authority response: {0}")]
    Malformed(String),
    /// Any other authority-side failure.
    #[error("decision authority failed: {0}")]
    Failed(String),
}

/// Decision Engine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecisionError {
    /// Payload does not match the registered schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The descriptor's header does not name the registration it is decided under.
    #[error(
        "{acctype} descriptor carries access type id {actual}, \
         registration '{registered}' has id {expected}"
    )]
    DescriptorMismatch {
        /// Access type of the descriptor.
        acctype: &'static str,
        /// Name of the registration passed in.
        registered: &'static str,
        /// Id of the registration passed in.
        expected: usize,
        /// Id found in the descriptor header.
        actual: usize,
    },
    /// The authority failed.
    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

/// One request to the decision authority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRequest {
    /// Correlates the request with its answer and logs.
    pub request_id: Uuid,
    /// Access type name.
    pub acctype: &'static str,
    /// Access descriptor payload.
    pub access: Map<String, Value>,
    /// Subject payload.
    pub subject: Map<String, Value>,
    /// Object payload.
    pub object: Map<String, Value>,
}

/// External collaborator issuing authoritative answers.
///
/// `decide` blocks the calling thread until the answer arrives. It must be
/// safe to call concurrently from many mediating threads.
pub trait DecisionAuthority: Send + Sync {
    /// Answer one request.
    ///
    /// # Errors
    ///
    /// Any [`AuthorityError`]; it is propagated to the hook caller as is.
    fn decide(&self, request: DecisionRequest) -> Result<Answer, AuthorityError>;
}

/// Builds requests and forwards them to the authority.
#[derive(Clone)]
pub struct DecisionEngine {
    authority: Arc<dyn DecisionAuthority>,
}

impl DecisionEngine {
    /// Engine answering through `authority`.
    pub fn new(authority: Arc<dyn DecisionAuthority>) -> Self {
        Self { authority }
    }

    /// Ask the authority about `access` by `subject` on `object`.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::DescriptorMismatch`] when `access` was not
    /// built for `def`, a schema error when a payload does not match its
    /// schema, and [`DecisionError::Authority`] when the authority fails.
    pub fn decide<A: AccessType>(
        &self,
        def: &AccessTypeDef,
        access: &A,
        subject: &A::Subject,
        object: &A::Object,
    ) -> Result<Answer, DecisionError> {
        let header = access.header();
        if def.name != A::NAME || header.acctype != def.id {
            return Err(DecisionError::DescriptorMismatch {
                acctype: A::NAME,
                registered: def.name,
                expected: def.id.index(),
                actual: header.acctype.index(),
            });
        }
        let request = DecisionRequest {
            request_id: Uuid::new_v4(),
            acctype: def.name,
            access: encode(access)?,
            subject: encode(subject)?,
            object: encode(object)?,
        };
        let request_id = request.request_id;
        debug!(%request_id, acctype = def.name, "asking decision authority");
        let answer = self.authority.decide(request)?;
        info!(%request_id, acctype = def.name, %answer, "decision authority answered");
        Ok(answer)
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("authority", &"<dyn DecisionAuthority>")
            .finish()
    }
}
