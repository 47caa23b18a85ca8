//! Medusa: access mediation for filesystem hooks.
//!
//! Every mediated operation follows one protocol: resolve the security
//! identity of subject and object, run the virtual-space fast path, and for
//! monitored access types ask an external decision authority while the
//! object is held live. Each call that gets past identity resolution is
//! audited exactly once.
//!
//! See `DESIGN.md` for the architecture and decisions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod audit;
pub mod authority;
pub mod config;
pub mod decision;
pub mod kobject;
pub mod live;
pub mod logging;
pub mod mediator;
pub mod registry;
pub mod scenario;
pub mod schema;
pub mod types;
pub mod vs;
