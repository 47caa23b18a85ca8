//! Mediators built on the registry installed at startup.
//!
//! The registry is process-wide, so this binary holds a single test that
//! walks through the whole install sequence.

use std::sync::Arc;

use medusa::access::{readlink, register_builtin};
use medusa::audit::MemoryAuditSink;
use medusa::authority::StaticAuthority;
use medusa::kobject::{Dentry, IdentityCache, IdentitySource, Inode, Mount, SecurityContext, Task};
use medusa::mediator::Mediator;
use medusa::registry::{self, RegistryBuilder, RegistryError};
use medusa::types::{Answer, EscalationStatus};
use medusa::vs::VirtualSpace;

struct Labelled(SecurityContext);

impl IdentitySource for Labelled {
    fn task_identity(&self, _task: &Task) -> Option<SecurityContext> {
        Some(self.0)
    }

    fn inode_identity(&self, _inode: &Inode, _mount: Option<&Mount>) -> Option<SecurityContext> {
        Some(self.0)
    }
}

fn identity() -> Arc<IdentityCache> {
    let space = VirtualSpace::from_spaces([9]).expect("valid space");
    let ctx = SecurityContext {
        vs: space,
        vss: space,
        vsw: space,
        ..SecurityContext::default()
    };
    Arc::new(IdentityCache::new(Arc::new(Labelled(ctx))))
}

#[test]
fn mediator_resolves_the_installed_registry() {
    let audit = Arc::new(MemoryAuditSink::new());
    let before = Mediator::from_global(
        identity(),
        Arc::new(StaticAuthority(Answer::Deny)),
        Arc::clone(&audit) as Arc<dyn medusa::audit::AuditSink>,
    );
    assert!(matches!(before, Err(RegistryError::NotInstalled)));

    let mut builder = RegistryBuilder::new();
    register_builtin(&mut builder).expect("register builtin access types");
    let installed = Arc::new(builder.build());
    registry::install_global(Arc::clone(&installed)).expect("first install");

    let mediator = Mediator::from_global(
        identity(),
        Arc::new(StaticAuthority(Answer::Deny)),
        Arc::clone(&audit) as Arc<dyn medusa::audit::AuditSink>,
    )
    .expect("registry installed");
    assert_eq!(mediator.registry().len(), installed.len());
    assert!(mediator.registry().lookup("readlink").is_some());

    let task = Task {
        pid: 1,
        tgid: 1,
        uid: 0,
        euid: 0,
        gid: 0,
        egid: 0,
        comm: "init".to_owned(),
    };
    let link = Dentry {
        name: "lnk".to_owned(),
        inode: Inode {
            dev: 1,
            ino: 5,
            mode: 0o120_777,
            uid: 0,
            gid: 0,
            nlink: 1,
        },
    };
    let answer = readlink(&mediator, &task, &link).expect("mediated");
    assert_eq!(answer, Answer::Allow);
    assert_eq!(audit.records()[0].status, EscalationStatus::NoRequest);
}
