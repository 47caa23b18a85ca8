//! A mediating thread blocked on an asynchronous endpoint.

use std::sync::Arc;

use medusa::access::{readlink, register_builtin};
use medusa::audit::{AuditSink, MemoryAuditSink};
use medusa::authority::channel;
use medusa::decision::{AuthorityError, DecisionAuthority};
use medusa::kobject::{Dentry, IdentityCache, IdentitySource, Inode, Mount, SecurityContext, Task};
use medusa::mediator::{MediationError, Mediator};
use medusa::registry::{AccessTypeRegistry, RegistryBuilder};
use medusa::types::{Answer, EscalationStatus};
use medusa::vs::VirtualSpace;

struct Labels(SecurityContext, SecurityContext);

impl IdentitySource for Labels {
    fn task_identity(&self, _task: &Task) -> Option<SecurityContext> {
        Some(self.0)
    }

    fn inode_identity(&self, _inode: &Inode, _mount: Option<&Mount>) -> Option<SecurityContext> {
        Some(self.1)
    }
}

fn registry() -> Arc<AccessTypeRegistry> {
    let mut builder = RegistryBuilder::new();
    register_builtin(&mut builder).expect("register");
    Arc::new(builder.build())
}

fn mediator(authority: Arc<dyn DecisionAuthority>, audit: Arc<MemoryAuditSink>) -> Mediator {
    let registry = registry();
    let space = VirtualSpace::from_spaces([5]).expect("valid space");
    let subject = SecurityContext {
        vs: space,
        vss: space,
        vsw: space,
        ..SecurityContext::default()
    };
    let object = SecurityContext {
        vs: space,
        act: registry.mask(&["readlink"]).expect("registered"),
        ..SecurityContext::default()
    };
    let identity = Arc::new(IdentityCache::new(Arc::new(Labels(subject, object))));
    Mediator::new(registry, identity, authority, audit as Arc<dyn AuditSink>)
}

fn task() -> Task {
    Task {
        pid: 4242,
        tgid: 4242,
        uid: 0,
        euid: 0,
        gid: 0,
        egid: 0,
        comm: "cat".to_owned(),
    }
}

fn link() -> Dentry {
    Dentry {
        name: "lnk".to_owned(),
        inode: Inode {
            dev: 1,
            ino: 77,
            mode: 0o120_777,
            uid: 0,
            gid: 0,
            nlink: 1,
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn endpoint_answer_reaches_the_blocked_caller() {
    let (authority, mut endpoint) = channel();
    let audit = Arc::new(MemoryAuditSink::new());
    let mediator = mediator(Arc::new(authority), Arc::clone(&audit));

    let daemon = tokio::spawn(async move {
        let pending = endpoint.recv().await.expect("one request");
        assert_eq!(pending.request.acctype, "readlink");
        assert_eq!(pending.request.subject["comm"], "cat");
        pending.respond(Answer::Deny).expect("caller waiting");
    });

    let answer = tokio::task::spawn_blocking(move || readlink(&mediator, &task(), &link()))
        .await
        .expect("mediation thread")
        .expect("mediated");
    daemon.await.expect("endpoint task");

    assert_eq!(answer, Answer::Deny);
    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, EscalationStatus::Request);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_request_is_an_authority_failure() {
    let (authority, mut endpoint) = channel();
    let audit = Arc::new(MemoryAuditSink::new());
    let mediator = mediator(Arc::new(authority), Arc::clone(&audit));

    let daemon = tokio::spawn(async move {
        let pending = endpoint.recv().await.expect("one request");
        drop(pending);
    });

    let result = tokio::task::spawn_blocking(move || readlink(&mediator, &task(), &link()))
        .await
        .expect("mediation thread");
    daemon.await.expect("endpoint task");

    assert!(matches!(
        result,
        Err(MediationError::Decision(medusa::decision::DecisionError::Authority(
            AuthorityError::NoAnswer(_)
        )))
    ));
    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].answer, None);
}

#[test]
fn closed_endpoint_is_disconnected() {
    let (authority, mut endpoint) = channel();
    endpoint.close();
    let audit = Arc::new(MemoryAuditSink::new());
    let mediator = mediator(Arc::new(authority), Arc::clone(&audit));

    let result = readlink(&mediator, &task(), &link());

    assert!(matches!(
        result,
        Err(MediationError::Decision(medusa::decision::DecisionError::Authority(
            AuthorityError::Disconnected
        )))
    ));
    assert_eq!(audit.len(), 1);
}
