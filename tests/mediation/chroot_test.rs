//! Chroot hook: subject-triggered mediation.

use medusa::access::chroot;
use medusa::audit::AuditTarget;
use medusa::decision::AuthorityError;
use medusa::kobject::{Dentry, Mount, Path};
use medusa::types::{Answer, EscalationStatus};

use crate::support::{harness, inode, jail_path, object, registry, subject, task, vs};

#[test]
fn disjoint_virtual_spaces_deny_without_escalation() {
    let registry = registry();
    let subj = subject(&registry, &[1, 2], &[1, 2], &["chroot"]);
    let obj = object(&registry, &[3], &[]);
    let h = harness(registry, Some(subj), Some(obj), Ok(Answer::Allow));

    let answer = chroot(&h.mediator, &task(), &jail_path()).expect("mediated");

    assert_eq!(answer, Answer::Deny);
    assert_eq!(h.authority.calls(), 0);
    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.function, "chroot");
    assert_eq!(record.pid, 100);
    assert_eq!(record.answer, Some(Answer::Deny));
    assert_eq!(record.status, EscalationStatus::FastPath);
    let denial = record.vs.expect("denial captured");
    assert_eq!(denial.vst, vs(&[3]));
    assert_eq!(denial.vss, vs(&[1, 2]));
    assert_eq!(denial.vsw, vs(&[1, 2]));
}

#[test]
fn readable_but_not_writable_denies() {
    let registry = registry();
    let subj = subject(&registry, &[3], &[1], &[]);
    let obj = object(&registry, &[3], &[]);
    let h = harness(registry, Some(subj), Some(obj), Ok(Answer::Allow));

    let answer = chroot(&h.mediator, &task(), &jail_path()).expect("mediated");

    assert_eq!(answer, Answer::Deny);
    assert_eq!(h.audit.records()[0].status, EscalationStatus::FastPath);
}

#[test]
fn unidentifiable_subject_allows_without_audit() {
    let registry = registry();
    let obj = object(&registry, &[3], &["chroot"]);
    let h = harness(registry, None, Some(obj), Ok(Answer::Deny));

    let answer = chroot(&h.mediator, &task(), &jail_path()).expect("mediated");

    assert_eq!(answer, Answer::Allow);
    assert!(h.audit.is_empty());
    assert_eq!(h.authority.calls(), 0);
}

#[test]
fn unidentifiable_object_allows_without_audit() {
    let registry = registry();
    let subj = subject(&registry, &[1, 2], &[1, 2], &["chroot"]);
    let h = harness(registry, Some(subj), None, Ok(Answer::Deny));

    let answer = chroot(&h.mediator, &task(), &jail_path()).expect("mediated");

    assert_eq!(answer, Answer::Allow);
    assert!(h.audit.is_empty());
    assert_eq!(h.authority.calls(), 0);
}

#[test]
fn unmonitored_subject_allows_without_request() {
    let registry = registry();
    let subj = subject(&registry, &[1], &[1], &[]);
    let obj = object(&registry, &[1], &[]);
    let h = harness(registry, Some(subj), Some(obj), Ok(Answer::Deny));

    let answer = chroot(&h.mediator, &task(), &jail_path()).expect("mediated");

    assert_eq!(answer, Answer::Allow);
    assert_eq!(h.authority.calls(), 0);
    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].answer, Some(Answer::Allow));
    assert_eq!(records[0].status, EscalationStatus::NoRequest);
    assert!(records[0].vs.is_none());
}

#[test]
fn monitored_subject_escalates_and_authority_answer_is_final() {
    let registry = registry();
    let subj = subject(&registry, &[1], &[1], &["chroot"]);
    let obj = object(&registry, &[1], &[]);
    let h = harness(registry, Some(subj), Some(obj), Ok(Answer::Deny));

    let answer = chroot(&h.mediator, &task(), &jail_path()).expect("mediated");

    assert_eq!(answer, Answer::Deny);
    assert_eq!(h.authority.calls(), 1);
    let seen = h.authority.seen.lock().expect("test lock");
    let request = &seen[0].request;
    assert_eq!(request.acctype, "chroot");
    assert_eq!(request.access["filename"], "jail");
    assert_eq!(request.subject["pid"], 100);
    assert_eq!(request.object["ino"], 12);
    assert_eq!(seen[0].live_during_call, 1);
    drop(seen);

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].answer, Some(Answer::Deny));
    assert_eq!(records[0].status, EscalationStatus::Request);
    assert_eq!(h.liveness.count(inode(12).id()), 0);
}

#[test]
fn monitored_object_alone_does_not_escalate() {
    let registry = registry();
    let subj = subject(&registry, &[1], &[1], &[]);
    let obj = object(&registry, &[1], &["chroot"]);
    let h = harness(registry, Some(subj), Some(obj), Ok(Answer::Deny));

    let answer = chroot(&h.mediator, &task(), &jail_path()).expect("mediated");

    assert_eq!(answer, Answer::Allow);
    assert_eq!(h.authority.calls(), 0);
    assert_eq!(h.audit.records()[0].status, EscalationStatus::NoRequest);
}

#[test]
fn mount_root_is_named_by_its_mountpoint() {
    let registry = registry();
    let subj = subject(&registry, &[1], &[1], &["chroot"]);
    let obj = object(&registry, &[1], &[]);
    let h = harness(registry, Some(subj), Some(obj), Ok(Answer::Allow));
    let root = inode(2);
    let path = Path {
        mnt: Mount {
            mountpoint: "srv".to_owned(),
            root: root.id(),
        },
        dentry: Dentry {
            name: "/".to_owned(),
            inode: root,
        },
    };

    let answer = chroot(&h.mediator, &task(), &path).expect("mediated");

    assert_eq!(answer, Answer::Allow);
    assert_eq!(
        h.audit.records()[0].target,
        AuditTarget::Path {
            path: "srv".to_owned()
        }
    );
    let seen = h.authority.seen.lock().expect("test lock");
    assert_eq!(seen[0].request.access["filename"], "srv");
}

#[test]
fn authority_failure_propagates_and_is_audited() {
    let registry = registry();
    let subj = subject(&registry, &[1], &[1], &["chroot"]);
    let obj = object(&registry, &[1], &[]);
    let h = harness(
        registry,
        Some(subj),
        Some(obj),
        Err(AuthorityError::Disconnected),
    );

    let err = chroot(&h.mediator, &task(), &jail_path()).expect_err("authority failed");

    assert!(err.to_string().contains("disconnected"), "got: {err}");
    assert_eq!(h.authority.seen.lock().expect("test lock")[0].live_during_call, 1);
    assert_eq!(h.liveness.count(inode(12).id()), 0);
    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].answer, None);
    assert_eq!(records[0].status, EscalationStatus::Request);
    assert!(records[0].error.is_some());
}
