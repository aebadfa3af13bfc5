//! Behaviour of the in-memory host that the sync engine relies on.

use filesync_core::RepoId;
use filesync_host::memory::{identity_of, InMemoryHost};
use filesync_host::{DeleteContent, HostError, Lookup, NewPullRequest, Operation, PutContent, RepositoryHost};

fn repo() -> RepoId {
    RepoId::from("org/service")
}

#[test]
fn missing_things_are_not_found_not_errors() {
    let host = InMemoryHost::new().with_repo("org/service", "main");
    assert_eq!(
        host.find_repository(&RepoId::from("org/ghost")).expect("lookup"),
        Lookup::NotFound
    );
    assert_eq!(host.get_branch(&repo(), "nope").expect("lookup"), Lookup::NotFound);
    assert_eq!(
        host.get_content(&repo(), "README.md", "main").expect("lookup"),
        Lookup::NotFound
    );
}

#[test]
fn update_requires_current_identity() {
    let host = InMemoryHost::new()
        .with_repo("org/service", "main")
        .with_file("org/service", "main", "ci.yml", b"v1");

    let stale = identity_of(b"v0");
    let err = host
        .put_content(
            &repo(),
            PutContent {
                path: "ci.yml",
                bytes: b"v2",
                message: "sync",
                branch: "main",
                expected: Some(&stale),
            },
        )
        .unwrap_err();
    assert!(matches!(err, HostError::Status { status: 409, .. }), "got: {err}");

    let current = identity_of(b"v1");
    host.put_content(
        &repo(),
        PutContent {
            path: "ci.yml",
            bytes: b"v2",
            message: "sync",
            branch: "main",
            expected: Some(&current),
        },
    )
    .expect("update");
    assert_eq!(host.file("org/service", "main", "ci.yml").as_deref(), Some(&b"v2"[..]));
}

#[test]
fn branch_is_cut_from_commit_and_pr_needs_a_diff() {
    let host = InMemoryHost::new()
        .with_repo("org/service", "main")
        .with_file("org/service", "main", "a.txt", b"a");
    let tip = host
        .get_branch(&repo(), "main")
        .expect("lookup")
        .found()
        .expect("main exists");
    host.create_branch(&repo(), "file-sync", &tip.commit_sha)
        .expect("create");
    assert_eq!(host.file("org/service", "file-sync", "a.txt").as_deref(), Some(&b"a"[..]));

    let pr = NewPullRequest {
        title: "file-sync",
        head: "file-sync",
        base: "main",
        draft: false,
    };
    assert!(host.create_pull_request(&repo(), pr).is_err(), "no diff yet");

    host.delete_content(
        &repo(),
        DeleteContent {
            path: "a.txt",
            message: "remove",
            branch: "file-sync",
            expected: &identity_of(b"a"),
        },
    )
    .expect("delete");
    let opened = host.create_pull_request(&repo(), pr).expect("open");
    assert_eq!(opened.number, 1);
    let dup = host.create_pull_request(&repo(), pr).unwrap_err();
    assert!(dup.to_string().contains("already exists"));
}

#[test]
fn injected_failures_are_scoped_and_recorded() {
    let host = InMemoryHost::new()
        .with_repo("org/service", "main")
        .with_repo("org/other", "main")
        .failing("org/service", Operation::GetBranch);

    assert!(host.get_branch(&repo(), "main").is_err());
    assert!(host.get_branch(&RepoId::from("org/other"), "main").is_ok());
    assert_eq!(host.count("org/service", Operation::GetBranch), 1);
    assert_eq!(host.count("org/other", Operation::GetBranch), 1);
}

#[test]
fn ref_scoped_failures_leave_other_refs_alone() {
    let host = InMemoryHost::new()
        .with_repo("org/service", "main")
        .with_file("org/service", "main", "a.txt", b"a")
        .with_branch("org/service", "file-sync", "main")
        .failing_at("org/service", Operation::GetContent, "main")
        .failing_at("org/service", Operation::GetBranch, "file-sync");

    assert!(host.get_content(&repo(), "a.txt", "main").is_err());
    assert!(matches!(
        host.get_content(&repo(), "a.txt", "file-sync"),
        Ok(Lookup::Found(_))
    ));
    assert!(host.get_branch(&repo(), "file-sync").is_err());
    assert!(matches!(host.get_branch(&repo(), "main"), Ok(Lookup::Found(_))));
}
