use portal_core::{RepositoryEvent as E, RepositoryPhase as P};

fn run(start: P, events: &[E]) -> P {
    events.iter().fold(start, |phase, event| phase.next(*event))
}

#[test]
fn full_submission_cycle_returns_to_authenticated() {
    let phase = run(
        P::Anonymous,
        &[
            E::LoginStarted,
            E::LoginSucceeded,
            E::CreateStarted,
            E::CreateSucceeded,
            E::PatchFinished,
            E::AttachmentsFinished,
        ],
    );
    assert_eq!(phase, P::Authenticated);
}

#[test]
fn failed_login_returns_to_anonymous() {
    assert_eq!(run(P::Anonymous, &[E::LoginStarted, E::LoginFailed]), P::Anonymous);
}

#[test]
fn failed_create_aborts_submission() {
    let phase = run(P::Authenticated, &[E::CreateStarted, E::CreateFailed]);
    assert_eq!(phase, P::Authenticated);
    // No patch step without a created item.
    assert_eq!(phase.next(E::PatchFinished), P::Authenticated);
}

#[test]
fn unauthorized_resets_from_any_phase() {
    for phase in [
        P::Authenticating,
        P::Authenticated,
        P::CreatingItem,
        P::PatchingMetadata,
        P::AttachingFiles,
    ] {
        assert_eq!(phase.next(E::Unauthorized), P::Anonymous);
        assert_eq!(phase.next(E::LoggedOut), P::Anonymous);
    }
}

#[test]
fn anonymous_cannot_create_items() {
    assert_eq!(P::Anonymous.next(E::CreateStarted), P::Anonymous);
    assert!(!P::Anonymous.is_authenticated());
    assert!(P::AttachingFiles.is_authenticated());
}
