//! End-to-end synchronization runs against an in-memory server

mod common;

use anyhow::Result;
use common::{FakeRemote, SERVER_URL};
use headsync_core::app::{BuildTargetRegistry, Checkout, HeadProjection, HeadSource, ScanMode, VcsKind, WitnessOutcome};
use headsync_core::behavior::{DiscoveryBehavior, MergeStrategy};
use headsync_core::cancel::CancellationToken;
use headsync_core::ports::{FileExistsCriteria, HeadObserver, Includes, ProbeTarget};
use headsync_core::{CloneInformation, CoreError, EventType, Head, HeadCategory, HeadEvent, RepositoryIdentity};
use std::sync::Arc;

fn source(remote: &Arc<FakeRemote>, behaviors: Vec<DiscoveryBehavior>) -> Result<HeadSource> {
    let identity = RepositoryIdentity::new(SERVER_URL, "space/demo")?;
    let client: Arc<dyn headsync_core::ports::RemoteRepositoryClient> = remote.clone();
    Ok(HeadSource::new(identity, client, Arc::new(BuildTargetRegistry::with_defaults()))
        .with_behaviors(behaviors))
}

fn origin() -> CloneInformation {
    CloneInformation::new("git", format!("{SERVER_URL}/repo/space/demo"))
}

fn branch(name: &str) -> Head {
    Head::branch(origin(), name)
}

fn names(projection: &HeadProjection) -> Vec<String> {
    projection.heads().iter().map(|h| h.name().to_string()).collect()
}

#[test]
fn test_branches_are_discovered_and_built() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1"), ("feature/x", "b2")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();

    let report = source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    assert_eq!(report.mode, ScanMode::Full);
    let lines: Vec<String> = report.witness.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["    main: Met criteria", "    feature/x: Met criteria"]);
    assert_eq!(names(&projection), vec!["feature/x", "main"]);

    let main = branch("main");
    let config = source.build(&main, projection.revision(&main))?;
    assert_eq!(config.vcs, VcsKind::Git);
    assert_eq!(config.clone_url, format!("{SERVER_URL}/repo/space/demo"));
    assert_eq!(config.revision.as_deref(), Some("a1"));
    assert!(matches!(config.checkout, Checkout::Git { ref reference, .. } if reference == "main"));
    Ok(())
}

#[test]
fn test_vanished_head_is_removed_exactly_once() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1"), ("old-feature", "b2")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    remote.update(|state| state.branches.retain(|b| b.name != "old-feature"));
    let report = source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    assert_eq!(report.removed, vec![branch("old-feature")]);
    assert_eq!(projection.removed(), &[branch("old-feature")]);
    assert_eq!(names(&projection), vec!["main"]);
    Ok(())
}

#[test]
fn test_second_run_without_changes_is_idempotent() -> Result<()> {
    let remote = Arc::new(
        FakeRemote::git()
            .with_branches(&[("main", "a1"), ("docs", "d4")])
            .with_file("a1", "Jenkinsfile"),
    );
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let criteria = FileExistsCriteria::new("Jenkinsfile");
    let mut projection = HeadProjection::new();

    source.retrieve(Some(&criteria), &mut projection, None, &CancellationToken::new())?;
    let first = names(&projection);
    let report = source.retrieve(Some(&criteria), &mut projection, None, &CancellationToken::new())?;

    assert_eq!(first, vec!["main"]);
    assert_eq!(names(&projection), first);
    assert!(report.removed.is_empty());
    assert_eq!(report.witness[1].outcome, WitnessOutcome::DoesNotMeetCriteria);
    Ok(())
}

#[test]
fn test_unreachable_server_leaves_observer_untouched() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1")]));
    let source = source(
        &remote,
        vec![DiscoveryBehavior::BranchDiscovery, DiscoveryBehavior::TagDiscovery],
    )?;
    let mut projection = HeadProjection::new();
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    remote.update(|state| state.unreachable = true);
    let result = source.retrieve(None, &mut projection, None, &CancellationToken::new());

    assert!(matches!(result, Err(CoreError::Transport { .. })));
    assert_eq!(names(&projection), vec!["main"]);
    assert!(projection.removed().is_empty());
    Ok(())
}

#[test]
fn test_targeted_refresh_never_prunes() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1"), ("feature/x", "b2")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    remote.update(|state| state.branches.clear());
    projection.set_includes(Includes::Only(vec![branch("feature/x")]));
    let report = source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    assert_eq!(report.mode, ScanMode::Targeted);
    assert!(report.witness.is_empty());
    assert!(report.removed.is_empty());
    assert_eq!(names(&projection), vec!["feature/x", "main"]);
    Ok(())
}

#[test]
fn test_targeted_refresh_updates_single_head() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1"), ("feature/x", "b2")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new().with_includes(Includes::Only(vec![branch("main")]));

    remote.update(|state| state.branches[0].revision = "a2".to_string());
    let report = source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    assert_eq!(report.witness.len(), 1);
    assert_eq!(
        projection.revision(&branch("main")).map(|r| r.marker().to_string()),
        Some("a2".to_string())
    );
    assert!(!projection.contains(&branch("feature/x")));
    Ok(())
}

#[test]
fn test_removal_event_forces_full_scan() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1"), ("feature/x", "b2")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    remote.update(|state| state.branches.retain(|b| b.name != "feature/x"));
    projection.set_includes(Includes::Only(vec![branch("feature/x")]));
    let event = HeadEvent::for_branches(EventType::Removed, &origin(), ["feature/x"]);
    let report = source.retrieve(None, &mut projection, Some(&event), &CancellationToken::new())?;

    assert_eq!(report.mode, ScanMode::Full);
    assert_eq!(report.removed, vec![branch("feature/x")]);
    Ok(())
}

#[test]
fn test_merge_strategy_probes_merge_revision() -> Result<()> {
    let remote = Arc::new(
        FakeRemote::git()
            .with_branches(&[("main", "a1")])
            .with_pull_request("7", "feature/x", "main", "p7")
            .with_file("p7+main", "Jenkinsfile"),
    );
    let source = source(
        &remote,
        vec![
            DiscoveryBehavior::PullRequestDiscovery {
                exclude_branches_with_pull_requests: false,
            },
            DiscoveryBehavior::PullRequestStrategy {
                strategy: MergeStrategy::Merge,
            },
        ],
    )?;
    let criteria = FileExistsCriteria::new("Jenkinsfile");
    let mut projection = HeadProjection::new();

    let report = source.retrieve(Some(&criteria), &mut projection, None, &CancellationToken::new())?;

    assert_eq!(
        remote.probed_targets(),
        vec![ProbeTarget::Merge {
            head: "p7".to_string(),
            target_branch: "main".to_string(),
        }]
    );
    assert_eq!(report.matched(), 1);
    assert_eq!(names(&projection), vec!["PR-7"]);
    Ok(())
}

#[test]
fn test_missing_revision_content_does_not_meet_criteria() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let criteria = FileExistsCriteria::new("Jenkinsfile");
    let mut projection = HeadProjection::new();

    let report = source.retrieve(Some(&criteria), &mut projection, None, &CancellationToken::new())?;

    assert_eq!(report.witness[0].outcome, WitnessOutcome::DoesNotMeetCriteria);
    assert!(names(&projection).is_empty());
    Ok(())
}

#[test]
fn test_head_without_revision_is_skipped_and_kept() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1"), ("broken", "b1")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    remote.update(|state| state.branches[1].revision.clear());
    let report = source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    assert_eq!(report.witness[1].to_string(), "    broken: Skipped");
    assert!(report.removed.is_empty());
    assert!(projection.contains(&branch("broken")));
    Ok(())
}

#[test]
fn test_category_needs_a_behavior() -> Result<()> {
    let remote = Arc::new(FakeRemote::git());
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;

    assert!(source.is_category_enabled(HeadCategory::Branch)?);
    assert!(!source.is_category_enabled(HeadCategory::Tag)?);
    assert!(!source.is_category_enabled(HeadCategory::PullRequest)?);
    Ok(())
}

#[test]
fn test_category_needs_type_support() -> Result<()> {
    let remote = Arc::new(FakeRemote::with_type("svn").with_tags(&[("v1", "7")]));
    let source = source(
        &remote,
        vec![DiscoveryBehavior::BranchDiscovery, DiscoveryBehavior::TagDiscovery],
    )?;

    assert!(source.is_category_enabled(HeadCategory::Branch)?);
    assert!(!source.is_category_enabled(HeadCategory::Tag)?);

    let mut projection = HeadProjection::new();
    let report = source.retrieve(None, &mut projection, None, &CancellationToken::new())?;
    assert!(report.witness.is_empty());
    Ok(())
}

#[test]
fn test_type_is_resolved_once() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();

    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;
    source.is_category_enabled(HeadCategory::Branch)?;

    assert_eq!(remote.repository_lookups(), 1);
    assert_eq!(source.identity().vcs_type()?, "git");
    Ok(())
}

#[test]
fn test_unknown_repository_fails_type_resolution() -> Result<()> {
    let remote = Arc::new(FakeRemote::with_type(""));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();

    let result = source.retrieve(None, &mut projection, None, &CancellationToken::new());
    assert!(matches!(result, Err(CoreError::TypeResolution { .. })));
    Ok(())
}

#[test]
fn test_unsupported_type_cannot_be_built() -> Result<()> {
    let remote = Arc::new(FakeRemote::with_type("bzr").with_branches(&[("trunk", "1")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    let trunk = projection.heads()[0].clone();
    let result = source.build(&trunk, projection.revision(&trunk));
    assert!(matches!(result, Err(CoreError::UnsupportedType { ref vcs_type }) if vcs_type == "bzr"));
    Ok(())
}

#[test]
fn test_clone_options_reach_the_build_target() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1")]));
    let source = source(
        &remote,
        vec![
            DiscoveryBehavior::BranchDiscovery,
            DiscoveryBehavior::CloneOptions {
                shallow_depth: Some(1),
                clean: true,
            },
        ],
    )?;

    let config = source.build(&branch("main"), None)?;
    assert!(matches!(
        config.checkout,
        Checkout::Git {
            shallow_depth: Some(1),
            clean: true,
            ..
        }
    ));
    Ok(())
}

#[test]
fn test_cancelled_run_reports_nothing() -> Result<()> {
    let remote = Arc::new(FakeRemote::git().with_branches(&[("main", "a1")]));
    let source = source(&remote, vec![DiscoveryBehavior::BranchDiscovery])?;
    let mut projection = HeadProjection::new();
    source.retrieve(None, &mut projection, None, &CancellationToken::new())?;

    remote.update(|state| state.branches.clear());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = source.retrieve(None, &mut projection, None, &cancel);

    assert!(matches!(result, Err(CoreError::Cancelled)));
    assert_eq!(projection.known_heads(), vec![branch("main")]);
    Ok(())
}
