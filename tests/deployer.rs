// ABOUTME: Integration tests for the deployment state machine.
// ABOUTME: Drives full runs against a fake provider and checks releases, pointers and the lock.

mod support;

use futures::future::BoxFuture;
use rand::SeedableRng;
use rand::rngs::StdRng;
use relay::config::{Config, JitterConfig, SharedConfig};
use relay::deploy::{
    Compensation, DeployError, DeployLock, Deployer, Outcome, RunContext, RunOutcome, RunReport,
    StageError, State, jitter_delay,
};
use relay::diagnostics::WarningKind;
use relay::hooks::{Hook, HookError};
use relay::layout::AppLayout;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use support::{FakeProvider, TestApp, fake_release, set_mtime};

async fn run(ctx: &mut RunContext) -> RunReport {
    Deployer::new().execute(ctx).await.unwrap()
}

#[tokio::test]
async fn first_run_deploys_and_promotes() {
    support::init_tracing();
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");

    let mut ctx = app.context(&provider, false);
    let report = run(&mut ctx).await;

    let release = match &report.outcome {
        RunOutcome::Deployed { release, revision } => {
            assert_eq!(revision.as_str(), "r1");
            release.clone()
        }
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(app.current(), Some(release.clone()));
    assert_eq!(app.previous(), None);
    assert_eq!(app.current_revision().as_deref(), Some("r1"));
    assert!(release.join("index.html").is_file());
    assert!(!app.lock_exists(), "lock should be released");
    assert_eq!(
        report.states,
        vec![
            State::Init,
            State::DetectChanges,
            State::Clone,
            State::Build,
            State::Deploy,
            State::PostDeploy,
            State::Verify,
            State::Finalize,
            State::End,
        ]
    );
    assert!(report.warnings.is_empty());
    assert_eq!(provider.initialize_calls(), 1);
}

#[tokio::test]
async fn no_current_release_clones_regardless_of_force() {
    for force in [false, true] {
        let app = TestApp::new();
        let provider = FakeProvider::new("r1");

        let report = run(&mut app.context(&provider, force)).await;

        assert!(report.visited(State::Clone), "force={force}");
        assert_eq!(app.current_revision().as_deref(), Some("r1"));
    }
}

#[tokio::test]
async fn unchanged_revision_is_a_noop() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    provider.add_hook(
        Hook::Build,
        &format!("echo build >> {}", app.hook_log().display()),
    );

    run(&mut app.context(&provider, false)).await;
    let live = app.current();

    let report = run(&mut app.context(&provider, false)).await;

    assert!(matches!(
        &report.outcome,
        RunOutcome::Unchanged { revision: Some(r) } if r.as_str() == "r1"
    ));
    assert_eq!(
        report.states,
        vec![
            State::Init,
            State::DetectChanges,
            State::Finalize,
            State::End
        ]
    );
    assert_eq!(app.releases().len(), 1);
    assert_eq!(app.current(), live);
    assert_eq!(provider.materialized().len(), 1);
    assert_eq!(app.hook_log_lines(), vec!["build"]);
    assert!(!app.lock_exists());
}

#[tokio::test]
async fn forced_run_redeploys_same_revision() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");

    run(&mut app.context(&provider, false)).await;
    let first = app.current().unwrap();

    let report = run(&mut app.context(&provider, true)).await;

    assert!(matches!(report.outcome, RunOutcome::Deployed { .. }));
    assert_eq!(app.releases().len(), 2);
    assert_ne!(app.current().unwrap(), first);
    assert_eq!(app.previous(), Some(first));
}

#[tokio::test]
async fn new_revision_moves_current_to_previous() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");

    run(&mut app.context(&provider, false)).await;
    let first = app.current().unwrap();

    provider.set_revision("r2");
    run(&mut app.context(&provider, false)).await;

    assert_eq!(app.current_revision().as_deref(), Some("r2"));
    assert_eq!(app.previous(), Some(first));
}

#[tokio::test]
async fn verify_failure_keeps_current() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    run(&mut app.context(&provider, false)).await;
    let live_before = app.current();

    provider.set_revision("r2");
    provider.add_hook(Hook::Verify, "exit 1");
    let report = run(&mut app.context(&provider, false)).await;

    match &report.outcome {
        RunOutcome::Failed { stage, reason } => {
            assert_eq!(*stage, State::Verify);
            assert!(reason.contains("verify hook"), "reason: {reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(app.current(), live_before);
    assert_eq!(app.previous(), None);
    assert_eq!(app.current_revision().as_deref(), Some("r1"));
    assert_eq!(app.releases().len(), 1, "failed release should be discarded");
    assert!(report.visited(State::Error));
    assert!(report.visited(State::Finalize));
    assert!(!app.lock_exists());
}

#[tokio::test]
async fn post_deploy_failure_restores_both_pointers() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    run(&mut app.context(&provider, false)).await;
    provider.set_revision("r2");
    run(&mut app.context(&provider, false)).await;
    let (current, previous) = (app.current(), app.previous());

    provider.set_revision("r3");
    provider.add_hook(Hook::PostDeploy, "exit 7");
    let report = run(&mut app.context(&provider, false)).await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Failed {
            stage: State::PostDeploy,
            ..
        }
    ));
    assert_eq!(app.current(), current);
    assert_eq!(app.previous(), previous);
    assert_eq!(app.releases().len(), 2);
}

#[tokio::test]
async fn interrupted_promotion_restores_pointers() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    run(&mut app.context(&provider, false)).await;
    let first = app.current();

    // Occupy current.tmp so the second swap of promote fails after
    // previous has already been repointed.
    provider.set_revision("r2");
    provider.add_hook(Hook::Deploy, "mkdir -p ../../current.tmp/busy");
    let report = run(&mut app.context(&provider, false)).await;

    match &report.outcome {
        RunOutcome::Failed { stage, reason } => {
            assert_eq!(*stage, State::Deploy);
            assert!(reason.contains("current.tmp"), "reason: {reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(app.current(), first);
    assert_eq!(app.previous(), None, "previous should be put back");
    assert_eq!(app.releases().len(), 1);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::Compensation),
        "restoring current through the blocked temp link is reported"
    );
    assert!(!app.lock_exists());
}

#[tokio::test]
async fn build_failure_on_first_run_leaves_nothing_behind() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    provider.add_hook(Hook::Build, "exit 2");

    let report = run(&mut app.context(&provider, false)).await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Failed {
            stage: State::Build,
            ..
        }
    ));
    assert_eq!(app.current(), None);
    assert!(app.releases().is_empty());
    assert!(!report.visited(State::Deploy));
}

#[tokio::test]
async fn relative_app_dir_deploys_from_its_parent() {
    let work = tempfile::tempdir().unwrap();
    let original_cwd = std::env::current_dir().unwrap();
    std::env::set_current_dir(work.path()).unwrap();

    let layout = AppLayout::new("app");
    for dir in layout.skeleton() {
        fs::create_dir_all(dir).unwrap();
    }
    fs::write(layout.shared_dir().join(".env"), "shared").unwrap();
    let mut config = Config::template("fake://repo", "main");
    config.deploy.shared.files = vec![PathBuf::from(".env")];

    let provider = FakeProvider::new("r1");
    provider.add_hook(Hook::Build, "exit 0");
    let mut ctx = RunContext::new(config, provider.clone(), layout.clone(), false);
    let report = run(&mut ctx).await;

    std::env::set_current_dir(&original_cwd).unwrap();

    assert!(
        matches!(report.outcome, RunOutcome::Deployed { .. }),
        "unexpected outcome: {:?}",
        report.outcome
    );
    let current = work.path().join("app/current");
    assert!(fs::metadata(&current).unwrap().is_dir(), "current must resolve");
    assert_eq!(fs::read_to_string(current.join("REVISION")).unwrap(), "r1");
    assert_eq!(fs::read_to_string(current.join(".env")).unwrap(), "shared");
}

#[tokio::test]
async fn hooks_run_in_lifecycle_order() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    let log = app.hook_log();
    for hook in Hook::ALL {
        provider.add_hook(hook, &format!("echo {hook} >> {}", log.display()));
    }

    run(&mut app.context(&provider, false)).await;

    assert_eq!(
        app.hook_log_lines(),
        vec!["clone", "build", "deploy", "post_deploy", "verify"]
    );
}

#[tokio::test]
async fn provider_failure_is_contained() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    provider.fail_initialize();

    let report = run(&mut app.context(&provider, false)).await;

    match &report.outcome {
        RunOutcome::Failed { stage, reason } => {
            assert_eq!(*stage, State::Init);
            assert!(reason.contains("remote unreachable"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!app.lock_exists(), "the run held the lock and must release it");
}

#[tokio::test]
async fn busy_lock_fails_without_touching_the_holder() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        let path = fake_release(&app.layout, name, "old");
        set_mtime(&path, 1_000 + i as u64);
    }
    let held = DeployLock::acquire(&app.layout).unwrap();

    let report = run(&mut app.context(&provider, false)).await;

    match &report.outcome {
        RunOutcome::Failed { stage, reason } => {
            assert_eq!(*stage, State::Init);
            assert!(reason.contains("deployment already in progress"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(app.lock_exists(), "another run's lock must survive");
    assert_eq!(app.releases().len(), 5, "a run without the lock must not prune");
    assert_eq!(provider.initialize_calls(), 0);

    held.release().unwrap();
}

#[tokio::test]
async fn finalize_prunes_to_keep_releases() {
    let mut app = TestApp::new();
    app.config.deploy.keep_releases = 2;
    let provider = FakeProvider::new("r1");

    for revision in ["r1", "r2", "r3", "r4"] {
        provider.set_revision(revision);
        run(&mut app.context(&provider, false)).await;
    }

    let releases = app.releases();
    assert_eq!(releases.len(), 2);
    assert!(releases.contains(&app.current().unwrap()));
    assert_eq!(app.current_revision().as_deref(), Some("r4"));
}

#[tokio::test]
async fn shared_paths_are_linked_into_the_release() {
    let mut app = TestApp::new();
    app.config.deploy.shared = SharedConfig {
        dirs: vec![PathBuf::from("storage")],
        files: vec![PathBuf::from(".env")],
    };
    fs::create_dir_all(app.layout.shared_dir().join("storage")).unwrap();
    fs::write(app.layout.shared_dir().join(".env"), "SECRET=1").unwrap();
    let provider = FakeProvider::new("r1");
    provider.add_file(".env", "SECRET=from-repo");
    provider.add_file("storage/.keep", "");

    run(&mut app.context(&provider, false)).await;

    let live = app.current().unwrap();
    assert_eq!(
        fs::read_link(live.join("storage")).unwrap(),
        app.layout.shared_dir().join("storage")
    );
    assert_eq!(fs::read_to_string(live.join(".env")).unwrap(), "SECRET=1");
}

#[tokio::test]
async fn clone_hook_runs_in_release_directory() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    provider.add_hook(
        Hook::Clone,
        &format!("pwd >> {}", app.hook_log().display()),
    );

    run(&mut app.context(&provider, false)).await;

    let live = app.current().unwrap();
    assert_eq!(app.hook_log_lines(), vec![live.display().to_string()]);
}

fn jump_to_end(_ctx: &mut RunContext) -> BoxFuture<'_, Result<Outcome, DeployError>> {
    Box::pin(async { Ok(Outcome::Next(State::End)) })
}

#[tokio::test]
async fn invalid_transition_is_fatal_and_keeps_the_lock() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    let deployer = Deployer::new().with_handler(State::DetectChanges, jump_to_end);

    let err = deployer
        .execute(&mut app.context(&provider, false))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::InvalidTransition {
            from: State::DetectChanges,
            to: State::End
        }
    ));
    assert!(app.lock_exists(), "fatal errors skip finalize");
}

#[tokio::test]
async fn missing_handler_is_fatal_and_skips_cleanup() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    let deployer = Deployer::new().without_handler(State::Build);

    let err = deployer
        .execute(&mut app.context(&provider, false))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::NoHandler(State::Build)));
    assert!(app.lock_exists());
    assert_eq!(app.releases().len(), 1, "no compensation runs on a fatal error");
    assert_eq!(app.current(), None);
}

fn build_with_broken_compensation(
    ctx: &mut RunContext,
) -> BoxFuture<'_, Result<Outcome, DeployError>> {
    Box::pin(async move {
        let ghost = ctx.layout().releases_dir().join("ghost");
        ctx.register(Compensation::DiscardRelease(ghost));
        Ok(Outcome::Contained(StageError::Hook(HookError::Failed {
            hook: Hook::Build,
            code: Some(1),
        })))
    })
}

#[tokio::test]
async fn compensations_continue_past_failures() {
    let app = TestApp::new();
    let provider = FakeProvider::new("r1");
    let deployer = Deployer::new().with_handler(State::Build, build_with_broken_compensation);

    let report = deployer
        .execute(&mut app.context(&provider, false))
        .await
        .unwrap();

    assert!(matches!(
        report.outcome,
        RunOutcome::Failed {
            stage: State::Build,
            ..
        }
    ));
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::Compensation);
    assert!(
        app.releases().is_empty(),
        "the staged release is still discarded"
    );
    assert!(!app.lock_exists());
}

#[tokio::test(start_paused = true)]
async fn jitter_sleeps_for_seeded_delay() {
    let mut app = TestApp::new();
    let jitter = JitterConfig { min: 5, max: 10 };
    app.config.deploy.jitter = Some(jitter);
    let provider = FakeProvider::new("r1");
    let expected = jitter_delay(&jitter, &mut StdRng::seed_from_u64(9));

    let mut ctx = app
        .context(&provider, false)
        .with_rng(StdRng::seed_from_u64(9));
    let start = tokio::time::Instant::now();
    run(&mut ctx).await;
    let elapsed = start.elapsed();

    assert!(expected >= Duration::from_secs(5) && expected <= Duration::from_secs(10));
    assert!(elapsed >= expected, "slept {elapsed:?}, expected {expected:?}");
    assert!(elapsed < expected + Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn zero_jitter_window_does_not_sleep() {
    let mut app = TestApp::new();
    app.config.deploy.jitter = Some(JitterConfig { min: 0, max: 0 });
    let provider = FakeProvider::new("r1");

    let start = tokio::time::Instant::now();
    run(&mut app.context(&provider, false)).await;

    assert!(start.elapsed() < Duration::from_secs(1));
}
