// ABOUTME: Test support utilities.
// ABOUTME: Provides an in-memory source provider, app directory fixtures and hook helpers.

use async_trait::async_trait;
use relay::config::Config;
use relay::deploy::RunContext;
use relay::hooks::{HOOKS_DIR, Hook};
use relay::layout::AppLayout;
use relay::provider::{ProviderError, SourceProvider};
use relay::release;
use relay::types::Revision;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("relay=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Source provider that serves a fixed set of files at a settable revision.
#[allow(dead_code)]
pub struct FakeProvider {
    revision: Mutex<String>,
    files: Mutex<Vec<(PathBuf, String, bool)>>,
    fail_initialize: AtomicBool,
    initialized: AtomicUsize,
    materialized: Mutex<Vec<PathBuf>>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(revision: &str) -> Arc<Self> {
        Arc::new(Self {
            revision: Mutex::new(revision.to_string()),
            files: Mutex::new(vec![(PathBuf::from("index.html"), "hello".to_string(), false)]),
            fail_initialize: AtomicBool::new(false),
            initialized: AtomicUsize::new(0),
            materialized: Mutex::new(Vec::new()),
        })
    }

    pub fn set_revision(&self, revision: &str) {
        *self.revision.lock().unwrap() = revision.to_string();
    }

    pub fn add_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .push((PathBuf::from(path), content.to_string(), false));
    }

    /// Ship a hook script in every materialized tree.
    pub fn add_hook(&self, hook: Hook, body: &str) {
        self.files.lock().unwrap().push((
            Path::new(HOOKS_DIR).join(hook.filename()),
            format!("#!/bin/sh\n{body}\n"),
            true,
        ));
    }

    /// Stop shipping any hook scripts.
    pub fn clear_hooks(&self) {
        self.files
            .lock()
            .unwrap()
            .retain(|(path, _, _)| !path.starts_with(HOOKS_DIR));
    }

    pub fn fail_initialize(&self) {
        self.fail_initialize.store(true, Ordering::SeqCst);
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn materialized(&self) -> Vec<PathBuf> {
        self.materialized.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceProvider for FakeProvider {
    async fn initialize(&self) -> Result<(), ProviderError> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(ProviderError::Command {
                command: "fake fetch".to_string(),
                stderr: "remote unreachable".to_string(),
            });
        }
        Ok(())
    }

    async fn revision(&self) -> Result<Revision, ProviderError> {
        Ok(Revision::new(&self.revision.lock().unwrap())?)
    }

    async fn materialize(&self, target: &Path) -> Result<(), ProviderError> {
        let files = self.files.lock().unwrap().clone();
        for (path, content, executable) in files {
            let dest = target.join(&path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&dest, content).unwrap();
            if executable {
                fs::set_permissions(&dest, fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        self.materialized.lock().unwrap().push(target.to_path_buf());
        Ok(())
    }
}

/// A scaffolded app directory in a temp dir.
#[allow(dead_code)]
pub struct TestApp {
    pub dir: TempDir,
    pub layout: AppLayout,
    pub config: Config,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = AppLayout::new(dir.path().canonicalize().unwrap());
        for path in layout.skeleton() {
            fs::create_dir_all(path).unwrap();
        }
        Self {
            dir,
            layout,
            config: Config::template("fake://repo", "main"),
        }
    }

    pub fn context(&self, provider: &Arc<FakeProvider>, force: bool) -> RunContext {
        RunContext::new(
            self.config.clone(),
            provider.clone(),
            self.layout.clone(),
            force,
        )
    }

    pub fn current(&self) -> Option<PathBuf> {
        release::current_target(&self.layout).unwrap()
    }

    pub fn previous(&self) -> Option<PathBuf> {
        release::previous_target(&self.layout).unwrap()
    }

    pub fn current_revision(&self) -> Option<String> {
        release::current_revision(&self.layout)
            .ok()
            .map(|r| r.to_string())
    }

    pub fn releases(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(self.layout.releases_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }

    pub fn lock_exists(&self) -> bool {
        fs::symlink_metadata(self.layout.lock_path()).is_ok()
    }

    /// A file hooks can append to, to prove they ran.
    pub fn hook_log(&self) -> PathBuf {
        self.layout.root().join("hooks.log")
    }

    pub fn hook_log_lines(&self) -> Vec<String> {
        fs::read_to_string(self.hook_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Create an empty release directory with a revision marker.
#[allow(dead_code)]
pub fn fake_release(layout: &AppLayout, name: &str, revision: &str) -> PathBuf {
    let path = layout.releases_dir().join(name);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("REVISION"), revision).unwrap();
    path
}

/// Set a directory's mtime to `secs` seconds after the epoch.
#[allow(dead_code)]
pub fn set_mtime(path: &Path, secs: u64) {
    let time = std::time::UNIX_EPOCH + std::time::Duration::from_secs(secs);
    fs::File::open(path).unwrap().set_modified(time).unwrap();
}
