//! Background artifact watcher.
//!
//! Periodically materializes each team's current service credentials as
//! `team_<team_num>_credentials.csv` under the artifact directory, so the
//! team-facing portal can serve them. Files are only rewritten when their
//! content changes, and every write goes through a temp file and a rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Credential, Team};
use crate::domain::ports::{CredentialSource, ResultStore};

const CSV_HEADER: &str = "check_id,username,password";

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherPass {
    pub written: usize,
    pub unchanged: usize,
}

/// Status of the watcher.
#[derive(Debug, Clone, Default)]
pub struct WatcherStatus {
    pub running: bool,
    pub total_passes: u64,
    pub failed_passes: u64,
    pub files_written: u64,
    pub last_pass: Option<Instant>,
}

/// Handle to control a running watcher.
#[derive(Clone)]
pub struct WatcherHandle {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    status: Arc<RwLock<WatcherStatus>>,
}

impl WatcherHandle {
    /// Request the watcher to stop after its current pass.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub async fn status(&self) -> WatcherStatus {
        self.status.read().await.clone()
    }
}

pub struct ArtifactWatcher {
    store: Arc<dyn ResultStore>,
    credentials: Arc<dyn CredentialSource>,
    artifact_dir: PathBuf,
    interval: Duration,
    status: Arc<RwLock<WatcherStatus>>,
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ArtifactWatcher {
    pub fn new(
        store: Arc<dyn ResultStore>,
        credentials: Arc<dyn CredentialSource>,
        artifact_dir: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            credentials,
            artifact_dir: artifact_dir.into(),
            interval: interval.max(Duration::from_millis(1)),
            status: Arc::new(RwLock::new(WatcherStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> WatcherHandle {
        WatcherHandle {
            stop_flag: self.stop_flag.clone(),
            wake: self.wake.clone(),
            status: self.status.clone(),
        }
    }

    /// Start the watcher on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run_loop().await })
    }

    async fn run_loop(self) {
        self.status.write().await.running = true;
        tracing::info!(dir = %self.artifact_dir.display(), interval = ?self.interval, "artifact watcher started");

        let mut timer = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = timer.tick() => {}
                () = self.wake.notified() => {}
            }
            if self.stop_flag.load(Ordering::Acquire) {
                break;
            }

            let result = self.run_once().await;
            let mut status = self.status.write().await;
            status.total_passes += 1;
            status.last_pass = Some(Instant::now());
            match result {
                Ok(pass) => {
                    status.files_written += pass.written as u64;
                    if pass.written > 0 {
                        tracing::debug!(written = pass.written, unchanged = pass.unchanged, "artifacts refreshed");
                    }
                }
                Err(e) => {
                    status.failed_passes += 1;
                    tracing::error!(error = %e, "artifact refresh failed");
                }
            }
        }

        self.status.write().await.running = false;
        tracing::info!("artifact watcher stopped");
    }

    /// Refresh every team's artifact once.
    pub async fn run_once(&self) -> DomainResult<WatcherPass> {
        let teams = self.store.list_teams().await?;
        let credentials = self.credentials.list_credentials().await?;
        tokio::fs::create_dir_all(&self.artifact_dir).await?;

        let mut by_team: BTreeMap<i64, Vec<Credential>> = BTreeMap::new();
        for credential in credentials {
            by_team.entry(credential.team_id).or_default().push(credential);
        }

        let mut pass = WatcherPass::default();
        for team in &teams {
            let rows = by_team.remove(&team.id).unwrap_or_default();
            let path = artifact_path(&self.artifact_dir, team);
            if write_if_changed(&path, &render_credentials(rows)).await? {
                pass.written += 1;
            } else {
                pass.unchanged += 1;
            }
        }
        Ok(pass)
    }
}

/// Where a team's credential artifact lives.
pub fn artifact_path(dir: &Path, team: &Team) -> PathBuf {
    dir.join(format!("team_{}_credentials.csv", team.team_num))
}

/// Render one team's credentials, sorted by check then username.
pub fn render_credentials(mut rows: Vec<Credential>) -> String {
    rows.sort_by(|a, b| (a.check_id, &a.username).cmp(&(b.check_id, &b.username)));

    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in &rows {
        out.push_str(&format!(
            "{},{},{}\n",
            row.check_id,
            csv_field(&row.username),
            csv_field(&row.password)
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

async fn write_if_changed(path: &Path, content: &str) -> DomainResult<bool> {
    match tokio::fs::read_to_string(path).await {
        Ok(existing) if existing == content => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let tmp = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(true)
}
