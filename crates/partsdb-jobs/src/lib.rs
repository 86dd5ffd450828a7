//! Launches the external update scripts and tracks them in `job_runs`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use partsdb_core::{JobKind, JobsConfig};
use partsdb_db::DbError;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::process::{Child, Command};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to open job log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start {kind}: {source}")]
    Spawn {
        kind: JobKind,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Db(#[from] DbError),
}

/// What the caller gets back for a submitted job.
#[derive(Debug, Clone, Serialize)]
pub struct JobHandle {
    pub id: i64,
    pub public_id: Uuid,
    pub kind: JobKind,
    pub pid: Option<u32>,
}

#[derive(Clone)]
pub struct JobLauncher {
    pool: PgPool,
    config: JobsConfig,
}

impl JobLauncher {
    #[must_use]
    pub fn new(pool: PgPool, config: JobsConfig) -> Self {
        Self { pool, config }
    }

    fn script(&self, kind: JobKind) -> &Path {
        match kind {
            JobKind::PricePhotoUpdate => &self.config.price_photo_script,
            JobKind::TrastPriceUpdate => &self.config.trast_script,
        }
    }

    /// Record a job, start `<python> <script>` in its own process group with
    /// output appended to `<log_dir>/<kind>.log`, and watch it to completion
    /// in the background.
    ///
    /// The watcher lives on the current runtime, so callers that exit right
    /// after submitting should use [`JobLauncher::run`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`JobError`] if the job row cannot be written, the log file
    /// cannot be opened or the process cannot be spawned. Spawn and log
    /// failures also mark the row `failed`; if the process started but its
    /// start cannot be recorded, it is killed and the row is marked `failed`.
    pub async fn submit(&self, kind: JobKind) -> Result<JobHandle, JobError> {
        let (handle, child) = self.launch(kind).await?;
        tokio::spawn(watch(self.pool.clone(), handle.id, kind, child));
        Ok(handle)
    }

    /// Like [`JobLauncher::submit`] but waits for the process to exit and
    /// returns the finished job row.
    ///
    /// # Errors
    ///
    /// Same as [`JobLauncher::submit`], plus [`JobError::Db`] if the final
    /// row cannot be read back.
    pub async fn run(&self, kind: JobKind) -> Result<partsdb_db::JobRunRow, JobError> {
        let (handle, child) = self.launch(kind).await?;
        watch(self.pool.clone(), handle.id, kind, child).await;
        Ok(partsdb_db::get_job_run(&self.pool, handle.public_id).await?)
    }

    async fn launch(&self, kind: JobKind) -> Result<(JobHandle, Child), JobError> {
        let log_path = self.config.log_dir.join(format!("{kind}.log"));
        let run = partsdb_db::create_job_run(&self.pool, kind.as_str(), &log_path.to_string_lossy())
            .await?;

        let child = match self.spawn(kind, &log_path).await {
            Ok(child) => child,
            Err(error) => {
                tracing::error!(job_id = run.id, %kind, error = %error, "job failed to start");
                partsdb_db::fail_job_run(&self.pool, run.id, &error.to_string()).await?;
                return Err(error);
            }
        };

        let pid = child.id();
        if let Err(error) =
            partsdb_db::start_job_run(&self.pool, run.id, pid.and_then(|p| i32::try_from(p).ok()))
                .await
        {
            abandon(&self.pool, run.id, kind, child, &error).await;
            return Err(error.into());
        }
        tracing::info!(job_id = run.id, %kind, pid, "job started");

        Ok((
            JobHandle {
                id: run.id,
                public_id: run.public_id,
                kind,
                pid,
            },
            child,
        ))
    }

    async fn spawn(&self, kind: JobKind, log_path: &Path) -> Result<Child, JobError> {
        let log_error = |source| JobError::Log {
            path: log_path.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(&self.config.log_dir)
            .await
            .map_err(log_error)?;
        let stdout = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .await
            .map_err(log_error)?
            .into_std()
            .await;
        let stderr = stdout.try_clone().map_err(log_error)?;

        let mut command = Command::new(&self.config.python);
        command
            .arg(self.script(kind))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        // Own process group: a server shutdown signal must not reach the job.
        #[cfg(unix)]
        command.process_group(0);

        command
            .spawn()
            .map_err(|source| JobError::Spawn { kind, source })
    }
}

/// Kill and reap a process whose start could not be recorded, then close its
/// row so nothing polls a `queued` job forever.
async fn abandon(pool: &PgPool, id: i64, kind: JobKind, mut child: Child, cause: &DbError) {
    tracing::error!(job_id = id, %kind, error = %cause, "failed to record job start, killing it");
    if let Err(error) = child.kill().await {
        tracing::warn!(job_id = id, error = %error, "failed to kill job process");
    }
    let message = format!("failed to record start: {cause}");
    if let Err(error) = partsdb_db::fail_job_run(pool, id, &message).await {
        tracing::error!(job_id = id, error = %error, "failed to record job failure");
    }
}

async fn watch(pool: PgPool, id: i64, kind: JobKind, mut child: Child) {
    let result = match child.wait().await {
        Ok(status) => {
            tracing::info!(job_id = id, %kind, exit_code = ?status.code(), "job exited");
            partsdb_db::finish_job_run(&pool, id, status.code()).await
        }
        Err(error) => {
            tracing::error!(job_id = id, %kind, error = %error, "lost track of job process");
            partsdb_db::fail_job_run(&pool, id, &error.to_string()).await
        }
    };

    if let Err(error) = result {
        tracing::error!(job_id = id, error = %error, "failed to record job completion");
    }
}
