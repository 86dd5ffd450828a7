//! Job and status command handlers for the CLI.

use partsdb_core::{status::WELL_KNOWN_KEYS, AppConfig, JobKind};
use partsdb_db::{JobRunRow, StatusStore};
use partsdb_jobs::JobLauncher;

const RECENT_JOBS: i64 = 10;

/// Run `kind` to completion and report how it ended.
///
/// The CLI process would otherwise exit before the job finishes, leaving its
/// row stuck in `running`, so the job runs in the foreground here.
///
/// # Errors
///
/// Returns an error if the job cannot be started or recorded, or exits
/// unsuccessfully.
pub(crate) async fn run_submit_job(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    kind: JobKind,
) -> anyhow::Result<()> {
    let launcher = JobLauncher::new(pool.clone(), config.jobs.clone());
    println!("running {kind}, log: {}", config.jobs.log_dir.join(format!("{kind}.log")).display());

    let row = launcher.run(kind).await?;
    println!("{}", describe_job(&row));

    if row.status != "succeeded" {
        anyhow::bail!("{kind} did not succeed");
    }
    Ok(())
}

/// Print every well-known status entry followed by the most recent jobs.
///
/// # Errors
///
/// Returns an error if either query fails.
pub(crate) async fn run_status(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let entries = StatusStore::new(pool.clone()).list(&WELL_KNOWN_KEYS).await?;
    for name in WELL_KNOWN_KEYS {
        match entries.iter().find(|e| e.name == name) {
            Some(entry) => println!(
                "{name:<20} {:<24} ({})",
                entry.value,
                entry.updated_at.format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("{name:<20} -"),
        }
    }

    let jobs = partsdb_db::list_job_runs(pool, RECENT_JOBS).await?;
    if !jobs.is_empty() {
        println!();
        for job in &jobs {
            println!("{}", describe_job(job));
        }
    }
    Ok(())
}

fn describe_job(row: &JobRunRow) -> String {
    let mut line = format!(
        "{} {} {} (created {})",
        row.public_id,
        row.kind,
        row.status,
        row.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(code) = row.exit_code {
        line.push_str(&format!(", exit {code}"));
    }
    if let Some(message) = &row.error_message {
        line.push_str(&format!(", error: {message}"));
    }
    line
}
