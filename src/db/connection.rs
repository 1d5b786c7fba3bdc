use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

/// The tracker and a CLI batch run may hold the same file open.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = self.worker.lock().unwrap_or_else(|p| p.into_inner());
        let Some(handle) = guard.take() else {
            return;
        };
        if self.sender.send(DbCommand::Shutdown).is_err() {
            error!("Database worker already gone at shutdown");
        }
        if let Err(join_err) = handle.join() {
            error!("Database worker panicked: {join_err:?}");
        }
    }
}

/// Open, tune and migrate the session database.
fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    conn.busy_timeout(BUSY_TIMEOUT)?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode on {}: {err}", path.display());
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

/// Worker body: run queued tasks in order until shutdown or until every sender is gone.
fn serve(mut conn: Connection, commands: mpsc::Receiver<DbCommand>, path: &Path) {
    let mut executed = 0u64;
    while let Ok(command) = commands.recv() {
        match command {
            DbCommand::Execute(task) => {
                task(&mut conn);
                executed += 1;
            }
            DbCommand::Shutdown => break,
        }
    }
    info!(
        "Closing session database {} after {executed} tasks",
        path.display()
    );
}

/// SQLite session store. Every statement runs on one dedicated thread that
/// owns the connection; callers await the result over a oneshot channel.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("timetrail-db".into())
            .spawn(move || match open_connection(&path_for_thread) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        serve(conn, command_rx, &path_for_thread);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Session database ready at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Run `task` against the connection on the worker thread.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: DbTask = Box::new(move |conn| {
            // A dropped receiver means the caller stopped waiting.
            let _ = reply_tx.send(task(conn));
        });

        self.inner
            .sender
            .send(DbCommand::Execute(job))
            .map_err(|_| anyhow!("session database {} is closed", self.db_path.display()))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database worker dropped the task"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_nested_path_and_runs_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("nested/timetrail.sqlite3")).unwrap();
        assert!(db.path().exists());

        let mode: String = db
            .execute(|conn| Ok(conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn connection_waits_on_a_locked_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("timetrail.sqlite3")).unwrap();
        let timeout_ms: i64 = db
            .execute(|conn| Ok(conn.pragma_query_value(None, "busy_timeout", |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(timeout_ms, BUSY_TIMEOUT.as_millis() as i64);
    }

    #[test]
    fn unopenable_path_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        assert!(Database::new(blocker.join("timetrail.sqlite3")).is_err());
    }

    #[tokio::test]
    async fn task_errors_reach_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("timetrail.sqlite3")).unwrap();
        let result: Result<()> = db.execute(|_| Err(anyhow!("boom"))).await;
        assert_eq!(result.unwrap_err().to_string(), "boom");
    }
}
