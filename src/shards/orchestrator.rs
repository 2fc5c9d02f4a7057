/*! Shard orchestration.

Shards are processed by worker *processes*: phonemization and tokenization are CPU-bound,
and each worker owns its own phonemizer and tokenizer.

[Orchestrator::run] submits one [ShardTask] per missing shard to a [WorkerPool], that keeps at most
`max_workers` processes alive and gives each task `timeout_secs` to complete.
A failed or timed out shard does not affect the others, and leaves no output directory behind:
the next run will retry it, while already completed shards are skipped.

There is no retry, and completion order is unspecified.
!*/
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::Error;

use super::{shard_dir, ShardTask};

/// Builds the command that runs a task in a new process.
///
/// The serialized task is sent on the process' stdin.
pub trait Launcher {
    fn command(&self, task: &ShardTask) -> Result<Command, Error>;
}

impl<F> Launcher for F
where
    F: Fn(&ShardTask) -> Command,
{
    fn command(&self, task: &ShardTask) -> Result<Command, Error> {
        Ok(self(task))
    }
}

/// Re-executes the running binary with the `shard --task-stdin` subcommand.
#[derive(Debug, Clone)]
pub struct ExeLauncher {
    exe: PathBuf,
}

impl ExeLauncher {
    pub fn new(exe: PathBuf) -> Self {
        Self { exe }
    }

    pub fn current() -> Result<Self, Error> {
        Ok(Self::new(std::env::current_exe()?))
    }
}

impl Launcher for ExeLauncher {
    fn command(&self, _task: &ShardTask) -> Result<Command, Error> {
        let mut cmd = Command::new(&self.exe);
        cmd.arg("shard").arg("--task-stdin");
        Ok(cmd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Output directory was present, no task was submitted.
    AlreadyDone,
    Completed,
    Failed(String),
    TimedOut,
}

/// Fixed-size pool of worker processes.
pub struct WorkerPool<L> {
    launcher: L,
    permits: Semaphore,
    timeout: Duration,
}

impl<L: Launcher> WorkerPool<L> {
    /// `workers` is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(launcher: L, workers: usize, timeout: Duration) -> Self {
        Self {
            launcher,
            permits: Semaphore::new(workers.clamp(1, Semaphore::MAX_PERMITS)),
            timeout,
        }
    }

    /// Spawn the worker, send it the task and wait for its exit.
    async fn launch(&self, task: &ShardTask) -> Result<(), Error> {
        let payload = task.to_json()?;
        let mut child = self
            .launcher
            .command(task)?
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // a worker is allowed to exit without reading its task
            match stdin.write_all(&payload).await {
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("shard {}: worker closed stdin", task.index)
                }
                res => res?,
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Custom(format!("worker exited with {}", status)))
        }
    }

    /// Run `task` once a worker slot is free.
    ///
    /// The timeout starts when the task starts. A timed out worker is killed.
    pub async fn submit(&self, task: ShardTask) -> TaskOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => return TaskOutcome::Failed(e.to_string()),
        };

        info!("dispatching shard {}", task.index);
        match tokio::time::timeout(self.timeout, self.launch(&task)).await {
            Ok(Ok(())) => {
                info!("shard {} done", task.index);
                TaskOutcome::Completed
            }
            Ok(Err(e)) => {
                error!("shard {} failed: {}", task.index, e);
                TaskOutcome::Failed(e.to_string())
            }
            Err(_) => {
                warn!("shard {} timed out after {:?}", task.index, self.timeout);
                TaskOutcome::TimedOut
            }
        }
    }
}

/// Outcome of every shard, by shard index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    outcomes: Vec<(usize, TaskOutcome)>,
}

impl Report {
    pub fn outcomes(&self) -> &[(usize, TaskOutcome)] {
        &self.outcomes
    }

    pub fn outcome(&self, index: usize) -> Option<&TaskOutcome> {
        self.outcomes
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, outcome)| outcome)
    }

    /// Shards that still have no output.
    pub fn unfinished(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TaskOutcome::Failed(_) | TaskOutcome::TimedOut))
            .map(|(i, _)| *i)
            .collect()
    }

    fn log_summary(&self) {
        let count = |f: fn(&TaskOutcome) -> bool| self.outcomes.iter().filter(|(_, o)| f(o)).count();
        info!(
            "shards: {} already done, {} completed, {} failed, {} timed out",
            count(|o| *o == TaskOutcome::AlreadyDone),
            count(|o| *o == TaskOutcome::Completed),
            count(|o| matches!(o, TaskOutcome::Failed(_))),
            count(|o| *o == TaskOutcome::TimedOut),
        );
        let unfinished = self.unfinished();
        if !unfinished.is_empty() {
            warn!("unfinished shards (rerun to retry): {:?}", unfinished);
        }
    }
}

pub struct Orchestrator<L> {
    config: Config,
    pool: WorkerPool<L>,
}

impl Orchestrator<ExeLauncher> {
    /// Orchestrator spawning copies of the current executable.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(config, ExeLauncher::current()?))
    }
}

impl<L: Launcher> Orchestrator<L> {
    pub fn new(config: &Config, launcher: L) -> Self {
        let p = &config.preprocess;
        let pool = WorkerPool::new(
            launcher,
            p.max_workers,
            Duration::from_secs(p.timeout_secs),
        );
        Self::with_pool(config, pool)
    }

    pub fn with_pool(config: &Config, pool: WorkerPool<L>) -> Self {
        Self {
            config: config.clone(),
            pool,
        }
    }

    /// Process every missing shard, waiting for all of them to either finish or time out.
    pub async fn run(&self) -> Result<Report, Error> {
        let root = &self.config.preprocess.shard_root;
        let total = self.config.preprocess.num_shards;
        std::fs::create_dir_all(root)?;

        let mut outcomes = BTreeMap::new();
        let mut pending = Vec::new();
        for index in 0..total {
            if shard_dir(root, index).exists() {
                info!("Shard {} already exists!", index);
                outcomes.insert(index, TaskOutcome::AlreadyDone);
            } else {
                pending.push(ShardTask::new(index, &self.config));
            }
        }

        info!(
            "{}/{} shards to process using {} workers",
            pending.len(),
            total,
            self.config.preprocess.max_workers
        );

        let results = join_all(pending.into_iter().map(|task| async move {
            let index = task.index;
            (index, self.pool.submit(task).await)
        }))
        .await;
        outcomes.extend(results);

        let report = Report {
            outcomes: outcomes.into_iter().collect(),
        };
        report.log_summary();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn sh(script: String) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    fn task(index: usize) -> ShardTask {
        let config = Config::from_yaml(
            "data_folder: d\ndataset_params:\n  tokenizer: t.json\n  word_separator: 1\n  token_maps: m.json\n",
        )
        .unwrap();
        ShardTask::new(index, &config)
    }

    #[tokio::test]
    async fn outcomes() {
        let pool = WorkerPool::new(
            |t: &ShardTask| match t.index {
                0 => sh("exit 0".to_string()),
                1 => sh("exit 3".to_string()),
                _ => sh("sleep 30".to_string()),
            },
            2,
            Duration::from_millis(500),
        );
        assert_eq!(pool.submit(task(0)).await, TaskOutcome::Completed);
        assert!(matches!(pool.submit(task(1)).await, TaskOutcome::Failed(_)));

        let start = Instant::now();
        assert_eq!(pool.submit(task(2)).await, TaskOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn worker_reads_task() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("task.json");
        let script = format!("cat > {}", out.display());
        let pool = WorkerPool::new(
            move |_: &ShardTask| sh(script.clone()),
            1,
            Duration::from_secs(10),
        );
        assert_eq!(pool.submit(task(4)).await, TaskOutcome::Completed);
        let received = ShardTask::from_reader(std::fs::File::open(out).unwrap()).unwrap();
        assert_eq!(received, task(4));
    }

    #[tokio::test]
    async fn spawn_error() {
        let pool = WorkerPool::new(
            |_: &ShardTask| Command::new("/nonexistent/worker"),
            1,
            Duration::from_secs(1),
        );
        assert!(matches!(pool.submit(task(0)).await, TaskOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn out_of_range_workers() {
        for workers in [0, usize::MAX] {
            let pool = WorkerPool::new(
                |_: &ShardTask| sh("exit 0".to_string()),
                workers,
                Duration::from_secs(10),
            );
            assert_eq!(pool.submit(task(0)).await, TaskOutcome::Completed);
        }
    }

    #[tokio::test]
    async fn bounded_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        // each worker fails if another worker is running
        let pool = WorkerPool::new(
            move |t: &ShardTask| {
                sh(format!(
                    "cd {root} && if ls running_* >/dev/null 2>&1; then exit 1; fi; touch running_{i}; sleep 0.2; rm running_{i}",
                    root = root.display(),
                    i = t.index
                ))
            },
            1,
            Duration::from_secs(10),
        );
        let outcomes = join_all((0..4).map(|i| pool.submit(task(i)))).await;
        assert!(outcomes.iter().all(|o| *o == TaskOutcome::Completed));
    }
}
