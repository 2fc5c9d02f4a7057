mod common;

use std::time::{Duration, Instant};

use plbert_prep::shards::{collect, shard_dir, Orchestrator, ShardTask, TaskOutcome};
use tokio::process::Command;

#[test_log::test(tokio::test)]
async fn timed_out_shard_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = common::write_corpus(dir.path(), 6);
    let config = common::config(dir.path(), &corpus, 3, 1);
    let staging = dir.path().join("staging");
    common::stage(&config, &staging);

    let launcher = {
        let staging = staging.clone();
        move |task: &ShardTask| {
            if task.index == 1 {
                let mut cmd = Command::new("sleep");
                cmd.arg("30");
                cmd
            } else {
                common::publish(task, &staging)
            }
        }
    };

    let start = Instant::now();
    let report = Orchestrator::new(&config, launcher).run().await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(20));

    assert_eq!(report.outcome(0), Some(&TaskOutcome::Completed));
    assert_eq!(report.outcome(1), Some(&TaskOutcome::TimedOut));
    assert_eq!(report.outcome(2), Some(&TaskOutcome::Completed));
    assert_eq!(report.unfinished(), vec![1]);

    let root = &config.preprocess.shard_root;
    assert!(shard_dir(root, 0).exists());
    assert!(!shard_dir(root, 1).exists());
    assert!(shard_dir(root, 2).exists());

    let dataset = collect(root).unwrap();
    let ids: Vec<&str> = dataset.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "3", "2", "5"]);
}

#[tokio::test]
async fn failed_shard_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = common::write_corpus(dir.path(), 4);
    let config = common::config(dir.path(), &corpus, 2, 30);
    let staging = dir.path().join("staging");
    common::stage(&config, &staging);

    let launcher = {
        let staging = staging.clone();
        move |task: &ShardTask| {
            if task.index == 0 {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg("exit 1");
                cmd
            } else {
                common::publish(task, &staging)
            }
        }
    };
    let report = Orchestrator::new(&config, launcher).run().await.unwrap();
    assert!(matches!(report.outcome(0), Some(TaskOutcome::Failed(_))));
    assert_eq!(report.outcome(1), Some(&TaskOutcome::Completed));

    let root = &config.preprocess.shard_root;
    assert!(!shard_dir(root, 0).exists());
    assert_eq!(collect(root).unwrap().len(), 2);
}

#[tokio::test]
async fn existing_shards_are_not_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = common::write_corpus(dir.path(), 4);
    let config = common::config(dir.path(), &corpus, 2, 30);
    // shards are directly processed into the shard root
    common::stage(&config, &config.preprocess.shard_root);

    let launcher = |_: &ShardTask| -> Command { panic!("no shard should be dispatched") };
    let report = Orchestrator::new(&config, launcher).run().await.unwrap();
    assert_eq!(
        report.outcomes(),
        &[(0, TaskOutcome::AlreadyDone), (1, TaskOutcome::AlreadyDone)]
    );
}

#[test]
fn all_shards_failed() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = common::write_corpus(dir.path(), 4);
    let config = common::config(dir.path(), &corpus, 2, 30);

    let launcher = |_: &ShardTask| {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 2");
        cmd
    };
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let report = runtime
        .block_on(Orchestrator::new(&config, launcher).run())
        .unwrap();
    assert_eq!(report.unfinished(), vec![0, 1]);
    assert!(matches!(
        collect(&config.preprocess.shard_root),
        Err(plbert_prep::error::Error::NoShards(_))
    ));
}
