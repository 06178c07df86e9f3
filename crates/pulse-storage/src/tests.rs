use crate::entities::{counter, gauge};
use crate::*;
use pulse_common::{Metric, Repository, Signer};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("metrics.db").display())
}

fn seeded_repo() -> Arc<Repository> {
    let repo = Arc::new(Repository::new(Signer::new("abc")));
    repo.update_gauge("g", 1.5);
    repo.update_counter("c", 3);
    repo
}

fn triples(repo: &Repository) -> Vec<(String, String, String)> {
    let mut out: Vec<_> = repo
        .to_metrics()
        .into_iter()
        .map(|m| (m.id.clone(), m.kind.to_string(), m.format_value()))
        .collect();
    out.sort();
    out
}

#[tokio::test]
async fn file_save_then_load_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let source = seeded_repo();
    FileStorage::new(source.clone(), &path, true).save().await.unwrap();

    let restored = Arc::new(Repository::default());
    FileStorage::new(restored.clone(), &path, true).load().await.unwrap();
    assert_eq!(restored.gauge("g"), Some(1.5));
    assert_eq!(restored.counter("c"), Some(3));
    assert_eq!(triples(&source), triples(&restored));
}

#[tokio::test]
async fn file_snapshot_is_a_json_array_of_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("snapshot.json");
    FileStorage::new(seeded_repo(), &path, true).save().await.unwrap();

    let metrics: Vec<Metric> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(metrics.len(), 2);
    assert!(metrics.contains(&Signer::new("abc").signed(Metric::gauge("g", 1.5))));
}

#[tokio::test]
async fn file_load_replaces_existing_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    FileStorage::new(seeded_repo(), &path, true).save().await.unwrap();

    let repo = Arc::new(Repository::default());
    repo.update_counter("c", 100);
    repo.update_gauge("stale", 9.0);
    FileStorage::new(repo.clone(), &path, true).load().await.unwrap();
    assert_eq!(repo.counter("c"), Some(3));
    assert_eq!(repo.gauge("stale"), None);
}

#[tokio::test]
async fn file_load_respects_restore_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    FileStorage::new(seeded_repo(), &path, true).save().await.unwrap();

    let repo = Arc::new(Repository::default());
    FileStorage::new(repo.clone(), &path, false).load().await.unwrap();
    assert!(repo.is_empty());
}

#[tokio::test]
async fn file_load_without_snapshot_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(Repository::default());
    FileStorage::new(repo.clone(), dir.path().join("absent.json"), true)
        .load()
        .await
        .unwrap();
    assert!(repo.is_empty());
}

#[tokio::test]
async fn file_load_rejects_corrupt_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, b"{not json").unwrap();
    let err = FileStorage::new(Arc::new(Repository::default()), &path, true)
        .load()
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Json(_)));
}

#[tokio::test]
async fn noop_ping_reports_unsupported() {
    let storage = NoopStorage::new();
    storage.save().await.unwrap();
    storage.load().await.unwrap();
    assert!(matches!(
        storage.ping().await,
        Err(StorageError::Unsupported { backend: "noop", .. })
    ));
}

#[tokio::test]
async fn relational_save_then_load_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_url(&dir);

    let source = seeded_repo();
    let storage = RelationalStorage::connect(&url, source.clone()).await.unwrap();
    storage.save().await.unwrap();
    storage.ping().await.unwrap();

    let restored = Arc::new(Repository::default());
    RelationalStorage::connect(&url, restored.clone())
        .await
        .unwrap()
        .load()
        .await
        .unwrap();
    assert_eq!(restored.gauge("g"), Some(1.5));
    assert_eq!(restored.counter("c"), Some(3));
    assert_eq!(triples(&source), triples(&restored));
}

#[tokio::test]
async fn relational_repeated_save_does_not_duplicate_rows() {
    let dir = tempfile::tempdir().unwrap();
    let repo = seeded_repo();
    let storage = RelationalStorage::connect(&sqlite_url(&dir), repo.clone())
        .await
        .unwrap();

    storage.save().await.unwrap();
    storage.save().await.unwrap();
    repo.update_counter("c", 2);
    storage.save().await.unwrap();

    let db = storage.connection();
    assert_eq!(counter::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(gauge::Entity::find().count(db).await.unwrap(), 1);
    let row = counter::Entity::find_by_id("c").one(db).await.unwrap().unwrap();
    assert_eq!(row.value, 5);
}

#[tokio::test]
async fn relational_failed_save_rolls_back_whole_flush() {
    let dir = tempfile::tempdir().unwrap();
    let repo = seeded_repo();
    let storage = RelationalStorage::connect(&sqlite_url(&dir), repo.clone())
        .await
        .unwrap();

    // gauges are written before counters, so the gauge upsert succeeds first
    storage
        .connection()
        .execute_unprepared("DROP TABLE counters;")
        .await
        .unwrap();
    assert!(storage.save().await.is_err());
    assert_eq!(gauge::Entity::find().count(storage.connection()).await.unwrap(), 0);
}

#[tokio::test]
async fn relational_concurrent_saves_leave_the_latest_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(Repository::default());
    let storage = Arc::new(
        RelationalStorage::connect(&sqlite_url(&dir), repo.clone())
            .await
            .unwrap(),
    );

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let repo = repo.clone();
        let storage = storage.clone();
        tasks.spawn(async move {
            repo.update_counter("c", 1);
            storage.save().await
        });
    }
    while let Some(saved) = tasks.join_next().await {
        saved.unwrap().unwrap();
    }

    let row = counter::Entity::find_by_id("c")
        .one(storage.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Some(row.value), repo.counter("c"));
    assert_eq!(row.value, 16);
}

#[tokio::test]
async fn factory_prefers_database_then_file_then_noop() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(Repository::default());

    let both = StorageConfig {
        database_dsn: Some(sqlite_url(&dir)),
        store_file: Some(dir.path().join("snapshot.json")),
        ..StorageConfig::default()
    };
    assert_eq!(create_storage(&both, repo.clone()).await.backend(), "relational");

    let file_only = StorageConfig {
        store_file: Some(dir.path().join("snapshot.json")),
        ..StorageConfig::default()
    };
    assert_eq!(create_storage(&file_only, repo.clone()).await.backend(), "file");

    let nothing = StorageConfig::default();
    assert_eq!(create_storage(&nothing, repo).await.backend(), "noop");
}

#[tokio::test]
async fn factory_falls_back_to_noop_when_database_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        database_dsn: Some(format!(
            "sqlite://{}?mode=ro",
            dir.path().join("missing").join("nope.db").display()
        )),
        store_file: Some(dir.path().join("snapshot.json")),
        ..StorageConfig::default()
    };
    let storage = create_storage(&config, Arc::new(Repository::default())).await;
    assert_eq!(storage.backend(), "noop");
}

#[tokio::test]
async fn saver_with_zero_interval_returns_immediately() {
    let storage: Arc<dyn PersistentStorage> = Arc::new(NoopStorage::new());
    tokio::time::timeout(
        Duration::from_secs(1),
        run_saver(storage, Duration::ZERO, CancellationToken::new()),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn saver_writes_snapshots_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let repo = seeded_repo();
    let storage: Arc<dyn PersistentStorage> = Arc::new(FileStorage::new(repo, &path, true));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run_saver(storage, Duration::from_millis(20), cancel.clone()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(path.exists());
}

struct FailingStorage {
    saves: std::sync::atomic::AtomicUsize,
}

#[async_trait::async_trait]
impl PersistentStorage for FailingStorage {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn load(&self) -> error::Result<()> {
        Ok(())
    }

    async fn save(&self) -> error::Result<()> {
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(StorageError::Unsupported {
            backend: "failing",
            operation: "save",
        })
    }

    async fn ping(&self) -> error::Result<()> {
        Ok(())
    }

    async fn close(&self) -> error::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn saver_keeps_running_after_a_failed_save() {
    let storage = Arc::new(FailingStorage {
        saves: std::sync::atomic::AtomicUsize::new(0),
    });

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run_saver(
        storage.clone(),
        Duration::from_millis(20),
        cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(storage.saves.load(std::sync::atomic::Ordering::SeqCst) >= 2);
}
