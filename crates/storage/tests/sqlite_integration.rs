use std::sync::Arc;

use storage::progress::{COMPLETED_UNITS_KEY, LAST_UPDATED_KEY, PROGRESS_RECORDS_KEY};
use storage::repository::{KeyValueStore, WriteBatch};
use storage::sqlite::SqliteRepository;
use storage::{LocalProgressStore, Storage};
use translate_core::model::{Catalog, WorkUnitId};
use translate_core::time::{fixed_clock, fixed_now};

fn unit(name: &str) -> WorkUnitId {
    WorkUnitId::new(name).unwrap()
}

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = repo("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");

    repo.apply(WriteBatch::new().put("k", "v")).await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn batch_upserts_and_deletes() {
    let repo = repo("memdb_kv_batch").await;

    repo.apply(WriteBatch::new().put("a", "1").put("b", "2"))
        .await
        .unwrap();
    repo.apply(WriteBatch::new().put("a", "3").delete("b"))
        .await
        .unwrap();

    let values = repo.get_many(&["a", "b", "missing"]).await.unwrap();
    assert_eq!(values, vec![Some("3".to_string()), None, None]);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let repo = repo("memdb_kv_empty").await;
    repo.apply(WriteBatch::new()).await.unwrap();
    assert_eq!(repo.get("anything").await.unwrap(), None);
}

#[tokio::test]
async fn progress_survives_reconnect() {
    let url = "sqlite:file:memdb_progress_reconnect?mode=memory&cache=shared";
    let first = Storage::sqlite(url).await.expect("storage");
    let store = LocalProgressStore::new(Arc::clone(&first.kv), fixed_clock());
    store.init().await.unwrap();
    store
        .record_progress(&unit("inputs/a.csv"), 45, 45)
        .await
        .unwrap();
    store
        .record_progress(&unit("inputs/b.csv"), 45, 9)
        .await
        .unwrap();

    // Second handle on the same shared-cache database while the first is
    // still alive.
    let second = Storage::sqlite(url).await.expect("storage");
    let reopened = LocalProgressStore::new(second.kv, fixed_clock());
    reopened.init().await.unwrap();

    let summary = reopened.summary().await.unwrap();
    assert_eq!(summary.records.len(), 2);
    assert!(summary.completed_units.contains(&unit("inputs/a.csv")));
    assert!(!summary.completed_units.contains(&unit("inputs/b.csv")));
    assert_eq!(summary.overall_percent, 60);
    assert_eq!(summary.last_updated, Some(fixed_now()));

    let catalog = Catalog::new(vec![unit("inputs/a.csv"), unit("inputs/b.csv")]).unwrap();
    assert!(!reopened.all_units_complete(&catalog).await.unwrap());
    drop(first);
}

#[tokio::test]
async fn progress_keys_use_the_documented_layout() {
    let repo = Arc::new(repo("memdb_progress_layout").await);
    let store = LocalProgressStore::new(repo.clone(), fixed_clock());

    store.record_progress(&unit("u1"), 4, 4).await.unwrap();

    let values = repo
        .get_many(&[COMPLETED_UNITS_KEY, PROGRESS_RECORDS_KEY, LAST_UPDATED_KEY])
        .await
        .unwrap();
    assert_eq!(values[0].as_deref(), Some(r#"["u1"]"#));
    assert_eq!(
        values[1].as_deref(),
        Some(r#"{"u1":{"total":4,"completed":4,"lastUpdated":"2023-11-14T22:13:20Z"}}"#)
    );
    assert_eq!(values[2].as_deref(), Some("2023-11-14T22:13:20.000Z"));
}

#[tokio::test]
async fn clear_removes_progress_from_sqlite() {
    let repo = Arc::new(repo("memdb_progress_clear").await);
    let store = LocalProgressStore::new(repo.clone(), fixed_clock());
    store.record_progress(&unit("u1"), 1, 1).await.unwrap();

    store.clear().await.unwrap();

    assert_eq!(repo.get(LAST_UPDATED_KEY).await.unwrap(), None);
    assert!(store.completed_units().await.unwrap().is_empty());
    assert_eq!(store.overall_completion_percent().await.unwrap(), 0);
}
