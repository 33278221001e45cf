//! State store contract tests against a scratch SQLite database.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use corvus::errors::CorvusError;
use corvus::models::{Deployment, DeploymentStatus, SourceSpec};
use corvus::store::Store;

fn open_store(dir: &TempDir) -> Store {
    Store::open(&dir.path().join("corvus.db")).unwrap()
}

fn sample(slug: &str) -> Deployment {
    Deployment {
        id: format!("id-{slug}"),
        slug: slug.to_string(),
        name: format!("site {slug}"),
        source: SourceSpec::Zip,
        build_command: String::new(),
        output_directory: ".".to_string(),
        env_vars: None,
        status: DeploymentStatus::Deploying,
        url: format!("http://{slug}.localhost"),
        webhook_secret: "ab".repeat(32),
        auto_deploy: false,
        expires_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn insert_and_get_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut deployment = sample("amber-cove-0001");
    deployment.source = SourceSpec::GitHub {
        url: "https://github.com/example/site.git".to_string(),
        branch: "main".to_string(),
    };
    deployment.build_command = "npm ci && npm run build".to_string();
    deployment.env_vars = Some(r#"{"NODE_ENV":"production"}"#.to_string());
    store.insert(&mut deployment).await.unwrap();

    let fetched = store.get(&deployment.id).await.unwrap();
    assert_eq!(fetched.slug, deployment.slug);
    assert_eq!(fetched.source, deployment.source);
    assert_eq!(fetched.build_command, deployment.build_command);
    assert_eq!(fetched.env_vars, deployment.env_vars);
    assert_eq!(fetched.status, DeploymentStatus::Deploying);
    assert_eq!(fetched.url, deployment.url);
    assert_eq!(fetched.webhook_secret, deployment.webhook_secret);
    assert_eq!(fetched.created_at, deployment.created_at);
}

#[tokio::test]
async fn get_missing_row_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let err = store.get("no-such-id").await.unwrap_err();
    assert!(matches!(err, CorvusError::NotFound(_)));
}

#[tokio::test]
async fn list_returns_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.insert(&mut sample("older-site-0001")).await.unwrap();
    // created_at is stamped at insert with millisecond precision; keep the
    // two rows in distinct instants.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store.insert(&mut sample("newer-site-0002")).await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].slug, "newer-site-0002");
    assert_eq!(listed[1].slug, "older-site-0001");
}

#[tokio::test]
async fn empty_table_lists_empty() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.insert(&mut sample("taken-slug-0001")).await.unwrap();

    let mut duplicate = sample("taken-slug-0001");
    duplicate.id = "different-id".to_string();
    let err = store.insert(&mut duplicate).await.unwrap_err();
    assert!(matches!(err, CorvusError::Conflict(_)));
}

#[tokio::test]
async fn update_status_transitions_and_refreshes_updated_at() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut deployment = sample("brisk-reef-0001");
    store.insert(&mut deployment).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store
        .update_status(&deployment.id, DeploymentStatus::Live)
        .await
        .unwrap();

    let fetched = store.get(&deployment.id).await.unwrap();
    assert_eq!(fetched.status, DeploymentStatus::Live);
    assert!(fetched.updated_at > fetched.created_at);
}

#[tokio::test]
async fn updates_on_missing_rows_are_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let status_err = store
        .update_status("ghost", DeploymentStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(status_err, CorvusError::NotFound(_)));

    let url_err = store
        .update_url("ghost", "http://ghost.localhost")
        .await
        .unwrap_err();
    assert!(matches!(url_err, CorvusError::NotFound(_)));

    let delete_err = store.delete("ghost").await.unwrap_err();
    assert!(matches!(delete_err, CorvusError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_the_row() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut deployment = sample("gone-soon-0001");
    store.insert(&mut deployment).await.unwrap();
    store.delete(&deployment.id).await.unwrap();

    let err = store.get(&deployment.id).await.unwrap_err();
    assert!(matches!(err, CorvusError::NotFound(_)));
}

#[tokio::test]
async fn expired_selection_only_returns_live_past_expiry() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut live_expired = sample("live-expired-0001");
    live_expired.expires_at = Some(Utc::now() - Duration::seconds(60));
    store.insert(&mut live_expired).await.unwrap();
    store
        .update_status(&live_expired.id, DeploymentStatus::Live)
        .await
        .unwrap();

    let mut live_future = sample("live-future-0002");
    live_future.expires_at = Some(Utc::now() + Duration::hours(1));
    store.insert(&mut live_future).await.unwrap();
    store
        .update_status(&live_future.id, DeploymentStatus::Live)
        .await
        .unwrap();

    let mut failed_expired = sample("failed-expired-0003");
    failed_expired.expires_at = Some(Utc::now() - Duration::seconds(60));
    store.insert(&mut failed_expired).await.unwrap();
    store
        .update_status(&failed_expired.id, DeploymentStatus::Failed)
        .await
        .unwrap();

    let mut live_forever = sample("live-forever-0004");
    store.insert(&mut live_forever).await.unwrap();
    store
        .update_status(&live_forever.id, DeploymentStatus::Live)
        .await
        .unwrap();

    let expired = store.list_expired_live().await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].slug, "live-expired-0001");

    // Reaper idempotence precondition: the same query with no state change
    // keeps returning the same row until teardown deletes it.
    let again = store.list_expired_live().await.unwrap();
    assert_eq!(again.len(), 1);
}

#[tokio::test]
async fn update_url_replaces_the_url() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut deployment = sample("moved-site-0001");
    store.insert(&mut deployment).await.unwrap();

    store
        .update_url(&deployment.id, "http://custom.localhost")
        .await
        .unwrap();
    let fetched = store.get(&deployment.id).await.unwrap();
    assert_eq!(fetched.url, "http://custom.localhost");
}

#[tokio::test]
async fn list_live_returns_only_live_rows() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut live = sample("live-site-0001");
    store.insert(&mut live).await.unwrap();
    store
        .update_status(&live.id, DeploymentStatus::Live)
        .await
        .unwrap();

    store.insert(&mut sample("deploying-site-0002")).await.unwrap();

    let listed = store.list_live().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].slug, "live-site-0001");
}
