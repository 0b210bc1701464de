//! Integration tests for record persistence against an SQLite file.
//!
//! Tests verify that:
//! - save followed by find returns the same values, with defaults filled in
//! - update writes NULL for values the record does not carry
//! - remove followed by find is absent
//! - row caps and (offset, count) windows select the right rows
//! - the pool never hands out more than maxsize connections

use awesome_orm::config::SqliteConfig;
use awesome_orm::entities::User;
use awesome_orm::{DbPool, Limit, Model, OrmError, QueryOptions, Value, crud};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const CREATE_USERS: &str = "CREATE TABLE users (
    id varchar(50) PRIMARY KEY,
    email varchar(50),
    passwd varchar(50),
    admin boolean,
    name varchar(50),
    image varchar(500),
    created_at real
)";

/// Open a pool over a fresh database file with the users table.
///
/// The returned directory must outlive the pool.
async fn setup_db(maxsize: u32) -> (DbPool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("awesome.db").display());
    let mut config = SqliteConfig::new(url).with_size(1, maxsize);
    config.acquire_timeout_secs = 5;
    let pool = DbPool::connect_sqlite(&config).await.unwrap();
    pool.execute(CREATE_USERS, &[]).await.unwrap();
    (pool, dir)
}

fn user(name: &str, email: &str) -> User {
    User::new()
        .with("name", name)
        .with("email", email)
        .with("passwd", "1234567890")
        .with("image", "about:blank")
}

#[tokio::test]
async fn test_save_then_find_round_trip() {
    let (pool, _dir) = setup_db(2).await;

    let mut u = user("Test", "test@example.com");
    let affected = crud::save(&pool, &mut u).await.unwrap();
    assert_eq!(affected, 1);

    // the generated key is written back
    let id = u.get("id").and_then(Value::as_str).unwrap().to_string();
    assert_eq!(id.len(), 50);

    let found = crud::find::<User>(&pool, id.as_str()).await.unwrap().unwrap();
    assert_eq!(found.get_value("name"), Value::from("Test"));
    assert_eq!(found.get_value("email"), Value::from("test@example.com"));
    assert_eq!(found.get_value("admin"), Value::Bool(false));
    assert!(found.get_value("created_at").as_f64().unwrap() > 1.0e9);
    assert_eq!(found, u);

    pool.close().await;
}

#[tokio::test]
async fn test_find_missing_is_none() {
    let (pool, _dir) = setup_db(2).await;
    let found = crud::find::<User>(&pool, "no-such-id").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_save_keeps_explicit_values() {
    let (pool, _dir) = setup_db(2).await;

    let mut u = user("Admin", "admin@example.com")
        .with("id", "fixed-id")
        .with("admin", true)
        .with("created_at", 42.5);
    crud::save(&pool, &mut u).await.unwrap();

    let found = crud::find::<User>(&pool, "fixed-id").await.unwrap().unwrap();
    assert_eq!(found.get_value("admin"), Value::Bool(true));
    assert_eq!(found.get_value("created_at"), Value::Float(42.5));
}

#[tokio::test]
async fn test_save_duplicate_key_fails() {
    let (pool, _dir) = setup_db(2).await;

    let mut first = user("A", "a@example.com").with("id", "same");
    crud::save(&pool, &mut first).await.unwrap();

    let mut second = user("B", "b@example.com").with("id", "same");
    let result = crud::save(&pool, &mut second).await;
    assert!(matches!(result, Err(OrmError::Database { .. })));
}

#[tokio::test]
async fn test_update_writes_null_for_missing_values() {
    let (pool, _dir) = setup_db(2).await;

    let mut u = user("Before", "before@example.com");
    crud::save(&pool, &mut u).await.unwrap();
    let id = u.primary_key_value();

    let partial = User::new().with("id", id.clone()).with("name", "After");
    let affected = crud::update(&pool, &partial).await.unwrap();
    assert_eq!(affected, 1);

    let found = crud::find::<User>(&pool, id).await.unwrap().unwrap();
    assert_eq!(found.get_value("name"), Value::from("After"));
    assert_eq!(found.get_value("email"), Value::Null);
    // no defaults on update
    assert_eq!(found.get_value("admin"), Value::Null);
    assert_eq!(found.get_value("created_at"), Value::Null);
}

#[tokio::test]
async fn test_update_unknown_key_is_not_an_error() {
    let (pool, _dir) = setup_db(2).await;

    let ghost = user("Ghost", "ghost@example.com").with("id", "missing");
    let affected = crud::update(&pool, &ghost).await.unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn test_remove_then_find_is_none() {
    let (pool, _dir) = setup_db(2).await;

    let mut u = user("Gone", "gone@example.com");
    crud::save(&pool, &mut u).await.unwrap();
    let id = u.primary_key_value();

    assert_eq!(crud::remove(&pool, &u).await.unwrap(), 1);
    assert!(crud::find::<User>(&pool, id).await.unwrap().is_none());

    // a second remove affects nothing and only warns
    assert_eq!(crud::remove(&pool, &u).await.unwrap(), 0);
}

async fn seed(pool: &DbPool) {
    for (i, name) in ["first", "second", "third"].iter().enumerate() {
        let mut u = user(name, &format!("{}@example.com", name))
            .with("created_at", (i + 1) as f64)
            .with("admin", i == 0);
        crud::save(pool, &mut u).await.unwrap();
    }
}

fn names(users: &[User]) -> Vec<String> {
    users
        .iter()
        .map(|u| u.get_value("name").to_string())
        .collect()
}

#[tokio::test]
async fn test_find_all_with_filter_order_and_limits() {
    let (pool, _dir) = setup_db(2).await;
    seed(&pool).await;

    let all = crud::find_all::<User>(&pool, &QueryOptions::new().order_by("created_at"))
        .await
        .unwrap();
    assert_eq!(names(&all), ["first", "second", "third"]);

    let capped = crud::find_all::<User>(
        &pool,
        &QueryOptions::new().order_by("created_at desc").limit(2),
    )
    .await
    .unwrap();
    assert_eq!(names(&capped), ["third", "second"]);

    let window = crud::find_all::<User>(
        &pool,
        &QueryOptions::new().order_by("created_at").limit((1, 1)),
    )
    .await
    .unwrap();
    assert_eq!(names(&window), ["second"]);

    let filtered = crud::find_all::<User>(
        &pool,
        &QueryOptions::new()
            .filter("`created_at` > ? and `name` <> '?'", vec![Value::Float(1.5)])
            .order_by("created_at"),
    )
    .await
    .unwrap();
    assert_eq!(names(&filtered), ["second", "third"]);
}

#[tokio::test]
async fn test_find_all_empty_table() {
    let (pool, _dir) = setup_db(2).await;
    let users = crud::find_all::<User>(&pool, &QueryOptions::new()).await.unwrap();
    assert!(users.is_empty());
}

#[test]
fn test_unsupported_limit_shape_rejected() {
    let err = "1,2,3".parse::<Limit>().unwrap_err();
    assert!(matches!(err, OrmError::InvalidLimit { .. }));

    let three: &[u64] = &[1, 2, 3];
    assert!(Limit::try_from(three).is_err());
}

#[tokio::test]
async fn test_find_number() {
    let (pool, _dir) = setup_db(2).await;
    seed(&pool).await;

    let total = crud::find_number::<User>(&pool, "count(id)", None, &[])
        .await
        .unwrap();
    assert_eq!(total, Some(Value::Int(3)));

    let admins = crud::find_number::<User>(&pool, "count(id)", Some("`admin`=?"), &[true.into()])
        .await
        .unwrap();
    assert_eq!(admins, Some(Value::Int(1)));

    let latest = crud::find_number::<User>(&pool, "max(created_at)", None, &[])
        .await
        .unwrap();
    assert_eq!(latest, Some(Value::Float(3.0)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_stay_within_maxsize() {
    let (pool, _dir) = setup_db(2).await;
    seed(&pool).await;

    let sqlite = match &pool {
        DbPool::Sqlite(p) => p.clone(),
        other => panic!("unexpected pool: {:?}", other),
    };
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let pool = pool.clone();
            let sqlite = sqlite.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let conn = sqlite.acquire().await.unwrap();
                let in_use = (pool.size() as usize).saturating_sub(pool.num_idle());
                peak.fetch_max(in_use, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                drop(conn);

                crud::find_all::<User>(&pool, &QueryOptions::new())
                    .await
                    .map(|users| users.len())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 3);
    }

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak checked-out connections: {}", peak);
    assert!(peak >= 2, "connections were never held together: {}", peak);
    assert_eq!(pool.max_size(), 2);
}

#[tokio::test]
async fn test_saturated_pool_waits_for_release() {
    let (pool, _dir) = setup_db(1).await;
    seed(&pool).await;

    let held = match &pool {
        DbPool::Sqlite(p) => p.acquire().await.unwrap(),
        other => panic!("unexpected pool: {:?}", other),
    };

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { crud::find_number::<User>(&pool, "count(*)", None, &[]).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished());

    drop(held);
    let count = waiter.await.unwrap().unwrap();
    assert_eq!(count, Some(Value::Int(3)));
}

#[tokio::test]
async fn test_saturated_pool_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("timeout.db").display());
    let mut config = SqliteConfig::new(url).with_size(1, 1);
    config.acquire_timeout_secs = 1;
    let pool = DbPool::connect_sqlite(&config).await.unwrap();

    let _held = match &pool {
        DbPool::Sqlite(p) => p.acquire().await.unwrap(),
        other => panic!("unexpected pool: {:?}", other),
    };

    let result = pool.select("select 1", &[], None).await;
    assert!(matches!(result, Err(OrmError::Timeout { .. })));
}
