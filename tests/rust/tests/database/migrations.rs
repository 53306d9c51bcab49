//! Migration tests

use sercha_storage::Database;
use tests::db::TestDatabase;

fn table_names(db: &Database) -> Vec<String> {
    let mut stmt = db
        .connection()
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_migrations_run_successfully() {
    // Database::open runs migrations automatically
    let test_db = TestDatabase::new();

    assert!(test_db.db_path().exists());
    assert_eq!(test_db.db.get_schema_version(), 1);
    assert_eq!(
        table_names(&test_db.db),
        vec![
            "app_settings",
            "auth_providers",
            "credentials",
            "schema_migrations",
            "sources"
        ]
    );
}

#[test]
fn test_migrations_are_idempotent() {
    let test_db = TestDatabase::new();

    // Opening the same database again should not fail or re-apply
    let db2 = Database::open(test_db.db_path()).unwrap();
    assert_eq!(db2.get_schema_version(), 1);
    let applied: i64 = db2
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(applied, 1);
}

#[test]
fn test_database_creates_parent_dirs() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("data").join("sercha").join("sercha.db");

    assert!(!db_path.exists());
    let _db = Database::open(&db_path).expect("Failed to open database");
    assert!(db_path.exists());
}

#[test]
fn test_foreign_keys_enforced() {
    let db = Database::open_in_memory().unwrap();
    let result = db.connection().execute(
        "INSERT INTO credentials (id, source_id, auth_method, secret_value, created_at, updated_at)
         VALUES ('cred-1', 'no-such-source', 'pat', 'x', 'now', 'now')",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn test_one_credentials_row_per_source() {
    let db = Database::open_in_memory().unwrap();
    let result = db.connection().execute_batch(
        "INSERT INTO sources (id, source_type, name, created_at, updated_at)
             VALUES ('src-1', 'github', 'GitHub', 'now', 'now');
         INSERT INTO credentials (id, source_id, auth_method, secret_value, created_at, updated_at)
             VALUES ('cred-1', 'src-1', 'pat', 'x', 'now', 'now');
         INSERT INTO credentials (id, source_id, auth_method, secret_value, created_at, updated_at)
             VALUES ('cred-2', 'src-1', 'pat', 'y', 'now', 'now');",
    );
    assert!(result.is_err());
}
