//! End-to-end run of the cloud migration history: v1 tables, uid backfill,
//! unique indexes, then the v2 refactor that replaces both tables.

use std::path::PathBuf;

use st_core::{ColumnDescriptor, ColumnType, Dialect, IndexDescriptor, TableDescriptor};
use st_db::{DatabaseCore, DatabaseSchema, SqliteBackend};
use st_migrate::{
    AddIndex, CreateTable, MigrateError, MigrationFile, RawSql, Registry, Runner, RunnerOptions,
    DEFAULT_LEDGER_TABLE,
};
use st_sql::{dialect_for, RawSqlVariants};

const SEED: &str = "seed v1 rows";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load(registry: &mut Registry, name: &str) {
    MigrationFile::load(&fixture(name))
        .unwrap()
        .register(registry)
        .unwrap();
}

/// Full history with a data seed right after the v1 tables exist.
fn history() -> Registry {
    let mut registry = Registry::new();
    load(&mut registry, "001_cloud_migration_v1.yml");
    registry
        .add(
            SEED,
            RawSql::new(RawSqlVariants::new().with_fallback(
                "INSERT INTO cloud_migration (id, auth_token, stack, created, updated) VALUES \
                 (1, 'tok-a', 'stack-a', '2024-05-01 10:00:00', '2024-05-01 10:00:00'), \
                 (42, NULL, 'stack-b', '2024-05-02 11:30:00', '2024-05-02 11:30:00'); \
                 INSERT INTO cloud_migration_run (id, cloud_migration_uid, result, created, updated) VALUES \
                 (1, 'session-a', 'ok', '2024-05-01 10:05:00', '2024-05-01 10:05:00'), \
                 (42, NULL, 'failed', '2024-05-02 11:35:00', '2024-05-02 11:35:00');",
            )),
        )
        .unwrap();
    load(&mut registry, "002_cloud_migration_uid.yml");
    load(&mut registry, "003_cloud_migration_v2.yml");
    registry
}

fn unlocked(limit: Option<usize>) -> RunnerOptions {
    RunnerOptions {
        lock: None,
        limit,
        ..RunnerOptions::default()
    }
}

/// Observable end state: surviving tables, their rows, and the ledger.
async fn snapshot(db: &SqliteBackend) -> Vec<String> {
    let mut out = Vec::new();
    for table in [
        "cloud_migration",
        "cloud_migration_run",
        "cloud_migration_session",
        "cloud_migration_snapshot",
        "cloud_migration_session_tmp_v2",
        "cloud_migration_snapshot_tmp_v2",
    ] {
        out.push(format!("{}={}", table, db.relation_exists(table).await.unwrap()));
    }
    let queries = [
        "SELECT id, uid, auth_token, slug, stack_id, created FROM cloud_migration_session ORDER BY id",
        "SELECT id, uid, session_uid, result, finished FROM cloud_migration_snapshot ORDER BY id",
        "SELECT migration_id FROM migration_log ORDER BY migration_id",
    ];
    for sql in queries {
        for row in db.query_rows(sql).await.unwrap() {
            out.push(
                row.into_iter()
                    .map(|v| v.unwrap_or_else(|| "NULL".to_string()))
                    .collect::<Vec<_>>()
                    .join("|"),
            );
        }
    }
    out
}

#[tokio::test]
async fn test_history_applies_and_pads_identifiers() {
    let db = SqliteBackend::in_memory().await.unwrap();
    let registry = history();
    let report = Runner::new(&db, &registry, RunnerOptions::default())
        .run()
        .await
        .unwrap();
    assert_eq!(report.applied.len(), registry.len());

    for gone in ["cloud_migration", "cloud_migration_run"] {
        assert!(!db.relation_exists(gone).await.unwrap(), "{gone} survived");
    }
    let sessions = db
        .query_rows("SELECT id, uid, slug FROM cloud_migration_session ORDER BY id")
        .await
        .unwrap();
    assert_eq!(
        sessions,
        vec![
            vec![Some("1".into()), Some("u000000001".into()), Some("stack-a".into())],
            vec![Some("42".into()), Some("u000000042".into()), Some("stack-b".into())],
        ]
    );
    let snapshots = db
        .query_rows("SELECT uid, session_uid FROM cloud_migration_snapshot ORDER BY id")
        .await
        .unwrap();
    assert_eq!(
        snapshots,
        vec![
            vec![Some("u000000001".into()), Some("session-a".into())],
            vec![Some("u000000042".into()), None],
        ]
    );
    assert!(db
        .index_exists(
            "cloud_migration_session",
            "UQE_cloud_migration_session_uid"
        )
        .await
        .unwrap());
    assert!(db
        .index_exists(
            "cloud_migration_snapshot",
            "UQE_cloud_migration_snapshot_uid"
        )
        .await
        .unwrap());
    assert_eq!(
        db.query_count(&format!("SELECT * FROM {}", DEFAULT_LEDGER_TABLE))
            .await
            .unwrap(),
        registry.len()
    );
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let db = SqliteBackend::in_memory().await.unwrap();
    let registry = history();
    let runner = Runner::new(&db, &registry, unlocked(None));
    runner.run().await.unwrap();
    let before = snapshot(&db).await;

    let again = runner.run().await.unwrap();
    assert!(again.applied.is_empty());
    assert_eq!(again.skipped, registry.len());
    assert_eq!(snapshot(&db).await, before);
}

#[tokio::test]
async fn test_resume_after_every_interruption_point() {
    let registry = history();
    let baseline = {
        let db = SqliteBackend::in_memory().await.unwrap();
        Runner::new(&db, &registry, unlocked(None))
            .run()
            .await
            .unwrap();
        snapshot(&db).await
    };

    for k in 0..registry.len() {
        let db = SqliteBackend::in_memory().await.unwrap();
        let first = Runner::new(&db, &registry, unlocked(Some(k)))
            .run()
            .await
            .unwrap();
        assert_eq!(first.applied.len(), k);

        let rest = Runner::new(&db, &registry, unlocked(None))
            .run()
            .await
            .unwrap();
        assert_eq!(rest.applied.len(), registry.len() - k);
        assert_eq!(snapshot(&db).await, baseline, "diverged after stopping at {k}");
    }
}

#[tokio::test]
async fn test_replace_stage_replays_when_ledger_row_is_lost() {
    let registry = history();
    let baseline = {
        let db = SqliteBackend::in_memory().await.unwrap();
        Runner::new(&db, &registry, unlocked(None))
            .run()
            .await
            .unwrap();
        snapshot(&db).await
    };

    // Replace stages are the only steps named "<migration>: <stage>".
    let stages: Vec<usize> = registry
        .steps()
        .iter()
        .enumerate()
        .filter(|(_, s)| s.name.contains(": "))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(stages.len(), 10);

    for k in stages {
        let db = SqliteBackend::in_memory().await.unwrap();
        Runner::new(&db, &registry, unlocked(Some(k + 1)))
            .run()
            .await
            .unwrap();
        // Work committed, ledger write lost.
        db.execute(&format!(
            "DELETE FROM {t} WHERE id = (SELECT MAX(id) FROM {t})",
            t = DEFAULT_LEDGER_TABLE
        ))
        .await
        .unwrap();

        let rest = Runner::new(&db, &registry, unlocked(None))
            .run()
            .await
            .unwrap();
        assert_eq!(rest.applied.len(), registry.len() - k);
        assert_eq!(
            snapshot(&db).await,
            baseline,
            "replaying '{}' diverged",
            registry.steps()[k].name
        );
    }
}

#[tokio::test]
async fn test_duplicate_values_fail_unique_index() {
    let db = SqliteBackend::in_memory().await.unwrap();
    let mut registry = Registry::new();
    registry
        .add(
            "create accounts",
            CreateTable::new(
                TableDescriptor::new("accounts")
                    .column(
                        ColumnDescriptor::new("id", ColumnType::BigInt)
                            .primary_key()
                            .auto_increment(),
                    )
                    .column(ColumnDescriptor::new("email", ColumnType::Text).nullable()),
            ),
        )
        .unwrap()
        .add(
            "seed accounts",
            RawSql::new(RawSqlVariants::new().with_fallback(
                "INSERT INTO accounts (email) VALUES ('a@example.com'), ('a@example.com')",
            )),
        )
        .unwrap()
        .add(
            "unique email",
            AddIndex::new("accounts", IndexDescriptor::unique(["email"])),
        )
        .unwrap();

    let err = Runner::new(&db, &registry, unlocked(None))
        .run()
        .await
        .unwrap_err();
    match &err {
        MigrateError::MigrationFailed { name, .. } => assert_eq!(name, "unique email"),
        other => panic!("expected MigrationFailed, got {other:?}"),
    }
    assert!(err.root().is_execution());
    assert!(!db
        .index_exists("accounts", "UQE_accounts_email")
        .await
        .unwrap());
    let pending = Runner::new(&db, &registry, unlocked(None))
        .pending()
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_missing_dialect_variant_stops_before_any_step() {
    let db = SqliteBackend::in_memory().await.unwrap();
    let mut registry = history();
    registry
        .add(
            "postgres and mysql only",
            RawSql::new(
                RawSqlVariants::new()
                    .postgres("SELECT 1")
                    .mysql("SELECT 1"),
            ),
        )
        .unwrap();

    let err = Runner::new(&db, &registry, unlocked(None))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        MigrateError::UnsupportedDialect {
            dialect: Dialect::Sqlite,
            ..
        }
    ));
    assert!(!db.relation_exists("cloud_migration").await.unwrap());
}

#[test]
fn test_history_renders_for_every_dialect() {
    let registry = history();
    for dialect in Dialect::ALL {
        let adapter = dialect_for(dialect);
        let plan = registry.render_all(adapter.as_ref()).unwrap();
        assert_eq!(plan.len(), registry.len());
        for step in plan {
            for sql in &step.sql {
                adapter
                    .parse(sql)
                    .unwrap_or_else(|e| panic!("{dialect}: '{}' does not parse: {e}", step.name));
            }
        }
    }
}
