//! End-to-end import against a real SQL engine.
//!
//! SQLite stands in for the MySQL server: it accepts the backtick-quoted
//! identifiers and multi-row VALUES lists the importer generates, so the
//! whole pipeline from dump file to queried rows runs for real. Fixtures
//! carry the `ENGINE=InnoDB` terminator in a trailing comment so the DDL
//! stays valid SQLite.

use rusqlite::Connection;
use sql_importer::db::Database;
use sql_importer::error::ImportError;
use sql_importer::importer::Importer;
use sql_importer::report::NullSink;
use tempfile::TempDir;

struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    fn in_memory() -> Self {
        Self {
            conn: Connection::open_in_memory().unwrap(),
        }
    }
}

impl Database for SqliteDatabase {
    fn execute(&mut self, sql: &str) -> Result<(), ImportError> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| ImportError::Database(e.to_string()))
    }

    fn count_rows(&mut self, table: &str) -> Result<u64, ImportError> {
        let sql = format!("SELECT COUNT(*) FROM `{}`", table.replace('`', "``"));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| ImportError::Database(e.to_string()))?;
        Ok(count as u64)
    }
}

fn sqlite_dump(table: &str, tuples: &[&str]) -> String {
    let mut out = format!(
        "-- Dump of table {table}\n\
         CREATE TABLE `{table}` (\n\
           `id` INTEGER PRIMARY KEY,\n\
           `name` TEXT\n\
         ); -- ENGINE=InnoDB\n"
    );
    for tuple in tuples {
        out.push_str(&format!(
            "INSERT INTO `{table}` (`id`, `name`) VALUES {tuple};\n"
        ));
    }
    out
}

fn names(db: &SqliteDatabase, table: &str) -> Vec<String> {
    let mut stmt = db
        .conn
        .prepare(&format!("SELECT name FROM `{table}` ORDER BY id"))
        .unwrap();
    let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
    rows.map(|r| r.unwrap()).collect()
}

#[test]
fn test_rows_land_in_the_database() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("users.sql"),
        sqlite_dump("users", &["(1,'alice')", "(2,'bob')", "(3,'carol')"]),
    )
    .unwrap();

    let mut db = SqliteDatabase::in_memory();
    let stats = Importer::new(&mut db, &NullSink).run(dir.path()).unwrap();

    assert_eq!(stats.files_imported, 1);
    assert_eq!(stats.total_rows_inserted, 3);
    assert_eq!(db.count_rows("users").unwrap(), 3);
    assert_eq!(names(&db, "users"), vec!["alice", "bob", "carol"]);
}

#[test]
fn test_batched_inserts_preserve_every_row() {
    let dir = TempDir::new().unwrap();
    let tuples: Vec<String> = (1..=7).map(|i| format!("({i},'name{i}')")).collect();
    let tuple_refs: Vec<&str> = tuples.iter().map(|s| s.as_str()).collect();
    std::fs::write(
        dir.path().join("items.sql"),
        sqlite_dump("items", &tuple_refs),
    )
    .unwrap();

    let mut db = SqliteDatabase::in_memory();
    let stats = Importer::new(&mut db, &NullSink)
        .with_batch_size(3)
        .run(dir.path())
        .unwrap();

    assert_eq!(stats.files[0].batches_executed, 3);
    assert_eq!(db.count_rows("items").unwrap(), 7);
    assert_eq!(names(&db, "items")[6], "name7");
}

#[test]
fn test_second_run_inserts_nothing_new() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("users.sql"),
        sqlite_dump("users", &["(1,'alice')", "(2,'bob')", "(3,'carol')"]),
    )
    .unwrap();

    let mut db = SqliteDatabase::in_memory();
    Importer::new(&mut db, &NullSink).run(dir.path()).unwrap();
    let second = Importer::new(&mut db, &NullSink).run(dir.path()).unwrap();

    assert_eq!(second.files[0].rows_skipped, 3);
    assert_eq!(second.files[0].rows_inserted, 0);
    assert_eq!(db.count_rows("users").unwrap(), 3);
}

#[test]
fn test_interrupted_import_resumes_where_it_stopped() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("users.sql"),
        sqlite_dump("users", &["(1,'alice')", "(2,'bob')", "(3,'carol')"]),
    )
    .unwrap();

    let mut db = SqliteDatabase::in_memory();
    // Simulate a prior run that died after two rows.
    db.execute("CREATE TABLE `users` (`id` INTEGER PRIMARY KEY, `name` TEXT)")
        .unwrap();
    db.execute("INSERT INTO `users` (`id`, `name`) VALUES (1,'alice'),(2,'bob')")
        .unwrap();

    let stats = Importer::new(&mut db, &NullSink).run(dir.path()).unwrap();

    assert_eq!(stats.files[0].rows_skipped, 2);
    assert_eq!(stats.files[0].rows_inserted, 1);
    assert_eq!(names(&db, "users"), vec!["alice", "bob", "carol"]);
}

#[test]
fn test_rejected_ddl_skips_file_without_stopping_the_run() {
    let dir = TempDir::new().unwrap();
    // Real MySQL table options that SQLite rejects.
    std::fs::write(
        dir.path().join("legacy.sql"),
        "CREATE TABLE `legacy` (\n  `id` int NOT NULL\n) ENGINE=InnoDB DEFAULT CHARSET=utf8;\n\
         INSERT INTO `legacy` (`id`) VALUES (1);\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("users.sql"),
        sqlite_dump("users", &["(1,'alice')"]),
    )
    .unwrap();

    let mut db = SqliteDatabase::in_memory();
    let stats = Importer::new(&mut db, &NullSink).run(dir.path()).unwrap();

    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.files_imported, 1);
    assert_eq!(db.count_rows("users").unwrap(), 1);
    assert!(db.count_rows("legacy").is_err());
}
