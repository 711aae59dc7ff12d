use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder};
use shelf_adapters::mysql::MysqlRecordStore;
use shelf_core::catalog::TableCatalog;
use shelf_core::mutator::{MutationError, RecordMutator, UpdatePlan};
use shelf_core::settings::ConnectionProfile;
use shelf_core::store::{ConstraintKind, RecordStore, RowKey, StoreError};

fn mysql_integration_enabled() -> bool {
    matches!(
        std::env::var("SHELF_RUN_MYSQL_INTEGRATION").ok().as_deref(),
        Some("1")
    )
}

fn integration_profile(database: Option<&str>) -> ConnectionProfile {
    let host = std::env::var("SHELF_TEST_DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let user = std::env::var("SHELF_TEST_DB_USER").unwrap_or_else(|_| "root".to_string());
    let port = std::env::var("SHELF_TEST_DB_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(3306);

    let mut profile = ConnectionProfile::new(host, user);
    profile.port = port;
    profile.database = database.map(str::to_string);
    profile
}

async fn admin_conn(profile: &ConnectionProfile) -> Conn {
    let opts = OptsBuilder::default()
        .ip_or_hostname(profile.host.clone())
        .tcp_port(profile.port)
        .user(Some(profile.user.clone()))
        .pass(std::env::var("SHELF_DB_PASSWORD").ok())
        .db_name(profile.database.clone());
    Conn::new(Opts::from(opts))
        .await
        .expect("admin connection should open")
}

async fn execute_sql(conn: &mut Conn, sql: &str) {
    conn.query_drop(sql).await.expect("setup statement should run");
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

#[tokio::test(flavor = "current_thread")]
async fn mysql_store_round_trips_library_records() {
    if !mysql_integration_enabled() {
        return;
    }

    let database = "shelf_adapters_it";
    let mut conn = admin_conn(&integration_profile(None)).await;
    execute_sql(&mut conn, &format!("CREATE DATABASE IF NOT EXISTS `{database}`")).await;
    execute_sql(&mut conn, &format!("USE `{database}`")).await;
    execute_sql(&mut conn, "DROP TABLE IF EXISTS Loans").await;
    execute_sql(&mut conn, "DROP TABLE IF EXISTS Books").await;
    execute_sql(&mut conn, "DROP TABLE IF EXISTS Authors").await;
    execute_sql(
        &mut conn,
        "CREATE TABLE Authors (AuthorID INT NOT NULL PRIMARY KEY, Name VARCHAR(64) NOT NULL)",
    )
    .await;
    execute_sql(
        &mut conn,
        "CREATE TABLE Books (\
         BookID INT NOT NULL PRIMARY KEY,\
         Title VARCHAR(64) NOT NULL,\
         AuthorID INT NOT NULL,\
         FOREIGN KEY (AuthorID) REFERENCES Authors (AuthorID))",
    )
    .await;
    execute_sql(
        &mut conn,
        "CREATE TABLE Loans (\
         LoanID INT NOT NULL PRIMARY KEY,\
         BookID INT NOT NULL,\
         FOREIGN KEY (BookID) REFERENCES Books (BookID))",
    )
    .await;
    execute_sql(&mut conn, "INSERT INTO Authors VALUES (1, 'Frank Herbert')").await;
    execute_sql(&mut conn, "INSERT INTO Books VALUES (1, 'Dune', 1), (2, 'Emma', 1)").await;
    execute_sql(&mut conn, "INSERT INTO Loans VALUES (42, 1)").await;

    let store = MysqlRecordStore::from_profile(&integration_profile(Some(database)));
    let catalog = TableCatalog::library();
    let mutator = RecordMutator::new(&store, &catalog);

    let books = store.fetch_all("Books").await.expect("books should load");
    assert_eq!(books.columns, strings(&["BookID", "Title", "AuthorID"]));
    assert_eq!(books.rows.len(), 2);
    assert_eq!(books.rows[0].values, strings(&["1", "Dune", "1"]));

    let err = mutator
        .create(
            "Books",
            &strings(&["BookID", "Title", "AuthorID"]),
            &strings(&["7", "Dune Messiah", "999"]),
        )
        .await
        .expect_err("author 999 does not exist");
    assert_eq!(
        err.user_message(),
        "The specified AuthorID does not exist in the Authors table."
    );

    let plan = UpdatePlan::split(
        &strings(&["BookID", "Title", "AuthorID"]),
        &strings(&["2", "Emma; DROP TABLE Books", "1"]),
        0,
    )
    .expect("valid plan");
    assert_eq!(mutator.update("Books", &plan).await.expect("update"), 1);
    let books = store.fetch_all("Books").await.expect("books should load");
    assert_eq!(books.rows[1].get(1), Some("Emma; DROP TABLE Books"));

    let err = mutator
        .delete("Books", &RowKey::new("BookID", "1"))
        .await
        .expect_err("book 1 is on loan");
    assert!(matches!(
        err,
        MutationError::Constraint { ref violation, .. }
            if violation.kind == ConstraintKind::Referenced
    ));
    assert_eq!(
        err.user_message(),
        "This record is still referenced by the Loans table."
    );

    assert_eq!(
        store
            .delete("Loans", &RowKey::new("LoanID", "42"))
            .await
            .expect("delete loan"),
        1
    );
    assert_eq!(
        store
            .delete("Loans", &RowKey::new("LoanID", "42"))
            .await
            .expect("delete is idempotent"),
        0
    );

    let missing = store.fetch_all("Shelves").await.expect_err("no such table");
    assert!(matches!(missing, StoreError::Backend(_)));

    execute_sql(&mut conn, "DROP TABLE IF EXISTS Loans").await;
    execute_sql(&mut conn, "DROP TABLE IF EXISTS Books").await;
    execute_sql(&mut conn, "DROP TABLE IF EXISTS Authors").await;
    conn.disconnect().await.expect("admin disconnect should succeed");
    store.close().await.expect("pool should close");
}
