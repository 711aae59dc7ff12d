use std::path::PathBuf;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Pool, Row, SslOpts, Value};
use shelf_core::settings::{ConnectionProfile, PasswordSource, TlsMode};
use shelf_core::sql_generator::{
    delete_sql, insert_sql, select_all_sql, table_columns_sql, update_sql, SqlGenerationError,
    Statement,
};
use shelf_core::store::{
    ConstraintKind, ConstraintViolation, Record, RecordStore, RowKey, StoreError, TableData,
};
use tracing::{debug, warn};

pub const PASSWORD_ENV_VAR: &str = "SHELF_DB_PASSWORD";

const ER_NO_REFERENCED_ROW: u16 = 1452;
const ER_ROW_IS_REFERENCED: u16 = 1451;
const ER_DUP_ENTRY: u16 = 1062;
const ER_BAD_NULL: u16 = 1048;

/// Pooled MySQL access for the record browser.
#[derive(Debug, Clone)]
pub struct MysqlRecordStore {
    pool: Pool,
}

impl MysqlRecordStore {
    #[must_use]
    pub fn from_profile(profile: &ConnectionProfile) -> Self {
        debug!(
            host = profile.host,
            port = profile.port,
            user = profile.user,
            database = profile.database.as_deref().unwrap_or(""),
            "creating mysql pool"
        );
        Self {
            pool: Pool::new(opts_from_profile(profile)),
        }
    }

    async fn conn(&self) -> Result<Conn, StoreError> {
        self.pool.get_conn().await.map_err(to_store_error)
    }

    async fn execute(&self, statement: Statement) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;
        conn.exec_drop(statement.sql, statement.params)
            .await
            .map_err(to_store_error)?;
        Ok(conn.affected_rows())
    }
}

#[async_trait]
impl RecordStore for MysqlRecordStore {
    async fn fetch_all(&self, table: &str) -> Result<TableData, StoreError> {
        let mut conn = self.conn().await?;
        let columns: Vec<String> = conn
            .exec(table_columns_sql(), (table.to_string(),))
            .await
            .map_err(to_store_error)?;
        if columns.is_empty() {
            return Err(StoreError::backend(format!("Table '{table}' doesn't exist")));
        }

        let sql = select_all_sql(table, &columns).map_err(to_generation_error)?;
        let rows: Vec<Row> = conn.query(sql).await.map_err(to_store_error)?;
        let rows = rows.into_iter().map(row_to_record).collect::<Vec<_>>();
        debug!(table, rows = rows.len(), "fetched rows");
        Ok(TableData::new(columns, rows))
    }

    async fn insert(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> Result<(), StoreError> {
        let statement = insert_sql(table, columns, values).map_err(to_generation_error)?;
        self.execute(statement).await.map(|_| ())
    }

    async fn update(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
        key: &RowKey,
    ) -> Result<u64, StoreError> {
        let statement = update_sql(table, columns, values, key).map_err(to_generation_error)?;
        self.execute(statement).await
    }

    async fn delete(&self, table: &str, key: &RowKey) -> Result<u64, StoreError> {
        let statement = delete_sql(table, key).map_err(to_generation_error)?;
        self.execute(statement).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.clone().disconnect().await.map_err(to_store_error)
    }
}

fn opts_from_profile(profile: &ConnectionProfile) -> OptsBuilder {
    let mut builder = OptsBuilder::default()
        .ip_or_hostname(profile.host.clone())
        .tcp_port(profile.port)
        .user(Some(profile.user.clone()));

    if let Some(password) = resolve_password(profile) {
        builder = builder.pass(Some(password));
    }

    if let Some(database) = &profile.database {
        builder = builder.db_name(Some(database.clone()));
    }

    if let Some(ssl_opts) = ssl_opts_from_profile(profile) {
        builder = builder.ssl_opts(ssl_opts);
    }

    if matches!(profile.tls_mode, TlsMode::Disabled) {
        builder = builder.prefer_socket(false);
    }

    builder
}

fn resolve_password(profile: &ConnectionProfile) -> Option<String> {
    let env_password = std::env::var(PASSWORD_ENV_VAR)
        .ok()
        .filter(|pw| !pw.is_empty());

    match profile.password_source {
        PasswordSource::EnvVar => env_password,
        PasswordSource::Keyring => {
            if let Some(password) = load_keyring_password(profile) {
                return Some(password);
            }

            if let Some(password) = env_password {
                store_keyring_password(profile, &password);
                return Some(password);
            }

            warn!(user = profile.user, "no password in the keyring or the environment");
            None
        }
    }
}

fn ssl_opts_from_profile(profile: &ConnectionProfile) -> Option<SslOpts> {
    if !profile_requests_tls(profile) {
        return None;
    }

    let mut ssl_opts = SslOpts::default();
    if let Some(ca_cert_path) = non_empty(profile.tls_ca_cert_path.as_deref()) {
        ssl_opts = ssl_opts.with_root_certs(vec![PathBuf::from(ca_cert_path).into()]);
    }
    Some(ssl_opts)
}

fn profile_requests_tls(profile: &ConnectionProfile) -> bool {
    match profile.tls_mode {
        TlsMode::Disabled => false,
        TlsMode::Prefer => non_empty(profile.tls_ca_cert_path.as_deref()).is_some(),
        TlsMode::Require => true,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn load_keyring_password(profile: &ConnectionProfile) -> Option<String> {
    let entry = keyring_entry(profile)?;
    entry.get_password().ok().filter(|pw| !pw.is_empty())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn load_keyring_password(_profile: &ConnectionProfile) -> Option<String> {
    None
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn store_keyring_password(profile: &ConnectionProfile, password: &str) {
    if password.is_empty() {
        return;
    }
    if let Some(entry) = keyring_entry(profile) {
        if let Err(error) = entry.set_password(password) {
            warn!(%error, "could not store the password in the keyring");
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn store_keyring_password(_profile: &ConnectionProfile, _password: &str) {}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn keyring_entry(profile: &ConnectionProfile) -> Option<keyring::Entry> {
    let service = non_empty(profile.keyring_service.as_deref()).unwrap_or("shelf");
    let account = non_empty(profile.keyring_account.as_deref()).unwrap_or(profile.user.as_str());
    keyring::Entry::new(service, account).ok()
}

fn row_to_record(row: Row) -> Record {
    row.unwrap().into_iter().map(mysql_value_to_string).collect()
}

fn mysql_value_to_string(value: Value) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Value::Int(value) => value.to_string(),
        Value::UInt(value) => value.to_string(),
        Value::Float(value) => value.to_string(),
        Value::Double(value) => value.to_string(),
        Value::Date(year, month, day, 0, 0, 0, 0) => format!("{year:04}-{month:02}-{day:02}"),
        Value::Date(year, month, day, hour, minute, second, 0) => {
            format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
        }
        Value::Date(year, month, day, hour, minute, second, micros) => format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        ),
        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if is_negative { "-" } else { "" };
            let hours = u32::from(hours) + days * 24;
            if micros == 0 {
                format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
            } else {
                format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
            }
        }
    }
}

fn to_store_error(error: mysql_async::Error) -> StoreError {
    match &error {
        mysql_async::Error::Server(server) => {
            classify_server_error(server.code, &server.message).map_or_else(
                || StoreError::backend(error.to_string()),
                StoreError::Constraint,
            )
        }
        _ => StoreError::backend(error.to_string()),
    }
}

fn to_generation_error(error: SqlGenerationError) -> StoreError {
    StoreError::backend(error.to_string())
}

fn classify_server_error(code: u16, message: &str) -> Option<ConstraintViolation> {
    let violation = match code {
        ER_NO_REFERENCED_ROW => {
            let mut violation = ConstraintViolation::new(ConstraintKind::ForeignKey, message);
            if let Some(column) = between(message, "FOREIGN KEY (`", "`") {
                violation = violation.with_column(column);
            }
            if let Some(table) = between(message, "REFERENCES `", "`") {
                violation = violation.with_referenced_table(table);
            }
            violation
        }
        ER_ROW_IS_REFERENCED => {
            let mut violation = ConstraintViolation::new(ConstraintKind::Referenced, message);
            if let Some(table) = referencing_table(message) {
                violation = violation.with_referencing_table(table);
            }
            violation
        }
        ER_DUP_ENTRY => {
            let mut violation = ConstraintViolation::new(ConstraintKind::Duplicate, message);
            if let Some(value) = between(message, "Duplicate entry '", "'") {
                violation = violation.with_value(value);
            }
            let key = between(message, "for key '", "'")
                .map(|key| key.rsplit('.').next().unwrap_or(key));
            if let Some(key) = key.filter(|key| !key.eq_ignore_ascii_case("PRIMARY")) {
                violation = violation.with_column(key);
            }
            violation
        }
        ER_BAD_NULL => {
            let mut violation = ConstraintViolation::new(ConstraintKind::NotNull, message);
            if let Some(column) = between(message, "Column '", "'") {
                violation = violation.with_column(column);
            }
            violation
        }
        _ => return None,
    };
    debug!(code, kind = ?violation.kind, "classified server error");
    Some(violation)
}

// "... constraint fails (`library`.`Loans`, CONSTRAINT ..." names the child table.
fn referencing_table(message: &str) -> Option<&str> {
    let qualified = between(message, "fails (`", ",")?;
    let table = qualified.rsplit("`.`").next()?;
    Some(table.trim_end_matches('`'))
}

fn between<'a>(haystack: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = haystack.find(start)? + start.len();
    let rest = &haystack[from..];
    let to = rest.find(end)?;
    Some(&rest[..to]).filter(|found| !found.is_empty())
}

#[cfg(test)]
mod tests {
    use mysql_async::{Opts, Value};
    use shelf_core::settings::{ConnectionProfile, TlsMode};
    use shelf_core::store::ConstraintKind;

    use super::{
        classify_server_error, mysql_value_to_string, opts_from_profile, profile_requests_tls,
    };

    #[test]
    fn value_conversion_is_human_readable() {
        assert_eq!(mysql_value_to_string(Value::NULL), "NULL");
        assert_eq!(
            mysql_value_to_string(Value::Bytes(b"Dune".to_vec())),
            "Dune".to_string()
        );
        assert_eq!(mysql_value_to_string(Value::Int(-8)), "-8");
        assert_eq!(mysql_value_to_string(Value::UInt(8)), "8");
        assert_eq!(
            mysql_value_to_string(Value::Date(2024, 3, 9, 0, 0, 0, 0)),
            "2024-03-09"
        );
        assert_eq!(
            mysql_value_to_string(Value::Time(false, 1, 2, 3, 4, 0)),
            "26:03:04"
        );
    }

    #[test]
    fn opts_builder_uses_profile_host_port_user() {
        let mut profile = ConnectionProfile::new("127.0.0.1", "librarian");
        profile.port = 3307;
        profile.database = Some("library".to_string());

        let opts = Opts::from(opts_from_profile(&profile));
        assert_eq!(opts.ip_or_hostname(), "127.0.0.1");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.user(), Some("librarian"));
        assert_eq!(opts.db_name(), Some("library"));
    }

    #[test]
    fn tls_mode_prefer_requires_a_ca_certificate() {
        let mut profile = ConnectionProfile::new("127.0.0.1", "root");
        assert!(!profile_requests_tls(&profile));

        profile.tls_ca_cert_path = Some("/tmp/ca.pem".to_string());
        assert!(profile_requests_tls(&profile));

        profile.tls_mode = TlsMode::Disabled;
        assert!(!profile_requests_tls(&profile));
    }

    #[test]
    fn tls_mode_require_always_uses_tls() {
        let mut profile = ConnectionProfile::new("127.0.0.1", "root");
        profile.tls_mode = TlsMode::Require;
        assert!(profile_requests_tls(&profile));
    }

    #[test]
    fn missing_parent_row_names_column_and_table() {
        let violation = classify_server_error(
            1452,
            "Cannot add or update a child row: a foreign key constraint fails \
             (`library`.`Books`, CONSTRAINT `books_ibfk_1` FOREIGN KEY (`AuthorID`) \
             REFERENCES `Authors` (`AuthorID`))",
        )
        .expect("recognised violation");

        assert_eq!(violation.kind, ConstraintKind::ForeignKey);
        assert_eq!(violation.column.as_deref(), Some("AuthorID"));
        assert_eq!(violation.referenced_table.as_deref(), Some("Authors"));
    }

    #[test]
    fn referenced_parent_row_names_the_child_table() {
        let violation = classify_server_error(
            1451,
            "Cannot delete or update a parent row: a foreign key constraint fails \
             (`library`.`Loans`, CONSTRAINT `loans_ibfk_1` FOREIGN KEY (`BookID`) \
             REFERENCES `Books` (`BookID`))",
        )
        .expect("recognised violation");

        assert_eq!(violation.kind, ConstraintKind::Referenced);
        assert_eq!(violation.referencing_table.as_deref(), Some("Loans"));
    }

    #[test]
    fn duplicate_and_null_violations_carry_their_column() {
        let primary = classify_server_error(1062, "Duplicate entry '7' for key 'Books.PRIMARY'")
            .expect("recognised violation");
        assert_eq!(primary.kind, ConstraintKind::Duplicate);
        assert_eq!(primary.column, None);
        assert_eq!(primary.value.as_deref(), Some("7"));

        let unique = classify_server_error(1062, "Duplicate entry 'a@b' for key 'Email'")
            .expect("recognised violation");
        assert_eq!(unique.column.as_deref(), Some("Email"));

        let null = classify_server_error(1048, "Column 'Title' cannot be null")
            .expect("recognised violation");
        assert_eq!(null.kind, ConstraintKind::NotNull);
        assert_eq!(null.column.as_deref(), Some("Title"));
    }

    #[test]
    fn other_server_errors_stay_unclassified() {
        assert!(classify_server_error(1146, "Table 'library.Shelves' doesn't exist").is_none());
    }
}
