//! Raw command surface: stored procedures, functions and ad hoc SQL.
//!
//! These calls bypass the persistence context and run directly on the unit of
//! work's raw connection. Arguments are always bound parameters. Routine
//! names cannot be bound, so they are checked against a strict identifier
//! pattern instead. SQL text passed to `execute_query*`/`execute_command` is
//! trusted as-is.

use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DbErr, FromQueryResult, JsonValue, QueryResult, Statement,
    TryGetable, Value,
};

use common::{AppError, AppResult};

use super::UnitOfWork;

/// Column name read by [`Scalar`]
const SCALAR_COLUMN: &str = "value";

/// `name` or `schema.name`
static ROUTINE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("routine name pattern is valid")
});

/// Single-column row produced by [`UnitOfWork::execute_function`].
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar<V>(pub V);

impl<V> Scalar<V> {
    pub fn into_inner(self) -> V {
        self.0
    }
}

impl<V: TryGetable> FromQueryResult for Scalar<V> {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Scalar(res.try_get(pre, SCALAR_COLUMN)?))
    }
}

fn validate_routine_name(name: &str) -> AppResult<()> {
    if ROUTINE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid routine name: {name:?}"
        )))
    }
}

fn placeholders(backend: DatabaseBackend, count: usize) -> String {
    (1..=count)
        .map(|index| match backend {
            DatabaseBackend::Postgres => format!("${index}"),
            _ => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Statement invoking a stored procedure that yields rows
pub(crate) fn procedure_statement(
    backend: DatabaseBackend,
    name: &str,
    params: Vec<Value>,
) -> AppResult<Statement> {
    validate_routine_name(name)?;
    let args = placeholders(backend, params.len());

    let sql = match backend {
        DatabaseBackend::Postgres => format!("SELECT * FROM {name}({args})"),
        DatabaseBackend::MySql => format!("CALL {name}({args})"),
        _ => {
            return Err(DbErr::Custom(format!(
                "{backend:?} does not support stored procedures"
            ))
            .into())
        }
    };

    Ok(Statement::from_sql_and_values(backend, sql, params))
}

/// Statement selecting a function's result as the `value` column
pub(crate) fn function_statement(
    backend: DatabaseBackend,
    name: &str,
    args: Vec<Value>,
) -> AppResult<Statement> {
    validate_routine_name(name)?;
    let placeholders = placeholders(backend, args.len());
    let sql = format!("SELECT {name}({placeholders}) AS {SCALAR_COLUMN}");
    Ok(Statement::from_sql_and_values(backend, sql, args))
}

/// Await `fut`, failing with a store error once `timeout` elapses
async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> AppResult<T>
where
    F: Future<Output = Result<T, DbErr>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| {
                DbErr::Custom(format!("Command timed out after {}ms", limit.as_millis()))
            })?
            .map_err(AppError::from),
        None => fut.await.map_err(AppError::from),
    }
}

fn exactly_one<T>(mut rows: Vec<T>) -> AppResult<T> {
    match rows.len() {
        0 => Err(AppError::NotFound),
        1 => rows.pop().ok_or(AppError::NotFound),
        _ => Err(AppError::AmbiguousMatch),
    }
}

impl UnitOfWork {
    /// Run a stored procedure and collect its rows.
    ///
    /// `timeout` overrides the unit of work's default command timeout.
    pub async fn execute_stored_procedure<T>(
        &self,
        name: &str,
        params: Vec<Value>,
        timeout: Option<Duration>,
    ) -> AppResult<Vec<T>>
    where
        T: FromQueryResult + Send,
    {
        let connection = self.connection()?;
        let statement = procedure_statement(connection.get_database_backend(), name, params)?;
        tracing::debug!(procedure = name, "Executing stored procedure");
        self.fetch_all(connection, statement, timeout).await
    }

    /// Run a stored procedure that must yield exactly one row
    pub async fn execute_stored_procedure_single<T>(
        &self,
        name: &str,
        params: Vec<Value>,
        timeout: Option<Duration>,
    ) -> AppResult<T>
    where
        T: FromQueryResult + Send,
    {
        exactly_one(self.execute_stored_procedure(name, params, timeout).await?)
    }

    /// Run `SELECT name(args) AS value` and collect the rows.
    ///
    /// Use [`Scalar`] as `T` to read the value column directly.
    pub async fn execute_function<T>(
        &self,
        name: &str,
        args: Vec<Value>,
        timeout: Option<Duration>,
    ) -> AppResult<Vec<T>>
    where
        T: FromQueryResult + Send,
    {
        let connection = self.connection()?;
        let statement = function_statement(connection.get_database_backend(), name, args)?;
        tracing::debug!(function = name, "Executing function");
        self.fetch_all(connection, statement, timeout).await
    }

    /// Run a function that must yield exactly one row
    pub async fn execute_function_single<T>(
        &self,
        name: &str,
        args: Vec<Value>,
        timeout: Option<Duration>,
    ) -> AppResult<T>
    where
        T: FromQueryResult + Send,
    {
        exactly_one(self.execute_function(name, args, timeout).await?)
    }

    /// Run trusted SQL text and return loosely typed rows
    pub async fn execute_query(&self, sql: &str) -> AppResult<Vec<JsonValue>> {
        self.execute_query_with(sql, Vec::new()).await
    }

    /// Run trusted SQL text with bound values and return loosely typed rows
    pub async fn execute_query_with(
        &self,
        sql: &str,
        values: Vec<Value>,
    ) -> AppResult<Vec<JsonValue>> {
        let connection = self.connection()?;
        let statement =
            Statement::from_sql_and_values(connection.get_database_backend(), sql, values);
        self.fetch_all(connection, statement, None).await
    }

    /// Run a trusted SQL command and return the number of affected rows
    pub async fn execute_command(&self, sql: &str, values: Vec<Value>) -> AppResult<u64> {
        let connection = self.connection()?;
        let statement =
            Statement::from_sql_and_values(connection.get_database_backend(), sql, values);
        let result = with_timeout(self.command_timeout, connection.execute(statement)).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all<T>(
        &self,
        connection: &sea_orm::DatabaseConnection,
        statement: Statement,
        timeout: Option<Duration>,
    ) -> AppResult<Vec<T>>
    where
        T: FromQueryResult + Send,
    {
        with_timeout(
            timeout.or(self.command_timeout),
            T::find_by_statement(statement).all(connection),
        )
        .await
    }
}
