//! Warehouse wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credentials for opening a warehouse session on behalf of a user.
#[derive(Debug, Clone)]
pub struct WarehouseLogin {
    pub login_name: String,
    pub access_token: String,
}

// =============================================================================
// Session login
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub data: LoginRequestData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) struct LoginRequestData<'a> {
    pub client_app_id: &'a str,
    pub client_app_version: &'a str,
    pub account_name: &'a str,
    pub login_name: &'a str,
    pub authenticator: &'a str,
    pub token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<LoginResponseData>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponseData {
    #[serde(default)]
    pub token: Option<String>,
}

// =============================================================================
// SQL statements API
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct StatementRequest<'a> {
    pub statement: &'a str,
    pub timeout: u64,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub warehouse: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub database: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatementResponse {
    #[serde(default)]
    pub result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultSetMetaData {
    #[serde(default)]
    pub row_type: Vec<ColumnType>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ColumnType {
    pub name: String,
}

/// Rows of one executed statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatementResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl StatementResult {
    pub(crate) fn from_response(resp: StatementResponse) -> Self {
        let columns = resp
            .result_set_meta_data
            .map(|m| m.row_type.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        Self {
            columns,
            rows: resp.data,
        }
    }

    /// Rows keyed by lower-cased column name.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.to_lowercase())
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// One row of `SHOW AGENTS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub database: String,
    pub schema: String,
    pub full_path: String,
    pub created_on: String,
    pub owner: String,
}

impl AgentSummary {
    pub(crate) fn from_record(record: &Map<String, Value>) -> Self {
        let field = |key: &str| -> String {
            match record.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        };
        let name = field("name");
        let database = field("database_name");
        let schema = field("schema_name");
        Self {
            full_path: format!("{database}.{schema}.{name}"),
            name,
            database,
            schema,
            created_on: field("created_on"),
            owner: field("owner"),
        }
    }
}

/// Result of the connection self-test query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub user: Option<String>,
    pub role: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub timestamp: Option<String>,
}

impl SessionContext {
    pub(crate) fn from_row(row: &[Value]) -> Self {
        let cell = |i: usize| match row.get(i) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        Self {
            user: cell(0),
            role: cell(1),
            database: cell(2),
            schema: cell(3),
            timestamp: cell(4),
        }
    }
}
