use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{
    config::{D1HttpConfig, RAW_URL_SCHEME},
    wire::{decode_response, QueryRequest},
};
use crate::{
    bind_collector::BindValue,
    error::D1Error,
    store::{D1Database, D1PreparedStatement, D1RawRows, D1Record, D1Result, FromDatabaseUrl},
};

/// Which REST endpoint statements are posted to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// `/query`: rows arrive as objects keyed by column name
    #[default]
    Query,
    /// `/raw`: rows arrive as arrays next to a column list, so repeated column
    /// names survive (use this for joins)
    Raw,
}

/// D1 database reached over the Cloudflare REST API
///
/// Clones share the HTTP client and its connection pool.
///
/// # Example
///
/// ```ignore
/// use diesel_d1_dialect::{D1Dialect, D1HttpConfig, D1HttpDatabase};
///
/// let config = D1HttpConfig::new("account-id", "database-id", "api-token");
/// let dialect = D1Dialect::from_database(D1HttpDatabase::new(config));
/// ```
#[derive(Clone, Debug)]
pub struct D1HttpDatabase {
    client: Client,
    config: Arc<D1HttpConfig>,
    format: WireFormat,
}

impl D1HttpDatabase {
    /// Post statements to the `/query` endpoint
    pub fn new(config: D1HttpConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Post statements to the `/raw` endpoint
    pub fn raw(config: D1HttpConfig) -> Self {
        Self::new(config).with_format(WireFormat::Raw)
    }

    /// Use a preconfigured reqwest client, e.g. one with a timeout
    pub fn with_client(config: D1HttpConfig, client: Client) -> Self {
        Self {
            client,
            config: Arc::new(config),
            format: WireFormat::Query,
        }
    }

    /// Switch the endpoint statements are posted to
    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Account, database and token this store talks to
    pub fn config(&self) -> &D1HttpConfig {
        &self.config
    }

    /// The endpoint statements are posted to
    pub fn format(&self) -> WireFormat {
        self.format
    }

    async fn send(&self, sql: &str, params: &[BindValue]) -> Result<D1Result, D1Error> {
        let url = match self.format {
            WireFormat::Query => self.config.query_url(),
            WireFormat::Raw => self.config.raw_url(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_token)
            .json(&QueryRequest { sql, params })
            .send()
            .await
            .map_err(|e| D1Error::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| D1Error::Transport(format!("Failed to read response: {e}")))?;
        debug!(status = status.as_u16(), bytes = body.len(), "D1 API responded");

        match self.format {
            WireFormat::Query => decode_response::<Vec<D1Record>>(status, &body),
            WireFormat::Raw => decode_response::<D1RawRows>(status, &body),
        }
    }
}

impl D1Database for D1HttpDatabase {
    type Statement = D1HttpStatement;

    fn prepare(&self, sql: &str) -> D1HttpStatement {
        D1HttpStatement {
            database: self.clone(),
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }
}

impl FromDatabaseUrl for D1HttpDatabase {
    /// Accepts `d1://account_id:api_token@database_id`, or `d1+raw://...` for the
    /// raw endpoint
    fn from_database_url(database_url: &str) -> Result<Self, D1Error> {
        let config = D1HttpConfig::from_url(database_url)?;
        let format = if database_url.starts_with(RAW_URL_SCHEME) {
            WireFormat::Raw
        } else {
            WireFormat::Query
        };
        Ok(Self::new(config).with_format(format))
    }
}

/// A statement waiting to be posted to the REST API
pub struct D1HttpStatement {
    database: D1HttpDatabase,
    sql: String,
    params: Vec<BindValue>,
}

#[async_trait]
impl D1PreparedStatement for D1HttpStatement {
    fn bind(mut self, params: Vec<BindValue>) -> Self {
        self.params = params;
        self
    }

    async fn all(self) -> Result<D1Result, D1Error> {
        self.database.send(&self.sql, &self.params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::D1Connection;
    use diesel_async::AsyncConnection;
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer a single request with `status` and `body`, handing back the request
    /// head and its JSON body
    async fn serve_once(status: &'static str, body: Value) -> (String, JoinHandle<(String, Value)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before the request head ended");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8(buf[..head_end].to_vec()).unwrap();
            let length: usize = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse().unwrap())
                })
                .unwrap_or(0);
            while buf.len() < head_end + length {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before the request body ended");
                buf.extend_from_slice(&chunk[..n]);
            }
            let request: Value = serde_json::from_slice(&buf[head_end..head_end + length]).unwrap();

            let payload = body.to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
                payload.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            (head, request)
        });

        (base_url, handle)
    }

    fn local_database(base_url: &str, format: WireFormat) -> D1HttpDatabase {
        let config = D1HttpConfig::new("acc", "db", "tok").with_base_url(base_url);
        let client = Client::builder().no_proxy().build().unwrap();
        D1HttpDatabase::with_client(config, client).with_format(format)
    }

    #[test]
    fn test_from_database_url_selects_endpoint() {
        let database = D1HttpDatabase::from_database_url("d1://acc:tok@db").unwrap();
        assert_eq!(database.format(), WireFormat::Query);
        assert_eq!(database.config().account_id, "acc");

        let database = D1HttpDatabase::from_database_url("d1+raw://acc:tok@db").unwrap();
        assert_eq!(database.format(), WireFormat::Raw);
        assert_eq!(database.config().database_id, "db");
    }

    #[test]
    fn test_prepare_and_bind_stay_local() {
        let database = D1HttpDatabase::new(D1HttpConfig::new("acc", "db", "tok"));
        let statement = database
            .prepare("SELECT * FROM t WHERE x = ?")
            .bind(vec![BindValue::Integer(5)]);
        assert_eq!(statement.sql, "SELECT * FROM t WHERE x = ?");
        assert_eq!(statement.params, vec![BindValue::Integer(5)]);
    }

    #[tokio::test]
    async fn test_establish_valid_url() {
        let conn = D1Connection::<D1HttpDatabase>::establish("d1://account:token%40x@database")
            .await
            .unwrap();
        assert_eq!(conn.database().config().api_token, "token@x");
    }

    #[tokio::test]
    async fn test_establish_invalid_url() {
        let result = D1Connection::<D1HttpDatabase>::establish("invalid://url").await;
        assert!(matches!(result, Err(diesel::ConnectionError::BadConnection(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let config = D1HttpConfig::new("acc", "db", "tok").with_base_url("http://127.0.0.1:9");
        let result = D1HttpDatabase::new(config).prepare("SELECT 1").all().await;
        assert!(matches!(result, Err(D1Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_query_endpoint_request_and_response() {
        let (base_url, server) = serve_once(
            "200 OK",
            json!({
                "success": true,
                "errors": [],
                "result": [{
                    "success": true,
                    "results": [{"id": 5, "name": "x"}],
                    "meta": {"rows_read": 1, "rows_written": 0, "changes": 0}
                }]
            }),
        )
        .await;

        let result = local_database(&base_url, WireFormat::Query)
            .prepare("SELECT id, name FROM t WHERE id = ? AND name = ?")
            .bind(vec![BindValue::Integer(5), BindValue::Text("x".into())])
            .all()
            .await
            .unwrap();

        let (head, request) = server.await.unwrap();
        assert!(
            head.starts_with("POST /accounts/acc/d1/database/db/query HTTP/1.1"),
            "{head}"
        );
        assert!(head.to_ascii_lowercase().contains("authorization: bearer tok"), "{head}");
        assert_eq!(
            request,
            json!({"sql": "SELECT id, name FROM t WHERE id = ? AND name = ?", "params": [5, "x"]})
        );

        assert_eq!(result.error, None);
        assert_eq!(result.meta.rows_read, 1);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0]["name"], json!("x"));
        assert_eq!(result.raw, None);
    }

    #[tokio::test]
    async fn test_raw_endpoint_keeps_repeated_columns() {
        let (base_url, server) = serve_once(
            "200 OK",
            json!({
                "success": true,
                "result": [{
                    "success": true,
                    "results": {"columns": ["id", "name", "id"], "rows": [[1, "ada", 10]]},
                    "meta": {"rows_read": 2}
                }]
            }),
        )
        .await;

        let result = local_database(&base_url, WireFormat::Raw)
            .prepare("SELECT users.id, users.name, posts.id FROM users JOIN posts")
            .all()
            .await
            .unwrap();

        let (head, request) = server.await.unwrap();
        assert!(head.starts_with("POST /accounts/acc/d1/database/db/raw HTTP/1.1"), "{head}");
        assert!(head.to_ascii_lowercase().contains("authorization: bearer tok"), "{head}");
        assert_eq!(request["sql"], json!("SELECT users.id, users.name, posts.id FROM users JOIN posts"));

        let raw = result.raw.unwrap();
        assert_eq!(raw.columns, ["id", "name", "id"]);
        assert_eq!(raw.rows, vec![vec![json!(1), json!("ada"), json!(10)]]);
    }

    #[tokio::test]
    async fn test_api_failure_becomes_result_error() {
        let (base_url, server) = serve_once(
            "400 Bad Request",
            json!({
                "success": false,
                "errors": [{"code": 7500, "message": "no such table: missing"}],
                "result": []
            }),
        )
        .await;

        let result = local_database(&base_url, WireFormat::Query)
            .prepare("SELECT * FROM missing")
            .all()
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(result.error.as_deref(), Some("no such table: missing"));
    }
}
