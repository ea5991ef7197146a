//! Request and response bodies of the D1 REST API

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    bind_collector::BindValue,
    error::D1Error,
    store::{D1Meta, D1RawRows, D1Record, D1Result},
};

#[derive(Serialize, Debug)]
pub(super) struct QueryRequest<'a> {
    pub(super) sql: &'a str,
    #[serde(skip_serializing_if = "no_params")]
    pub(super) params: &'a [BindValue],
}

fn no_params(params: &&[BindValue]) -> bool {
    params.is_empty()
}

#[derive(Deserialize, Debug)]
struct ApiResponse<R> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    #[serde(default = "Option::default")]
    result: Option<Vec<StatementResult<R>>>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    #[allow(dead_code)]
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug)]
struct StatementResult<R> {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default = "Option::default")]
    results: Option<R>,
    #[serde(default)]
    meta: Option<D1Meta>,
}

fn default_success() -> bool {
    true
}

/// A `results` payload, in one of the two shapes the API returns
pub(super) trait StatementRows: DeserializeOwned {
    fn into_result(self, meta: D1Meta) -> Result<D1Result, D1Error>;
}

/// `/query`: rows as objects
impl StatementRows for Vec<D1Record> {
    fn into_result(self, meta: D1Meta) -> Result<D1Result, D1Error> {
        Ok(D1Result::success(self, meta))
    }
}

/// `/raw`: rows as arrays next to a column list
impl StatementRows for D1RawRows {
    fn into_result(self, meta: D1Meta) -> Result<D1Result, D1Error> {
        D1Result::success_raw(self, meta)
    }
}

/// Turn a response body into the result of the first statement
///
/// API failures reported in the envelope become [`D1Result::error`], matching what
/// a Worker binding reports. A body that is not an envelope at all is a transport
/// failure when the status already says so, and a decoding failure otherwise.
pub(super) fn decode_response<R: StatementRows>(
    status: StatusCode,
    body: &str,
) -> Result<D1Result, D1Error> {
    let response: ApiResponse<R> = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(error) if status.is_success() => return Err(D1Error::Decode(error.to_string())),
        Err(_) => return Err(D1Error::Transport(format!("HTTP error {status}: {body}"))),
    };

    if !response.success {
        let message = response
            .errors
            .into_iter()
            .next()
            .map(|e| e.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        return Ok(D1Result::failure(message));
    }

    let statement = response
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| D1Error::Decode("No result returned".to_string()))?;

    if !statement.success {
        return Ok(D1Result::failure(
            statement.error.unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    let meta = statement.meta.unwrap_or_default();
    match statement.results {
        Some(results) => results.into_result(meta),
        None => Ok(D1Result::success(Vec::new(), meta)),
    }
}
