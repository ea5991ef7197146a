use std::fmt;

use crate::error::D1Error;

/// The Cloudflare API endpoint used unless overridden
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

pub(crate) const URL_SCHEME: &str = "d1://";
pub(crate) const RAW_URL_SCHEME: &str = "d1+raw://";

const ACCOUNT_ID_VAR: &str = "CF_ACCOUNT_ID";
const DATABASE_ID_VAR: &str = "CF_DATABASE_ID";
const API_TOKEN_VAR: &str = "CF_API_TOKEN";
const BASE_URL_VAR: &str = "CF_API_BASE_URL";

/// Configuration for D1 HTTP API access
///
/// # Example
///
/// ```
/// use diesel_d1_dialect::D1HttpConfig;
///
/// let config = D1HttpConfig::new(
///     "your-account-id",
///     "your-database-id",
///     "your-api-token",
/// );
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct D1HttpConfig {
    /// Cloudflare account ID
    pub account_id: String,
    /// D1 database ID
    pub database_id: String,
    /// API token with D1 permissions
    pub api_token: String,
    /// Base URL for the API (defaults to Cloudflare API)
    pub base_url: String,
}

impl D1HttpConfig {
    /// Create a new configuration with the required parameters
    pub fn new(
        account_id: impl Into<String>,
        database_id: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            database_id: database_id.into(),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read `CF_ACCOUNT_ID`, `CF_DATABASE_ID`, `CF_API_TOKEN` and, optionally,
    /// `CF_API_BASE_URL` from the environment
    pub fn from_env() -> Result<Self, D1Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, D1Error> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| D1Error::Config(format!("{name} is not set")))
        };

        let config = Self::new(
            required(ACCOUNT_ID_VAR)?,
            required(DATABASE_ID_VAR)?,
            required(API_TOKEN_VAR)?,
        );
        Ok(match lookup(BASE_URL_VAR).filter(|url| !url.is_empty()) {
            Some(base_url) => config.with_base_url(base_url),
            None => config,
        })
    }

    /// Parse `d1://account_id:api_token@database_id`
    ///
    /// The token may be percent-encoded if it contains `@` or `:`. The
    /// `d1+raw://` scheme is accepted as well; it only matters to
    /// [`D1HttpDatabase`](super::D1HttpDatabase), which picks its endpoint from it.
    pub fn from_url(database_url: &str) -> Result<Self, D1Error> {
        let url_body = database_url
            .strip_prefix(RAW_URL_SCHEME)
            .or_else(|| database_url.strip_prefix(URL_SCHEME))
            .ok_or_else(|| D1Error::Config("D1 URL must start with 'd1://'".to_string()))?;

        let invalid = || {
            D1Error::Config(
                "Invalid D1 URL format. Expected: d1://account_id:api_token@database_id".to_string(),
            )
        };
        // the last '@' splits auth from the database, the first ':' splits account from token
        let (auth_part, database_id) = url_body.rsplit_once('@').ok_or_else(invalid)?;
        let (account_id, api_token_encoded) = auth_part.split_once(':').ok_or_else(invalid)?;
        let api_token = percent_decode(api_token_encoded);

        for (field, value) in [
            ("account_id", account_id),
            ("database_id", database_id),
            ("api_token", api_token.as_str()),
        ] {
            if value.is_empty() {
                return Err(D1Error::Config(format!("{field} cannot be empty in D1 URL")));
            }
        }

        Ok(Self::new(account_id, database_id, api_token))
    }

    /// Endpoint returning rows as objects
    pub fn query_url(&self) -> String {
        self.endpoint("query")
    }

    /// Endpoint returning rows as arrays plus a column list
    pub fn raw_url(&self) -> String {
        self.endpoint("raw")
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/accounts/{}/d1/database/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.account_id,
            self.database_id,
            action
        )
    }
}

impl fmt::Debug for D1HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("D1HttpConfig")
            .field("account_id", &self.account_id)
            .field("database_id", &self.database_id)
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Decode `%XX` escapes; malformed escapes are kept as written
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = byte {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
