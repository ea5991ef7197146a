//! Example: running queries against Cloudflare D1 through the dialect
//!
//! ## Prerequisites
//!
//! 1. Create a D1 database in the Cloudflare dashboard
//! 2. Create an API token with D1 permissions
//! 3. Set the required environment variables:
//!    - `CF_ACCOUNT_ID`: Your Cloudflare account ID
//!    - `CF_DATABASE_ID`: Your D1 database ID
//!    - `CF_API_TOKEN`: Your Cloudflare API token
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=diesel_d1_dialect=trace cargo run --example http_dialect
//! ```

use diesel::prelude::*;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use diesel_d1_dialect::{
    D1Connection, D1Dialect, D1HttpConfig, D1HttpDatabase, DatabaseConnection,
    DatabaseMetadataOptions, Dialect, Driver,
};
use tracing_subscriber::EnvFilter;

diesel::table! {
    users (id) {
        id -> Integer,
        name -> Text,
        email -> Text,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dialect = D1Dialect::from_database(D1HttpDatabase::new(D1HttpConfig::from_env()?));
    let driver = dialect.create_driver();
    driver.init().await?;

    let mut conn: D1Connection<D1HttpDatabase> = driver.acquire_connection().await?;
    conn.batch_execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL
        )",
    )
    .await?;

    // Compiled query through the driver contract
    let insert = dialect.create_query_compiler().compile(
        &diesel::insert_into(users::table)
            .values((users::name.eq("John Doe"), users::email.eq("john@example.com"))),
    )?;
    let result = DatabaseConnection::execute_query(&conn, &insert).await?;
    println!("inserted, {} rows changed", result.num_changed_rows.unwrap_or(0));

    // The same connection as a Diesel AsyncConnection
    let rows: Vec<(i32, String)> = users::table
        .select((users::id, users::name))
        .order(users::id.desc())
        .limit(5)
        .load(&mut conn)
        .await?;
    for (id, name) in rows {
        println!("{id}: {name}");
    }

    if let Err(e) = conn.begin_transaction().await {
        println!("transactions: {e}");
    }

    let metadata = dialect
        .create_introspector()
        .get_metadata(DatabaseMetadataOptions::default())
        .await?;
    for table in metadata.tables {
        println!("{} ({} columns)", table.name, table.columns.len());
    }

    driver.release_connection(conn).await?;
    driver.destroy().await?;
    Ok(())
}
