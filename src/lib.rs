//! Vertica Driver
//!
//! An asynchronous client for the Vertica analytic database, speaking the
//! simple query flow of its Postgres derived wire protocol.
//!
//! # Examples
//!
//! ```no_run
//! use vertiq::{Config, Connection};
//!
//! # async fn app() -> vertiq::Result<()> {
//! let mut conn = Connection::connect_with(
//!     Config::new()
//!         .host("db1")
//!         .user("dbadmin")
//!         .database("warehouse")
//!         .schema("public"),
//! )
//! .await?;
//!
//! // rows stream off the socket lazily
//! let mut rows = conn.query("SELECT id, name FROM users");
//! while let Some(row) = rows.try_next().await? {
//!     let id: i64 = row.try_get("id")?;
//!     let name: Option<String> = row.try_get("name")?;
//!     println!("{id}: {name:?}");
//! }
//! drop(rows);
//!
//! // statements take effect transactionally
//! conn.within_transaction(async |conn| {
//!     conn.execute("DELETE FROM users WHERE banned").await?;
//!     conn.execute("INSERT INTO audit VALUES ('purge')").await?;
//!     Ok(())
//! })
//! .await?;
//!
//! conn.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod common;
mod net;
mod ext;

// Protocol
pub mod vertica;

// Component
pub mod sql;
pub mod row;
mod column;

// Operation
pub mod transport;
pub mod query;
pub mod transaction;
mod startup;

// Connection
pub mod connection;
mod stream;

mod error;

pub use column::ColumnDescriptor;
pub use connection::{Config, ConfigError, Connection};
pub use error::{Error, ErrorKind, Result};
pub use query::{ExecResult, QueryStream};
pub use startup::UnsupportedAuth;
pub use row::{Column, DecodeError, Decode, Row};
pub use transaction::{NotFoundError, StateError, TxStatus};
