//! Seqport-DB: Status store schema, migrations, and query operations
//!
//! This crate provides the SQLite status store for seqport using rusqlite
//! and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching the database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use seqport_db::models::TableName;
//! use seqport_db::pool::{get_conn, init_pool};
//! use seqport_db::queries::status;
//!
//! let pool = init_pool("/var/lib/seqport/status.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let table = TableName::new("seq_status").unwrap();
//! let flagged = status::rows_with_value(&conn, &table, 1).unwrap();
//! println!("{} channels flagged for export", flagged.len());
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
