//! Database tests
//!
//! Schema migrations and the SQLite repositories on real files.

mod migrations;
mod repositories;
