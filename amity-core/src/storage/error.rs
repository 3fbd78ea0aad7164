// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Storage error types.

use thiserror::Error;

/// Errors from the SQLite-backed stores.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON (de)serialization of a stored column failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}
