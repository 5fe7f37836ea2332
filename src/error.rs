// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Errors surfaced by the ledger engine.
//!
//! Every failure maps onto one [`ErrorKind`]; callers translate the kind into
//! whatever their transport needs. Validation errors are always raised before
//! a batch is committed, so no variant implies a partial write.

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    AlreadyExists,
    FailedPrecondition,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            LedgerError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            LedgerError::FailedPrecondition(_) => ErrorKind::FailedPrecondition,
            LedgerError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            success: false,
            error: ErrorBody {
                kind: self.kind(),
                message: self.to_string(),
            },
        }
    }
}

/// Failure envelope: `{ "success": false, "error": { "kind", "message" } }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
