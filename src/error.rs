use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouteError>;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("storage error: {0}")]
    Storage(Box<redb::Error>),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("corruption detected: {0}")]
    Corruption(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("search cancelled")]
    Cancelled,
}

impl From<redb::Error> for RouteError {
    fn from(e: redb::Error) -> Self {
        RouteError::Storage(Box::new(e))
    }
}

impl From<redb::DatabaseError> for RouteError {
    fn from(e: redb::DatabaseError) -> Self {
        RouteError::Storage(Box::new(e.into()))
    }
}

impl From<redb::TransactionError> for RouteError {
    fn from(e: redb::TransactionError) -> Self {
        RouteError::Storage(Box::new(e.into()))
    }
}

impl From<redb::TableError> for RouteError {
    fn from(e: redb::TableError) -> Self {
        RouteError::Storage(Box::new(e.into()))
    }
}

impl From<redb::StorageError> for RouteError {
    fn from(e: redb::StorageError) -> Self {
        RouteError::Storage(Box::new(e.into()))
    }
}

impl From<redb::CommitError> for RouteError {
    fn from(e: redb::CommitError) -> Self {
        RouteError::Storage(Box::new(e.into()))
    }
}

impl From<regex::Error> for RouteError {
    fn from(e: regex::Error) -> Self {
        RouteError::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(e: serde_json::Error) -> Self {
        RouteError::Serialization(e.to_string())
    }
}
