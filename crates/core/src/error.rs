// Central Error Type for the Application

use crate::domain::QueueName;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Queue '{0}' is already registered")]
    DuplicateRegistration(QueueName),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
