//! Error type definitions.
//!
//! This module defines every error used throughout the crate, from the
//! per-call `StepError` up to the public `ScrapeError`.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// The configured proxy URL was rejected.
    #[error("Invalid proxy '{0}'")]
    ProxyError(String),
}

/// Transport failure categories.
///
/// Mirrors the classes `reqwest` distinguishes so outcome reports can say
/// *why* a call never produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    HttpRequestBuilderError,
    HttpRequestRedirectError,
    HttpRequestTimeoutError,
    HttpRequestRequestError,
    HttpRequestConnectError,
    HttpRequestBodyError,
    HttpRequestDecodeError,
    HttpRequestOtherError,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpRequestBuilderError => "HTTP request builder error",
            ErrorType::HttpRequestRedirectError => "HTTP request redirect error",
            ErrorType::HttpRequestTimeoutError => "HTTP request timeout error",
            ErrorType::HttpRequestRequestError => "HTTP request error",
            ErrorType::HttpRequestConnectError => "HTTP request connect error",
            ErrorType::HttpRequestBodyError => "HTTP request body error",
            ErrorType::HttpRequestDecodeError => "HTTP request decode error",
            ErrorType::HttpRequestOtherError => "HTTP request other error",
        }
    }
}

/// Why a single orchestrated call failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// Connection, TLS or timeout failure: no response at all.
    #[error("{kind}: {message}")]
    Transport { kind: ErrorType, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status { status: u16, snippet: String },

    /// The body could not be decompressed or parsed.
    #[error("undecodable body: {0}")]
    Decode(String),

    /// The main search answered, but not in the shape the front-end expects.
    #[error("protocol mismatch (HTTP {status}): {reason}")]
    ProtocolMismatch {
        status: u16,
        reason: String,
        snippet: String,
    },
}

impl StepError {
    /// Status code carried by the failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            StepError::Status { status, .. } | StepError::ProtocolMismatch { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Response preview carried by the failure, if any.
    pub fn snippet(&self) -> Option<&str> {
        match self {
            StepError::Status { snippet, .. } | StepError::ProtocolMismatch { snippet, .. } => {
                Some(snippet.as_str())
            }
            _ => None,
        }
    }
}

/// Failure of a signing oracle. Never fatal: the header is omitted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("oracle failed: {0}")]
    Failed(String),

    #[error("oracle returned an empty value")]
    Empty,
}

/// Failure to turn a search response body into JSON.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{encoding} decompression failed: {source}")]
    Decompression {
        encoding: String,
        #[source]
        source: std::io::Error,
    },

    #[error("body is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event stream carried no data lines with JSON payloads")]
    EmptyStream,
}

/// Public error of a scrape operation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScrapeError {
    /// Missing or malformed input URL. No network call was made.
    #[error("Invalid search URL: {0}")]
    Validation(String),

    /// A mandatory bootstrap call (the search page visit) failed.
    #[error("Session bootstrap failed at {step}: {detail}")]
    Bootstrap { step: String, detail: String },

    /// The mandatory main search call did not produce a usable response.
    #[error("{step} failed: {detail}")]
    FatalSearch { step: String, detail: String },

    /// The HTTP client could not be built.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
}
