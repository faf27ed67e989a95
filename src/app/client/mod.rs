//! HTTP access to the NOAA distribution endpoints
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with rate limiting and retries
//! - `download`: Streamed file downloads with atomic writes

pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;
pub use download::DownloadHandler;
pub use http::HttpHandler;
