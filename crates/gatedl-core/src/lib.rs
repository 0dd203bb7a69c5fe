pub mod config;
pub mod error;
pub mod logging;

pub mod auth;
pub mod cookie_store;
pub mod download;
pub mod http;
pub mod metadata;
pub mod page;
pub mod pipeline;
pub mod resolver;
pub mod storage;
pub mod url_model;

pub use error::{GatedlError, Result};
