//! Core library for notekeep - a client for a personal note-taking REST service.
//!
//! This crate provides:
//! - `api`: the authenticated HTTP client for the auth and notes endpoints
//! - `auth`: session persistence, token expiry validation, credential storage
//! - `models`: wire/domain types for users and notes
//! - `validation`: client-side form validation with field-keyed errors
//! - `config`: application configuration and file locations

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod validation;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionData};
pub use config::Config;
