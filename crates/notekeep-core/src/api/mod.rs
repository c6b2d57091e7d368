//! REST API client module for the notekeep service.
//!
//! This module provides the `ApiClient` for the auth and notes endpoints.
//! The API uses JWT bearer token authentication obtained through the
//! login/register endpoints; every response arrives wrapped in a
//! `{ success, content|data, message|msg }` envelope that is normalized
//! here so callers never see the inconsistent field spellings.

pub mod client;
pub mod error;
pub mod response;

pub use client::{ApiClient, AuthSuccess};
pub use error::ApiError;
pub use response::Envelope;
