//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: bearer-token session state persisted across restarts
//! - `token`: stateless JWT expiry inspection
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! The session file holds only the token and the user object; expiry is
//! re-derived from the token itself every time the session is restored.

pub mod credentials;
pub mod session;
pub mod token;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
