//! OAuth2 login and principal management.
//!
//! This module runs the authorization-code flow against the directory
//! identity provider and keeps the resulting principal in the session:
//!
//! - **Login**: random state token in the session, redirect to the provider
//! - **Callback**: state check, code exchange, profile fetch, group normalization
//! - **Lookup**: `current_user` / `is_admin`, the only integration point for
//!   protected resources
//!
//! ## Security Model
//!
//! - The state token is compared before any provider call and is single-use
//! - The admin role is never stored; it is derived from `memberOf` and the
//!   configured admin group on every read
//! - A session either holds a fully normalized principal or none at all
//!
//! ## Usage
//!
//! ```ignore
//! let config = state.config.current().await;
//! match auth::current_user(&session, &config).await {
//!     Ok(user) if user.is_admin => { /* full access */ }
//!     Ok(_) | Err(AuthError::NotFound) => { /* read-only */ }
//!     Err(e) => return e.into_response(),
//! }
//! ```

pub mod client;
mod error;
pub mod flow;
mod principal;
mod state_token;

pub use client::{OAuthClient, TokenResponse};
pub use error::{AuthError, ProviderError};
pub use flow::{
    AuthRedirect, CallbackParams, begin_login, current_user, handle_callback, is_admin, logout,
};
pub use principal::{CurrentUser, Principal, UserInfo, normalize_group};
pub use state_token::{STATE_TOKEN_BYTES, generate_state_token, state_matches};
