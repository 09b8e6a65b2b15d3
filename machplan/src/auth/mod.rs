//! Authentication.
//!
//! Tokens are issued by the external identity service; this service only verifies
//! them and never stores users. The verified subject (a UUID) is the owner id used to
//! scope every database query.
//!
//! # Authentication Methods
//!
//! Tried in order by the [`CurrentUser`](crate::api::models::users::CurrentUser)
//! extractor; the first one that succeeds wins:
//!
//! 1. `Authorization: Bearer <jwt>` (when `auth.bearer_enabled`)
//! 2. a session cookie holding the same JWT (when `auth.cookie_name` is set)
//! 3. a trusted proxy header carrying the user UUID (when `auth.proxy_header.enabled`)
//!
//! # Usage in Handlers
//!
//! ```ignore
//! async fn protected_handler(
//!     State(state): State<AppState>,
//!     current_user: CurrentUser,
//! ) -> Result<Json<Vec<MachineResponse>>> {
//!     // current_user.id scopes every query
//! }
//! ```

pub mod current_user;
pub mod session;
