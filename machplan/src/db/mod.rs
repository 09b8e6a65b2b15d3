//! Database layer: error classification, row models and owner-scoped repositories.
//!
//! Repositories wrap a `&mut PgConnection` so callers decide the transaction
//! boundary:
//!
//! ```ignore
//! let mut tx = state.db.begin().await?;
//! let machine = Machines::new(&mut tx).create(current_user.id, &request).await?;
//! tx.commit().await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
