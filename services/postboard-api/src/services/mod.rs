//! Use cases, one service per aggregate
//!
//! Services are stateless and generic over [`Repository`](postboard::repository::Repository),
//! so handlers pass in the SQLite repositories and tests can pass in anything
//! else that implements the trait.

mod accounts;
mod posts;

pub use accounts::{AccountService, CreateAccountInput, DUPLICATE_EMAIL};
pub use posts::{CreatePostInput, PostService};
