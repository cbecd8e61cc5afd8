//! Stored entities and the schema they live in

pub mod account;
mod address;
mod post;

pub use account::Account;
pub use address::Address;
pub use post::Post;

/// Tables for accounts, their addresses and their posts
///
/// Applied on every start; all statements are idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id          TEXT PRIMARY KEY NOT NULL,
    created_at  TEXT,
    updated_at  TEXT,
    deleted_at  TEXT,
    version     INTEGER NOT NULL DEFAULT 1,
    name        TEXT NOT NULL,
    username    TEXT NOT NULL DEFAULT '',
    email       TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS addresses (
    id          TEXT PRIMARY KEY NOT NULL,
    created_at  TEXT,
    updated_at  TEXT,
    deleted_at  TEXT,
    version     INTEGER NOT NULL DEFAULT 1,
    account_id  TEXT NOT NULL UNIQUE REFERENCES accounts(id) ON DELETE CASCADE,
    street      TEXT NOT NULL,
    city        TEXT NOT NULL,
    state       TEXT NOT NULL,
    zipcode     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id          TEXT PRIMARY KEY NOT NULL,
    created_at  TEXT,
    updated_at  TEXT,
    deleted_at  TEXT,
    version     INTEGER NOT NULL DEFAULT 1,
    account_id  TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    body        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_account_created ON posts (account_id, created_at);
"#;
