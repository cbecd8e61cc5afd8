use std::collections::HashMap;

use chrono::Utc;
use postboard::repository::{
    fetch_by_keys, insert_row, Entity, FilterValue, Metadata, Query, RepositoryOperation,
    RepositoryResult, SqlEntity,
};
use sqlx::SqliteConnection;

use super::{Address, Post};

/// Association names accepted as preloads
pub const ADDRESS: &str = "address";
pub const POSTS: &str = "posts";

/// A registered user
///
/// `address` and `posts` are associations: written with the account on
/// create, and loaded only when a query preloads them.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Account {
    #[sqlx(flatten)]
    pub metadata: Metadata,
    pub name: String,
    pub username: String,
    pub email: String,
    #[sqlx(skip)]
    pub address: Option<Address>,
    #[sqlx(skip)]
    pub posts: Vec<Post>,
}

impl Entity for Account {
    const NAME: &'static str = "Account";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn before_save(&mut self, operation: RepositoryOperation) -> RepositoryResult<()> {
        let now = Utc::now();
        let creating = operation == RepositoryOperation::Create;

        if creating {
            self.metadata.prepare_insert(now);
        } else {
            self.metadata.touch(now);
        }

        // Owned rows only get written on create
        if creating {
            let account_id = self.metadata.id.clone();
            if let Some(address) = self.address.as_mut() {
                address.account_id.clone_from(&account_id);
                address.metadata.prepare_insert(now);
            }
            for post in &mut self.posts {
                post.account_id.clone_from(&account_id);
                post.metadata.prepare_insert(now);
            }
        }
        Ok(())
    }
}

impl SqlEntity for Account {
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &["name", "username", "email"];

    fn values(&self) -> Vec<FilterValue> {
        vec![
            self.name.clone().into(),
            self.username.clone().into(),
            self.email.clone().into(),
        ]
    }

    async fn insert_related(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        if let Some(address) = &self.address {
            insert_row(&mut *conn, address).await?;
        }
        for post in &self.posts {
            insert_row(&mut *conn, post).await?;
        }
        Ok(())
    }

    async fn load_related(
        rows: &mut [Self],
        conn: &mut SqliteConnection,
        query: &Query,
    ) -> Result<(), sqlx::Error> {
        let ids: Vec<String> = rows.iter().map(|a| a.metadata.id.clone()).collect();

        if query.wants(ADDRESS) {
            let addresses: Vec<Address> = fetch_by_keys(&mut *conn, "account_id", ids.clone()).await?;
            let mut by_account: HashMap<String, Address> = addresses
                .into_iter()
                .map(|address| (address.account_id.clone(), address))
                .collect();
            for account in rows.iter_mut() {
                account.address = by_account.remove(&account.metadata.id);
            }
        }

        if query.wants(POSTS) {
            let posts: Vec<Post> = fetch_by_keys(&mut *conn, "account_id", ids).await?;
            let mut by_account: HashMap<String, Vec<Post>> = HashMap::new();
            for post in posts {
                by_account.entry(post.account_id.clone()).or_default().push(post);
            }
            for account in rows.iter_mut() {
                account.posts = by_account.remove(&account.metadata.id).unwrap_or_default();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_prepares_owned_rows() {
        let mut account = Account {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            address: Some(Address::new("1 Main St", "Springfield", "IL", "62701")),
            ..Account::default()
        };

        account.before_save(RepositoryOperation::Create).unwrap();

        assert!(!account.metadata.id.is_empty());
        assert_eq!(account.metadata.version, 1);
        let address = account.address.as_ref().unwrap();
        assert_eq!(address.account_id, account.metadata.id);
        assert!(!address.metadata.id.is_empty());
        assert_ne!(address.metadata.id, account.metadata.id);
        assert_eq!(address.metadata.version, 1);
    }

    #[test]
    fn test_update_leaves_address_untouched() {
        let mut account = Account {
            address: Some(Address::default()),
            ..Account::default()
        };
        account.metadata.id = "acct".into();
        account.metadata.version = 2;

        account.before_save(RepositoryOperation::Update).unwrap();

        assert_eq!(account.metadata.version, 2);
        assert!(account.metadata.updated_at.is_some());
        assert!(account.address.unwrap().metadata.id.is_empty());
    }
}
