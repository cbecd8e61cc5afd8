use postboard::context::RequestContext;
use postboard::error::{Error, Result};
use postboard::repository::{
    ErrorCategory, OrderDirection, Paginator, Query, Repository, RepositoryError,
};
use postboard::responses::PageParams;

use crate::models::{account, Account, Address};

pub const DUPLICATE_EMAIL: &str = "an account with this email already exists";

#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    pub full_name: String,
    pub email: String,
    pub username: Option<String>,
    pub address: Address,
}

/// Account use cases
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountService;

impl AccountService {
    /// Register an account together with its address
    ///
    /// An email already in use is a conflict, whether it is caught by the
    /// lookup or by the unique index when two requests race.
    pub async fn create_account<R: Repository<Account>>(
        &self,
        ctx: &RequestContext,
        input: CreateAccountInput,
        repo: &R,
    ) -> Result<Account> {
        let by_email = Query::new().filter("email = ?", [input.email.as_str()]);
        match repo.find_one(ctx, by_email, &[]).await {
            Ok(_) => {
                tracing::warn!(email = %input.email, "found account with matching email");
                return Err(Error::Conflict(DUPLICATE_EMAIL.to_string()));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let account = Account {
            name: input.full_name,
            username: input.username.unwrap_or_default(),
            email: input.email,
            address: Some(input.address),
            ..Account::default()
        };

        repo.create(ctx, account).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to create account");
            duplicate_email_or(e)
        })
    }

    /// One page of accounts with their addresses, oldest first
    pub async fn list_accounts<R: Repository<Account>>(
        &self,
        ctx: &RequestContext,
        page: PageParams,
        repo: &R,
    ) -> Result<(Vec<Account>, Paginator)> {
        let query = Query::new()
            .order_by("created_at", OrderDirection::Ascending)
            .order_by("id", OrderDirection::Ascending);

        let result = repo
            .find_many_paginated(ctx, query, page.page, page.per_page, &[account::ADDRESS])
            .await?;
        Ok(result)
    }

    pub async fn get_account<R: Repository<Account>>(
        &self,
        ctx: &RequestContext,
        id: &str,
        repo: &R,
    ) -> Result<Account> {
        let account = repo
            .find_one(ctx, Query::by_id(id), &[account::ADDRESS])
            .await?;
        Ok(account)
    }

    pub async fn count_accounts<R: Repository<Account>>(
        &self,
        ctx: &RequestContext,
        repo: &R,
    ) -> Result<u64> {
        Ok(repo.count(ctx, Query::new()).await?)
    }
}

fn duplicate_email_or(err: RepositoryError) -> Error {
    if err.category() == ErrorCategory::Conflict {
        Error::Conflict(DUPLICATE_EMAIL.to_string())
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::memory_store;
    use crate::services::testing::FailingRepository;
    use postboard::repository::{RepositoryErrorKind, RepositoryOperation};

    fn input(email: &str) -> CreateAccountInput {
        CreateAccountInput {
            full_name: "Ada Lovelace".into(),
            email: email.into(),
            username: None,
            address: Address::new("1 Main St", "Springfield", "IL", "62701"),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = memory_store().await.repository::<Account>();
        let ctx = RequestContext::new();

        let created = AccountService
            .create_account(&ctx, input("ada@example.com"), &repo)
            .await
            .unwrap();
        assert_eq!(created.username, "");

        let fetched = AccountService
            .get_account(&ctx, &created.metadata.id, &repo)
            .await
            .unwrap();
        assert_eq!(fetched.name, "Ada Lovelace");
        assert_eq!(fetched.address.unwrap().city, "Springfield");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = memory_store().await.repository::<Account>();
        let ctx = RequestContext::new();

        AccountService
            .create_account(&ctx, input("ada@example.com"), &repo)
            .await
            .unwrap();
        let err = AccountService
            .create_account(&ctx, input("ada@example.com"), &repo)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conflict(ref msg) if msg == DUPLICATE_EMAIL));
        assert_eq!(AccountService.count_accounts(&ctx, &repo).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_treated_as_absent() {
        let repo = FailingRepository::new(RepositoryError::new(
            RepositoryOperation::FindOne,
            RepositoryErrorKind::ConnectionFailed,
            "pool closed",
        ));

        let err = AccountService
            .create_account(&RequestContext::new(), input("ada@example.com"), &repo)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Repository(ref e) if e.kind == RepositoryErrorKind::ConnectionFailed));
        assert_eq!(repo.creates(), 0);
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let repo = memory_store().await.repository::<Account>();

        let err = AccountService
            .get_account(&RequestContext::new(), "missing", &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Repository(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_list_pages_in_creation_order() {
        let repo = memory_store().await.repository::<Account>();
        let ctx = RequestContext::new();

        for i in 0..3 {
            AccountService
                .create_account(&ctx, input(&format!("user{i}@example.com")), &repo)
                .await
                .unwrap();
        }

        let (first, paginator) = AccountService
            .list_accounts(&ctx, PageParams { page: 1, per_page: 2 }, &repo)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].email, "user0@example.com");
        assert!(first.iter().all(|a| a.address.is_some()));
        assert_eq!(paginator.total_rows, 3);
        assert_eq!(paginator.total_pages, 2);

        let (second, _) = AccountService
            .list_accounts(&ctx, PageParams { page: 2, per_page: 2 }, &repo)
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].email, "user2@example.com");
    }
}
