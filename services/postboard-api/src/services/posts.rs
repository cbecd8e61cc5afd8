use postboard::context::RequestContext;
use postboard::error::Result;
use postboard::repository::{OrderDirection, Paginator, Query, Repository};
use postboard::responses::PageParams;

use crate::models::Post;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePostInput {
    pub account_id: String,
    pub title: String,
    pub body: String,
}

/// Post use cases
#[derive(Debug, Clone, Copy, Default)]
pub struct PostService;

impl PostService {
    pub async fn create_post<R: Repository<Post>>(
        &self,
        ctx: &RequestContext,
        input: CreatePostInput,
        repo: &R,
    ) -> Result<Post> {
        let post = Post::new(input.account_id, input.title, input.body);

        repo.create(ctx, post).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to create post");
            e.into()
        })
    }

    /// One page of an account's posts, newest first
    pub async fn list_account_posts<R: Repository<Post>>(
        &self,
        ctx: &RequestContext,
        account_id: &str,
        page: PageParams,
        repo: &R,
    ) -> Result<(Vec<Post>, Paginator)> {
        let query = Query::new()
            .filter("account_id = ?", [account_id])
            .order_by("created_at", OrderDirection::Descending)
            .order_by("id", OrderDirection::Descending);

        Ok(repo
            .find_many_paginated(ctx, query, page.page, page.per_page, &[])
            .await?)
    }

    pub async fn delete_post<R: Repository<Post>>(
        &self,
        ctx: &RequestContext,
        id: &str,
        repo: &R,
    ) -> Result<()> {
        let post = repo.find_one(ctx, Query::by_id(id), &[]).await?;
        repo.delete(ctx, &post).await?;

        tracing::debug!(post_id = %id, account_id = %post.account_id, "post deleted");
        Ok(())
    }
}
