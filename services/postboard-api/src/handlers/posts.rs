use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use postboard::error::{Error, Result};
use postboard::responses::{ApiResponse, PageParams};

use crate::requests::{CreatePostRequest, PostsFilter};
use crate::services::{AccountService, PostService};
use crate::views::PostView;
use crate::AppState;

const INVALID_USER_ID: &str = "invalid user id";

/// `POST /posts`
///
/// The author must exist; an unknown `user_id` is a bad request.
pub async fn create_post(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<PostView>)> {
    let Json(request) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    let input = request.validate()?;
    let ctx = state.request_context();

    match AccountService
        .get_account(&ctx, &input.account_id, state.accounts())
        .await
    {
        Ok(_) => {}
        Err(Error::Repository(e)) if e.is_not_found() => {
            tracing::debug!(user_id = %input.account_id, "post for unknown account");
            return Err(Error::BadRequest(INVALID_USER_ID.to_string()));
        }
        Err(e) => return Err(e),
    }

    let post = PostService.create_post(&ctx, input, state.posts()).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(post.into())))
}

/// `GET /posts?user_id=&pageNumber=&pageSize=`
pub async fn list_posts(
    State(state): State<AppState>,
    filter: std::result::Result<Query<PostsFilter>, QueryRejection>,
    page: PageParams,
) -> Result<ApiResponse<Vec<PostView>>> {
    let Query(filter) = filter.map_err(|e| Error::BadRequest(e.body_text()))?;
    let user_id = filter.user_id.trim();
    if user_id.is_empty() {
        return Err(Error::BadRequest("user_id is required".to_string()));
    }

    let ctx = state.request_context();
    let (posts, paginator) = PostService
        .list_account_posts(&ctx, user_id, page, state.posts())
        .await?;

    Ok(ApiResponse::paginated(
        posts.into_iter().map(PostView::from).collect(),
        paginator,
    ))
}

/// `DELETE /posts/{id}`
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>> {
    let ctx = state.request_context();
    PostService.delete_post(&ctx, &id, state.posts()).await?;

    Ok(ApiResponse::ok(()))
}
