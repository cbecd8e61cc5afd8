use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use postboard::error::{Error, Result};
use postboard::responses::{ApiResponse, PageParams};

use crate::requests::CreateUserRequest;
use crate::services::AccountService;
use crate::views::{AccountView, CountView};
use crate::AppState;

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<AccountView>)> {
    let Json(request) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    let input = request.validate()?;

    let ctx = state.request_context();
    let account = AccountService
        .create_account(&ctx, input, state.accounts())
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(account.into())))
}

/// `GET /users?pageNumber=&pageSize=`
pub async fn list_users(
    State(state): State<AppState>,
    page: PageParams,
) -> Result<ApiResponse<Vec<AccountView>>> {
    let ctx = state.request_context();
    let (accounts, paginator) = AccountService
        .list_accounts(&ctx, page, state.accounts())
        .await?;

    Ok(ApiResponse::paginated(
        accounts.into_iter().map(AccountView::from).collect(),
        paginator,
    ))
}

/// `GET /users/count`
pub async fn count_users(State(state): State<AppState>) -> Result<ApiResponse<CountView>> {
    let ctx = state.request_context();
    let count = AccountService
        .count_accounts(&ctx, state.accounts())
        .await?;

    Ok(ApiResponse::ok(CountView { count }))
}

/// `GET /users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<AccountView>> {
    let ctx = state.request_context();
    let account = AccountService
        .get_account(&ctx, &id, state.accounts())
        .await?;

    Ok(ApiResponse::ok(account.into()))
}
