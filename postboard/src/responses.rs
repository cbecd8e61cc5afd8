//! Success envelope and pagination query parameters shared by all handlers

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{error::Error, repository::Paginator};

/// Message carried by every successful response
pub const SUCCESS_MESSAGE: &str = "successful";

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `{"message": "successful", "data": ..., "pagination": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: &'static str,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Paginator>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            message: SUCCESS_MESSAGE,
            data,
            pagination: None,
        }
    }

    pub fn paginated(data: T, paginator: Paginator) -> Self {
        Self {
            message: SUCCESS_MESSAGE,
            data,
            pagination: Some(paginator),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawPageParams {
    #[serde(rename = "pageNumber")]
    page_number: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
}

/// `pageNumber` / `pageSize` query parameters
///
/// Missing values fall back to page 1 of 10; sizes above 100 are capped.
/// Values that are not integers are rejected with 400. Zero and negative
/// values pass through and are clamped by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub per_page: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageParams {
    fn parse(raw: RawPageParams) -> Result<Self, Error> {
        let page = match non_empty(raw.page_number) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| Error::BadRequest("page number must be a number".to_string()))?,
            None => DEFAULT_PAGE,
        };

        let per_page = match non_empty(raw.page_size) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| Error::BadRequest("page size must be a number".to_string()))?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            page,
            per_page: per_page.min(MAX_PAGE_SIZE),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for PageParams
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawPageParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?;

        Self::parse(raw)
    }
}
