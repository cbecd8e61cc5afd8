//! Request bodies and their validation

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use postboard::error::Error;

use crate::models::Address;
use crate::services::{CreateAccountInput, CreatePostInput};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

const MAX_NAME_CHARS: usize = 200;
const MAX_EMAIL_CHARS: usize = 100;
const MAX_TITLE_CHARS: usize = 200;

/// Collects field errors and reports them all at once
#[derive(Debug, Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.0.push(format!("{field}: {message}"));
        }
    }

    fn length(&mut self, value: &str, field: &str, max: usize) {
        let chars = value.trim().chars().count();
        self.check(
            (1..=max).contains(&chars),
            field,
            &format!("must be between 1 and {max} characters"),
        );
    }

    fn required(&mut self, value: &str, field: &str) {
        self.check(!value.trim().is_empty(), field, "is required");
    }

    fn finish(self) -> Result<(), Error> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationError(self.0.join("; ")))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressRequest {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    pub username: Option<String>,
    pub address: Option<AddressRequest>,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<CreateAccountInput, Error> {
        let mut errors = FieldErrors::default();

        errors.length(&self.full_name, "full_name", MAX_NAME_CHARS);
        let email = self.email.trim();
        errors.check(
            email.chars().count() <= MAX_EMAIL_CHARS && EMAIL_PATTERN.is_match(email),
            "email",
            "must be a valid email address of at most 100 characters",
        );

        match &self.address {
            Some(address) => {
                errors.required(&address.street, "address.street");
                errors.required(&address.city, "address.city");
                errors.required(&address.state, "address.state");
                errors.required(&address.zipcode, "address.zipcode");
            }
            None => errors.check(false, "address", "is required"),
        }

        errors.finish()?;
        let address = self.address.unwrap_or_default();

        Ok(CreateAccountInput {
            full_name: self.full_name.trim().to_string(),
            email: email.to_string(),
            username: self
                .username
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            address: Address::new(
                address.street.trim(),
                address.city.trim(),
                address.state.trim(),
                address.zipcode.trim(),
            ),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user_id: String,
}

impl CreatePostRequest {
    pub fn validate(self) -> Result<CreatePostInput, Error> {
        let mut errors = FieldErrors::default();

        errors.length(&self.title, "title", MAX_TITLE_CHARS);
        errors.required(&self.body, "body");
        errors.required(&self.user_id, "user_id");

        errors.finish()?;

        Ok(CreatePostInput {
            account_id: self.user_id.trim().to_string(),
            title: self.title.trim().to_string(),
            body: self.body,
        })
    }
}

/// `user_id` query parameter of `GET /posts`
#[derive(Debug, Clone, Deserialize)]
pub struct PostsFilter {
    #[serde(default)]
    pub user_id: String,
}
