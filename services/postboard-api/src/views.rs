//! JSON shapes returned to clients

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Account, Address, Post};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    pub id: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl From<Address> for AddressView {
    fn from(address: Address) -> Self {
        Self {
            id: address.metadata.id,
            street: address.street,
            city: address.city,
            state: address.state,
            zip_code: address.zipcode,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub username: String,
    pub address: Option<AddressView>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.metadata.id,
            email: account.email,
            full_name: account.name,
            username: account.username,
            address: account.address.map(AddressView::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.metadata.id,
            user_id: post.account_id,
            title: post.title,
            body: post.body,
            created_at: post.metadata.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountView {
    pub count: u64,
}
