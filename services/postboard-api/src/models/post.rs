use postboard::repository::{Entity, FilterValue, Metadata, SqlEntity};

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Post {
    #[sqlx(flatten)]
    pub metadata: Metadata,
    pub account_id: String,
    pub title: String,
    pub body: String,
}

impl Post {
    pub fn new(
        account_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }
}

impl Entity for Post {
    const NAME: &'static str = "Post";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl SqlEntity for Post {
    const TABLE: &'static str = "posts";
    const COLUMNS: &'static [&'static str] = &["account_id", "title", "body"];

    fn values(&self) -> Vec<FilterValue> {
        vec![
            self.account_id.clone().into(),
            self.title.clone().into(),
            self.body.clone().into(),
        ]
    }
}
