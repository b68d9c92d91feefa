use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::validation::{self, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Article {
    pub id: i64,
    /// Author.
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewArticle {
    pub user_id: i64,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
}

impl Validate for NewArticle {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("user_id", self.user_id)?;
        validation::text("title", &self.title, 200)?;
        validation::text("body", &self.body, 100_000)
    }
}

impl Validate for ArticlePatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("title", self.title.as_deref(), 200)?;
        validation::opt_text("body", self.body.as_deref(), 100_000)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewTag {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct TagPatch {
    pub name: Option<String>,
}

impl Validate for NewTag {
    fn validate(&self) -> Result<(), AppError> {
        validation::text("name", &self.name, 50)
    }
}

impl Validate for TagPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("name", self.name.as_deref(), 50)
    }
}

/// Join record attaching a tag to an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ArticleTag {
    pub id: i64,
    pub article_id: i64,
    pub tag_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewArticleTag {
    pub article_id: i64,
    pub tag_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ArticleTagPatch {
    pub tag_id: Option<i64>,
}

impl Validate for NewArticleTag {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("article_id", self.article_id)?;
        validation::positive("tag_id", self.tag_id)
    }
}

impl Validate for ArticleTagPatch {
    fn validate(&self) -> Result<(), AppError> {
        match self.tag_id {
            Some(id) => validation::positive("tag_id", id),
            None => Ok(()),
        }
    }
}
