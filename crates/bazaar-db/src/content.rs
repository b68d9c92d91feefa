use bazaar_core::models::{
    Article, ArticlePatch, ArticleTag, ArticleTagPatch, NewArticle, NewArticleTag, NewTag, Tag,
    TagPatch,
};
use bazaar_core::{AppError, CrudStore, Page, PageRequest};

use crate::support::{self, map_db_error, repository};

repository!(ArticleRepository => "articles");

impl ArticleRepository {
    /// Published articles, newest first.
    pub async fn published(&self, page: PageRequest) -> Result<Page<Article>, AppError> {
        let page = page.normalized();
        let items = sqlx::query_as::<_, Article>(
            r#"
            SELECT * FROM articles
            WHERE published
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE published")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(Page::new(items, page, total))
    }
}

impl CrudStore for ArticleRepository {
    type Entity = Article;
    type Create = NewArticle;
    type Update = ArticlePatch;

    const RESOURCE: &'static str = "article";

    async fn list(&self, page: PageRequest) -> Result<Page<Article>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Article>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewArticle) -> Result<Article, AppError> {
        sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (user_id, title, body, published)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.user_id)
        .bind(&input.title)
        .bind(&input.body)
        .bind(input.published)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &ArticlePatch) -> Result<Option<Article>, AppError> {
        sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET title = COALESCE($2, title),
                body = COALESCE($3, body),
                published = COALESCE($4, published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.body)
        .bind(patch.published)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Article>, AppError> {
        support::search_page(&self.pool, Self::TABLE, &["title"], query, page).await
    }
}

repository!(TagRepository => "tags");

impl CrudStore for TagRepository {
    type Entity = Tag;
    type Create = NewTag;
    type Update = TagPatch;

    const RESOURCE: &'static str = "tag";

    async fn list(&self, page: PageRequest) -> Result<Page<Tag>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Tag>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewTag) -> Result<Tag, AppError> {
        sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING *")
            .bind(&input.name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &TagPatch) -> Result<Option<Tag>, AppError> {
        sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags
            SET name = COALESCE($2, name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Tag>, AppError> {
        support::search_page(&self.pool, Self::TABLE, &["name"], query, page).await
    }

    async fn find_conflict(&self, input: &NewTag) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE name = $1)")
            .bind(&input.name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(taken.then(|| format!("tag {} already exists", input.name)))
    }
}

repository!(ArticleTagRepository => "article_tags");

impl CrudStore for ArticleTagRepository {
    type Entity = ArticleTag;
    type Create = NewArticleTag;
    type Update = ArticleTagPatch;

    const RESOURCE: &'static str = "article tag";

    async fn list(&self, page: PageRequest) -> Result<Page<ArticleTag>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<ArticleTag>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewArticleTag) -> Result<ArticleTag, AppError> {
        sqlx::query_as::<_, ArticleTag>(
            "INSERT INTO article_tags (article_id, tag_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(input.article_id)
        .bind(input.tag_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(
        &self,
        id: i64,
        patch: &ArticleTagPatch,
    ) -> Result<Option<ArticleTag>, AppError> {
        sqlx::query_as::<_, ArticleTag>(
            r#"
            UPDATE article_tags
            SET tag_id = COALESCE($2, tag_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.tag_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewArticleTag) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM article_tags WHERE article_id = $1 AND tag_id = $2)",
        )
        .bind(input.article_id)
        .bind(input.tag_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| {
            format!(
                "article {} is already tagged with {}",
                input.article_id, input.tag_id
            )
        }))
    }
}
