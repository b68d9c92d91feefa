use bazaar_core::models::{
    Address, AddressPatch, NewAddress, NewReview, NewRole, NewUserAction, NewUserRecord,
    NewUserRole, NewUserWishlist, Review, ReviewPatch, Role, RolePatch, User, UserAction,
    UserActionPatch, UserRecordPatch, UserRole, UserRolePatch, UserWishlist, UserWishlistPatch,
};
use bazaar_core::{AppError, CrudStore, Page, PageRequest, UserDirectory, UserScoped};

use crate::support::{self, map_db_error, repository};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

repository!(
    /// Raw account records. Passwords arrive here already hashed; wrap in
    /// `bazaar_core::services::UserAccounts` to accept plain-text input.
    UserRepository => "users"
);

impl CrudStore for UserRepository {
    type Entity = User;
    type Create = NewUserRecord;
    type Update = UserRecordPatch;

    const RESOURCE: &'static str = "user";

    async fn list(&self, page: PageRequest) -> Result<Page<User>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewUserRecord) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, phone, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.full_name)
        .bind(&input.phone)
        .bind(input.active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &UserRecordPatch) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                full_name = COALESCE($4, full_name),
                phone = COALESCE($5, phone),
                active = COALESCE($6, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.email)
        .bind(&patch.password_hash)
        .bind(&patch.full_name)
        .bind(&patch.phone)
        .bind(patch.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<User>, AppError> {
        support::search_page(&self.pool, Self::TABLE, &["email", "full_name"], query, page).await
    }

    async fn find_conflict(&self, input: &NewUserRecord) -> Result<Option<String>, AppError> {
        Ok(self
            .find_by_email(&input.email)
            .await?
            .map(|_| format!("email {} is already registered", input.email)))
    }
}

impl UserDirectory for UserRepository {
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        self.get(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, AppError> {
        sqlx::query_scalar(
            r#"
            SELECT r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn create_with_role(&self, user: &NewUserRecord, role: &str) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, phone, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.active)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let granted = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
        )
        .bind(created.id)
        .bind(role)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if granted.rows_affected() == 0 {
            return Err(AppError::ConfigError(format!(
                "role {role} does not exist; run the migrations first"
            )));
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// Role / UserRole
// ---------------------------------------------------------------------------

repository!(RoleRepository => "roles");

impl CrudStore for RoleRepository {
    type Entity = Role;
    type Create = NewRole;
    type Update = RolePatch;

    const RESOURCE: &'static str = "role";

    async fn list(&self, page: PageRequest) -> Result<Page<Role>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Role>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewRole) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &RolePatch) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewRole) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1)")
            .bind(&input.name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(taken.then(|| format!("role {} already exists", input.name)))
    }
}

repository!(UserRoleRepository => "user_roles");

impl UserRoleRepository {
    /// Grant a role by name. Granting a role the user already holds is a no-op.
    pub async fn grant(&self, user_id: i64, role: &str) -> Result<(), AppError> {
        let granted = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE name = $2
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1)")
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        if !exists {
            return Err(AppError::NotFound(format!("role {role} not found")));
        }

        tracing::debug!(user_id, role, added = granted.rows_affected(), "role granted");
        Ok(())
    }
}

impl CrudStore for UserRoleRepository {
    type Entity = UserRole;
    type Create = NewUserRole;
    type Update = UserRolePatch;

    const RESOURCE: &'static str = "user role";

    async fn list(&self, page: PageRequest) -> Result<Page<UserRole>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<UserRole>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewUserRole) -> Result<UserRole, AppError> {
        sqlx::query_as::<_, UserRole>(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(input.user_id)
        .bind(input.role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &UserRolePatch) -> Result<Option<UserRole>, AppError> {
        sqlx::query_as::<_, UserRole>(
            r#"
            UPDATE user_roles
            SET role_id = COALESCE($2, role_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.role_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewUserRole) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = $1 AND role_id = $2)",
        )
        .bind(input.user_id)
        .bind(input.role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| {
            format!(
                "user {} already holds role {}",
                input.user_id, input.role_id
            )
        }))
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

repository!(AddressRepository => "addresses");

impl CrudStore for AddressRepository {
    type Entity = Address;
    type Create = NewAddress;
    type Update = AddressPatch;

    const RESOURCE: &'static str = "address";

    async fn list(&self, page: PageRequest) -> Result<Page<Address>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Address>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewAddress) -> Result<Address, AppError> {
        sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses
                (user_id, line1, line2, city, region, postal_code, country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(input.user_id)
        .bind(&input.line1)
        .bind(&input.line2)
        .bind(&input.city)
        .bind(&input.region)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(input.is_default)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &AddressPatch) -> Result<Option<Address>, AppError> {
        sqlx::query_as::<_, Address>(
            r#"
            UPDATE addresses
            SET line1 = COALESCE($2, line1),
                line2 = COALESCE($3, line2),
                city = COALESCE($4, city),
                region = COALESCE($5, region),
                postal_code = COALESCE($6, postal_code),
                country = COALESCE($7, country),
                is_default = COALESCE($8, is_default),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.line1)
        .bind(&patch.line2)
        .bind(&patch.city)
        .bind(&patch.region)
        .bind(&patch.postal_code)
        .bind(&patch.country)
        .bind(patch.is_default)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }
}

impl UserScoped for AddressRepository {
    async fn list_for_user(&self, user_id: i64, page: PageRequest) -> Result<Page<Address>, AppError> {
        support::fetch_page_by(&self.pool, Self::TABLE, "user_id", user_id, page).await
    }
}

// ---------------------------------------------------------------------------
// UserWishlist
// ---------------------------------------------------------------------------

repository!(WishlistRepository => "user_wishlists");

impl WishlistRepository {
    /// Remove a product from a user's wishlist. Returns `false` when it was
    /// not there.
    pub async fn remove(&self, user_id: i64, product_id: i64) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM user_wishlists WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

impl CrudStore for WishlistRepository {
    type Entity = UserWishlist;
    type Create = NewUserWishlist;
    type Update = UserWishlistPatch;

    const RESOURCE: &'static str = "wishlist entry";

    async fn list(&self, page: PageRequest) -> Result<Page<UserWishlist>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<UserWishlist>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewUserWishlist) -> Result<UserWishlist, AppError> {
        sqlx::query_as::<_, UserWishlist>(
            "INSERT INTO user_wishlists (user_id, product_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(input.user_id)
        .bind(input.product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(
        &self,
        id: i64,
        patch: &UserWishlistPatch,
    ) -> Result<Option<UserWishlist>, AppError> {
        sqlx::query_as::<_, UserWishlist>(
            r#"
            UPDATE user_wishlists
            SET product_id = COALESCE($2, product_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewUserWishlist) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_wishlists WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(input.user_id)
        .bind(input.product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| format!("product {} is already on the wishlist", input.product_id)))
    }
}

impl UserScoped for WishlistRepository {
    async fn list_for_user(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<UserWishlist>, AppError> {
        support::fetch_page_by(&self.pool, Self::TABLE, "user_id", user_id, page).await
    }
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

repository!(ReviewRepository => "reviews");

impl ReviewRepository {
    pub async fn list_for_product(
        &self,
        product_id: i64,
        page: PageRequest,
    ) -> Result<Page<Review>, AppError> {
        support::fetch_page_by(&self.pool, Self::TABLE, "product_id", product_id, page).await
    }
}

impl CrudStore for ReviewRepository {
    type Entity = Review;
    type Create = NewReview;
    type Update = ReviewPatch;

    const RESOURCE: &'static str = "review";

    async fn list(&self, page: PageRequest) -> Result<Page<Review>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Review>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewReview) -> Result<Review, AppError> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, product_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.user_id)
        .bind(input.product_id)
        .bind(input.rating)
        .bind(&input.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &ReviewPatch) -> Result<Option<Review>, AppError> {
        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.rating)
        .bind(&patch.comment)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewReview) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(input.user_id)
        .bind(input.product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| {
            format!(
                "user {} has already reviewed product {}",
                input.user_id, input.product_id
            )
        }))
    }
}

// ---------------------------------------------------------------------------
// UserAction
// ---------------------------------------------------------------------------

repository!(UserActionRepository => "user_actions");

impl CrudStore for UserActionRepository {
    type Entity = UserAction;
    type Create = NewUserAction;
    type Update = UserActionPatch;

    const RESOURCE: &'static str = "user action";

    async fn list(&self, page: PageRequest) -> Result<Page<UserAction>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<UserAction>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewUserAction) -> Result<UserAction, AppError> {
        sqlx::query_as::<_, UserAction>(
            "INSERT INTO user_actions (user_id, name, detail) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(input.user_id)
        .bind(&input.name)
        .bind(&input.detail)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(
        &self,
        id: i64,
        patch: &UserActionPatch,
    ) -> Result<Option<UserAction>, AppError> {
        sqlx::query_as::<_, UserAction>(
            r#"
            UPDATE user_actions
            SET name = COALESCE($2, name),
                detail = COALESCE($3, detail),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.detail)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewUserAction) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_actions WHERE user_id = $1 AND name = $2)",
        )
        .bind(input.user_id)
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| {
            format!(
                "user {} already has an action named {}",
                input.user_id, input.name
            )
        }))
    }
}
