use sqlx::PgPool;

use crate::users::dto::UserUpdate;
use crate::users::repo_types::{NewUser, User};

impl User {
    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, department, title, active,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, department, title, active,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, department, title, active,
                   created_at, updated_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_department(db: &PgPool, department: &str) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, department, title, active,
                   created_at, updated_at
            FROM users
            WHERE department = $1
            ORDER BY id
            "#,
        )
        .bind(department)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_active(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, department, title, active,
                   created_at, updated_at
            FROM users
            WHERE active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, password_hash, department, title, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, full_name, password_hash, department, title, active,
                      created_at, updated_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .bind(&new.department)
        .bind(&new.title)
        .bind(new.active)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Patch semantics: absent fields are left untouched. The field changes
    /// and the `updated_at` stamp are one statement.
    pub async fn update(db: &PgPool, id: i64, patch: &UserUpdate) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name  = COALESCE($2, full_name),
                department = COALESCE($3, department),
                title      = COALESCE($4, title),
                active     = COALESCE($5, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, full_name, password_hash, department, title, active,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.full_name)
        .bind(&patch.department)
        .bind(&patch.title)
        .bind(patch.active)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Idempotent: an already-inactive user still matches and returns true.
    pub async fn soft_delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let result =
            sqlx::query("UPDATE users SET active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(db)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
