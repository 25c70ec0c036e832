//! Category management service

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use shared::types::{PaginatedResponse, Pagination, Patch};
use shared::validation::{validate_max_len, validate_name};

use super::keyword_pattern;
use crate::error::{AppError, AppResult};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Category service
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CategoryService {
    /// Create a new CategoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List categories ordered by name, optionally filtered by a name keyword
    pub async fn list(
        &self,
        keyword: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Category>> {
        let pattern = keyword_pattern(keyword);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM category WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM category
            WHERE ($1::text IS NULL OR name ILIKE $1)
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(Category::from).collect(),
            pagination,
            total.max(0) as u64,
        ))
    }

    /// Get a category by ID
    pub async fn get(&self, category_id: Uuid) -> AppResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE id = $1"
        ))
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        Ok(row.into())
    }

    /// Create a new category
    pub async fn create(&self, input: CreateCategoryInput) -> AppResult<Category> {
        input.validate()?;
        validate_name(&input.name, 100).map_err(|msg| AppError::validation("name", msg))?;

        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            INSERT INTO category (name, description)
            VALUES ($1, $2)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "name"))?;

        tracing::info!(category_id = %row.id, "Category created");
        Ok(row.into())
    }

    /// Update a category
    pub async fn update(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> AppResult<Category> {
        let existing = self.get(category_id).await?;

        let name = match input.name {
            Patch::Unset => existing.name,
            Patch::Set(name) => name.trim().to_string(),
            Patch::Clear => return Err(AppError::validation("name", "name cannot be cleared")),
        };
        validate_name(&name, 100).map_err(|msg| AppError::validation("name", msg))?;

        let description = input.description.apply_to(existing.description);
        if let Some(description) = &description {
            validate_max_len(description, 255)
                .map_err(|msg| AppError::validation("description", msg))?;
        }

        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            UPDATE category
            SET name = $1, description = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&name)
        .bind(&description)
        .bind(category_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "name"))?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        Ok(row.into())
    }

    /// Delete a category. SKUs in it keep existing without a category.
    pub async fn delete(&self, category_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }

        tracing::info!(category_id = %category_id, "Category deleted");
        Ok(())
    }
}
