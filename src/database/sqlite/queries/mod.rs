#[cfg(test)]
mod tests;

use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

const SELECT_PAGE: &str = "SELECT id, page_id, title, status, chunk_count, content_complete, \
                           error_message, indexed_date, created_date FROM pages";

pub struct PageQueries;

impl PageQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_page: NewPage) -> Result<Page> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO pages (page_id, title, status, created_date) VALUES (?, ?, 'pending', ?)",
        )
        .bind(&new_page.page_id)
        .bind(&new_page.title)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create page")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created page"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Page>> {
        let query = format!("{SELECT_PAGE} WHERE id = ?");
        let result = sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get page by id")?;

        Ok(result)
    }

    #[inline]
    pub async fn get_by_page_id(pool: &SqlitePool, page_id: &str) -> Result<Option<Page>> {
        let query = format!("{SELECT_PAGE} WHERE page_id = ?");
        let result = sqlx::query_as::<_, Page>(&query)
            .bind(page_id)
            .fetch_optional(pool)
            .await
            .context("Failed to get page by page id")?;

        Ok(result)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Page>> {
        let query = format!("{SELECT_PAGE} ORDER BY created_date DESC");
        let pages = sqlx::query_as::<_, Page>(&query)
            .fetch_all(pool)
            .await
            .context("Failed to list all pages")?;

        Ok(pages)
    }

    #[inline]
    pub async fn list_by_status(pool: &SqlitePool, status: PageStatus) -> Result<Vec<Page>> {
        let query = format!("{SELECT_PAGE} WHERE status = ? ORDER BY created_date DESC");
        let pages = sqlx::query_as::<_, Page>(&query)
            .bind(status.as_str())
            .fetch_all(pool)
            .await
            .context("Failed to list pages by status")?;

        Ok(pages)
    }

    #[inline]
    pub async fn update(pool: &SqlitePool, id: i64, update: PageUpdate) -> Result<Option<Page>> {
        let mut query_parts = Vec::new();
        let mut query_values = Vec::new();

        if let Some(title) = update.title {
            query_parts.push("title = ?");
            query_values.push(title);
        }

        if let Some(status) = update.status {
            query_parts.push("status = ?");
            query_values.push(status.as_str().to_string());
            // A clean completion sheds whatever error an earlier run left behind
            if status == PageStatus::Completed && update.error_message.is_none() {
                query_parts.push("error_message = NULL");
            }
        }

        if let Some(chunk_count) = update.chunk_count {
            query_parts.push("chunk_count = ?");
            query_values.push(chunk_count.to_string());
        }

        if let Some(complete) = update.content_complete {
            query_parts.push("content_complete = ?");
            query_values.push(i64::from(complete).to_string());
        }

        if let Some(error) = update.error_message {
            query_parts.push("error_message = ?");
            query_values.push(error);
        }

        if let Some(indexed_date) = update.indexed_date {
            query_parts.push("indexed_date = ?");
            query_values.push(indexed_date.to_string());
        }

        if query_parts.is_empty() {
            return Self::get_by_id(pool, id).await;
        }

        let query_str = format!("UPDATE pages SET {} WHERE id = ?", query_parts.join(", "));

        let mut query = sqlx::query(&query_str);
        for value in query_values {
            query = query.bind(value);
        }
        query = query.bind(id);

        query.execute(pool).await.context("Failed to update page")?;

        Self::get_by_id(pool, id).await
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete page")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn count_chunks(pool: &SqlitePool) -> Result<i64> {
        let total: (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(chunk_count), 0) FROM pages WHERE status = 'completed'")
                .fetch_one(pool)
                .await
                .context("Failed to count chunks")?;

        Ok(total.0)
    }
}
