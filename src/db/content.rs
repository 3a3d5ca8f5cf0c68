use super::models::{ContentItem, Tag};
use super::Db;
use crate::errors::{AppError, Result};
use crate::models::NewContentItem;

impl Db {
    pub async fn create_content_item(
        &self,
        text: &str,
        counterpart: &str,
        owner: i64,
        tags: &[String],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let item_id: i64 = sqlx::query_scalar(
            "INSERT INTO content_items (text, counterpart, owner, created_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(text)
        .bind(counterpart)
        .bind(owner)
        .bind(chrono::Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for tag in tags {
            let tag_id = Self::get_or_create_tag_tx(&mut tx, tag, owner).await?;
            sqlx::query(
                "INSERT INTO content_item_tags (content_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
            )
            .bind(item_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(item_id)
    }

    /// Bulk-load content items for one owner. Used by seeding and the import
    /// command; the whole batch lands atomically.
    pub async fn import_content(&self, owner: i64, items: &[NewContentItem]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            let item_id: i64 = sqlx::query_scalar(
                "INSERT INTO content_items (text, counterpart, owner, created_at) VALUES (?, ?, ?, ?) RETURNING id",
            )
            .bind(&item.text)
            .bind(&item.counterpart)
            .bind(owner)
            .bind(chrono::Utc::now())
            .fetch_one(&mut *tx)
            .await?;

            for tag in &item.tags {
                let tag_id = Self::get_or_create_tag_tx(&mut tx, tag, owner).await?;
                sqlx::query(
                    "INSERT INTO content_item_tags (content_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
                )
                .bind(item_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!("imported {} content items for owner {owner}", items.len());
        Ok(items.len())
    }

    pub async fn get_content_item(&self, item_id: i64) -> Result<ContentItem> {
        sqlx::query_as::<_, ContentItem>(
            "SELECT id, text, counterpart, owner FROM content_items WHERE id = ?",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("content item"))
    }

    /// The owner's pool, minus the items already attached to `exclude_task`.
    /// The exclusion is per-task: items attached elsewhere stay listed.
    pub async fn list_available_content(
        &self,
        owner: i64,
        exclude_task: Option<i64>,
    ) -> Result<Vec<ContentItem>> {
        let items = match exclude_task {
            Some(task_id) => {
                sqlx::query_as::<_, ContentItem>(
                    r#"
                    SELECT id, text, counterpart, owner FROM content_items
                    WHERE owner = ? AND id NOT IN (
                        SELECT content_id FROM content_attachments WHERE task_id = ?
                    )
                    ORDER BY id
                    "#,
                )
                .bind(owner)
                .bind(task_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ContentItem>(
                    "SELECT id, text, counterpart, owner FROM content_items WHERE owner = ? ORDER BY id",
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(items)
    }

    pub async fn mark_attached(&self, item_id: i64, task_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO content_attachments (content_id, task_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(item_id)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Items stay deletable only while no task references them; historical
    /// tasks must keep reading the content they were generated from.
    pub async fn delete_content_item(&self, item_id: i64) -> Result<()> {
        let attached: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM content_attachments WHERE content_id = ?)",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        if attached {
            return Err(AppError::Validation(
                "content item is referenced by a task and cannot be deleted".into(),
            ));
        }

        let deleted = sqlx::query("DELETE FROM content_items WHERE id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("content item"));
        }

        tracing::info!("deleted content item {item_id}");
        Ok(())
    }

    pub async fn get_or_create_tag(&self, name: &str, owner: i64) -> Result<Tag> {
        sqlx::query("INSERT INTO tags (name, owner) VALUES (?, ?) ON CONFLICT(name, owner) DO NOTHING")
            .bind(name)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        let tag = sqlx::query_as::<_, Tag>("SELECT id, name, owner FROM tags WHERE name = ? AND owner = ?")
            .bind(name)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(tag)
    }

    pub(super) async fn get_or_create_tag_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        name: &str,
        owner: i64,
    ) -> Result<i64> {
        sqlx::query("INSERT INTO tags (name, owner) VALUES (?, ?) ON CONFLICT(name, owner) DO NOTHING")
            .bind(name)
            .bind(owner)
            .execute(&mut **tx)
            .await?;

        let tag_id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE name = ? AND owner = ?")
            .bind(name)
            .bind(owner)
            .fetch_one(&mut **tx)
            .await?;

        Ok(tag_id)
    }

    pub async fn content_item_tags(&self, item_id: i64) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.owner FROM tags t
            JOIN content_item_tags ct ON ct.tag_id = t.id
            WHERE ct.content_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}
