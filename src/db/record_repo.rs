use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;

use super::store::{RecordStore, StoreError};
use crate::models::{FieldValue, LinkDef, Record};

/// SQLite-backed record store.
pub struct RecordRepository {
    pool: SqlitePool,
}

// Row types for database queries
#[derive(sqlx::FromRow)]
struct RecordRow {
    module: String,
    id: String,
    deleted: bool,
    date_modified: String,
}

#[derive(sqlx::FromRow)]
struct FieldRow {
    name: String,
    value: String,
}

impl RecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn hydrate_record(&self, row: RecordRow) -> Result<Record, StoreError> {
        let fields: Vec<FieldRow> =
            sqlx::query_as("SELECT name, value FROM record_fields WHERE module = ? AND record_id = ?")
                .bind(&row.module)
                .bind(&row.id)
                .fetch_all(&self.pool)
                .await?;

        tracing::trace!("Hydrating {} {} (modified {})", row.module, row.id, row.date_modified);
        let mut record = Record::existing(row.module, row.id).with_deleted(row.deleted);

        for field in fields {
            let value: FieldValue =
                serde_json::from_str(&field.value).map_err(|source| StoreError::Value {
                    field: field.name.clone(),
                    source,
                })?;
            record.fields.insert(field.name, value);
        }

        Ok(record)
    }

    async fn hydrate_all(&self, rows: Vec<RecordRow>) -> Result<Vec<Record>, StoreError> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.hydrate_record(row).await?);
        }
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for RecordRepository {
    async fn retrieve(
        &self,
        module: &str,
        id: &str,
        include_deleted: bool,
    ) -> Result<Option<Record>, StoreError> {
        let sql = if include_deleted {
            "SELECT module, id, deleted, date_modified FROM records WHERE module = ? AND id = ?"
        } else {
            "SELECT module, id, deleted, date_modified FROM records WHERE module = ? AND id = ? AND deleted = 0"
        };

        let row: Option<RecordRow> = sqlx::query_as(sql)
            .bind(module)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => self.hydrate_record(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &mut Record) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO records (module, id, deleted, date_modified)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(module, id) DO UPDATE
            SET deleted = excluded.deleted, date_modified = excluded.date_modified
            "#,
        )
        .bind(&record.module)
        .bind(&record.id)
        .bind(record.deleted)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        // Replace fields
        sqlx::query("DELETE FROM record_fields WHERE module = ? AND record_id = ?")
            .bind(&record.module)
            .bind(&record.id)
            .execute(&mut *tx)
            .await?;

        for (name, value) in &record.fields {
            let encoded = serde_json::to_string(value).map_err(|source| StoreError::Value {
                field: name.clone(),
                source,
            })?;
            sqlx::query(
                "INSERT INTO record_fields (module, record_id, name, value) VALUES (?, ?, ?, ?)",
            )
            .bind(&record.module)
            .bind(&record.id)
            .bind(name)
            .bind(&encoded)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        record.new_with_id = false;
        Ok(())
    }

    async fn mark_deleted(&self, module: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE records SET deleted = 1, date_modified = ? WHERE module = ? AND id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(module)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn linked(
        &self,
        parent: &Record,
        link: &LinkDef,
    ) -> Result<BTreeMap<String, Record>, StoreError> {
        // Narrow by the stored encodings of the parent id, then apply the
        // loose membership check on hydrated records.
        let encoded = serde_json::to_string(&FieldValue::from(parent.id.as_str())).map_err(
            |source| StoreError::Value {
                field: link.foreign_key.to_string(),
                source,
            },
        )?;
        let mut candidates = vec![encoded];
        if let Ok(numeric) = parent.id.trim().parse::<i64>() {
            candidates.push(numeric.to_string());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT r.module, r.id, r.deleted, r.date_modified \
             FROM records r \
             JOIN record_fields f ON f.module = r.module AND f.record_id = r.id \
             WHERE r.deleted = 0 AND f.module = ",
        );
        query.push_bind(link.related_module);
        query.push(" AND f.name = ");
        query.push_bind(link.foreign_key);
        query.push(" AND f.value IN (");
        let mut separated = query.separated(", ");
        for candidate in &candidates {
            separated.push_bind(candidate.as_str());
        }
        separated.push_unseparated(")");
        query.push(" ORDER BY r.id");

        let rows: Vec<RecordRow> = query.build_query_as().fetch_all(&self.pool).await?;

        let children = self
            .hydrate_all(rows)
            .await?
            .into_iter()
            .filter(|child| link.is_member(&parent.id, child))
            .map(|child| (child.id.clone(), child))
            .collect();

        Ok(children)
    }

    async fn ids_not_in(&self, module: &str, ids: &[String]) -> Result<Vec<String>, StoreError> {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT id FROM records WHERE deleted = 0 AND module = ");
        query.push_bind(module);

        if !ids.is_empty() {
            query.push(" AND id NOT IN (");
            let mut separated = query.separated(", ");
            for id in ids {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
        }
        query.push(" ORDER BY id");

        let rows: Vec<(String,)> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list(&self, module: &str) -> Result<Vec<Record>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT module, id, deleted, date_modified FROM records WHERE module = ? AND deleted = 0 ORDER BY id",
        )
        .bind(module)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    struct TestContext {
        repo: RecordRepository,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_repo() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(&db_path).await.unwrap();
        TestContext {
            repo: RecordRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    const ALERTS: LinkDef = LinkDef {
        name: "alerts",
        related_module: "WorkFlowAlertShells",
        foreign_key: "parent_id",
        discriminator: None,
    };

    #[tokio::test]
    async fn test_save_and_retrieve() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut record = Record::new_with_id("WorkFlow", "wf-1")
            .with_field("name", "Escalate")
            .with_field("priority", 3)
            .with_field("active", true);
        repo.save(&mut record).await.unwrap();
        assert!(!record.new_with_id);

        let fetched = repo.retrieve("WorkFlow", "wf-1", false).await.unwrap().unwrap();
        assert!(!fetched.new_with_id);
        assert_eq!(fetched.get("name"), FieldValue::from("Escalate"));
        assert_eq!(fetched.get("priority"), FieldValue::from(3));
        assert_eq!(fetched.get("active"), FieldValue::from(true));
    }

    #[tokio::test]
    async fn test_retrieve_is_scoped_to_module() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut record = Record::new_with_id("WorkFlow", "shared-id");
        repo.save(&mut record).await.unwrap();

        assert!(repo
            .retrieve("WorkFlowAlertShells", "shared-id", true)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_fields() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut record = Record::new_with_id("WorkFlow", "wf-1")
            .with_field("name", "Old")
            .with_field("stale", "x");
        repo.save(&mut record).await.unwrap();

        record.fields.remove("stale");
        record.set("name", FieldValue::from("New"));
        repo.save(&mut record).await.unwrap();

        let fetched = repo.retrieve("WorkFlow", "wf-1", false).await.unwrap().unwrap();
        assert_eq!(fetched.get("name"), FieldValue::from("New"));
        assert!(!fetched.fields.contains_key("stale"));
    }

    #[tokio::test]
    async fn test_mark_deleted_hides_from_default_fetch() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut record = Record::new_with_id("WorkFlow", "wf-1").with_field("name", "Gone");
        repo.save(&mut record).await.unwrap();
        repo.mark_deleted("WorkFlow", "wf-1").await.unwrap();

        assert!(repo.retrieve("WorkFlow", "wf-1", false).await.unwrap().is_none());

        let deleted = repo.retrieve("WorkFlow", "wf-1", true).await.unwrap().unwrap();
        assert!(deleted.deleted);
        // Soft delete keeps the fields
        assert_eq!(deleted.get("name"), FieldValue::from("Gone"));
    }

    #[tokio::test]
    async fn test_linked_children() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        for (id, parent) in [("a-1", "wf-1"), ("a-2", "wf-1"), ("a-3", "wf-2")] {
            let mut child =
                Record::new_with_id("WorkFlowAlertShells", id).with_field("parent_id", parent);
            repo.save(&mut child).await.unwrap();
        }
        repo.mark_deleted("WorkFlowAlertShells", "a-2").await.unwrap();

        let parent = Record::existing("WorkFlow", "wf-1");
        let children = repo.linked(&parent, &ALERTS).await.unwrap();
        let ids: Vec<&str> = children.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a-1"]);
    }

    #[tokio::test]
    async fn test_linked_matches_numeric_foreign_key() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let mut child =
            Record::new_with_id("WorkFlowAlertShells", "a-1").with_field("parent_id", 7);
        repo.save(&mut child).await.unwrap();
        let mut other =
            Record::new_with_id("WorkFlowAlertShells", "a-2").with_field("parent_id", "70");
        repo.save(&mut other).await.unwrap();

        let parent = Record::existing("WorkFlow", "7");
        let children = repo.linked(&parent, &ALERTS).await.unwrap();
        let ids: Vec<&str> = children.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a-1"]);
    }

    #[tokio::test]
    async fn test_linked_ignores_prefix_parent_ids() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        for (id, parent) in [("a-1", "wf-1"), ("a-2", "wf-10")] {
            let mut child =
                Record::new_with_id("WorkFlowAlertShells", id).with_field("parent_id", parent);
            repo.save(&mut child).await.unwrap();
        }

        let parent = Record::existing("WorkFlow", "wf-1");
        let children = repo.linked(&parent, &ALERTS).await.unwrap();
        assert_eq!(children.len(), 1);
        assert!(children.contains_key("a-1"));
    }

    #[tokio::test]
    async fn test_ids_not_in() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        for id in ["1", "2", "3", "4"] {
            let mut record = Record::new_with_id("WorkFlow", id);
            repo.save(&mut record).await.unwrap();
        }
        repo.mark_deleted("WorkFlow", "4").await.unwrap();

        let ids = repo
            .ids_not_in("WorkFlow", &["1".to_string(), "2".to_string()])
            .await
            .unwrap();
        assert_eq!(ids, vec!["3"]);

        let all = repo.ids_not_in("WorkFlow", &[]).await.unwrap();
        assert_eq!(all, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_list_excludes_deleted() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        for id in ["b", "a", "c"] {
            let mut record = Record::new_with_id("WorkFlow", id);
            repo.save(&mut record).await.unwrap();
        }
        repo.mark_deleted("WorkFlow", "c").await.unwrap();

        let records = repo.list("WorkFlow").await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
