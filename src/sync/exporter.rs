//! Export workflow records to definition files the importer can read back.

use serde_json::Value;
use std::path::{Path, PathBuf};

use super::document::{self, Document};
use super::error::SyncError;
use super::schema::{WORKFLOW_LINKS, WORKFLOW_MODULE};
use crate::db::RecordStore;
use crate::models::Record;

pub struct Exporter<'a> {
    store: &'a dyn RecordStore,
    directory: PathBuf,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a dyn RecordStore, directory: impl Into<PathBuf>) -> Self {
        Self {
            store,
            directory: directory.into(),
        }
    }

    /// Exports a single id, or every workflow when `id` is `None`. Returns
    /// the exported ids.
    pub async fn run(&self, id: Option<&str>) -> Result<Vec<String>, SyncError> {
        document::ensure_directory(&self.directory)?;

        match id {
            Some(id) => {
                self.export(id).await?;
                Ok(vec![id.to_string()])
            }
            None => self.export_all().await,
        }
    }

    pub async fn export_all(&self) -> Result<Vec<String>, SyncError> {
        let workflows = self.store.list(WORKFLOW_MODULE).await?;
        if workflows.is_empty() {
            println!("no workflows to export");
        }

        let mut ids = Vec::with_capacity(workflows.len());
        for workflow in &workflows {
            self.write_workflow(workflow).await?;
            ids.push(workflow.id.clone());
        }
        Ok(ids)
    }

    pub async fn export(&self, id: &str) -> Result<PathBuf, SyncError> {
        let workflow = self
            .store
            .retrieve(WORKFLOW_MODULE, id, false)
            .await?
            .ok_or_else(|| SyncError::RecordNotFound {
                module: WORKFLOW_MODULE.to_string(),
                id: id.to_string(),
            })?;

        self.write_workflow(&workflow).await
    }

    /// The workflow's fields plus one entry per non-empty link.
    pub async fn document_for(&self, workflow: &Record) -> Result<Document, SyncError> {
        let mut doc = workflow.to_document();

        for link in WORKFLOW_LINKS.iter() {
            let children = self.store.linked(workflow, link).await?;
            if children.is_empty() {
                continue;
            }

            let children: Document = children
                .into_iter()
                .map(|(id, child)| (id, Value::Object(child.to_document())))
                .collect();
            doc.insert(link.name.to_string(), Value::Object(children));
        }

        Ok(doc)
    }

    async fn write_workflow(&self, workflow: &Record) -> Result<PathBuf, SyncError> {
        println!("- Exporting {}", workflow);

        let doc = self.document_for(workflow).await?;
        let path = document::path_for(&self.directory, &workflow.id);
        document::write_file(&path, &doc)?;

        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, RecordRepository};
    use crate::models::FieldValue;
    use crate::sync::importer::{ImportSummary, Importer};
    use serde_json::json;
    use tempfile::TempDir;

    struct TestContext {
        repo: RecordRepository,
        dir: PathBuf,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            repo: RecordRepository::new(pool),
            dir: temp_dir.path().join("workflows"),
            _temp_dir: temp_dir,
        }
    }

    async fn seed(repo: &RecordRepository, record: Record) {
        let mut record = record;
        repo.save(&mut record).await.unwrap();
    }

    #[tokio::test]
    async fn test_export_writes_fields_and_links() {
        let ctx = setup().await;
        seed(
            &ctx.repo,
            Record::new_with_id("WorkFlow", "wf-1").with_field("name", "Escalate"),
        )
        .await;
        seed(
            &ctx.repo,
            Record::new_with_id("WorkFlowAlertShells", "a-1")
                .with_field("parent_id", "wf-1")
                .with_field("name", "Notify"),
        )
        .await;
        seed(
            &ctx.repo,
            Record::new_with_id("WorkFlowAlertShells", "a-2")
                .with_field("parent_id", "wf-1")
                .with_deleted(true),
        )
        .await;

        let exporter = Exporter::new(&ctx.repo, &ctx.dir);
        let path = exporter.export("wf-1").await.unwrap();

        let doc = document::read_file(&path).unwrap();
        assert_eq!(
            Value::Object(doc),
            json!({
                "id": "wf-1",
                "name": "Escalate",
                "alerts": {
                    "a-1": {"id": "a-1", "name": "Notify", "parent_id": "wf-1"}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_export_missing_workflow() {
        let ctx = setup().await;
        let exporter = Exporter::new(&ctx.repo, &ctx.dir);

        let err = exporter.run(Some("nope")).await.unwrap_err();
        assert!(matches!(err, SyncError::RecordNotFound { .. }));
        assert!(exporter.directory().is_dir());
    }

    #[tokio::test]
    async fn test_export_all_skips_deleted() {
        let ctx = setup().await;
        seed(&ctx.repo, Record::new_with_id("WorkFlow", "b")).await;
        seed(&ctx.repo, Record::new_with_id("WorkFlow", "a")).await;
        seed(&ctx.repo, Record::new_with_id("WorkFlow", "c").with_deleted(true)).await;

        let ids = Exporter::new(&ctx.repo, &ctx.dir).run(None).await.unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(document::list_ids(&ctx.dir).unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_export_then_import_is_synchronized() {
        let ctx = setup().await;
        seed(
            &ctx.repo,
            Record::new_with_id("WorkFlow", "wf-1")
                .with_field("name", "Escalate")
                .with_field("status", 1),
        )
        .await;
        seed(
            &ctx.repo,
            Record::new_with_id("WorkFlowTriggerShells", "t-1")
                .with_field("parent_id", "wf-1")
                .with_field("frame_type", "Primary")
                .with_field("field", FieldValue::Null),
        )
        .await;
        seed(
            &ctx.repo,
            Record::new_with_id("WorkFlowActionShells", "ac-1").with_field("parent_id", "wf-1"),
        )
        .await;

        Exporter::new(&ctx.repo, &ctx.dir).run(None).await.unwrap();
        let summary = Importer::new(&ctx.repo, &ctx.dir)
            .run(None, true)
            .await
            .unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                files: 1,
                created: 0,
                updated: 0,
                unchanged: 3,
                deleted: 0,
            }
        );
    }
}
