//! Import workflow definition files into the record store.
//!
//! Each `<id>.json` file is resolved to a `WorkFlow` record (created if
//! absent, undeleted if soft-deleted), its scalar fields are diff-applied
//! under loose equality, and every recognized link key is reconciled against
//! the children currently linked to the workflow. Children no longer named by
//! the file are soft-deleted.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::AddAssign;
use std::path::PathBuf;

use super::document::{self, Document};
use super::error::SyncError;
use super::schema::{find_link, is_link, WORKFLOW_MODULE};
use crate::db::RecordStore;
use crate::models::{FieldValue, LinkDef, Record, ID_FIELD};

/// How `find_record` resolved an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No row existed; the record was built in memory.
    New,
    Existing,
    /// The row was soft-deleted and has had its flag cleared.
    Undeleted,
}

/// Outcome of `save_record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Tally of what an import did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Definition files imported. Zero when the directory held none.
    pub files: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl ImportSummary {
    fn record(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Created => self.created += 1,
            SaveOutcome::Updated => self.updated += 1,
            SaveOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

impl AddAssign for ImportSummary {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.deleted += other.deleted;
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s): {} created, {} updated, {} already synchronized, {} deleted",
            self.files,
            self.created, self.updated, self.unchanged, self.deleted
        )
    }
}

/// One link reconciled, with deletion of unnamed children left to the caller.
struct LinkChanges {
    summary: ImportSummary,
    named: Vec<String>,
    stale: Vec<Record>,
}

pub struct Importer<'a> {
    store: &'a dyn RecordStore,
    directory: PathBuf,
    verbose: bool,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn RecordStore, directory: impl Into<PathBuf>) -> Self {
        Self {
            store,
            directory: directory.into(),
            verbose: false,
        }
    }

    /// Print every field assignment.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Imports a single id, or every file in the directory when `id` is
    /// `None`. `purge` only applies to the whole-directory case.
    pub async fn run(&self, id: Option<&str>, purge: bool) -> Result<ImportSummary, SyncError> {
        document::ensure_directory(&self.directory)?;

        match id {
            Some(id) => self.import(id).await,
            None => self.import_all(purge).await,
        }
    }

    pub fn list_ids(&self) -> Result<Vec<String>, SyncError> {
        document::list_ids(&self.directory)
    }

    /// Imports every file in listing order. The first failure aborts the
    /// remaining files.
    pub async fn import_all(&self, purge: bool) -> Result<ImportSummary, SyncError> {
        let ids = self.list_ids()?;
        let mut summary = ImportSummary::default();

        if ids.is_empty() {
            println!("no workflows to import");
        } else {
            for id in &ids {
                summary += self.import(id).await?;
            }
        }

        if purge {
            summary.deleted += self.purge(&ids).await?;
        }

        Ok(summary)
    }

    pub async fn import(&self, id: &str) -> Result<ImportSummary, SyncError> {
        let path = document::path_for(&self.directory, id);
        if !path.is_file() {
            return Err(SyncError::FileNotFound(path));
        }

        println!("- Importing {} with id {}", WORKFLOW_MODULE, id);

        let data = document::read_file(&path)?;
        let mut summary = ImportSummary {
            files: 1,
            ..ImportSummary::default()
        };

        let (mut workflow, resolution) = self.find_record(WORKFLOW_MODULE, id).await?;
        let changed = self.populate(&mut workflow, &data)?;
        let outcome = self
            .save_record(&mut workflow, changed || resolution == Resolution::Undeleted)
            .await?;
        summary.record(outcome);

        // A child dropped from one link may be named by another link on the
        // same module, so nothing is deleted until every link has run.
        let mut named = BTreeSet::new();
        let mut stale = BTreeMap::new();
        for (name, value) in &data {
            if let Some(link) = find_link(name) {
                let changes = self.reconcile_link(&workflow, link, value).await?;
                summary += changes.summary;
                for child_id in changes.named {
                    named.insert((link.related_module, child_id));
                }
                for record in changes.stale {
                    stale.insert((link.related_module, record.id.clone()), record);
                }
            }
        }

        for (key, record) in &stale {
            if !named.contains(key) {
                self.delete_record(record).await?;
                summary.deleted += 1;
            }
        }

        Ok(summary)
    }

    /// Reconciles one link of `parent` with the child definitions in `value`.
    pub async fn sync_link(
        &self,
        parent: &Record,
        link: &LinkDef,
        value: &Value,
    ) -> Result<ImportSummary, SyncError> {
        let mut changes = self.reconcile_link(parent, link, value).await?;
        for record in &changes.stale {
            self.delete_record(record).await?;
            changes.summary.deleted += 1;
        }
        Ok(changes.summary)
    }

    async fn reconcile_link(
        &self,
        parent: &Record,
        link: &LinkDef,
        value: &Value,
    ) -> Result<LinkChanges, SyncError> {
        let invalid = || SyncError::InvalidLink {
            link: link.name.to_string(),
            id: parent.id.clone(),
        };

        let empty = Document::new();
        let children = match value {
            Value::Object(children) => children,
            // An empty JSON array is how an empty map is often written
            Value::Array(items) if items.is_empty() => &empty,
            _ => return Err(invalid()),
        };

        let mut current = self.store.linked(parent, link).await?;
        tracing::debug!(
            "{} has {} linked record(s) in {}",
            parent,
            current.len(),
            link.name
        );

        let mut summary = ImportSummary::default();
        let mut named = Vec::with_capacity(children.len());
        for (child_id, child_value) in children {
            let fields = child_value.as_object().ok_or_else(invalid)?;

            let (mut child, resolution) = self.find_record(link.related_module, child_id).await?;
            current.remove(child_id);

            let mut changed = self.populate(&mut child, fields)?;
            changed |= link.attach(&mut child, &parent.id);
            changed |= resolution == Resolution::Undeleted;

            summary.record(self.save_record(&mut child, changed).await?);
            named.push(child.id);
        }

        Ok(LinkChanges {
            summary,
            named,
            stale: current.into_values().collect(),
        })
    }

    /// Fetches `id` in `module`, soft-deleted rows included.
    pub async fn find_record(
        &self,
        module: &str,
        id: &str,
    ) -> Result<(Record, Resolution), SyncError> {
        match self.store.retrieve(module, id, true).await? {
            None => Ok((Record::new_with_id(module, id), Resolution::New)),
            Some(mut record) if record.deleted => {
                record.deleted = false;
                Ok((record, Resolution::Undeleted))
            }
            Some(record) => Ok((record, Resolution::Existing)),
        }
    }

    /// Assigns every non-link field that differs from the record's current
    /// value. Returns true if anything changed. An `id` key must match the
    /// record's id; it never re-keys the record.
    pub fn populate(&self, record: &mut Record, data: &Document) -> Result<bool, SyncError> {
        let mut changed = false;

        for (name, value) in data {
            if is_link(name) {
                continue;
            }

            let value = FieldValue::from_json(value).ok_or_else(|| SyncError::UnsupportedValue {
                module: record.module.clone(),
                id: record.id.clone(),
                field: name.clone(),
            })?;

            if name == ID_FIELD {
                if !record.get(ID_FIELD).loose_eq(&value) {
                    return Err(SyncError::IdMismatch {
                        module: record.module.clone(),
                        id: record.id.clone(),
                        found: value.to_string(),
                    });
                }
                continue;
            }

            if !record.get(name).loose_eq(&value) {
                if self.verbose {
                    println!(
                        "   * updating field {} to {} on record with id {} in module {}",
                        name, value, record.id, record.module
                    );
                }
                record.set(name, value);
                changed = true;
            }
        }

        Ok(changed)
    }

    pub async fn save_record(
        &self,
        record: &mut Record,
        changed: bool,
    ) -> Result<SaveOutcome, SyncError> {
        if record.new_with_id {
            println!("   * creating {}", record);
            self.store.save(record).await?;
            Ok(SaveOutcome::Created)
        } else if changed {
            println!("   * updating {}", record);
            self.store.save(record).await?;
            Ok(SaveOutcome::Updated)
        } else {
            println!("   * {} is already synchronized", record);
            Ok(SaveOutcome::Unchanged)
        }
    }

    /// Soft-deletes every workflow whose id is not in `ids`.
    pub async fn purge(&self, ids: &[String]) -> Result<usize, SyncError> {
        let mut deleted = 0;

        for id in self.store.ids_not_in(WORKFLOW_MODULE, ids).await? {
            if let Some(workflow) = self.store.retrieve(WORKFLOW_MODULE, &id, false).await? {
                println!("- Deleting {}", workflow);
                self.store.mark_deleted(&workflow.module, &workflow.id).await?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    async fn delete_record(&self, record: &Record) -> Result<(), SyncError> {
        println!("   * deleting {}", record);
        self.store.mark_deleted(&record.module, &record.id).await?;
        Ok(())
    }
}
