//! Synchronization between workflow definition files and the record store.
//!
//! # File Layout
//!
//! One `<id>.json` file per workflow. Keys are field names, except the
//! recognized link names, whose values map child ids to child fields:
//!
//! ```json
//! {
//!     "name": "Escalate overdue cases",
//!     "base_module": "Cases",
//!     "alerts": {
//!         "a-1": { "name": "Notify owner" }
//!     }
//! }
//! ```

pub mod document;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod schema;

pub use exporter::Exporter;
pub use importer::Importer;
