//! Workflow module and the relationship links the synchronizer recognizes.

use crate::models::LinkDef;

pub const WORKFLOW_MODULE: &str = "WorkFlow";

/// Recognized link names. A definition key matching one of these is always
/// synced as a relationship, whatever module the record belongs to.
pub static WORKFLOW_LINKS: [LinkDef; 4] = [
    LinkDef {
        name: "trigger_filters",
        related_module: "WorkFlowTriggerShells",
        foreign_key: "parent_id",
        discriminator: Some(("frame_type", "Secondary")),
    },
    LinkDef {
        name: "triggers",
        related_module: "WorkFlowTriggerShells",
        foreign_key: "parent_id",
        discriminator: Some(("frame_type", "Primary")),
    },
    LinkDef {
        name: "alerts",
        related_module: "WorkFlowAlertShells",
        foreign_key: "parent_id",
        discriminator: None,
    },
    LinkDef {
        name: "actions",
        related_module: "WorkFlowActionShells",
        foreign_key: "parent_id",
        discriminator: None,
    },
];

pub fn find_link(name: &str) -> Option<&'static LinkDef> {
    WORKFLOW_LINKS.iter().find(|link| link.name == name)
}

pub fn is_link(name: &str) -> bool {
    find_link(name).is_some()
}
