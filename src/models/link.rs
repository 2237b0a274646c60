use super::field_value::FieldValue;
use super::record::Record;

/// A named one-to-many relationship from a parent record to child records of
/// a related module.
///
/// A child belongs to the link when its foreign key field equals the parent
/// id and, if the link has a discriminator, that field holds the expected
/// value. Several links may share one related module and differ only by
/// discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDef {
    pub name: &'static str,
    pub related_module: &'static str,
    pub foreign_key: &'static str,
    pub discriminator: Option<(&'static str, &'static str)>,
}

impl LinkDef {
    pub fn is_member(&self, parent_id: &str, child: &Record) -> bool {
        if child.module != self.related_module {
            return false;
        }
        if !child
            .get(self.foreign_key)
            .loose_eq(&FieldValue::from(parent_id))
        {
            return false;
        }
        match self.discriminator {
            Some((field, value)) => child.get(field).loose_eq(&FieldValue::from(value)),
            None => true,
        }
    }

    /// Points `child` at the parent. Returns true if any field had to change.
    pub fn attach(&self, child: &mut Record, parent_id: &str) -> bool {
        let mut changed = assign(child, self.foreign_key, FieldValue::from(parent_id));
        if let Some((field, value)) = self.discriminator {
            changed |= assign(child, field, FieldValue::from(value));
        }
        changed
    }
}

fn assign(record: &mut Record, field: &str, value: FieldValue) -> bool {
    if record.get(field).loose_eq(&value) {
        return false;
    }
    record.set(field, value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILTERS: LinkDef = LinkDef {
        name: "trigger_filters",
        related_module: "WorkFlowTriggerShells",
        foreign_key: "parent_id",
        discriminator: Some(("frame_type", "Secondary")),
    };

    #[test]
    fn test_membership_requires_foreign_key_and_discriminator() {
        let child = Record::existing("WorkFlowTriggerShells", "t-1")
            .with_field("parent_id", "wf-1")
            .with_field("frame_type", "Secondary");
        assert!(FILTERS.is_member("wf-1", &child));
        assert!(!FILTERS.is_member("wf-2", &child));

        let primary = child.clone().with_field("frame_type", "Primary");
        assert!(!FILTERS.is_member("wf-1", &primary));
    }

    #[test]
    fn test_membership_checks_module() {
        let child = Record::existing("WorkFlowAlertShells", "a-1")
            .with_field("parent_id", "wf-1")
            .with_field("frame_type", "Secondary");
        assert!(!FILTERS.is_member("wf-1", &child));
    }

    #[test]
    fn test_attach() {
        let mut child = Record::new_with_id("WorkFlowTriggerShells", "t-1");
        assert!(FILTERS.attach(&mut child, "wf-1"));
        assert!(FILTERS.is_member("wf-1", &child));

        // already attached
        assert!(!FILTERS.attach(&mut child, "wf-1"));
    }
}
