mod field_value;
mod link;
mod record;

pub use field_value::FieldValue;
pub use link::LinkDef;
pub use record::{Record, ID_FIELD};
