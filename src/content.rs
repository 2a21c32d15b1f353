//! Content model
//!
//! Every content type the CMS manages is described by a static resource
//! descriptor. Generic handlers and repositories work from these
//! descriptors instead of per-type code.

pub mod bulk;
pub mod field;
pub mod publish;
pub mod registry;
pub mod slug;

pub use bulk::{BulkAction, BulkOutcome};
pub use field::{FieldKind, SqlValue};
