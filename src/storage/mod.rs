pub mod ledger;

pub use ledger::{sanitize_field, split_fields, LedgerFile, FIELD_SEPARATOR};
