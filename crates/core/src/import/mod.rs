//! Deposit file normalization.
//!
//! Turns an already-tokenized tabular upload plus an explicit column→field
//! mapping into validated line items: header resolution, derived-field rules,
//! payment date parsing (ISO or Excel serial), and junk/summary row filtering.
//! File parsing mechanics (CSV/XLSX decoding) belong to the transport layer.

pub mod error;
pub mod normalize;
pub mod types;

pub use error::ImportError;
pub use normalize::{normalize, parse_payment_date};
pub use types::{ColumnMapping, DepositMetadata, ImportTable, NormalizedImport, NormalizedLine};
