use winnow::error::{ContextError, ErrMode, Needed};

uniffi::setup_scaffolding!();

pub mod convert;
pub mod ffi;
pub mod header;
pub mod ndef_type;
pub mod parser;
pub mod payload;
pub mod record;
pub mod writer;

pub use ndef_type::NdefType;
pub use parser::parse_message;
pub use record::NdefRecord;
pub use writer::encode_message;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NdefError {
    #[error("NDEF message is truncated, need {needed} more bytes")]
    Incomplete { needed: usize },

    #[error("error parsing the NDEF message: {0}")]
    Parse(String),

    #[error("record {field} is too long ({length} bytes)")]
    FieldTooLong { field: &'static str, length: usize },
}

impl From<ErrMode<ContextError>> for NdefError {
    fn from(error: ErrMode<ContextError>) -> Self {
        match error {
            ErrMode::Incomplete(Needed::Size(needed)) => Self::Incomplete { needed: needed.get() },
            ErrMode::Incomplete(Needed::Unknown) => Self::Incomplete { needed: 0 },
            error => Self::Parse(error.to_string()),
        }
    }
}
