use crate::opcode::{Opcode, OpcodeClass};

/// One decoded journal extract line.
///
/// Built once by [`crate::parse_line`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub opcode: &'static Opcode,
    /// Unix epoch seconds, `0` for placeholder Horolog values.
    pub timestamp: i64,
    pub header: SequenceHeader,
    pub body: RecordBody,
}

/// Sequence fields shared by every opcode class (fields 2-7).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceHeader {
    /// Raw field text; legacy writers occasionally put non-numeric ids here.
    pub transaction_num: String,
    pub update_num: i64,
    pub stream_num: i64,
    pub token_seq: i64,
    pub stream_seq: i64,
    pub journal_seq: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Mutation(Mutation),
    TransactionStart,
    TransactionCommit(TransactionMeta),
    Marker,
}

/// A write or removal of a single global node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mutation {
    pub node_update_num: i64,
    pub node_flags: i64,
    pub global: String,
    pub key: String,
    pub sub_keys: Vec<String>,
    /// Empty for removals.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionMeta {
    pub token_seq: i64,
    pub tag: String,
    pub partners: String,
}

impl DecodedRecord {
    /// Symbolic opcode name, e.g. `SET`.
    pub fn opcode_name(&self) -> &'static str {
        self.opcode.name
    }

    pub fn class(&self) -> OpcodeClass {
        self.opcode.class
    }

    pub fn mutation(&self) -> Option<&Mutation> {
        match &self.body {
            RecordBody::Mutation(mutation) => Some(mutation),
            _ => None,
        }
    }

    pub fn transaction_meta(&self) -> Option<&TransactionMeta> {
        match &self.body {
            RecordBody::TransactionCommit(meta) => Some(meta),
            _ => None,
        }
    }
}

/// Data-quality failures for a single extract line.
///
/// None of these are fatal to a line stream; callers count and skip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("truncated {opcode} record: expected at least {required} fields, found {found}")]
    TruncatedRecord {
        opcode: &'static str,
        required: usize,
        found: usize,
    },
    #[error("unknown opcode code: {0:?}")]
    UnknownOpcode(String),
    #[error("malformed node reference at byte {position}: {reason}")]
    MalformedNodeReference {
        position: usize,
        reason: &'static str,
    },
    #[error("horolog timestamp on day {days} is out of range")]
    TimestampOutOfRange { days: i64 },
}

/// Failure to project an already decoded record into JSON.
///
/// This is an invariant violation, not a data problem, and is kept apart from
/// [`ParseError`] so callers cannot mistake one for the other.
#[derive(Debug, thiserror::Error)]
#[error("failed to serialize {opcode} record: {source}")]
pub struct SerializeError {
    pub opcode: &'static str,
    #[source]
    pub source: serde_json::Error,
}
