use serde::Serialize;

use crate::{DecodedRecord, SerializeError};

/// Wire shape of a CDC event. Field order is the published key order.
#[derive(Debug, Serialize)]
pub struct CdcEvent<'a> {
    pub operand: &'a str,
    pub transaction_num: &'a str,
    pub token_seq: i64,
    pub update_num: i64,
    pub stream_num: i64,
    pub stream_seq: i64,
    pub journal_seq: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscripts: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_values: Option<&'a [String]>,
    pub time_stamp: i64,
}

impl<'a> From<&'a DecodedRecord> for CdcEvent<'a> {
    fn from(rec: &'a DecodedRecord) -> Self {
        let mutation = rec.mutation();
        CdcEvent {
            operand: rec.opcode.name,
            transaction_num: &rec.header.transaction_num,
            token_seq: rec.header.token_seq,
            update_num: rec.header.update_num,
            stream_num: rec.header.stream_num,
            stream_seq: rec.header.stream_seq,
            journal_seq: rec.header.journal_seq,
            global: mutation.map(|m| m.global.as_str()),
            key: mutation.map(|m| m.key.as_str()),
            subscripts: mutation.map(|m| m.sub_keys.as_slice()),
            node_values: mutation.map(|m| m.values.as_slice()),
            time_stamp: rec.timestamp,
        }
    }
}

impl DecodedRecord {
    pub fn to_event(&self) -> CdcEvent<'_> {
        CdcEvent::from(self)
    }

    /// Compact JSON text of the CDC event for this record.
    pub fn to_json(&self) -> Result<String, SerializeError> {
        serde_json::to_string(&self.to_event()).map_err(|source| SerializeError {
            opcode: self.opcode.name,
            source,
        })
    }
}
