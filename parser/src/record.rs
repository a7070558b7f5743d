use crate::horolog::{horolog_to_unix, lenient_int};
use crate::node_ref::{parse_assignment, parse_reference, NodeReference};
use crate::opcode::{Opcode, OpcodeClass};
use crate::{DecodedRecord, Mutation, ParseError, RecordBody, SequenceHeader, TransactionMeta};

/// Field separator of journal extract lines.
pub const FIELD_DELIMITER: char = '\\';

/// Decode one journal extract line.
///
/// Splitting is positional; only the node expression of a mutation may
/// itself contain the delimiter, so everything from its first field on is
/// rejoined before it is handed to the node reference parser.
pub fn parse_line(line: &str) -> Result<DecodedRecord, ParseError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();

    let opcode = Opcode::from_code(fields[0])?;
    let required = opcode.class.min_fields();
    if fields.len() < required {
        return Err(ParseError::TruncatedRecord {
            opcode: opcode.name,
            required,
            found: fields.len(),
        });
    }

    let timestamp = horolog_to_unix(fields[1])?;
    let header = SequenceHeader {
        transaction_num: fields[2].trim().to_string(),
        update_num: lenient_int(fields[3]),
        stream_num: lenient_int(fields[4]),
        token_seq: lenient_int(fields[5]),
        stream_seq: lenient_int(fields[6]),
        journal_seq: lenient_int(fields[7]),
    };

    let body = match opcode.class {
        OpcodeClass::Update => {
            let node = parse_assignment(&node_expression(&fields))?;
            RecordBody::Mutation(mutation(&fields, node))
        }
        OpcodeClass::Removal => {
            let node = parse_reference(&node_expression(&fields))?;
            RecordBody::Mutation(mutation(&fields, node))
        }
        OpcodeClass::TransactionStart => RecordBody::TransactionStart,
        OpcodeClass::TransactionCommit => RecordBody::TransactionCommit(TransactionMeta {
            token_seq: header.token_seq,
            partners: fields[8].to_string(),
            tag: fields.get(9).map(|tag| tag.to_string()).unwrap_or_default(),
        }),
        OpcodeClass::Marker => RecordBody::Marker,
    };

    Ok(DecodedRecord {
        opcode,
        timestamp,
        header,
        body,
    })
}

fn node_expression(fields: &[&str]) -> String {
    fields[10..].join("\\")
}

fn mutation(fields: &[&str], node: NodeReference) -> Mutation {
    Mutation {
        node_update_num: lenient_int(fields[8]),
        node_flags: lenient_int(fields[9]),
        global: node.global,
        key: node.key,
        sub_keys: node.sub_keys,
        values: node.values,
    }
}
