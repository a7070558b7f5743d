//! Journal extract opcode table.
//!
//! The table is plain data: supporting another record type means adding a
//! row to [`OPCODE_TABLE`], the dispatcher only looks at [`OpcodeClass`].

use crate::ParseError;

/// Field layout family an opcode belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeClass {
    /// Node write, tail is `updnum\nodeflags\^G(k,...)="v|v|..."`.
    Update,
    /// Node removal, tail is `updnum\nodeflags\^G(k,...)`.
    Removal,
    TransactionStart,
    /// Tail is `partners\tag`.
    TransactionCommit,
    /// Header only.
    Marker,
}

impl OpcodeClass {
    /// Minimum number of `\`-separated fields a line of this class carries.
    pub const fn min_fields(self) -> usize {
        match self {
            OpcodeClass::Update | OpcodeClass::Removal => 11,
            OpcodeClass::TransactionCommit => 9,
            OpcodeClass::TransactionStart | OpcodeClass::Marker => HEADER_FIELDS,
        }
    }

    pub const fn is_mutation(self) -> bool {
        matches!(self, OpcodeClass::Update | OpcodeClass::Removal)
    }
}

/// Opcode, timestamp and the six sequence fields.
pub const HEADER_FIELDS: usize = 8;

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Opcode {
    pub code: &'static str,
    pub name: &'static str,
    pub class: OpcodeClass,
}

pub static OPCODE_TABLE: &[Opcode] = &[
    Opcode { code: "00", name: "NULL", class: OpcodeClass::Marker },
    Opcode { code: "04", name: "KILL", class: OpcodeClass::Removal },
    Opcode { code: "05", name: "SET", class: OpcodeClass::Update },
    Opcode { code: "06", name: "ZTSTART", class: OpcodeClass::TransactionStart },
    Opcode { code: "07", name: "ZTCOM", class: OpcodeClass::TransactionCommit },
    Opcode { code: "08", name: "TSTART", class: OpcodeClass::TransactionStart },
    Opcode { code: "09", name: "TCOM", class: OpcodeClass::TransactionCommit },
    Opcode { code: "10", name: "ZKILL", class: OpcodeClass::Removal },
];

impl Opcode {
    /// Resolve a numeric opcode code such as `"05"`.
    pub fn from_code(code: &str) -> Result<&'static Opcode, ParseError> {
        OPCODE_TABLE
            .iter()
            .find(|op| op.code == code)
            .ok_or_else(|| ParseError::UnknownOpcode(code.to_string()))
    }

    /// Resolve a symbolic name such as `"TCOM"`.
    pub fn from_name(name: &str) -> Option<&'static Opcode> {
        OPCODE_TABLE.iter().find(|op| op.name == name)
    }
}
