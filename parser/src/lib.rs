// Parser crate for GT.M journal extract lines
// Decodes one line at a time into a CDC record; everything here is pure

pub mod types;
pub mod opcode;
pub mod horolog;
pub mod node_ref;
pub mod record;
pub mod serialize;

// Re-export main types
pub use types::*;
pub use opcode::{Opcode, OpcodeClass, OPCODE_TABLE};
pub use horolog::horolog_to_unix;
pub use node_ref::NodeReference;
pub use record::parse_line;
pub use serialize::CdcEvent;
