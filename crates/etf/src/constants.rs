//! Tag bytes of the external term format.

pub const FORMAT_VERSION: u8 = 131;

// zlib wrapper around a whole term
pub const COMPRESSED: u8 = 80;

pub const NEW_FLOAT_EXT: u8 = 70;
pub const BIT_BINARY_EXT: u8 = 77;
pub const NEW_PID_EXT: u8 = 88;
pub const NEW_PORT_EXT: u8 = 89;
pub const NEWER_REFERENCE_EXT: u8 = 90;
pub const SMALL_INTEGER_EXT: u8 = 97;
pub const INTEGER_EXT: u8 = 98;
// superseded by NEW_FLOAT_EXT, decode only
pub const FLOAT_EXT: u8 = 99;
pub const ATOM_EXT: u8 = 100;
// deprecated
pub const REFERENCE_EXT: u8 = 101;
pub const PORT_EXT: u8 = 102;
pub const PID_EXT: u8 = 103;
pub const SMALL_TUPLE_EXT: u8 = 104;
pub const LARGE_TUPLE_EXT: u8 = 105;
pub const NIL_EXT: u8 = 106;
pub const STRING_EXT: u8 = 107;
pub const LIST_EXT: u8 = 108;
pub const BINARY_EXT: u8 = 109;
pub const SMALL_BIG_EXT: u8 = 110;
pub const LARGE_BIG_EXT: u8 = 111;
pub const NEW_FUN_EXT: u8 = 112;
pub const EXPORT_EXT: u8 = 113;
pub const NEW_REFERENCE_EXT: u8 = 114;
pub const SMALL_ATOM_EXT: u8 = 115;
pub const FUN_EXT: u8 = 117;
pub const ATOM_UTF8_EXT: u8 = 118;
pub const SMALL_ATOM_UTF8_EXT: u8 = 119;

pub const MAX_ATOM_LEN: usize = u16::MAX as usize;
pub const MAX_STRING_EXT_LEN: usize = u16::MAX as usize;
pub const MAX_BINARY_LEN: usize = u32::MAX as usize;

/// Id words allowed by `REFERENCE_EXT`/`NEW_REFERENCE_EXT`.
pub const MAX_REFERENCE_WORDS: usize = 3;
/// Id words allowed by `NEWER_REFERENCE_EXT`.
pub const MAX_NEWER_REFERENCE_WORDS: usize = 5;

/// Human readable name of a tag, used in error messages.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        COMPRESSED => "COMPRESSED",
        NEW_FLOAT_EXT => "NEW_FLOAT_EXT",
        BIT_BINARY_EXT => "BIT_BINARY_EXT",
        NEW_PID_EXT => "NEW_PID_EXT",
        NEW_PORT_EXT => "NEW_PORT_EXT",
        NEWER_REFERENCE_EXT => "NEWER_REFERENCE_EXT",
        SMALL_INTEGER_EXT => "SMALL_INTEGER_EXT",
        INTEGER_EXT => "INTEGER_EXT",
        FLOAT_EXT => "FLOAT_EXT",
        ATOM_EXT => "ATOM_EXT",
        REFERENCE_EXT => "REFERENCE_EXT",
        PORT_EXT => "PORT_EXT",
        PID_EXT => "PID_EXT",
        SMALL_TUPLE_EXT => "SMALL_TUPLE_EXT",
        LARGE_TUPLE_EXT => "LARGE_TUPLE_EXT",
        NIL_EXT => "NIL_EXT",
        STRING_EXT => "STRING_EXT",
        LIST_EXT => "LIST_EXT",
        BINARY_EXT => "BINARY_EXT",
        SMALL_BIG_EXT => "SMALL_BIG_EXT",
        LARGE_BIG_EXT => "LARGE_BIG_EXT",
        NEW_FUN_EXT => "NEW_FUN_EXT",
        EXPORT_EXT => "EXPORT_EXT",
        NEW_REFERENCE_EXT => "NEW_REFERENCE_EXT",
        SMALL_ATOM_EXT => "SMALL_ATOM_EXT",
        FUN_EXT => "FUN_EXT",
        ATOM_UTF8_EXT => "ATOM_UTF8_EXT",
        SMALL_ATOM_UTF8_EXT => "SMALL_ATOM_UTF8_EXT",
        _ => "unknown",
    }
}
