use std::io::Cursor;

use binrw::{binrw, BinRead, BinResult, BinWrite, Endian};

use crate::types::encode_be;

/// A raw attribute: name index plus undecoded payload.
#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct AttributeInfo {
    pub attribute_name_index: u16,
    pub attribute_length: u32,
    #[br(count = attribute_length)]
    pub info: Vec<u8>,
}

impl AttributeInfo {
    /// Encode `value` as the payload of an attribute named by `attribute_name_index`.
    pub fn encode<T>(attribute_name_index: u16, value: &T) -> BinResult<Self>
    where
        T: for<'a> BinWrite<Args<'a> = ()>,
    {
        let info = encode_be(value)?;
        Ok(AttributeInfo {
            attribute_name_index,
            attribute_length: info.len() as u32,
            info,
        })
    }

    /// Decode the payload as `T`.
    pub fn decode<T>(&self) -> BinResult<T>
    where
        T: for<'a> BinRead<Args<'a> = ()>,
    {
        T::read_options(&mut Cursor::new(&self.info), Endian::Big, ())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
#[brw(big)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// Payload of a `Code` attribute. `code` holds the encoded instruction stream.
#[derive(Clone, Debug)]
#[binrw]
#[brw(big)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_length: u32,
    #[br(count = code_length)]
    pub code: Vec<u8>,
    pub exception_table_length: u16,
    #[br(count = exception_table_length)]
    pub exception_table: Vec<ExceptionEntry>,
    pub attributes_count: u16,
    #[br(count = attributes_count)]
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        CodeAttribute {
            max_stack,
            max_locals,
            code_length: code.len() as u32,
            code,
            exception_table_length: 0,
            exception_table: Vec::new(),
            attributes_count: 0,
            attributes: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
#[brw(big)]
pub struct SignatureAttribute {
    pub signature_index: u16,
}

/// The SourceFile attribute is an optional fixed-length attribute in the attributes table of a ClassFile structure.
///
/// There may be at most one SourceFile attribute in the attributes table of a ClassFile structure.
/// [see more](https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html#jvms-4.7.10)
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[binrw]
#[brw(big)]
pub struct SourceFileAttribute {
    /// The value of the sourcefile_index item must be a valid index into the constant_pool table.
    /// The constant_pool entry at that index must be a CONSTANT_Utf8_info structure representing a string.
    pub sourcefile_index: u16,
}
