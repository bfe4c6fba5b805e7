use std::fmt;

use binrw::binrw;

#[derive(Clone, Debug, PartialEq)]
#[binrw]
#[brw(big)]
pub enum ConstantInfo {
    #[brw(magic = 1u8)]
    Utf8(Utf8Constant),
    #[brw(magic = 3u8)]
    Integer(IntegerConstant),
    #[brw(magic = 4u8)]
    Float(FloatConstant),
    #[brw(magic = 5u8)]
    Long(LongConstant),
    #[brw(magic = 6u8)]
    Double(DoubleConstant),
    #[brw(magic = 7u8)]
    Class(ClassConstant),
    #[brw(magic = 8u8)]
    String(StringConstant),
    #[brw(magic = 9u8)]
    FieldRef(FieldRefConstant),
    #[brw(magic = 10u8)]
    MethodRef(MethodRefConstant),
    #[brw(magic = 11u8)]
    InterfaceMethodRef(InterfaceMethodRefConstant),
    #[brw(magic = 12u8)]
    NameAndType(NameAndTypeConstant),
    #[brw(magic = 15u8)]
    MethodHandle(MethodHandleConstant),
    #[brw(magic = 16u8)]
    MethodType(MethodTypeConstant),
    #[brw(magic = 17u8)]
    Dynamic(DynamicConstant),
    #[brw(magic = 18u8)]
    InvokeDynamic(InvokeDynamicConstant),
    #[brw(magic = 19u8)]
    Module(ModuleConstant),
    #[brw(magic = 20u8)]
    Package(PackageConstant),
    // Placeholder for the slot after a Long or Double; never written.
    #[brw(magic = 0u8)]
    Unusable,
}

impl ConstantInfo {
    /// Long and Double constants occupy two pool indices.
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantInfo::Long(_) | ConstantInfo::Double(_))
    }
}

/// A `CONSTANT_Utf8_info`, stored in the JVM's modified UTF-8 encoding.
// `#[binrw]` must come first so the derives never see the temp `length` field.
#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utf8Constant {
    #[br(temp)]
    #[bw(calc = bytes.len() as u16)]
    length: u16,
    #[br(count = length)]
    pub bytes: Vec<u8>,
}

impl Utf8Constant {
    pub fn new(value: &str) -> Self {
        Utf8Constant {
            bytes: encode_modified_utf8(value),
        }
    }
}

impl fmt::Display for Utf8Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode_modified_utf8(&self.bytes))
    }
}

impl PartialEq<str> for Utf8Constant {
    fn eq(&self, other: &str) -> bool {
        self.bytes == encode_modified_utf8(other)
    }
}

/// NUL becomes `C0 80` and supplementary characters become surrogate pairs.
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | ((unit >> 6) & 0x1f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | ((unit >> 12) & 0x0f) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Malformed sequences decode to U+FFFD.
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xe0 == 0xc0 && i + 1 < bytes.len() {
            units.push(((b as u16 & 0x1f) << 6) | (bytes[i + 1] as u16 & 0x3f));
            i += 2;
        } else if b & 0xf0 == 0xe0 && i + 2 < bytes.len() {
            units.push(
                ((b as u16 & 0x0f) << 12)
                    | ((bytes[i + 1] as u16 & 0x3f) << 6)
                    | (bytes[i + 2] as u16 & 0x3f),
            );
            i += 3;
        } else {
            units.push(0xfffd);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct IntegerConstant {
    pub value: i32,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
pub struct FloatConstant {
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct LongConstant {
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq)]
#[binrw]
pub struct DoubleConstant {
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct ClassConstant {
    pub name_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct StringConstant {
    pub string_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct FieldRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct MethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct InterfaceMethodRefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct NameAndTypeConstant {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct MethodHandleConstant {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct MethodTypeConstant {
    pub descriptor_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct DynamicConstant {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct InvokeDynamicConstant {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct ModuleConstant {
    pub name_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[binrw]
pub struct PackageConstant {
    pub name_index: u16,
}
