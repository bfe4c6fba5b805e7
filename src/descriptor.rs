//! JVM type descriptor and method descriptor model.

use std::fmt;

/// Represents an erased JVM type from a descriptor string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum JvmType {
    Int,
    Long,
    Float,
    Double,
    Byte,
    Char,
    Short,
    Boolean,
    Void,
    Reference(String),
    Array(Box<JvmType>),
}

/// Which family of load/return instructions moves a value of a given type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpcodeClass {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl JvmType {
    pub fn object() -> Self {
        JvmType::Reference("java/lang/Object".into())
    }

    pub fn string() -> Self {
        JvmType::Reference("java/lang/String".into())
    }

    pub fn reference(internal_name: impl Into<String>) -> Self {
        JvmType::Reference(internal_name.into())
    }

    /// Returns true if this type occupies two slots on the JVM stack.
    pub fn is_wide(&self) -> bool {
        matches!(self, JvmType::Long | JvmType::Double)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JvmType::Reference(_) | JvmType::Array(_))
    }

    /// Either `boolean` or `java.lang.Boolean`.
    pub fn is_boolean(&self) -> bool {
        match self {
            JvmType::Boolean => true,
            JvmType::Reference(name) => name == "java/lang/Boolean",
            _ => false,
        }
    }

    /// Number of local-variable or operand-stack slots a value takes.
    pub fn slot_width(&self) -> u16 {
        match self {
            JvmType::Void => 0,
            JvmType::Long | JvmType::Double => 2,
            _ => 1,
        }
    }

    /// `None` for `void`, which has no load or store form.
    pub fn opcode_class(&self) -> Option<OpcodeClass> {
        match self {
            JvmType::Void => None,
            JvmType::Boolean | JvmType::Byte | JvmType::Char | JvmType::Short | JvmType::Int => {
                Some(OpcodeClass::Int)
            }
            JvmType::Long => Some(OpcodeClass::Long),
            JvmType::Float => Some(OpcodeClass::Float),
            JvmType::Double => Some(OpcodeClass::Double),
            JvmType::Reference(_) | JvmType::Array(_) => Some(OpcodeClass::Reference),
        }
    }

    /// Name usable in a `CONSTANT_Class` entry: the internal name for classes,
    /// the full descriptor for arrays.
    pub fn class_constant_name(&self) -> Option<String> {
        match self {
            JvmType::Reference(name) => Some(name.clone()),
            JvmType::Array(_) => Some(self.to_descriptor()),
            _ => None,
        }
    }

    /// Returns the JVM descriptor string for this type.
    pub fn to_descriptor(&self) -> String {
        match self {
            JvmType::Int => "I".into(),
            JvmType::Long => "J".into(),
            JvmType::Float => "F".into(),
            JvmType::Double => "D".into(),
            JvmType::Byte => "B".into(),
            JvmType::Char => "C".into(),
            JvmType::Short => "S".into(),
            JvmType::Boolean => "Z".into(),
            JvmType::Void => "V".into(),
            JvmType::Reference(name) => format!("L{};", name),
            JvmType::Array(inner) => format!("[{}", inner.to_descriptor()),
        }
    }

    /// Returns the source-level name for display.
    pub fn source_name(&self) -> String {
        match self {
            JvmType::Int => "int".into(),
            JvmType::Long => "long".into(),
            JvmType::Float => "float".into(),
            JvmType::Double => "double".into(),
            JvmType::Byte => "byte".into(),
            JvmType::Char => "char".into(),
            JvmType::Short => "short".into(),
            JvmType::Boolean => "boolean".into(),
            JvmType::Void => "void".into(),
            JvmType::Reference(name) => internal_to_source_name(name),
            JvmType::Array(inner) => format!("{}[]", inner.source_name()),
        }
    }
}

impl fmt::Display for JvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source_name())
    }
}

/// Parse a single type descriptor starting at position `pos` in `desc`.
/// Returns (JvmType, next_position).
pub fn parse_type_at(desc: &str, pos: usize) -> Option<(JvmType, usize)> {
    let bytes = desc.as_bytes();
    if pos >= bytes.len() {
        return None;
    }
    match bytes[pos] {
        b'B' => Some((JvmType::Byte, pos + 1)),
        b'C' => Some((JvmType::Char, pos + 1)),
        b'D' => Some((JvmType::Double, pos + 1)),
        b'F' => Some((JvmType::Float, pos + 1)),
        b'I' => Some((JvmType::Int, pos + 1)),
        b'J' => Some((JvmType::Long, pos + 1)),
        b'S' => Some((JvmType::Short, pos + 1)),
        b'Z' => Some((JvmType::Boolean, pos + 1)),
        b'V' => Some((JvmType::Void, pos + 1)),
        b'L' => {
            let semi = desc[pos + 1..].find(';')?;
            let class_name = &desc[pos + 1..pos + 1 + semi];
            if class_name.is_empty() {
                return None;
            }
            Some((JvmType::Reference(class_name.to_string()), pos + 1 + semi + 1))
        }
        b'[' => {
            let (inner, next) = parse_type_at(desc, pos + 1)?;
            if inner == JvmType::Void {
                return None;
            }
            Some((JvmType::Array(Box::new(inner)), next))
        }
        _ => None,
    }
}

/// Parse a full type descriptor string. Trailing characters are rejected.
pub fn parse_type_descriptor(desc: &str) -> Option<JvmType> {
    let (ty, next) = parse_type_at(desc, 0)?;
    (next == desc.len()).then_some(ty)
}

/// Parse a method descriptor, e.g. "(II)V" -> ([Int, Int], Void)
pub fn parse_method_descriptor(desc: &str) -> Option<(Vec<JvmType>, JvmType)> {
    if !desc.starts_with('(') {
        return None;
    }
    let close = desc.find(')')?;
    let mut params = Vec::new();
    let mut pos = 1;
    while pos < close {
        let (ty, next) = parse_type_at(desc, pos)?;
        if ty == JvmType::Void {
            return None;
        }
        params.push(ty);
        pos = next;
    }
    let (ret, next) = parse_type_at(desc, close + 1)?;
    (next == desc.len()).then_some((params, ret))
}

/// Build a method descriptor from its parts.
pub fn method_descriptor(params: &[JvmType], ret: &JvmType) -> String {
    let mut desc = String::from("(");
    for param in params {
        desc.push_str(&param.to_descriptor());
    }
    desc.push(')');
    desc.push_str(&ret.to_descriptor());
    desc
}

/// Convert internal class name to source name.
pub fn internal_to_source_name(name: &str) -> String {
    name.replace('/', ".")
}

/// Convert a dotted source name to an internal name.
pub fn source_to_internal_name(name: &str) -> String {
    name.replace('.', "/")
}

/// Get just the simple class name from an internal name.
pub fn simple_class_name(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}
