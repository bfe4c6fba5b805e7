//! Type metadata consumed by the materializer: descriptors for types and
//! their declared methods, and the hierarchy queries run against them.

mod class_reader;
mod hierarchy;
mod types;

pub use self::hierarchy::{TypeHierarchy, TypeUniverse, OBJECT};
pub use self::types::{MethodDescriptor, TypeDescriptor, TypeKind, TypeRef};
