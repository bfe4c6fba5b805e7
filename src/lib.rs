//! Generates concrete JVM classes for abstract types.
//!
//! Given an interface or abstract class, the materializer infers bean
//! properties from its getters and setters, then writes a
//! [class file](https://docs.oracle.com/javase/specs/jvms/se8/html/jvms-4.html)
//! with one public field per property, accessors for them, a no-argument
//! constructor and throwing stubs for every other abstract method.
//!
//! ```rust
//! use classfile_materializer::descriptor::JvmType;
//! use classfile_materializer::introspect::{MethodDescriptor, TypeDescriptor, TypeUniverse};
//! use classfile_materializer::materialize::Materializer;
//! use classfile_materializer::ClassFile;
//!
//! let mut universe = TypeUniverse::new();
//! universe.insert(
//!     TypeDescriptor::interface("com.example.Point")
//!         .method(MethodDescriptor::new("getX", vec![], JvmType::Int))
//!         .method(MethodDescriptor::new("setX", vec![JvmType::Int], JvmType::Void)),
//! );
//!
//! let result = Materializer::default()
//!     .materialize(&universe, "com.example.Point")
//!     .unwrap()
//!     .unwrap();
//! let class_file = ClassFile::from_bytes(&result.bytes).unwrap();
//! assert_eq!(class_file.interface_names(), vec!["com/example/Point"]);
//! ```

#[macro_use]
extern crate bitflags;

pub mod attribute_info;
pub mod constant_info;
pub mod field_info;
pub mod method_info;

pub mod code_attribute;

pub mod types;

pub mod backend;
pub mod descriptor;
pub mod error;
pub mod introspect;
pub mod jar;
pub mod materialize;
pub mod signature;

pub use error::{MaterializeError, MaterializeResult};
pub use types::*;

use std::io::Read;
use std::path::Path;

/// Read and parse a class file from any reader.
///
/// ```rust
/// let mut reader = "this_will_be_parsed_as_classfile".as_bytes();
/// let result = classfile_materializer::read_class(&mut reader);
/// assert!(result.is_err());
/// ```
pub fn read_class<R: Read>(reader: &mut R) -> MaterializeResult<ClassFile> {
    let mut class_bytes = Vec::new();
    reader.read_to_end(&mut class_bytes)?;
    Ok(ClassFile::from_bytes(&class_bytes)?)
}

/// Read and parse the class file at `path`.
pub fn read_class_file(path: impl AsRef<Path>) -> MaterializeResult<ClassFile> {
    let file = std::fs::File::open(path)?;
    read_class(&mut std::io::BufReader::new(file))
}
