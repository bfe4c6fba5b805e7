//! Rendering of class models into loadable artifacts.

mod class_file;

pub use self::class_file::ClassFileBackend;

use crate::error::MaterializeResult;
use crate::materialize::ClassModel;
use crate::JAVA_8;

/// Turns a class model into the bytes of an artifact.
pub trait Backend {
    fn render(&self, model: &ClassModel) -> MaterializeResult<Vec<u8>>;
}

/// Options for [`ClassFileBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendOptions {
    /// Class-file major version written into the header.
    pub major_version: u16,
}

impl Default for BackendOptions {
    fn default() -> Self {
        BackendOptions {
            major_version: JAVA_8,
        }
    }
}
