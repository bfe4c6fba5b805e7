//! Property discovery and class generation for abstract types.

mod builder;
mod classify;
mod emit;
mod materializer;
mod model;
mod registry;
mod resolve;

pub use self::builder::{BeanBuilder, BuildResult};
pub use self::classify::{classify, getter_name, setter_name, Accessor};
pub use self::emit::{build_class_model, unimplemented_message};
pub use self::materializer::{Feature, Materializer, MaterializerConfig, DEFAULT_PACKAGE};
pub use self::model::{ClassModel, FieldModel, MethodBody, MethodModel, SetterReturn};
pub use self::registry::{discover_properties, BuildContext, PropertyDescriptor};
pub use self::resolve::PropertyType;
