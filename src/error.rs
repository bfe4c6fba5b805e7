use thiserror::Error;

use crate::jar::JarError;

/// Everything that can stop a class from being materialized.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(
        "unrecognized abstract method '{method}' in {type_name} (not a getter or setter) -- \
         to avoid this error, disable Feature::FAIL_ON_UNMATERIALIZED_METHOD"
    )]
    Configuration { type_name: String, method: String },

    #[error(
        "invalid property '{property}': incompatible types for getter/setter \
         ({getter_type} vs {setter_type})"
    )]
    TypeConflict {
        property: String,
        getter_type: String,
        setter_type: String,
    },

    #[error("invalid property '{property}': type {descriptor} cannot back a field")]
    InvalidPropertyType { property: String, descriptor: String },

    #[error("cannot construct class: {message}")]
    Construction { message: String },

    #[error("unknown type {name}")]
    UnknownType { name: String },

    #[error("can not materialize implementation of {name} since it is not public")]
    NonPublicType { name: String },

    #[error("invalid method {name}{descriptor}")]
    InvalidMethod { name: String, descriptor: String },

    #[error("malformed class file: {message}")]
    MalformedClass { message: String },

    #[error("class format error: {0}")]
    ClassFormat(#[from] binrw::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("jar error: {0}")]
    Jar(#[from] JarError),
}

pub type MaterializeResult<T> = Result<T, MaterializeError>;
