use crate::introspect::MethodDescriptor;

/// Role of a declared method in the bean surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Accessor {
    /// Zero-argument `getX()`, or `isX()` returning a boolean.
    Getter(String),
    /// One-argument `setX(value)`.
    Setter(String),
    Other,
}

/// Classify a method by name, arity and (for `is` getters) return type.
///
/// A bare `get`, `set` or `is` with nothing after the prefix is `Other`.
pub fn classify(method: &MethodDescriptor) -> Accessor {
    let name = method.name.as_str();
    match method.arity() {
        0 => {
            if let Some(prop) = property_name(name, "get") {
                return Accessor::Getter(prop);
            }
            if method.ret.erased.is_boolean() {
                if let Some(prop) = property_name(name, "is") {
                    return Accessor::Getter(prop);
                }
            }
            Accessor::Other
        }
        1 => match property_name(name, "set") {
            Some(prop) => Accessor::Setter(prop),
            None => Accessor::Other,
        },
        _ => Accessor::Other,
    }
}

fn property_name(method_name: &str, prefix: &str) -> Option<String> {
    let rest = method_name.strip_prefix(prefix)?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

fn with_prefix(prefix: &str, prop: &str) -> String {
    let mut chars = prop.chars();
    match chars.next() {
        Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

/// `age` -> `getAge`
pub fn getter_name(prop: &str) -> String {
    with_prefix("get", prop)
}

/// `age` -> `setAge`
pub fn setter_name(prop: &str) -> String {
    with_prefix("set", prop)
}
