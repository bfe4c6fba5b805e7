use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::descriptor::JvmType;
use crate::error::MaterializeResult;
use crate::jar::JarFile;
use crate::ClassFile;

use super::types::{MethodDescriptor, TypeDescriptor, TypeKind};

pub const OBJECT: &str = "java/lang/Object";

/// Type metadata queries the materializer depends on.
///
/// Only `resolve` is required; the rest have defaults derived from it.
pub trait TypeHierarchy {
    fn resolve(&self, name: &str) -> Option<&TypeDescriptor>;

    /// Ancestors of `ty` (superclasses and interfaces), excluding `ty` itself,
    /// `stop_at` and `java/lang/Object`. Depth-first: a type's interfaces in
    /// declaration order come before its superclass. Duplicates reached
    /// through several paths are listed once.
    fn ancestors_of<'a>(&'a self, ty: &TypeDescriptor, stop_at: &str) -> Vec<&'a TypeDescriptor> {
        let mut result: Vec<&'a TypeDescriptor> = Vec::new();
        for interface in &ty.interfaces {
            collect_ancestors(self, interface, stop_at, &mut result);
        }
        if let Some(super_name) = &ty.super_name {
            collect_ancestors(self, super_name, stop_at, &mut result);
        }
        result
    }

    /// Whether `method` already has a body.
    fn is_concrete(&self, method: &MethodDescriptor) -> bool {
        method.concrete
    }

    /// Whether a value of type `source` can be assigned to `target` without a cast.
    fn is_assignable_from(&self, target: &JvmType, source: &JvmType) -> bool {
        if target == source {
            return true;
        }
        match (target, source) {
            (JvmType::Reference(t), JvmType::Array(_)) => {
                t == OBJECT || t == "java/lang/Cloneable" || t == "java/io/Serializable"
            }
            (JvmType::Reference(t), JvmType::Reference(s)) => {
                if t == OBJECT {
                    return true;
                }
                match self.resolve(s) {
                    Some(source_ty) => self
                        .ancestors_of(source_ty, OBJECT)
                        .iter()
                        .any(|ancestor| &ancestor.name == t),
                    None => false,
                }
            }
            (JvmType::Array(t), JvmType::Array(s)) if t.is_reference() && s.is_reference() => {
                self.is_assignable_from(t, s)
            }
            _ => false,
        }
    }

    /// Whether a subclass in another package may call `<init>()V` on `name`.
    fn has_accessible_default_constructor(&self, name: &str) -> bool {
        if name == OBJECT {
            return true;
        }
        self.resolve(name)
            .map(|ty| ty.kind != TypeKind::Interface && ty.default_constructor)
            .unwrap_or(false)
    }
}

fn collect_ancestors<'a, H: TypeHierarchy + ?Sized>(
    hierarchy: &'a H,
    name: &str,
    stop_at: &str,
    result: &mut Vec<&'a TypeDescriptor>,
) {
    if name == stop_at || name == OBJECT {
        return;
    }
    let Some(ty) = hierarchy.resolve(name) else {
        warn!(type_name = name, "ancestor type is unknown, its methods are not inspected");
        return;
    };
    if result.iter().any(|seen| seen.name == ty.name) {
        return;
    }
    result.push(ty);
    for interface in &ty.interfaces {
        collect_ancestors(hierarchy, interface, stop_at, result);
    }
    if let Some(super_name) = &ty.super_name {
        collect_ancestors(hierarchy, super_name, stop_at, result);
    }
}

/// An in-memory set of type descriptors, keyed by internal name.
#[derive(Clone, Debug)]
pub struct TypeUniverse {
    types: FxHashMap<String, TypeDescriptor>,
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeUniverse {
    /// A universe preloaded with the supertype structure of common JDK types.
    ///
    /// The preloaded types carry no methods; load real class files over them
    /// when their methods matter.
    pub fn new() -> Self {
        let mut universe = Self::empty();
        for ty in jdk_prelude() {
            universe.insert(ty);
        }
        universe
    }

    /// A universe that knows only `java/lang/Object`.
    pub fn empty() -> Self {
        let mut types = FxHashMap::default();
        let mut object = TypeDescriptor::class(OBJECT);
        object.super_name = None;
        types.insert(OBJECT.to_string(), object);
        TypeUniverse { types }
    }

    /// Insert or replace a descriptor.
    pub fn insert(&mut self, ty: TypeDescriptor) {
        self.types.insert(ty.name.clone(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(&name.replace('.', "/"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Load one class from parsed class-file data. Returns its internal name.
    pub fn add_class_file(&mut self, class_file: &ClassFile) -> MaterializeResult<String> {
        let ty = TypeDescriptor::from_class_file(class_file)?;
        let name = ty.name.clone();
        debug!(type_name = %name, methods = ty.methods.len(), "loaded type");
        self.insert(ty);
        Ok(name)
    }

    pub fn add_class_bytes(&mut self, bytes: &[u8]) -> MaterializeResult<String> {
        let class_file = ClassFile::from_bytes(bytes)?;
        self.add_class_file(&class_file)
    }

    /// Load every class in a jar. `module-info.class` entries are skipped.
    /// Returns how many types were added.
    pub fn add_jar(&mut self, jar: &JarFile) -> MaterializeResult<usize> {
        let mut added = 0;
        for (path, parsed) in jar.parse_all_classes() {
            if path.ends_with("module-info.class") {
                continue;
            }
            self.add_class_file(&parsed?)?;
            added += 1;
        }
        Ok(added)
    }
}

impl TypeHierarchy for TypeUniverse {
    fn resolve(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }
}

fn jdk_prelude() -> Vec<TypeDescriptor> {
    let mut prelude = vec![
        TypeDescriptor::interface("java/io/Serializable"),
        TypeDescriptor::interface("java/lang/Cloneable"),
        TypeDescriptor::interface("java/lang/CharSequence"),
        TypeDescriptor::interface("java/lang/Comparable"),
        TypeDescriptor::interface("java/lang/Iterable"),
        TypeDescriptor::interface("java/util/Collection").implements("java/lang/Iterable"),
        TypeDescriptor::interface("java/util/List").implements("java/util/Collection"),
        TypeDescriptor::interface("java/util/Set").implements("java/util/Collection"),
        TypeDescriptor::interface("java/util/SortedSet").implements("java/util/Set"),
        TypeDescriptor::interface("java/util/Queue").implements("java/util/Collection"),
        TypeDescriptor::interface("java/util/Map"),
        TypeDescriptor::interface("java/util/SortedMap").implements("java/util/Map"),
        TypeDescriptor::class("java/lang/String")
            .implements("java/io/Serializable")
            .implements("java/lang/Comparable")
            .implements("java/lang/CharSequence"),
        TypeDescriptor::abstract_class("java/lang/Number").implements("java/io/Serializable"),
        TypeDescriptor::class("java/lang/Boolean")
            .implements("java/io/Serializable")
            .implements("java/lang/Comparable"),
        TypeDescriptor::class("java/lang/Character")
            .implements("java/io/Serializable")
            .implements("java/lang/Comparable"),
    ];
    for boxed in ["Byte", "Short", "Integer", "Long", "Float", "Double"] {
        prelude.push(
            TypeDescriptor::class(&format!("java/lang/{boxed}"))
                .extends("java/lang/Number")
                .implements("java/lang/Comparable"),
        );
    }
    prelude
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(types: &[&TypeDescriptor]) -> Vec<String> {
        types.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn test_ancestors_depth_first_interfaces_then_super() {
        let mut universe = TypeUniverse::empty();
        universe.insert(TypeDescriptor::interface("a/Named"));
        universe.insert(TypeDescriptor::interface("a/Aged"));
        universe.insert(TypeDescriptor::interface("a/Person").implements("a/Named").implements("a/Aged"));
        universe.insert(TypeDescriptor::abstract_class("a/Base").implements("a/Named"));
        universe.insert(
            TypeDescriptor::abstract_class("a/Employee")
                .extends("a/Base")
                .implements("a/Person"),
        );

        let employee = universe.get("a/Employee").unwrap();
        let ancestors = universe.ancestors_of(employee, OBJECT);
        assert_eq!(names(&ancestors), vec!["a/Person", "a/Named", "a/Aged", "a/Base"]);
    }

    #[test]
    fn test_ancestors_stop_before_stop_type() {
        let mut universe = TypeUniverse::empty();
        universe.insert(TypeDescriptor::abstract_class("a/Root"));
        universe.insert(TypeDescriptor::abstract_class("a/Mid").extends("a/Root"));
        universe.insert(TypeDescriptor::abstract_class("a/Leaf").extends("a/Mid"));

        let leaf = universe.get("a/Leaf").unwrap();
        assert_eq!(names(&universe.ancestors_of(leaf, "a/Root")), vec!["a/Mid"]);
        assert_eq!(names(&universe.ancestors_of(leaf, OBJECT)), vec!["a/Mid", "a/Root"]);
    }

    #[test]
    fn test_unknown_ancestors_are_skipped() {
        let mut universe = TypeUniverse::empty();
        universe.insert(TypeDescriptor::interface("a/Thing").implements("b/Missing"));
        let thing = universe.get("a/Thing").unwrap();
        assert!(universe.ancestors_of(thing, OBJECT).is_empty());
    }

    #[test]
    fn test_assignability() {
        let universe = TypeUniverse::new();
        let object = JvmType::object();
        let string = JvmType::string();
        let integer = JvmType::reference("java/lang/Integer");
        let number = JvmType::reference("java/lang/Number");

        assert!(universe.is_assignable_from(&object, &string));
        assert!(!universe.is_assignable_from(&string, &object));
        assert!(universe.is_assignable_from(&number, &integer));
        assert!(universe.is_assignable_from(&JvmType::reference("java/lang/Comparable"), &integer));
        assert!(!universe.is_assignable_from(&integer, &string));
        assert!(!universe.is_assignable_from(&JvmType::Int, &integer));
        assert!(!universe.is_assignable_from(&JvmType::Long, &JvmType::Int));
        assert!(universe.is_assignable_from(
            &JvmType::Array(Box::new(object.clone())),
            &JvmType::Array(Box::new(string.clone()))
        ));
        assert!(!universe.is_assignable_from(
            &JvmType::Array(Box::new(JvmType::Long)),
            &JvmType::Array(Box::new(JvmType::Int))
        ));
        assert!(universe.is_assignable_from(&object, &JvmType::Array(Box::new(JvmType::Int))));
    }

    #[test]
    fn test_default_constructor_lookup() {
        let mut universe = TypeUniverse::new();
        universe.insert(TypeDescriptor::abstract_class("a/WithCtor"));
        universe.insert(TypeDescriptor::abstract_class("a/NoCtor").without_default_constructor());
        assert!(universe.has_accessible_default_constructor(OBJECT));
        assert!(universe.has_accessible_default_constructor("a/WithCtor"));
        assert!(!universe.has_accessible_default_constructor("a/NoCtor"));
        assert!(!universe.has_accessible_default_constructor("a/Unknown"));
    }
}
