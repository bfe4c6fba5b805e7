use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::error::{MaterializeError, MaterializeResult};
use crate::introspect::{MethodDescriptor, TypeDescriptor, TypeHierarchy, OBJECT};

use super::classify::{classify, Accessor};
use super::resolve::PropertyType;

/// A logical bean property and the methods that first declared it.
///
/// Getter and setter are assigned at most once. Discovery visits the
/// implemented type before its ancestors, so the most derived declaration
/// wins.
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    name: String,
    getter: Option<MethodDescriptor>,
    setter: Option<MethodDescriptor>,
    pub(super) resolved: Option<PropertyType>,
}

impl PropertyDescriptor {
    fn new(name: String) -> Self {
        PropertyDescriptor {
            name,
            getter: None,
            setter: None,
            resolved: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field backing the property shares its name.
    pub fn field_name(&self) -> &str {
        &self.name
    }

    pub fn getter(&self) -> Option<&MethodDescriptor> {
        self.getter.as_ref()
    }

    pub fn setter(&self) -> Option<&MethodDescriptor> {
        self.setter.as_ref()
    }

    pub fn has_concrete_getter(&self) -> bool {
        self.getter.as_ref().is_some_and(|m| m.concrete)
    }

    pub fn has_concrete_setter(&self) -> bool {
        self.setter.as_ref().is_some_and(|m| m.concrete)
    }

    /// The resolved type, once emission has computed it.
    pub fn resolved_type(&self) -> Option<&PropertyType> {
        self.resolved.as_ref()
    }
}

/// Mutable state of one build: discovered properties and the abstract
/// methods that will get throwing stubs. Both keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct BuildContext {
    properties: Vec<PropertyDescriptor>,
    property_index: FxHashMap<String, usize>,
    unsupported: Vec<MethodDescriptor>,
    unsupported_index: FxHashMap<String, usize>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub(super) fn properties_mut(&mut self) -> &mut [PropertyDescriptor] {
        &mut self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.property_index.get(name).map(|&i| &self.properties[i])
    }

    pub fn unsupported_methods(&self) -> &[MethodDescriptor] {
        &self.unsupported
    }

    pub fn is_unsupported(&self, name: &str) -> bool {
        self.unsupported_index.contains_key(name)
    }

    fn find_or_create(&mut self, name: String) -> &mut PropertyDescriptor {
        let index = match self.property_index.get(&name) {
            Some(&index) => index,
            None => {
                let index = self.properties.len();
                self.property_index.insert(name.clone(), index);
                self.properties.push(PropertyDescriptor::new(name));
                index
            }
        };
        &mut self.properties[index]
    }

    /// Record `method` as the getter of `prop` unless one is already set.
    pub fn add_getter(&mut self, prop: String, method: MethodDescriptor) {
        let property = self.find_or_create(prop);
        if let Some(existing) = &property.getter {
            note_shadowed(&property.name, existing, &method);
            return;
        }
        debug!(property = %property.name, method = %method.name, "getter");
        property.getter = Some(method);
    }

    /// Record `method` as the setter of `prop` unless one is already set.
    pub fn add_setter(&mut self, prop: String, method: MethodDescriptor) {
        let property = self.find_or_create(prop);
        if let Some(existing) = &property.setter {
            note_shadowed(&property.name, existing, &method);
            return;
        }
        debug!(property = %property.name, method = %method.name, "setter");
        property.setter = Some(method);
    }

    /// Record an abstract method that is not an accessor. Keyed by name only:
    /// a later method with the same name is ignored even if its descriptor
    /// differs.
    pub fn add_unsupported(&mut self, method: MethodDescriptor) {
        if let Some(&index) = self.unsupported_index.get(&method.name) {
            let kept = &self.unsupported[index];
            if kept.descriptor() != method.descriptor() {
                warn!(
                    method = %method.name,
                    kept = %kept.descriptor(),
                    dropped = %method.descriptor(),
                    "overloaded method collapses into one stub"
                );
            }
            return;
        }
        debug!(method = %method.name, descriptor = %method.descriptor(), "unsupported method");
        self.unsupported_index
            .insert(method.name.clone(), self.unsupported.len());
        self.unsupported.push(method);
    }
}

fn note_shadowed(property: &str, kept: &MethodDescriptor, ignored: &MethodDescriptor) {
    if kept.name == ignored.name && kept.descriptor() == ignored.descriptor() {
        // same method redeclared further up the hierarchy
        return;
    }
    if !ignored.concrete {
        warn!(
            property,
            kept = %format!("{}{}", kept.name, kept.descriptor()),
            ignored = %format!("{}{}", ignored.name, ignored.descriptor()),
            "second accessor for property is left unimplemented"
        );
    }
}

/// Walk `ty` and its ancestors and sort every declared method into
/// properties or unsupported methods.
///
/// With `fail_on_unrecognized`, the first abstract method that is neither a
/// getter nor a setter aborts discovery with a configuration error.
pub fn discover_properties<H>(
    hierarchy: &H,
    ty: &TypeDescriptor,
    fail_on_unrecognized: bool,
) -> MaterializeResult<BuildContext>
where
    H: TypeHierarchy + ?Sized,
{
    let mut context = BuildContext::new();
    // name+descriptor of methods that already have a body in the generated
    // class, whichever ancestor declares them abstractly
    let mut implemented = inherited_implementations(hierarchy, ty);
    let mut types = vec![ty];
    types.extend(hierarchy.ancestors_of(ty, OBJECT));

    for declaring in types {
        for method in &declaring.methods {
            let mut method = method.clone();
            let key = (method.name.clone(), method.descriptor());
            method.concrete = hierarchy.is_concrete(&method) || implemented.contains(&key);
            if method.concrete {
                implemented.insert(key);
            }

            match classify(&method) {
                Accessor::Getter(prop) => context.add_getter(prop, method),
                Accessor::Setter(prop) => context.add_setter(prop, method),
                Accessor::Other => {
                    if method.concrete {
                        continue;
                    }
                    if context.is_unsupported(&method.name) {
                        context.add_unsupported(method);
                        continue;
                    }
                    if fail_on_unrecognized {
                        return Err(MaterializeError::Configuration {
                            type_name: declaring.source_name(),
                            method: method.name,
                        });
                    }
                    context.add_unsupported(method);
                }
            }
        }
    }

    debug!(
        type_name = %ty.name,
        properties = context.properties.len(),
        unsupported = context.unsupported.len(),
        "discovery finished"
    );
    Ok(context)
}

/// Methods with a body on `ty` or its superclass chain. Interfaces are
/// visited before superclasses during discovery, so an interface's abstract
/// declaration must not hide a body a superclass provides. The most derived
/// class declaration decides: an abstract redeclaration hides the body above.
fn inherited_implementations<H>(hierarchy: &H, ty: &TypeDescriptor) -> FxHashSet<(String, String)>
where
    H: TypeHierarchy + ?Sized,
{
    let mut declared = FxHashSet::default();
    let mut concrete = FxHashSet::default();
    let mut current = Some(ty);
    while let Some(class) = current {
        for method in &class.methods {
            let key = (method.name.clone(), method.descriptor());
            if declared.insert(key.clone()) && hierarchy.is_concrete(method) {
                concrete.insert(key);
            }
        }
        current = class
            .super_name
            .as_deref()
            .filter(|name| *name != OBJECT)
            .and_then(|name| hierarchy.resolve(name));
    }
    concrete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::JvmType;
    use crate::introspect::TypeUniverse;

    fn names(context: &BuildContext) -> Vec<&str> {
        context.properties().iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_properties_merge_getter_and_setter() {
        let mut universe = TypeUniverse::new();
        universe.insert(
            TypeDescriptor::interface("demo/Person")
                .method(MethodDescriptor::new("getName", vec![], JvmType::string()))
                .method(MethodDescriptor::new("setName", vec![JvmType::string()], JvmType::Void))
                .method(MethodDescriptor::new("isActive", vec![], JvmType::Boolean))
                .method(MethodDescriptor::new("setAge", vec![JvmType::Int], JvmType::Void)),
        );
        let person = universe.get("demo/Person").unwrap();
        let context = discover_properties(&universe, person, false).unwrap();

        assert_eq!(names(&context), vec!["name", "active", "age"]);
        let name = context.property("name").unwrap();
        assert!(name.getter().is_some());
        assert!(name.setter().is_some());
        assert!(context.property("active").unwrap().setter().is_none());
        assert!(context.property("age").unwrap().getter().is_none());
        assert!(context.unsupported_methods().is_empty());
    }

    #[test]
    fn test_subtype_declaration_wins() {
        let mut universe = TypeUniverse::new();
        universe.insert(
            TypeDescriptor::interface("demo/Base")
                .method(MethodDescriptor::new("getValue", vec![], JvmType::object())),
        );
        universe.insert(
            TypeDescriptor::interface("demo/Derived")
                .implements("demo/Base")
                .method(MethodDescriptor::new("getValue", vec![], JvmType::string())),
        );
        let derived = universe.get("demo/Derived").unwrap();
        let context = discover_properties(&universe, derived, false).unwrap();

        let value = context.property("value").unwrap();
        assert_eq!(value.getter().unwrap().ret.erased, JvmType::string());
    }

    #[test]
    fn test_unrecognized_methods() {
        let mut universe = TypeUniverse::new();
        universe.insert(
            TypeDescriptor::abstract_class("demo/Worker")
                .method(MethodDescriptor::new("run", vec![], JvmType::Void))
                .method(MethodDescriptor::new("run", vec![JvmType::Int], JvmType::Void))
                .method(MethodDescriptor::new("describe", vec![], JvmType::string()).implemented()),
        );
        let worker = universe.get("demo/Worker").unwrap();

        let context = discover_properties(&universe, worker, false).unwrap();
        let stubs: Vec<String> = context
            .unsupported_methods()
            .iter()
            .map(|m| format!("{}{}", m.name, m.descriptor()))
            .collect();
        assert_eq!(stubs, vec!["run()V"]);

        let err = discover_properties(&universe, worker, true).unwrap_err();
        match err {
            MaterializeError::Configuration { type_name, method } => {
                assert_eq!(type_name, "demo.Worker");
                assert_eq!(method, "run");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inherited_abstract_method_already_implemented() {
        let mut universe = TypeUniverse::new();
        universe.insert(
            TypeDescriptor::interface("demo/Runnable")
                .method(MethodDescriptor::new("run", vec![], JvmType::Void)),
        );
        universe.insert(
            TypeDescriptor::abstract_class("demo/Task")
                .implements("demo/Runnable")
                .method(MethodDescriptor::new("run", vec![], JvmType::Void).implemented()),
        );
        let task = universe.get("demo/Task").unwrap();
        let context = discover_properties(&universe, task, true).unwrap();
        assert!(context.unsupported_methods().is_empty());
    }

    fn named_greeter(universe: &mut TypeUniverse) {
        universe.insert(
            TypeDescriptor::interface("demo/Named")
                .method(MethodDescriptor::new("getName", vec![], JvmType::string()))
                .method(MethodDescriptor::new("greet", vec![], JvmType::string())),
        );
        universe.insert(
            TypeDescriptor::class("demo/Base")
                .method(MethodDescriptor::new("getName", vec![], JvmType::string()).implemented())
                .method(MethodDescriptor::new("greet", vec![], JvmType::string()).implemented()),
        );
    }

    #[test]
    fn test_superclass_body_beats_interface_declaration() {
        let mut universe = TypeUniverse::new();
        named_greeter(&mut universe);
        universe.insert(
            TypeDescriptor::abstract_class("demo/Greeter")
                .extends("demo/Base")
                .implements("demo/Named")
                .method(MethodDescriptor::new("setName", vec![JvmType::string()], JvmType::Void)),
        );
        let greeter = universe.get("demo/Greeter").unwrap();
        let context = discover_properties(&universe, greeter, true).unwrap();

        let name = context.property("name").unwrap();
        assert!(name.has_concrete_getter());
        assert!(!name.has_concrete_setter());
        assert!(context.unsupported_methods().is_empty());
    }

    #[test]
    fn test_abstract_redeclaration_hides_superclass_body() {
        let mut universe = TypeUniverse::new();
        named_greeter(&mut universe);
        universe.insert(
            TypeDescriptor::abstract_class("demo/Strict")
                .extends("demo/Base")
                .implements("demo/Named")
                .method(MethodDescriptor::new("greet", vec![], JvmType::string())),
        );
        let strict = universe.get("demo/Strict").unwrap();
        let context = discover_properties(&universe, strict, false).unwrap();

        let stubs: Vec<&str> = context.unsupported_methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(stubs, vec!["greet"]);
        assert!(context.property("name").unwrap().has_concrete_getter());
    }

    #[test]
    fn test_concrete_accessors_are_recorded() {
        let mut universe = TypeUniverse::new();
        universe.insert(
            TypeDescriptor::abstract_class("demo/Partial")
                .method(MethodDescriptor::new("getId", vec![], JvmType::Long).implemented())
                .method(MethodDescriptor::new("setId", vec![JvmType::Long], JvmType::Void)),
        );
        let partial = universe.get("demo/Partial").unwrap();
        let context = discover_properties(&universe, partial, true).unwrap();

        let id = context.property("id").unwrap();
        assert!(id.has_concrete_getter());
        assert!(!id.has_concrete_setter());
    }
}
