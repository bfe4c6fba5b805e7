use tracing::debug;

use crate::backend::{Backend, BackendOptions, ClassFileBackend};
use crate::descriptor::{internal_to_source_name, source_to_internal_name};
use crate::error::{MaterializeError, MaterializeResult};
use crate::introspect::{MethodDescriptor, TypeDescriptor, TypeHierarchy};

use super::emit::build_class_model;
use super::model::ClassModel;
use super::registry::{discover_properties, BuildContext, PropertyDescriptor};

/// The bytes of one generated class and the name it was generated under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildResult {
    /// Fully-qualified dotted name.
    pub class_name: String,
    pub bytes: Vec<u8>,
}

impl BuildResult {
    pub fn internal_name(&self) -> String {
        source_to_internal_name(&self.class_name)
    }

    /// Where the class lives inside a jar.
    pub fn entry_path(&self) -> String {
        format!("{}.class", self.internal_name())
    }
}

/// Builds an implementation class for one abstract type.
///
/// Use is two-phase: [`discover`](Self::discover) walks the type and its
/// ancestors, then [`emit`](Self::emit) renders the class. Emitting without
/// discovering first produces a class with only a constructor.
pub struct BeanBuilder<'u, H: TypeHierarchy + ?Sized> {
    hierarchy: &'u H,
    implemented: &'u TypeDescriptor,
    context: BuildContext,
    options: BackendOptions,
    sort_members: bool,
}

impl<'u, H: TypeHierarchy + ?Sized> BeanBuilder<'u, H> {
    /// `type_name` may be dotted or internal.
    pub fn new(hierarchy: &'u H, type_name: &str) -> MaterializeResult<Self> {
        let internal = source_to_internal_name(type_name);
        let implemented = hierarchy
            .resolve(&internal)
            .ok_or_else(|| MaterializeError::UnknownType {
                name: internal_to_source_name(&internal),
            })?;
        Ok(BeanBuilder {
            hierarchy,
            implemented,
            context: BuildContext::new(),
            options: BackendOptions::default(),
            sort_members: false,
        })
    }

    pub fn with_options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }

    /// Order fields and stubs by name instead of discovery order.
    pub fn sort_members(mut self, sort_members: bool) -> Self {
        self.sort_members = sort_members;
        self
    }

    pub fn implemented_type(&self) -> &TypeDescriptor {
        self.implemented
    }

    /// Collect properties and unsupported methods. Calling it again starts
    /// over from an empty context.
    pub fn discover(&mut self, fail_on_unrecognized: bool) -> MaterializeResult<&mut Self> {
        self.context =
            discover_properties(self.hierarchy, self.implemented, fail_on_unrecognized)?;
        Ok(self)
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        self.context.properties()
    }

    pub fn unsupported_methods(&self) -> &[MethodDescriptor] {
        self.context.unsupported_methods()
    }

    /// The class model that [`emit`](Self::emit) would render.
    pub fn model(&mut self, class_name: &str) -> MaterializeResult<ClassModel> {
        build_class_model(
            self.hierarchy,
            self.implemented,
            &mut self.context,
            class_name,
            self.sort_members,
        )
    }

    /// Render the class with the class-file backend.
    pub fn emit(&mut self, class_name: &str) -> MaterializeResult<BuildResult> {
        let backend = ClassFileBackend::new(self.options.clone());
        self.emit_with(class_name, &backend)
    }

    pub fn emit_with<B: Backend + ?Sized>(
        &mut self,
        class_name: &str,
        backend: &B,
    ) -> MaterializeResult<BuildResult> {
        let model = self.model(class_name)?;
        let bytes = backend.render(&model)?;
        debug!(
            implemented = %self.implemented.name,
            class_name,
            size = bytes.len(),
            "class emitted"
        );
        Ok(BuildResult {
            class_name: internal_to_source_name(&model.name),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::JvmType;
    use crate::introspect::TypeUniverse;
    use crate::ClassFile;

    fn universe() -> TypeUniverse {
        let mut universe = TypeUniverse::new();
        universe.insert(
            TypeDescriptor::interface("demo.Person")
                .method(MethodDescriptor::new("getName", vec![], JvmType::string()))
                .method(MethodDescriptor::new("setAge", vec![JvmType::Int], JvmType::Void))
                .method(MethodDescriptor::new("greet", vec![], JvmType::Void)),
        );
        universe
    }

    #[test]
    fn test_discover_then_emit() {
        let universe = universe();
        let mut builder = BeanBuilder::new(&universe, "demo.Person").unwrap();
        builder.discover(false).unwrap();
        assert_eq!(builder.properties().len(), 2);
        assert_eq!(builder.unsupported_methods().len(), 1);

        let result = builder.emit("gen.demo.Person").unwrap();
        assert_eq!(result.class_name, "gen.demo.Person");
        assert_eq!(result.internal_name(), "gen/demo/Person");
        assert_eq!(result.entry_path(), "gen/demo/Person.class");

        let class_file = ClassFile::from_bytes(&result.bytes).unwrap();
        assert_eq!(class_file.fields.len(), 2);
        // constructor, two accessors per property, one stub
        assert_eq!(class_file.methods.len(), 6);
    }

    #[test]
    fn test_emit_without_discover() {
        let universe = universe();
        let mut builder = BeanBuilder::new(&universe, "demo/Person").unwrap();
        let result = builder.emit("gen.Empty").unwrap();
        let class_file = ClassFile::from_bytes(&result.bytes).unwrap();
        assert!(class_file.fields.is_empty());
        assert_eq!(class_file.methods.len(), 1);
    }

    #[test]
    fn test_fail_on_unrecognized() {
        let universe = universe();
        let mut builder = BeanBuilder::new(&universe, "demo.Person").unwrap();
        assert!(matches!(
            builder.discover(true),
            Err(MaterializeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_unknown_type() {
        let universe = universe();
        assert!(matches!(
            BeanBuilder::new(&universe, "demo.Missing"),
            Err(MaterializeError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_emission_is_repeatable() {
        let universe = universe();
        let mut first = BeanBuilder::new(&universe, "demo.Person").unwrap();
        let mut second = BeanBuilder::new(&universe, "demo.Person").unwrap();
        let a = first.discover(false).unwrap().emit("gen.P").unwrap();
        let b = second.discover(false).unwrap().emit("gen.P").unwrap();
        assert_eq!(a, b);
        assert_eq!(first.emit("gen.P").unwrap(), a);
    }
}
