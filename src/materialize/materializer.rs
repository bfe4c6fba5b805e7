use tracing::{debug, info};

use crate::backend::BackendOptions;
use crate::descriptor::{source_to_internal_name, JvmType};
use crate::error::{MaterializeError, MaterializeResult};
use crate::introspect::{TypeDescriptor, TypeHierarchy};
use crate::jar::JarFile;
use crate::JAVA_8;

use super::builder::{BeanBuilder, BuildResult};

/// Package generated classes go into unless configured otherwise.
pub const DEFAULT_PACKAGE: &str = "com.fasterxml.jackson.module.mrbean.generated";

/// Container roots that are never materialized; deserializers for them
/// pick concrete collection types instead.
const CONTAINER_TYPES: [&str; 2] = ["java/util/Collection", "java/util/Map"];

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Feature(u32);

bitflags! {
    impl Feature: u32 {
        /// Fail when an abstract method is neither a getter nor a setter,
        /// instead of generating a stub that throws.
        const FAIL_ON_UNMATERIALIZED_METHOD = 0x0001;
        /// Refuse to materialize types that are not public.
        const FAIL_ON_NON_PUBLIC_TYPES = 0x0002;
    }
}

impl Default for Feature {
    fn default() -> Self {
        Feature::FAIL_ON_NON_PUBLIC_TYPES
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterializerConfig {
    pub features: Feature,
    /// Dotted package prefix for generated class names.
    pub default_package: String,
    /// Class-file major version of generated classes.
    pub class_version: u16,
    /// Order generated members by name.
    pub sort_members: bool,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        MaterializerConfig {
            features: Feature::default(),
            default_package: DEFAULT_PACKAGE.to_string(),
            class_version: JAVA_8,
            sort_members: false,
        }
    }
}

impl MaterializerConfig {
    pub fn enable(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn disable(mut self, feature: Feature) -> Self {
        self.features.remove(feature);
        self
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.features.contains(feature)
    }
}

/// Decides which abstract types get an implementation and generates it.
#[derive(Clone, Debug, Default)]
pub struct Materializer {
    config: MaterializerConfig,
}

impl Materializer {
    pub fn new(config: MaterializerConfig) -> Self {
        Materializer { config }
    }

    pub fn config(&self) -> &MaterializerConfig {
        &self.config
    }

    /// Generated name for `ty`: the configured package followed by the
    /// original dotted name.
    pub fn generated_name(&self, ty: &TypeDescriptor) -> String {
        let package = self.config.default_package.trim_end_matches('.');
        if package.is_empty() {
            ty.source_name()
        } else {
            format!("{package}.{}", ty.source_name())
        }
    }

    /// Generate an implementation of `type_name`.
    ///
    /// Returns `None` for concrete classes and for collection and map types,
    /// which need no materialized implementation.
    pub fn materialize<H>(
        &self,
        hierarchy: &H,
        type_name: &str,
    ) -> MaterializeResult<Option<BuildResult>>
    where
        H: TypeHierarchy + ?Sized,
    {
        let internal = source_to_internal_name(type_name);
        let ty = hierarchy
            .resolve(&internal)
            .ok_or_else(|| MaterializeError::UnknownType {
                name: type_name.to_string(),
            })?;

        if !ty.is_abstract() {
            debug!(type_name = %ty.name, "concrete type, not materialized");
            return Ok(None);
        }
        if is_container(hierarchy, ty) {
            debug!(type_name = %ty.name, "container type, not materialized");
            return Ok(None);
        }
        if !ty.public && self.config.is_enabled(Feature::FAIL_ON_NON_PUBLIC_TYPES) {
            return Err(MaterializeError::NonPublicType {
                name: ty.source_name(),
            });
        }

        let class_name = self.generated_name(ty);
        let mut builder = BeanBuilder::new(hierarchy, &internal)?
            .with_options(BackendOptions {
                major_version: self.config.class_version,
            })
            .sort_members(self.config.sort_members);
        let result = builder
            .discover(self.config.is_enabled(Feature::FAIL_ON_UNMATERIALIZED_METHOD))?
            .emit(&class_name)?;
        info!(type_name = %ty.source_name(), class_name = %result.class_name, "materialized");
        Ok(Some(result))
    }

    /// Materialize every named type and collect the results in one jar.
    /// Types that need no implementation are skipped.
    pub fn materialize_all<H, S>(&self, hierarchy: &H, type_names: &[S]) -> MaterializeResult<JarFile>
    where
        H: TypeHierarchy + ?Sized,
        S: AsRef<str>,
    {
        let mut jar = JarFile::with_default_manifest();
        for name in type_names {
            if let Some(result) = self.materialize(hierarchy, name.as_ref())? {
                jar.set_class_bytes(&result.internal_name(), result.bytes);
            }
        }
        Ok(jar)
    }
}

fn is_container<H: TypeHierarchy + ?Sized>(hierarchy: &H, ty: &TypeDescriptor) -> bool {
    let source = ty.as_type();
    CONTAINER_TYPES
        .iter()
        .any(|container| hierarchy.is_assignable_from(&JvmType::reference(*container), &source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{MethodDescriptor, TypeUniverse};
    use crate::ClassFile;

    fn universe() -> TypeUniverse {
        let mut universe = TypeUniverse::new();
        universe.insert(
            TypeDescriptor::interface("demo.Bean")
                .method(MethodDescriptor::new("getId", vec![], JvmType::Long))
                .method(MethodDescriptor::new("reset", vec![], JvmType::Void)),
        );
        universe.insert(TypeDescriptor::interface("demo.Hidden").non_public());
        universe.insert(TypeDescriptor::class("demo.Plain"));
        universe.insert(TypeDescriptor::interface("demo.Names").implements("java.util.List"));
        universe
    }

    #[test]
    fn test_default_config() {
        let config = MaterializerConfig::default();
        assert!(config.is_enabled(Feature::FAIL_ON_NON_PUBLIC_TYPES));
        assert!(!config.is_enabled(Feature::FAIL_ON_UNMATERIALIZED_METHOD));
        assert_eq!(config.default_package, DEFAULT_PACKAGE);
        assert_eq!(config.class_version, 52);
    }

    #[test]
    fn test_materialize_names_class_under_package() {
        let universe = universe();
        let result = Materializer::default()
            .materialize(&universe, "demo.Bean")
            .unwrap()
            .unwrap();
        assert_eq!(
            result.class_name,
            "com.fasterxml.jackson.module.mrbean.generated.demo.Bean"
        );
        let class_file = ClassFile::from_bytes(&result.bytes).unwrap();
        assert_eq!(class_file.interface_names(), vec!["demo/Bean"]);
    }

    #[test]
    fn test_skipped_types() {
        let universe = universe();
        let materializer = Materializer::default();
        assert!(materializer.materialize(&universe, "demo.Plain").unwrap().is_none());
        assert!(materializer.materialize(&universe, "demo.Names").unwrap().is_none());
        assert!(materializer.materialize(&universe, "java.util.Map").unwrap().is_none());
    }

    #[test]
    fn test_non_public_types() {
        let universe = universe();
        assert!(matches!(
            Materializer::default().materialize(&universe, "demo.Hidden"),
            Err(MaterializeError::NonPublicType { .. })
        ));
        let relaxed = Materializer::new(
            MaterializerConfig::default().disable(Feature::FAIL_ON_NON_PUBLIC_TYPES),
        );
        assert!(relaxed.materialize(&universe, "demo.Hidden").unwrap().is_some());
    }

    #[test]
    fn test_fail_on_unmaterialized_method() {
        let universe = universe();
        let strict = Materializer::new(
            MaterializerConfig::default().enable(Feature::FAIL_ON_UNMATERIALIZED_METHOD),
        );
        assert!(matches!(
            strict.materialize(&universe, "demo.Bean"),
            Err(MaterializeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_materialize_all_packages_jar() {
        let universe = universe();
        let materializer = Materializer::new(MaterializerConfig {
            default_package: "gen".into(),
            ..MaterializerConfig::default()
        });
        let jar = materializer
            .materialize_all(&universe, &["demo.Bean", "demo.Plain"])
            .unwrap();
        let classes: Vec<&str> = jar.class_names().collect();
        assert_eq!(classes, vec!["gen/demo/Bean.class"]);
        assert!(jar.contains_entry(crate::jar::MANIFEST_PATH));
    }
}
