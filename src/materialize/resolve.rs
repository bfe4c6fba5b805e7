use crate::descriptor::{JvmType, OpcodeClass};
use crate::error::{MaterializeError, MaterializeResult};
use crate::introspect::{TypeHierarchy, TypeRef};

use super::registry::PropertyDescriptor;

/// The canonical type of a property: what its field is declared as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyType {
    pub erased: JvmType,
    pub generic: Option<String>,
    pub opcode_class: OpcodeClass,
}

impl PropertyType {
    fn from_type_ref(property: &str, type_ref: &TypeRef) -> MaterializeResult<Self> {
        let invalid = || MaterializeError::InvalidPropertyType {
            property: property.to_string(),
            descriptor: type_ref.descriptor(),
        };
        let opcode_class = type_ref.erased.opcode_class().ok_or_else(invalid)?;
        Ok(PropertyType {
            erased: type_ref.erased.clone(),
            generic: type_ref.generic_signature().map(str::to_string),
            opcode_class,
        })
    }

    pub fn descriptor(&self) -> String {
        self.erased.to_descriptor()
    }

    /// True when the declaration carried generic information worth keeping.
    /// Unbound type variables never count.
    pub fn has_generics(&self) -> bool {
        self.generic.is_some()
    }

    pub fn generic_signature(&self) -> Option<&str> {
        self.generic.as_deref()
    }
}

impl PropertyDescriptor {
    /// Resolve and cache the property type.
    ///
    /// The setter parameter is preferred over the getter return. When both
    /// exist with different types the more specific one is used; when
    /// neither is assignable to the other the property is rejected.
    pub fn resolve_type<H>(&mut self, hierarchy: &H) -> MaterializeResult<&PropertyType>
    where
        H: TypeHierarchy + ?Sized,
    {
        if self.resolved.is_none() {
            let resolved = self.compute_type(hierarchy)?;
            self.resolved = Some(resolved);
        }
        self.resolved
            .as_ref()
            .ok_or_else(|| MaterializeError::Construction {
                message: format!("property '{}' has no resolved type", self.name()),
            })
    }

    fn compute_type<H>(&self, hierarchy: &H) -> MaterializeResult<PropertyType>
    where
        H: TypeHierarchy + ?Sized,
    {
        let from_getter = self.getter().map(|m| &m.ret);
        let from_setter = self.setter().and_then(|m| m.params.first());

        let chosen = match (from_getter, from_setter) {
            (None, None) => {
                return Err(MaterializeError::Construction {
                    message: format!("property '{}' has neither getter nor setter", self.name()),
                })
            }
            (Some(getter), None) => getter.clone(),
            (None, Some(setter)) => setter.clone(),
            (Some(getter), Some(setter)) if getter.erased == setter.erased => {
                if setter.has_generics() || !getter.has_generics() {
                    setter.clone()
                } else {
                    getter.clone()
                }
            }
            (Some(getter), Some(setter)) => {
                if hierarchy.is_assignable_from(&getter.erased, &setter.erased) {
                    setter.clone()
                } else if hierarchy.is_assignable_from(&setter.erased, &getter.erased) {
                    getter.clone()
                } else {
                    return Err(MaterializeError::TypeConflict {
                        property: self.name().to_string(),
                        getter_type: getter.erased.source_name(),
                        setter_type: setter.erased.source_name(),
                    });
                }
            }
        };
        PropertyType::from_type_ref(self.name(), &chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{MethodDescriptor, TypeDescriptor, TypeUniverse};
    use crate::materialize::registry::{discover_properties, BuildContext};

    fn context_for(universe: &mut TypeUniverse, methods: Vec<MethodDescriptor>) -> BuildContext {
        let mut ty = TypeDescriptor::interface("demo/Bean");
        for method in methods {
            ty = ty.method(method);
        }
        universe.insert(ty);
        let bean = universe.get("demo/Bean").unwrap();
        discover_properties(&*universe, bean, false).unwrap()
    }

    #[test]
    fn test_setter_type_preferred_when_more_specific() {
        let mut universe = TypeUniverse::new();
        let mut context = context_for(
            &mut universe,
            vec![
                MethodDescriptor::new("getValue", vec![], JvmType::object()),
                MethodDescriptor::new("setValue", vec![JvmType::string()], JvmType::Void),
            ],
        );
        let prop = &mut context.properties_mut()[0];
        let resolved = prop.resolve_type(&universe).unwrap();
        assert_eq!(resolved.erased, JvmType::string());
        assert_eq!(resolved.opcode_class, OpcodeClass::Reference);
    }

    #[test]
    fn test_getter_type_used_when_more_specific() {
        let mut universe = TypeUniverse::new();
        let mut context = context_for(
            &mut universe,
            vec![
                MethodDescriptor::new("getCount", vec![], JvmType::reference("java/lang/Integer")),
                MethodDescriptor::new(
                    "setCount",
                    vec![JvmType::reference("java/lang/Number")],
                    JvmType::Void,
                ),
            ],
        );
        let prop = &mut context.properties_mut()[0];
        assert_eq!(
            prop.resolve_type(&universe).unwrap().erased,
            JvmType::reference("java/lang/Integer")
        );
    }

    #[test]
    fn test_incompatible_types_conflict() {
        let mut universe = TypeUniverse::new();
        let mut context = context_for(
            &mut universe,
            vec![
                MethodDescriptor::new("getSize", vec![], JvmType::Int),
                MethodDescriptor::new("setSize", vec![JvmType::string()], JvmType::Void),
            ],
        );
        let prop = &mut context.properties_mut()[0];
        match prop.resolve_type(&universe).unwrap_err() {
            MaterializeError::TypeConflict {
                property,
                getter_type,
                setter_type,
            } => {
                assert_eq!(property, "size");
                assert_eq!(getter_type, "int");
                assert_eq!(setter_type, "java.lang.String");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_void_getter_is_invalid() {
        let mut universe = TypeUniverse::new();
        let mut context = context_for(
            &mut universe,
            vec![MethodDescriptor::new("getNothing", vec![], JvmType::Void)],
        );
        let prop = &mut context.properties_mut()[0];
        assert!(matches!(
            prop.resolve_type(&universe),
            Err(MaterializeError::InvalidPropertyType { .. })
        ));
    }

    #[test]
    fn test_generics_and_memoization() {
        let mut universe = TypeUniverse::new();
        let mut context = context_for(
            &mut universe,
            vec![MethodDescriptor::new("getTags", vec![], JvmType::reference("java/util/List"))
                .with_generic_return("Ljava/util/List<Ljava/lang/String;>;")],
        );
        let prop = &mut context.properties_mut()[0];
        assert!(prop.resolved_type().is_none());
        let resolved = prop.resolve_type(&universe).unwrap().clone();
        assert!(resolved.has_generics());
        assert_eq!(
            resolved.generic_signature(),
            Some("Ljava/util/List<Ljava/lang/String;>;")
        );
        assert_eq!(prop.resolved_type(), Some(&resolved));
    }
}
