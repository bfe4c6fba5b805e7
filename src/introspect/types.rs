use crate::descriptor::{
    internal_to_source_name, method_descriptor, parse_method_descriptor, JvmType,
};
use crate::error::{MaterializeError, MaterializeResult};
use crate::signature::{contains_type_variable, is_valid_type_signature, parse_method_signature};

/// What sort of type a descriptor stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Pure abstract: no instance state, implementations go through `implements`.
    Interface,
    /// Partially implemented base class; implementations extend it.
    AbstractClass,
    Class,
}

/// A type as seen from a method signature: the erased JVM type plus the
/// generic signature it was declared with, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub erased: JvmType,
    pub generic: Option<String>,
}

impl TypeRef {
    pub fn new(erased: JvmType) -> Self {
        TypeRef {
            erased,
            generic: None,
        }
    }

    pub fn descriptor(&self) -> String {
        self.erased.to_descriptor()
    }

    /// The signature to carry into generated members, if the declaration had
    /// meaningful generic information. Type variables are dropped since the
    /// generated class does not declare them.
    pub fn generic_signature(&self) -> Option<&str> {
        let generic = self.generic.as_deref()?;
        if generic == self.descriptor()
            || contains_type_variable(generic)
            || !is_valid_type_signature(generic)
        {
            return None;
        }
        Some(generic)
    }

    pub fn has_generics(&self) -> bool {
        self.generic_signature().is_some()
    }
}

impl From<JvmType> for TypeRef {
    fn from(erased: JvmType) -> Self {
        TypeRef::new(erased)
    }
}

/// One declared method of a type or one of its ancestors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub ret: TypeRef,
    /// The method has a body.
    pub concrete: bool,
    /// The method declares its own type parameters.
    pub declares_generics: bool,
    pub signature: Option<String>,
}

impl MethodDescriptor {
    /// An abstract method with no generic information.
    pub fn new(name: impl Into<String>, params: Vec<JvmType>, ret: JvmType) -> Self {
        MethodDescriptor {
            name: name.into(),
            params: params.into_iter().map(TypeRef::new).collect(),
            ret: TypeRef::new(ret),
            concrete: false,
            declares_generics: false,
            signature: None,
        }
    }

    /// Build from a JVM descriptor and an optional generic signature. A
    /// signature that does not line up with the descriptor is ignored.
    pub fn parse(
        name: impl Into<String>,
        descriptor: &str,
        signature: Option<&str>,
    ) -> MaterializeResult<Self> {
        let name = name.into();
        let (params, ret) =
            parse_method_descriptor(descriptor).ok_or_else(|| MaterializeError::InvalidMethod {
                name: name.clone(),
                descriptor: descriptor.to_string(),
            })?;
        let mut method = MethodDescriptor::new(name, params, ret);

        let parsed = signature.and_then(parse_method_signature);
        if let Some(sig) = parsed.filter(|s| s.params.len() == method.params.len()) {
            for (param, generic) in method.params.iter_mut().zip(&sig.params) {
                param.generic = Some(generic.clone());
            }
            method.ret.generic = Some(sig.ret.clone());
            method.declares_generics = sig.declares_generics();
            method.signature = signature.map(str::to_string);
        }
        Ok(method)
    }

    /// Mark the method as having a body.
    pub fn implemented(mut self) -> Self {
        self.concrete = true;
        self
    }

    /// Attach a generic type to parameter `index`.
    pub fn with_generic_param(mut self, index: usize, generic: impl Into<String>) -> Self {
        if let Some(param) = self.params.get_mut(index) {
            param.generic = Some(generic.into());
        }
        self
    }

    pub fn with_generic_return(mut self, generic: impl Into<String>) -> Self {
        self.ret.generic = Some(generic.into());
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn descriptor(&self) -> String {
        let params: Vec<JvmType> = self.params.iter().map(|p| p.erased.clone()).collect();
        method_descriptor(&params, &self.ret.erased)
    }
}

/// The metadata of a class or interface needed to materialize it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Internal name, e.g. `com/example/Bean`.
    pub name: String,
    pub kind: TypeKind,
    pub public: bool,
    /// `None` only for `java/lang/Object`.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    /// Declared instance methods in declaration order.
    pub methods: Vec<MethodDescriptor>,
    /// A public or protected `<init>()V` exists.
    pub default_constructor: bool,
    pub signature: Option<String>,
}

impl TypeDescriptor {
    fn with_kind(name: &str, kind: TypeKind, super_name: Option<String>) -> Self {
        TypeDescriptor {
            name: name.replace('.', "/"),
            kind,
            public: true,
            super_name,
            interfaces: Vec::new(),
            methods: Vec::new(),
            default_constructor: kind != TypeKind::Interface,
            signature: None,
        }
    }

    /// Accepts dotted or internal names.
    pub fn interface(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Interface, Some("java/lang/Object".into()))
    }

    pub fn abstract_class(name: &str) -> Self {
        Self::with_kind(name, TypeKind::AbstractClass, Some("java/lang/Object".into()))
    }

    pub fn class(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Class, Some("java/lang/Object".into()))
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.replace('.', "/"));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.replace('.', "/"));
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn non_public(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn without_default_constructor(mut self) -> Self {
        self.default_constructor = false;
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        self.kind != TypeKind::Class
    }

    /// Dotted name, e.g. `com.example.Bean`.
    pub fn source_name(&self) -> String {
        internal_to_source_name(&self.name)
    }

    pub fn as_type(&self) -> JvmType {
        JvmType::Reference(self.name.clone())
    }
}
