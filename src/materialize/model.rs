//! In-memory form of a generated class, independent of the binary encoding.

use crate::descriptor::JvmType;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassModel {
    /// Internal name of the generated class.
    pub name: String,
    pub super_name: String,
    pub interfaces: Vec<String>,
    pub source_file: String,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
}

/// A public instance field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldModel {
    pub name: String,
    pub ty: JvmType,
    pub signature: Option<String>,
}

impl FieldModel {
    pub fn descriptor(&self) -> String {
        self.ty.to_descriptor()
    }
}

/// A public method and what its body does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodModel {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub body: MethodBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodBody {
    /// `super()` and return.
    DelegatingConstructor { super_name: String },
    /// Return the value of `owner.field`.
    FieldGetter {
        owner: String,
        field: String,
        field_type: JvmType,
        return_type: JvmType,
    },
    /// Store the single argument into `owner.field`, narrowing it first when
    /// the declared parameter type is wider than the field.
    FieldSetter {
        owner: String,
        field: String,
        field_type: JvmType,
        param_type: JvmType,
        returns: SetterReturn,
    },
    /// Throw `exception` constructed with `message`.
    ThrowingStub { exception: String, message: String },
    /// Inherited implementation is kept; nothing is generated.
    PassthroughOriginal,
}

/// What a setter hands back after storing its argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetterReturn {
    Void,
    /// Fluent setter: the declared return type accepts the generated class.
    This,
    /// Zero, `false` or `null` of the declared return type.
    Default(JvmType),
}

impl ClassModel {
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodModel> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Methods that produce a member in the generated class.
    pub fn generated_methods(&self) -> impl Iterator<Item = &MethodModel> {
        self.methods
            .iter()
            .filter(|m| m.body != MethodBody::PassthroughOriginal)
    }
}
