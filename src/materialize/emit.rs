use rustc_hash::FxHashSet;
use tracing::debug;

use crate::descriptor::{method_descriptor, simple_class_name, source_to_internal_name, JvmType};
use crate::error::{MaterializeError, MaterializeResult};
use crate::introspect::{MethodDescriptor, TypeDescriptor, TypeHierarchy, OBJECT};

use super::classify::{getter_name, setter_name};
use super::model::{ClassModel, FieldModel, MethodBody, MethodModel, SetterReturn};
use super::registry::{BuildContext, PropertyDescriptor};
use super::resolve::PropertyType;

const UNSUPPORTED_OPERATION: &str = "java/lang/UnsupportedOperationException";

/// Message carried by the exception a stub throws.
pub fn unimplemented_message(method: &str) -> String {
    format!("Unimplemented method '{method}' (not a setter/getter, could not materialize)")
}

/// Name+descriptor pairs already generated, to reject duplicate members.
struct MemberSet {
    seen: FxHashSet<(String, String)>,
    owner: String,
}

impl MemberSet {
    fn insert(&mut self, method: &MethodModel) -> MaterializeResult<()> {
        if method.body == MethodBody::PassthroughOriginal {
            return Ok(());
        }
        if !self
            .seen
            .insert((method.name.clone(), method.descriptor.clone()))
        {
            return Err(MaterializeError::Construction {
                message: format!(
                    "duplicate method {}{} in {}",
                    method.name, method.descriptor, self.owner
                ),
            });
        }
        Ok(())
    }
}

/// Turn the discovered properties and unsupported methods of `ty` into the
/// model of a class named `class_name` (dotted or internal).
pub fn build_class_model<H>(
    hierarchy: &H,
    ty: &TypeDescriptor,
    context: &mut BuildContext,
    class_name: &str,
    sort_members: bool,
) -> MaterializeResult<ClassModel>
where
    H: TypeHierarchy + ?Sized,
{
    let internal = source_to_internal_name(class_name);
    let (super_name, interfaces) = if ty.is_interface() {
        (OBJECT.to_string(), vec![ty.name.clone()])
    } else {
        if !hierarchy.has_accessible_default_constructor(&ty.name) {
            return Err(MaterializeError::Construction {
                message: format!(
                    "{} has no accessible no-argument constructor to delegate to",
                    ty.source_name()
                ),
            });
        }
        (ty.name.clone(), Vec::new())
    };

    let mut members = MemberSet {
        seen: FxHashSet::default(),
        owner: internal.clone(),
    };
    let mut model = ClassModel {
        source_file: format!("{}.java", simple_class_name(&internal)),
        name: internal.clone(),
        super_name: super_name.clone(),
        interfaces,
        fields: Vec::new(),
        methods: Vec::new(),
    };

    let constructor = MethodModel {
        name: "<init>".into(),
        descriptor: "()V".into(),
        signature: None,
        body: MethodBody::DelegatingConstructor { super_name },
    };
    members.insert(&constructor)?;
    model.methods.push(constructor);

    let mut order: Vec<usize> = (0..context.properties().len()).collect();
    if sort_members {
        order.sort_by(|&a, &b| context.properties()[a].name().cmp(context.properties()[b].name()));
    }
    for index in order {
        let property = &mut context.properties_mut()[index];
        let prop_type = property.resolve_type(hierarchy)?.clone();

        model.fields.push(FieldModel {
            name: property.field_name().to_string(),
            ty: prop_type.erased.clone(),
            signature: prop_type.generic.clone(),
        });

        for method in [
            getter_model(&internal, property, &prop_type),
            setter_model(hierarchy, ty, &internal, property, &prop_type),
        ] {
            members.insert(&method)?;
            model.methods.push(method);
        }
    }

    let mut stubs: Vec<&MethodDescriptor> = context.unsupported_methods().iter().collect();
    if sort_members {
        stubs.sort_by(|a, b| a.name.cmp(&b.name));
    }
    for method in stubs {
        let stub = MethodModel {
            name: method.name.clone(),
            descriptor: method.descriptor(),
            signature: None,
            body: MethodBody::ThrowingStub {
                exception: UNSUPPORTED_OPERATION.into(),
                message: unimplemented_message(&method.name),
            },
        };
        members.insert(&stub)?;
        model.methods.push(stub);
    }

    debug!(
        class_name = %model.name,
        fields = model.fields.len(),
        methods = model.generated_methods().count(),
        "class model built"
    );
    Ok(model)
}

fn getter_model(owner: &str, property: &PropertyDescriptor, prop_type: &PropertyType) -> MethodModel {
    let declared = property.getter();
    let (name, return_type) = match declared {
        Some(getter) => (getter.name.clone(), getter.ret.erased.clone()),
        None => (getter_name(property.name()), prop_type.erased.clone()),
    };
    let descriptor = match declared {
        Some(getter) => getter.descriptor(),
        None => method_descriptor(&[], &return_type),
    };
    if property.has_concrete_getter() {
        return passthrough(name, descriptor);
    }
    let signature = generic_for(prop_type, &return_type).map(|g| format!("(){g}"));
    MethodModel {
        name,
        descriptor,
        signature,
        body: MethodBody::FieldGetter {
            owner: owner.to_string(),
            field: property.field_name().to_string(),
            field_type: prop_type.erased.clone(),
            return_type,
        },
    }
}

fn setter_model<H>(
    hierarchy: &H,
    ty: &TypeDescriptor,
    owner: &str,
    property: &PropertyDescriptor,
    prop_type: &PropertyType,
) -> MethodModel
where
    H: TypeHierarchy + ?Sized,
{
    let declared = property.setter();
    let (name, param_type) = match declared.and_then(|s| s.params.first().map(|p| (s, p))) {
        Some((setter, param)) => (setter.name.clone(), param.erased.clone()),
        None => (setter_name(property.name()), prop_type.erased.clone()),
    };
    let descriptor = match declared {
        Some(setter) => setter.descriptor(),
        None => method_descriptor(&[param_type.clone()], &JvmType::Void),
    };
    if property.has_concrete_setter() {
        return passthrough(name, descriptor);
    }
    let return_type = declared.map_or(JvmType::Void, |s| s.ret.erased.clone());
    // a `(T)V` signature would contradict a non-void declared return
    let signature = match return_type {
        JvmType::Void => generic_for(prop_type, &param_type).map(|g| format!("({g})V")),
        _ => None,
    };
    let returns = match return_type {
        JvmType::Void => SetterReturn::Void,
        ret if hierarchy.is_assignable_from(&ret, &JvmType::Reference(ty.name.clone())) => {
            SetterReturn::This
        }
        ret => SetterReturn::Default(ret),
    };
    MethodModel {
        name,
        descriptor,
        signature,
        body: MethodBody::FieldSetter {
            owner: owner.to_string(),
            field: property.field_name().to_string(),
            field_type: prop_type.erased.clone(),
            param_type,
            returns,
        },
    }
}

fn generic_for<'a>(prop_type: &'a PropertyType, declared: &JvmType) -> Option<&'a str> {
    if &prop_type.erased != declared {
        return None;
    }
    prop_type.generic_signature()
}

fn passthrough(name: String, descriptor: String) -> MethodModel {
    MethodModel {
        name,
        descriptor,
        signature: None,
        body: MethodBody::PassthroughOriginal,
    }
}
