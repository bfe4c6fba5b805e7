use tracing::trace;

use crate::attribute_info::{AttributeInfo, CodeAttribute, SignatureAttribute, SourceFileAttribute};
use crate::code_attribute::{encode_instructions, Instruction};
use crate::constant_info::ConstantInfo;
use crate::descriptor::{parse_method_descriptor, JvmType, OpcodeClass};
use crate::error::{MaterializeError, MaterializeResult};
use crate::field_info::{FieldAccessFlags, FieldInfo};
use crate::materialize::{ClassModel, MethodBody, MethodModel, SetterReturn};
use crate::method_info::{MethodAccessFlags, MethodInfo};
use crate::{ClassAccessFlags, ClassFile};

use super::{Backend, BackendOptions};

/// Highest pool index a class file can address.
const MAX_POOL_ENTRIES: usize = u16::MAX as usize - 1;

/// A `CONSTANT_Utf8` length is a `u16`.
const MAX_UTF8_BYTES: usize = u16::MAX as usize;

/// Writes class models as JVM class files.
#[derive(Clone, Debug, Default)]
pub struct ClassFileBackend {
    options: BackendOptions,
}

/// Lowered method body with its exact frame requirements.
struct Lowered {
    instructions: Vec<Instruction>,
    max_stack: u16,
    max_locals: u16,
}

impl ClassFileBackend {
    pub fn new(options: BackendOptions) -> Self {
        ClassFileBackend { options }
    }

    pub fn options(&self) -> &BackendOptions {
        &self.options
    }
}

impl Backend for ClassFileBackend {
    fn render(&self, model: &ClassModel) -> MaterializeResult<Vec<u8>> {
        let mut class_file = ClassFile::new(self.options.major_version);
        class_file.access_flags = ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER;
        class_file.this_class = class_file.get_or_add_class(&model.name);
        class_file.super_class = class_file.get_or_add_class(&model.super_name);
        for interface in &model.interfaces {
            let index = class_file.get_or_add_class(interface);
            class_file.interfaces.push(index);
        }

        for field in &model.fields {
            let name_index = class_file.get_or_add_utf8(&field.name);
            let descriptor_index = class_file.get_or_add_utf8(&field.descriptor());
            let mut info = FieldInfo::new(FieldAccessFlags::PUBLIC, name_index, descriptor_index);
            if let Some(signature) = &field.signature {
                info.attributes
                    .push(signature_attribute(&mut class_file, signature)?);
            }
            class_file.fields.push(info);
        }

        for method in model.generated_methods() {
            let info = render_method(&mut class_file, method)?;
            class_file.methods.push(info);
        }

        let source_name = class_file.get_or_add_utf8("SourceFile");
        let sourcefile_index = class_file.get_or_add_utf8(&model.source_file);
        class_file.attributes.push(AttributeInfo::encode(
            source_name,
            &SourceFileAttribute { sourcefile_index },
        )?);

        let oversized = class_file.const_pool.iter().find_map(|constant| match constant {
            ConstantInfo::Utf8(utf8) if utf8.bytes.len() > MAX_UTF8_BYTES => Some(utf8.bytes.len()),
            _ => None,
        });
        if let Some(length) = oversized {
            return Err(MaterializeError::Construction {
                message: format!(
                    "a constant of {} encodes to {length} bytes, more than a class file can hold",
                    model.name
                ),
            });
        }
        if class_file.const_pool.len() > MAX_POOL_ENTRIES {
            return Err(MaterializeError::Construction {
                message: format!(
                    "constant pool of {} needs {} entries, more than a class file can hold",
                    model.name,
                    class_file.const_pool.len()
                ),
            });
        }
        class_file.sync_counts();
        trace!(
            class_name = %model.name,
            pool_entries = class_file.const_pool.len(),
            fields = class_file.fields.len(),
            methods = class_file.methods.len(),
            "class file assembled"
        );
        Ok(class_file.to_bytes()?)
    }
}

fn signature_attribute(class_file: &mut ClassFile, signature: &str) -> MaterializeResult<AttributeInfo> {
    let name_index = class_file.get_or_add_utf8("Signature");
    let signature_index = class_file.get_or_add_utf8(signature);
    Ok(AttributeInfo::encode(
        name_index,
        &SignatureAttribute { signature_index },
    )?)
}

fn render_method(class_file: &mut ClassFile, method: &MethodModel) -> MaterializeResult<MethodInfo> {
    let name_index = class_file.get_or_add_utf8(&method.name);
    let descriptor_index = class_file.get_or_add_utf8(&method.descriptor);
    let mut info = MethodInfo::new(MethodAccessFlags::PUBLIC, name_index, descriptor_index);

    let lowered = lower_body(class_file, method)?;
    let code = encode_instructions(&lowered.instructions)?;
    trace!(
        method = %method.name,
        descriptor = %method.descriptor,
        code_length = code.len(),
        max_stack = lowered.max_stack,
        max_locals = lowered.max_locals,
        "method lowered"
    );
    let code_name = class_file.get_or_add_utf8("Code");
    info.attributes.push(AttributeInfo::encode(
        code_name,
        &CodeAttribute::new(lowered.max_stack, lowered.max_locals, code),
    )?);
    if let Some(signature) = &method.signature {
        info.attributes
            .push(signature_attribute(class_file, signature)?);
    }
    Ok(info)
}

fn lower_body(class_file: &mut ClassFile, method: &MethodModel) -> MaterializeResult<Lowered> {
    let lowered = match &method.body {
        MethodBody::DelegatingConstructor { super_name } => {
            let init = class_file.get_or_add_method_ref(super_name, "<init>", "()V");
            Lowered {
                instructions: vec![
                    Instruction::Aload0,
                    Instruction::Invokespecial(init),
                    Instruction::Return,
                ],
                max_stack: 1,
                max_locals: 1,
            }
        }
        MethodBody::FieldGetter {
            owner,
            field,
            field_type,
            return_type,
        } => {
            let field_ref =
                class_file.get_or_add_field_ref(owner, field, &field_type.to_descriptor());
            Lowered {
                instructions: vec![
                    Instruction::Aload0,
                    Instruction::Getfield(field_ref),
                    return_instruction(opcode_class(method, return_type)?),
                ],
                max_stack: field_type.slot_width().max(1),
                max_locals: 1,
            }
        }
        MethodBody::FieldSetter {
            owner,
            field,
            field_type,
            param_type,
            returns,
        } => {
            let mut instructions = vec![
                Instruction::Aload0,
                load_first_argument(opcode_class(method, param_type)?),
            ];
            if param_type != field_type && field_type.is_reference() {
                if let Some(target) = field_type.class_constant_name() {
                    instructions.push(Instruction::Checkcast(class_file.get_or_add_class(&target)));
                }
            }
            let field_ref =
                class_file.get_or_add_field_ref(owner, field, &field_type.to_descriptor());
            instructions.push(Instruction::Putfield(field_ref));
            let mut max_stack = 1 + param_type.slot_width();
            match returns {
                SetterReturn::Void => instructions.push(Instruction::Return),
                SetterReturn::This => {
                    instructions.push(Instruction::Aload0);
                    instructions.push(Instruction::Areturn);
                }
                SetterReturn::Default(ty) => {
                    let class = opcode_class(method, ty)?;
                    instructions.push(push_default(class));
                    instructions.push(return_instruction(class));
                    max_stack = max_stack.max(ty.slot_width());
                }
            }
            Lowered {
                instructions,
                max_stack,
                max_locals: 1 + param_type.slot_width(),
            }
        }
        MethodBody::ThrowingStub { exception, message } => {
            let (params, _) = parse_method_descriptor(&method.descriptor).ok_or_else(|| {
                MaterializeError::InvalidMethod {
                    name: method.name.clone(),
                    descriptor: method.descriptor.clone(),
                }
            })?;
            let class_index = class_file.get_or_add_class(exception);
            let message_index = class_file.get_or_add_string(message);
            let init =
                class_file.get_or_add_method_ref(exception, "<init>", "(Ljava/lang/String;)V");
            let ldc = match u8::try_from(message_index) {
                Ok(index) => Instruction::Ldc(index),
                Err(_) => Instruction::LdcW(message_index),
            };
            Lowered {
                instructions: vec![
                    Instruction::New(class_index),
                    Instruction::Dup,
                    ldc,
                    Instruction::Invokespecial(init),
                    Instruction::Athrow,
                ],
                max_stack: 3,
                max_locals: 1 + params.iter().map(JvmType::slot_width).sum::<u16>(),
            }
        }
        MethodBody::PassthroughOriginal => {
            return Err(MaterializeError::Construction {
                message: format!("{}{} has no generated body", method.name, method.descriptor),
            })
        }
    };
    Ok(lowered)
}

fn opcode_class(method: &MethodModel, ty: &JvmType) -> MaterializeResult<OpcodeClass> {
    ty.opcode_class().ok_or_else(|| MaterializeError::InvalidMethod {
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
    })
}

fn load_first_argument(class: OpcodeClass) -> Instruction {
    match class {
        OpcodeClass::Int => Instruction::Iload1,
        OpcodeClass::Long => Instruction::Lload1,
        OpcodeClass::Float => Instruction::Fload1,
        OpcodeClass::Double => Instruction::Dload1,
        OpcodeClass::Reference => Instruction::Aload1,
    }
}

fn push_default(class: OpcodeClass) -> Instruction {
    match class {
        OpcodeClass::Int => Instruction::Iconst0,
        OpcodeClass::Long => Instruction::Lconst0,
        OpcodeClass::Float => Instruction::Fconst0,
        OpcodeClass::Double => Instruction::Dconst0,
        OpcodeClass::Reference => Instruction::AconstNull,
    }
}

fn return_instruction(class: OpcodeClass) -> Instruction {
    match class {
        OpcodeClass::Int => Instruction::Ireturn,
        OpcodeClass::Long => Instruction::Lreturn,
        OpcodeClass::Float => Instruction::Freturn,
        OpcodeClass::Double => Instruction::Dreturn,
        OpcodeClass::Reference => Instruction::Areturn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_attribute::decode_instructions;
    use crate::materialize::FieldModel;

    fn model(methods: Vec<MethodModel>) -> ClassModel {
        ClassModel {
            name: "gen/Bean".into(),
            super_name: "java/lang/Object".into(),
            interfaces: vec!["demo/Bean".into()],
            source_file: "Bean.java".into(),
            fields: vec![FieldModel {
                name: "size".into(),
                ty: JvmType::Long,
                signature: None,
            }],
            methods,
        }
    }

    fn code_of(class_file: &ClassFile, name: &str) -> CodeAttribute {
        let method = class_file
            .methods
            .iter()
            .find(|m| class_file.get_utf8(m.name_index).as_deref() == Some(name))
            .unwrap();
        class_file
            .find_attribute(&method.attributes, "Code")
            .unwrap()
            .decode()
            .unwrap()
    }

    #[test]
    fn test_header_and_members() {
        let bytes = ClassFileBackend::default()
            .render(&model(vec![MethodModel {
                name: "<init>".into(),
                descriptor: "()V".into(),
                signature: None,
                body: MethodBody::DelegatingConstructor {
                    super_name: "java/lang/Object".into(),
                },
            }]))
            .unwrap();
        assert_eq!(&bytes[..4], &[0xca, 0xfe, 0xba, 0xbe]);

        let class_file = ClassFile::from_bytes(&bytes).unwrap();
        assert_eq!(class_file.major_version, 52);
        assert_eq!(
            class_file.access_flags,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER
        );
        assert_eq!(class_file.this_class_name().as_deref(), Some("gen/Bean"));
        assert_eq!(class_file.super_class_name().as_deref(), Some("java/lang/Object"));
        assert_eq!(class_file.interface_names(), vec!["demo/Bean"]);
        assert_eq!(class_file.fields.len(), 1);
        assert_eq!(class_file.get_utf8(class_file.fields[0].descriptor_index).as_deref(), Some("J"));

        let code = code_of(&class_file, "<init>");
        assert_eq!((code.max_stack, code.max_locals), (1, 1));
        let source: SourceFileAttribute = class_file
            .find_attribute(&class_file.attributes, "SourceFile")
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(class_file.get_utf8(source.sourcefile_index).as_deref(), Some("Bean.java"));
    }

    #[test]
    fn test_wide_accessors() {
        let methods = vec![
            MethodModel {
                name: "getSize".into(),
                descriptor: "()J".into(),
                signature: None,
                body: MethodBody::FieldGetter {
                    owner: "gen/Bean".into(),
                    field: "size".into(),
                    field_type: JvmType::Long,
                    return_type: JvmType::Long,
                },
            },
            MethodModel {
                name: "setSize".into(),
                descriptor: "(J)V".into(),
                signature: None,
                body: MethodBody::FieldSetter {
                    owner: "gen/Bean".into(),
                    field: "size".into(),
                    field_type: JvmType::Long,
                    param_type: JvmType::Long,
                    returns: SetterReturn::Void,
                },
            },
        ];
        let bytes = ClassFileBackend::default().render(&model(methods)).unwrap();
        let class_file = ClassFile::from_bytes(&bytes).unwrap();

        let getter = code_of(&class_file, "getSize");
        assert_eq!((getter.max_stack, getter.max_locals), (2, 1));
        let instructions = decode_instructions(&getter.code).unwrap();
        assert!(matches!(
            instructions.as_slice(),
            [Instruction::Aload0, Instruction::Getfield(_), Instruction::Lreturn]
        ));

        let setter = code_of(&class_file, "setSize");
        assert_eq!((setter.max_stack, setter.max_locals), (3, 3));
        let instructions = decode_instructions(&setter.code).unwrap();
        assert!(matches!(
            instructions.as_slice(),
            [Instruction::Aload0, Instruction::Lload1, Instruction::Putfield(_), Instruction::Return]
        ));
    }

    #[test]
    fn test_narrowing_setter_and_stub() {
        let methods = vec![
            MethodModel {
                name: "setName".into(),
                descriptor: "(Ljava/lang/Object;)V".into(),
                signature: None,
                body: MethodBody::FieldSetter {
                    owner: "gen/Bean".into(),
                    field: "name".into(),
                    field_type: JvmType::string(),
                    param_type: JvmType::object(),
                    returns: SetterReturn::Void,
                },
            },
            MethodModel {
                name: "compute".into(),
                descriptor: "(JI)D".into(),
                signature: None,
                body: MethodBody::ThrowingStub {
                    exception: "java/lang/UnsupportedOperationException".into(),
                    message: "nope".into(),
                },
            },
        ];
        let bytes = ClassFileBackend::default().render(&model(methods)).unwrap();
        let class_file = ClassFile::from_bytes(&bytes).unwrap();

        let setter = decode_instructions(&code_of(&class_file, "setName").code).unwrap();
        match setter.as_slice() {
            [Instruction::Aload0, Instruction::Aload1, Instruction::Checkcast(index), Instruction::Putfield(_), Instruction::Return] => {
                assert_eq!(class_file.get_class_name(*index).as_deref(), Some("java/lang/String"));
            }
            other => panic!("unexpected setter body: {other:?}"),
        }

        let stub = code_of(&class_file, "compute");
        assert_eq!((stub.max_stack, stub.max_locals), (3, 4));
        let instructions = decode_instructions(&stub.code).unwrap();
        assert_eq!(instructions.len(), 5);
        assert_eq!(instructions[1], Instruction::Dup);
        assert_eq!(instructions[4], Instruction::Athrow);
    }

    fn setter(name: &str, descriptor: &str, returns: SetterReturn) -> MethodModel {
        MethodModel {
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            body: MethodBody::FieldSetter {
                owner: "gen/Bean".into(),
                field: "size".into(),
                field_type: JvmType::Long,
                param_type: JvmType::Long,
                returns,
            },
        }
    }

    #[test]
    fn test_setters_with_return_values() {
        let methods = vec![
            setter("withSize", "(J)Ldemo/Bean;", SetterReturn::This),
            setter("setSize", "(J)J", SetterReturn::Default(JvmType::Long)),
            setter("putSize", "(J)Ljava/lang/String;", SetterReturn::Default(JvmType::string())),
            setter("markSize", "(J)Z", SetterReturn::Default(JvmType::Boolean)),
        ];
        let bytes = ClassFileBackend::default().render(&model(methods)).unwrap();
        let class_file = ClassFile::from_bytes(&bytes).unwrap();

        let tail = |name: &str| {
            let code = code_of(&class_file, name);
            let instructions = decode_instructions(&code.code).unwrap();
            assert!(matches!(instructions[2], Instruction::Putfield(_)));
            (instructions[3..].to_vec(), code.max_stack, code.max_locals)
        };
        assert_eq!(
            tail("withSize"),
            (vec![Instruction::Aload0, Instruction::Areturn], 3, 3)
        );
        assert_eq!(
            tail("setSize"),
            (vec![Instruction::Lconst0, Instruction::Lreturn], 3, 3)
        );
        assert_eq!(
            tail("putSize"),
            (vec![Instruction::AconstNull, Instruction::Areturn], 3, 3)
        );
        assert_eq!(
            tail("markSize"),
            (vec![Instruction::Iconst0, Instruction::Ireturn], 3, 3)
        );
    }

    #[test]
    fn test_oversized_constant_is_rejected() {
        let methods = vec![MethodModel {
            name: "explain".into(),
            descriptor: "()V".into(),
            signature: None,
            body: MethodBody::ThrowingStub {
                exception: "java/lang/UnsupportedOperationException".into(),
                message: "x".repeat(70_000),
            },
        }];
        match ClassFileBackend::default().render(&model(methods)) {
            Err(MaterializeError::Construction { message }) => assert!(message.contains("70000")),
            other => panic!("expected construction error, got {other:?}"),
        }
    }

    #[test]
    fn test_passthrough_is_not_rendered() {
        let methods = vec![MethodModel {
            name: "getId".into(),
            descriptor: "()J".into(),
            signature: None,
            body: MethodBody::PassthroughOriginal,
        }];
        let bytes = ClassFileBackend::default().render(&model(methods)).unwrap();
        let class_file = ClassFile::from_bytes(&bytes).unwrap();
        assert!(class_file.methods.is_empty());
    }

    #[test]
    fn test_configured_version() {
        let backend = ClassFileBackend::new(BackendOptions { major_version: 61 });
        let bytes = backend.render(&model(Vec::new())).unwrap();
        assert_eq!(ClassFile::from_bytes(&bytes).unwrap().major_version, 61);
    }
}
