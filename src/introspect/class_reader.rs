use crate::attribute_info::{AttributeInfo, SignatureAttribute};
use crate::error::{MaterializeError, MaterializeResult};
use crate::method_info::MethodAccessFlags;
use crate::{ClassAccessFlags, ClassFile};

use super::types::{MethodDescriptor, TypeDescriptor, TypeKind};

fn malformed(message: &str) -> MaterializeError {
    MaterializeError::MalformedClass {
        message: message.to_string(),
    }
}

fn read_signature(class_file: &ClassFile, attributes: &[AttributeInfo]) -> Option<String> {
    let attr = class_file.find_attribute(attributes, "Signature")?;
    let sig: SignatureAttribute = attr.decode().ok()?;
    class_file.get_utf8(sig.signature_index)
}

impl TypeDescriptor {
    /// Build a descriptor from compiled class-file data.
    ///
    /// Constructors, class initializers, static, synthetic and bridge methods
    /// are not part of the instance method surface and are left out.
    pub fn from_class_file(class_file: &ClassFile) -> MaterializeResult<Self> {
        let name = class_file
            .this_class_name()
            .ok_or_else(|| malformed("this_class does not name a class"))?;
        let flags = class_file.access_flags;
        let kind = if flags.contains(ClassAccessFlags::INTERFACE) {
            TypeKind::Interface
        } else if flags.contains(ClassAccessFlags::ABSTRACT) {
            TypeKind::AbstractClass
        } else {
            TypeKind::Class
        };

        let mut methods = Vec::new();
        let mut default_constructor = false;
        for method in &class_file.methods {
            let method_name = class_file
                .get_utf8(method.name_index)
                .ok_or_else(|| malformed("method name is not a Utf8 constant"))?;
            let descriptor = class_file
                .get_utf8(method.descriptor_index)
                .ok_or_else(|| malformed("method descriptor is not a Utf8 constant"))?;
            let access = method.access_flags;

            if method_name == "<init>" {
                if descriptor == "()V"
                    && access.intersects(MethodAccessFlags::PUBLIC | MethodAccessFlags::PROTECTED)
                {
                    default_constructor = true;
                }
                continue;
            }
            if method_name == "<clinit>"
                || access.intersects(
                    MethodAccessFlags::STATIC
                        | MethodAccessFlags::SYNTHETIC
                        | MethodAccessFlags::BRIDGE,
                )
            {
                continue;
            }

            let signature = read_signature(class_file, &method.attributes);
            let mut parsed =
                MethodDescriptor::parse(method_name, &descriptor, signature.as_deref())?;
            parsed.concrete = !access.contains(MethodAccessFlags::ABSTRACT);
            methods.push(parsed);
        }

        Ok(TypeDescriptor {
            name,
            kind,
            public: flags.contains(ClassAccessFlags::PUBLIC),
            super_name: class_file.super_class_name(),
            interfaces: class_file.interface_names(),
            methods,
            default_constructor,
            signature: read_signature(class_file, &class_file.attributes),
        })
    }
}
