use std::io::Cursor;

use binrw::{binrw, BinRead, BinResult, BinWrite, Endian};
use rustc_hash::FxHashMap;

use crate::attribute_info::AttributeInfo;
use crate::constant_info::{
    ClassConstant, ConstantInfo, FieldRefConstant, MethodRefConstant, NameAndTypeConstant,
    StringConstant, Utf8Constant,
};
use crate::field_info::FieldInfo;
use crate::method_info::MethodInfo;

/// Class file major version for Java 8.
pub const JAVA_8: u16 = 52;

#[derive(Clone, Debug)]
#[binrw]
#[brw(big, magic = b"\xca\xfe\xba\xbe")]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub const_pool_size: u16,
    #[br(parse_with = parse_const_pool, args(const_pool_size))]
    #[bw(write_with = write_const_pool)]
    pub const_pool: Vec<ConstantInfo>,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces_count: u16,
    #[br(count = interfaces_count)]
    pub interfaces: Vec<u16>,
    pub fields_count: u16,
    #[br(count = fields_count)]
    pub fields: Vec<FieldInfo>,
    pub methods_count: u16,
    #[br(count = methods_count)]
    pub methods: Vec<MethodInfo>,
    pub attributes_count: u16,
    #[br(count = attributes_count)]
    pub attributes: Vec<AttributeInfo>,
    #[brw(ignore)]
    pool_index: PoolIndex,
}

/// Hashable identity of the pool entries `get_or_add_*` deduplicates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(Vec<u8>),
    Class(u16),
    String(u16),
    NameAndType(u16, u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
}

impl PoolKey {
    fn of(constant: &ConstantInfo) -> Option<PoolKey> {
        Some(match constant {
            ConstantInfo::Utf8(c) => PoolKey::Utf8(c.bytes.clone()),
            ConstantInfo::Class(c) => PoolKey::Class(c.name_index),
            ConstantInfo::String(c) => PoolKey::String(c.string_index),
            ConstantInfo::NameAndType(c) => PoolKey::NameAndType(c.name_index, c.descriptor_index),
            ConstantInfo::FieldRef(c) => PoolKey::FieldRef(c.class_index, c.name_and_type_index),
            ConstantInfo::MethodRef(c) => PoolKey::MethodRef(c.class_index, c.name_and_type_index),
            _ => return None,
        })
    }
}

/// Pool position of each deduplicated entry. Entries are indexed lazily, so a
/// parsed pool or one extended through `const_pool` directly is picked up on
/// the next insertion.
#[derive(Clone, Debug, Default)]
struct PoolIndex {
    positions: FxHashMap<PoolKey, u16>,
    indexed: usize,
}

impl PoolIndex {
    fn catch_up(&mut self, pool: &[ConstantInfo]) {
        if self.indexed > pool.len() {
            self.positions.clear();
            self.indexed = 0;
        }
        for (offset, constant) in pool[self.indexed..].iter().enumerate() {
            if let Some(key) = PoolKey::of(constant) {
                let index = (self.indexed + offset + 1) as u16;
                self.positions.entry(key).or_insert(index);
            }
        }
        self.indexed = pool.len();
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[binrw]
pub struct ClassAccessFlags(u16);

bitflags! {
    impl ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;     //	Declared public; may be accessed from outside its package.
        const FINAL = 0x0010;      //	Declared final; no subclasses allowed.
        const SUPER = 0x0020;      //	Treat superclass methods specially when invoked by the invokespecial instruction.
        const INTERFACE = 0x0200;  //	Is an interface, not a class.
        const ABSTRACT = 0x0400;   //	Declared abstract; must not be instantiated.
        const SYNTHETIC = 0x1000;  //	Declared synthetic; not present in the source code.
        const ANNOTATION = 0x2000; //	Declared as an annotation type.
        const ENUM = 0x4000;       //	Declared as an enum type.
        const MODULE = 0x8000;     //	Declared as a module type.
    }
}

/// Long and Double entries take two pool slots; the second is `Unusable`.
#[binrw::parser(reader, endian)]
fn parse_const_pool(const_pool_size: u16) -> BinResult<Vec<ConstantInfo>> {
    let count = const_pool_size.saturating_sub(1) as usize;
    let mut pool = Vec::with_capacity(count);
    while pool.len() < count {
        let constant = ConstantInfo::read_options(reader, endian, ())?;
        let wide = constant.is_wide();
        pool.push(constant);
        if wide {
            pool.push(ConstantInfo::Unusable);
        }
    }
    Ok(pool)
}

#[binrw::writer(writer, endian)]
fn write_const_pool(pool: &Vec<ConstantInfo>) -> BinResult<()> {
    for constant in pool {
        if matches!(constant, ConstantInfo::Unusable) {
            continue;
        }
        constant.write_options(writer, endian, ())?;
    }
    Ok(())
}

impl ClassFile {
    /// An empty class with no pool entries, members, or attributes.
    pub fn new(major_version: u16) -> Self {
        ClassFile {
            minor_version: 0,
            major_version,
            const_pool_size: 1,
            const_pool: Vec::new(),
            access_flags: ClassAccessFlags::empty(),
            this_class: 0,
            super_class: 0,
            interfaces_count: 0,
            interfaces: Vec::new(),
            fields_count: 0,
            fields: Vec::new(),
            methods_count: 0,
            methods: Vec::new(),
            attributes_count: 0,
            attributes: Vec::new(),
            pool_index: PoolIndex::default(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> BinResult<Self> {
        ClassFile::read(&mut Cursor::new(bytes))
    }

    pub fn to_bytes(&self) -> BinResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.write(&mut out)?;
        Ok(out.into_inner())
    }

    /// Recompute every `*_count` field from the backing vectors.
    pub fn sync_counts(&mut self) {
        self.const_pool_size = (self.const_pool.len() + 1) as u16;
        self.interfaces_count = self.interfaces.len() as u16;
        self.fields_count = self.fields.len() as u16;
        for field in &mut self.fields {
            field.attributes_count = field.attributes.len() as u16;
        }
        self.methods_count = self.methods.len() as u16;
        for method in &mut self.methods {
            method.attributes_count = method.attributes.len() as u16;
        }
        self.attributes_count = self.attributes.len() as u16;
    }

    // -- Constant pool lookup --

    pub fn get_constant(&self, index: u16) -> Option<&ConstantInfo> {
        self.const_pool.get((index as usize).checked_sub(1)?)
    }

    pub fn get_utf8(&self, index: u16) -> Option<String> {
        match self.get_constant(index)? {
            ConstantInfo::Utf8(u) => Some(u.to_string()),
            _ => None,
        }
    }

    /// Resolve a `CONSTANT_Class` index to its internal name.
    pub fn get_class_name(&self, index: u16) -> Option<String> {
        match self.get_constant(index)? {
            ConstantInfo::Class(c) => self.get_utf8(c.name_index),
            _ => None,
        }
    }

    pub fn this_class_name(&self) -> Option<String> {
        self.get_class_name(self.this_class)
    }

    /// `None` for `java/lang/Object` and `module-info`, which have no superclass.
    pub fn super_class_name(&self) -> Option<String> {
        if self.super_class == 0 {
            return None;
        }
        self.get_class_name(self.super_class)
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces
            .iter()
            .filter_map(|&i| self.get_class_name(i))
            .collect()
    }

    /// Find an attribute in `attributes` by its name.
    pub fn find_attribute<'a>(
        &self,
        attributes: &'a [AttributeInfo],
        name: &str,
    ) -> Option<&'a AttributeInfo> {
        attributes
            .iter()
            .find(|a| self.get_utf8(a.attribute_name_index).as_deref() == Some(name))
    }

    // -- Constant pool insertion --

    fn find_or_push(&mut self, constant: ConstantInfo) -> u16 {
        self.pool_index.catch_up(&self.const_pool);
        let key = PoolKey::of(&constant);
        if let Some(&index) = key.as_ref().and_then(|k| self.pool_index.positions.get(k)) {
            return index;
        }
        self.const_pool.push(constant);
        self.const_pool_size = (self.const_pool.len() + 1) as u16;
        self.const_pool.len() as u16
    }

    pub fn get_or_add_utf8(&mut self, value: &str) -> u16 {
        self.find_or_push(ConstantInfo::Utf8(Utf8Constant::new(value)))
    }

    pub fn get_or_add_class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.get_or_add_utf8(internal_name);
        self.find_or_push(ConstantInfo::Class(ClassConstant { name_index }))
    }

    pub fn get_or_add_string(&mut self, value: &str) -> u16 {
        let string_index = self.get_or_add_utf8(value);
        self.find_or_push(ConstantInfo::String(StringConstant { string_index }))
    }

    pub fn get_or_add_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.get_or_add_utf8(name);
        let descriptor_index = self.get_or_add_utf8(descriptor);
        self.find_or_push(ConstantInfo::NameAndType(NameAndTypeConstant {
            name_index,
            descriptor_index,
        }))
    }

    pub fn get_or_add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.get_or_add_class(class);
        let name_and_type_index = self.get_or_add_name_and_type(name, descriptor);
        self.find_or_push(ConstantInfo::FieldRef(FieldRefConstant {
            class_index,
            name_and_type_index,
        }))
    }

    pub fn get_or_add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.get_or_add_class(class);
        let name_and_type_index = self.get_or_add_name_and_type(name, descriptor);
        self.find_or_push(ConstantInfo::MethodRef(MethodRefConstant {
            class_index,
            name_and_type_index,
        }))
    }
}

/// Serialize any big-endian structure with no read/write arguments.
pub(crate) fn encode_be<T>(value: &T) -> BinResult<Vec<u8>>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut out = Cursor::new(Vec::new());
    value.write_options(&mut out, Endian::Big, ())?;
    Ok(out.into_inner())
}
