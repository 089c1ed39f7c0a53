use bitflags::bitflags;

use crate::runner::ds::value::JsValue;

bitflags! {
    /// Property attributes. The empty set is a plain writable, enumerable, deletable property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        const READ_ONLY = 0b0000_0001;
        const DONT_ENUM = 0b0000_0010;
        const DONT_DELETE = 0b0000_0100;
    }
}

impl PropertyFlags {
    /// Attributes of built-in methods and prototype links.
    pub fn hidden() -> Self {
        PropertyFlags::DONT_ENUM
    }

    /// Attributes of built-in constants such as `NaN` or `Math.PI`.
    pub fn constant() -> Self {
        PropertyFlags::READ_ONLY | PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub value: JsValue,
    pub flags: PropertyFlags,
}

impl PropertyDescriptor {
    pub fn new(value: JsValue, flags: PropertyFlags) -> Self {
        PropertyDescriptor { value, flags }
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(PropertyFlags::READ_ONLY)
    }

    pub fn is_enumerable(&self) -> bool {
        !self.flags.contains(PropertyFlags::DONT_ENUM)
    }

    pub fn is_deletable(&self) -> bool {
        !self.flags.contains(PropertyFlags::DONT_DELETE)
    }
}
