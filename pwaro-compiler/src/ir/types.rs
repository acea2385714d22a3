use crate::ir::ast::Width;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    I8,
    I16,
    I32,
    I64,
    Ptr,
}

impl Ty {
    pub fn bits(self) -> Option<u32> {
        match self {
            Ty::I8 => Some(8),
            Ty::I16 => Some(16),
            Ty::I32 => Some(32),
            Ty::I64 => Some(64),
            Ty::Ptr => None,
        }
    }

    pub fn is_int(self) -> bool {
        self.bits().is_some()
    }

    pub fn align(self) -> u32 {
        match self {
            Ty::I8 => 1,
            Ty::I16 => 2,
            Ty::I32 => 4,
            Ty::I64 | Ty::Ptr => 8,
        }
    }

    /// Reinterpret the low `bits` of `value` as a signed integer of this type.
    pub fn normalize(self, value: i64) -> i64 {
        match self.bits() {
            Some(bits) if bits < 64 => {
                let shift = 64 - bits;
                (value << shift) >> shift
            }
            _ => value,
        }
    }
}

impl From<Width> for Ty {
    fn from(width: Width) -> Self {
        match width {
            Width::I8 => Ty::I8,
            Width::I16 => Ty::I16,
            Width::I32 => Ty::I32,
            Width::I64 => Ty::I64,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bits() {
            Some(bits) => write!(f, "i{bits}"),
            None => f.write_str("ptr"),
        }
    }
}
