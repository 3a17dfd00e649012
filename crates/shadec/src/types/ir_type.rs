//! Types of IR values
//!
//! Vectors and matrices both lower to float vectors (a matN is N*N lanes);
//! addresses are opaque pointers.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrType {
    pub kind: IrTypeKind,
    /// Size in bytes
    pub size: usize,
    /// Alignment in bytes
    pub align: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrTypeKind {
    /// No value
    Void,

    /// Integer; `bits == 1` is the boolean type
    Int { bits: u8 },

    /// IEEE float
    Float { bits: u8 },

    /// Fixed-width SIMD vector
    Vector {
        element: Box<IrType>,
        lanes: usize,
    },

    /// Address of storage
    Pointer,

    /// Fixed-length array
    Array {
        element: Box<IrType>,
        count: usize,
    },
}

impl IrType {
    pub fn void() -> Self {
        Self { kind: IrTypeKind::Void, size: 0, align: 1 }
    }

    /// Boolean
    pub fn i1() -> Self {
        Self { kind: IrTypeKind::Int { bits: 1 }, size: 1, align: 1 }
    }

    pub fn i32() -> Self {
        Self { kind: IrTypeKind::Int { bits: 32 }, size: 4, align: 4 }
    }

    pub fn f32() -> Self {
        Self { kind: IrTypeKind::Float { bits: 32 }, size: 4, align: 4 }
    }

    pub fn ptr() -> Self {
        Self { kind: IrTypeKind::Pointer, size: 8, align: 8 }
    }

    pub fn vector(element: IrType, lanes: usize) -> Self {
        let size = element.size * lanes;
        Self {
            kind: IrTypeKind::Vector {
                element: Box::new(element),
                lanes,
            },
            size,
            align: 16,
        }
    }

    pub fn array(element: IrType, count: usize) -> Self {
        let size = element.size * count;
        let align = element.align;
        Self {
            kind: IrTypeKind::Array {
                element: Box::new(element),
                count,
            },
            size,
            align,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, IrTypeKind::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, IrTypeKind::Int { .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, IrTypeKind::Float { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, IrTypeKind::Vector { .. })
    }

    /// Lane count of a vector, 1 for anything else
    pub fn lanes(&self) -> usize {
        match &self.kind {
            IrTypeKind::Vector { lanes, .. } => *lanes,
            _ => 1,
        }
    }

    /// Element type of a vector or array
    pub fn element_type(&self) -> Option<&IrType> {
        match &self.kind {
            IrTypeKind::Vector { element, .. } | IrTypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }
}

impl Default for IrType {
    fn default() -> Self {
        Self::void()
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IrTypeKind::Void => write!(f, "void"),
            IrTypeKind::Int { bits } => write!(f, "i{}", bits),
            IrTypeKind::Float { bits } => write!(f, "f{}", bits),
            IrTypeKind::Vector { element, lanes } => write!(f, "<{} x {}>", lanes, element),
            IrTypeKind::Pointer => write!(f, "ptr"),
            IrTypeKind::Array { element, count } => write!(f, "[{} x {}]", count, element),
        }
    }
}
