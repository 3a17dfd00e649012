//! Source-level value types

use std::fmt;

use super::IrType;

/// A value type of the shader language
///
/// `Error` is the absorbing type given to ill-typed subtrees: it converts to
/// and from everything so one mistake does not cascade into many diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int,
    Float,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Array { elem: Box<Type>, len: usize },
    Error,
}

impl Type {
    pub fn array(elem: Type, len: usize) -> Self {
        Type::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Float vector with `lanes` components (2..=4)
    pub fn vector(lanes: usize) -> Option<Type> {
        match lanes {
            2 => Some(Type::Vec2),
            3 => Some(Type::Vec3),
            4 => Some(Type::Vec4),
            _ => None,
        }
    }

    /// Square float matrix of dimension `dim` (2..=4)
    pub fn matrix(dim: usize) -> Option<Type> {
        match dim {
            2 => Some(Type::Mat2),
            3 => Some(Type::Mat3),
            4 => Some(Type::Mat4),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vec2 | Type::Vec3 | Type::Vec4)
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Type::Mat2 | Type::Mat3 | Type::Mat4)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Numeric scalars, vectors and matrices: everything arithmetic applies to
    pub fn is_arithmetic(&self) -> bool {
        self.is_numeric() || self.is_vector() || self.is_matrix()
    }

    /// Number of scalar lanes: 1 for scalars, N for vecN, N*N for matN
    pub fn lanes(&self) -> usize {
        match self {
            Type::Int | Type::Float | Type::Bool => 1,
            Type::Vec2 => 2,
            Type::Vec3 => 3,
            Type::Vec4 | Type::Mat2 => 4,
            Type::Mat3 => 9,
            Type::Mat4 => 16,
            Type::Void | Type::Array { .. } | Type::Error => 0,
        }
    }

    /// Element type of an array
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Structural equality; vectors and matrices compare arity, arrays compare
    /// element type and length.
    pub fn is_equivalent_to(&self, other: &Type) -> bool {
        self == other
    }

    /// Whether a value of `self` may be used where `other` is expected
    pub fn is_convertible_to(&self, other: &Type) -> bool {
        self.is_equivalent_to(other)
            || (self.is_int() && other.is_float())
            || self.is_error()
            || other.is_error()
    }

    /// Result type of `self <op> other` for `+ - * /`
    ///
    /// Equivalent operands keep their type, an int/float mix widens to float,
    /// and a float scalar next to a vector or matrix is broadcast to that
    /// shape. `None` means the operands are incompatible.
    pub fn arithmetic_result(&self, other: &Type) -> Option<Type> {
        if self.is_error() || other.is_error() {
            return Some(Type::Error);
        }
        if !self.is_arithmetic() || !other.is_arithmetic() {
            return None;
        }
        if self.is_equivalent_to(other) {
            return Some(self.clone());
        }
        match (self, other) {
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => Some(Type::Float),
            (Type::Float, shaped) | (shaped, Type::Float)
                if shaped.is_vector() || shaped.is_matrix() =>
            {
                Some(shaped.clone())
            }
            _ => None,
        }
    }

    /// Type both arms of a conditional can be brought to
    pub fn common_type(&self, other: &Type) -> Option<Type> {
        if self.is_error() || other.is_error() {
            return Some(Type::Error);
        }
        if self.is_equivalent_to(other) {
            return Some(self.clone());
        }
        if self.is_convertible_to(other) {
            return Some(other.clone());
        }
        if other.is_convertible_to(self) {
            return Some(self.clone());
        }
        None
    }

    /// Whether `self(args...)` is a valid constructor call
    ///
    /// Scalars take exactly one argument of a scalar type (numeric for
    /// `int`/`float`, bool for `bool`). Vectors and matrices take arithmetic
    /// arguments whose lanes add up to the target's lanes, or a single
    /// numeric scalar that is splatted to every lane.
    pub fn constructible_from(&self, args: &[Type]) -> bool {
        if args.iter().any(Type::is_error) {
            return true;
        }
        match self {
            Type::Int | Type::Float => args.len() == 1 && args[0].is_numeric(),
            Type::Bool => args.len() == 1 && args[0].is_bool(),
            shaped if shaped.is_vector() || shaped.is_matrix() => {
                if let [single] = args {
                    if single.is_numeric() {
                        return true;
                    }
                }
                !args.is_empty()
                    && args.iter().all(Type::is_arithmetic)
                    && args.iter().map(Type::lanes).sum::<usize>() == shaped.lanes()
            }
            _ => false,
        }
    }

    /// Lowered representation used by the IR
    pub fn ir_type(&self) -> IrType {
        match self {
            Type::Void | Type::Error => IrType::void(),
            Type::Int => IrType::i32(),
            Type::Float => IrType::f32(),
            Type::Bool => IrType::i1(),
            Type::Vec2 | Type::Vec3 | Type::Vec4 | Type::Mat2 | Type::Mat3 | Type::Mat4 => {
                IrType::vector(IrType::f32(), self.lanes())
            }
            Type::Array { elem, len } => IrType::array(elem.ir_type(), *len),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::Vec2 => write!(f, "vec2"),
            Type::Vec3 => write!(f, "vec3"),
            Type::Vec4 => write!(f, "vec4"),
            Type::Mat2 => write!(f, "mat2"),
            Type::Mat3 => write!(f, "mat3"),
            Type::Mat4 => write!(f, "mat4"),
            Type::Array { elem, len } => write!(f, "{}[{}]", elem, len),
            Type::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_types() -> Vec<Type> {
        vec![
            Type::Void,
            Type::Int,
            Type::Float,
            Type::Bool,
            Type::Vec2,
            Type::Vec3,
            Type::Vec4,
            Type::Mat2,
            Type::Mat3,
            Type::Mat4,
            Type::array(Type::Int, 4),
            Type::array(Type::Vec3, 2),
            Type::Error,
        ]
    }

    #[test]
    fn test_equivalence_reflexive_and_symmetric() {
        let types = all_types();
        for a in &types {
            assert!(a.is_equivalent_to(a), "{} not equivalent to itself", a);
            for b in &types {
                assert_eq!(a.is_equivalent_to(b), b.is_equivalent_to(a));
            }
        }
    }

    #[test]
    fn test_vectors_of_different_arity_differ() {
        assert!(!Type::Vec2.is_equivalent_to(&Type::Vec3));
        assert!(!Type::Mat3.is_equivalent_to(&Type::Mat4));
        assert!(!Type::array(Type::Int, 3).is_equivalent_to(&Type::array(Type::Int, 4)));
    }

    #[test]
    fn test_error_converts_everywhere() {
        for ty in all_types() {
            assert!(Type::Error.is_convertible_to(&ty));
            assert!(ty.is_convertible_to(&Type::Error));
        }
    }

    #[test]
    fn test_int_widens_to_float_only() {
        assert!(Type::Int.is_convertible_to(&Type::Float));
        assert!(!Type::Float.is_convertible_to(&Type::Int));
        assert!(!Type::Bool.is_convertible_to(&Type::Int));
        assert!(!Type::Float.is_convertible_to(&Type::Vec2));
    }

    #[test]
    fn test_classification() {
        assert!(Type::Int.is_numeric());
        assert!(!Type::Bool.is_numeric());
        assert!(Type::Vec4.is_vector());
        assert!(Type::Mat2.is_matrix());
        assert!(!Type::Mat2.is_vector());
        assert_eq!(Type::Mat3.lanes(), 9);
        assert_eq!(Type::Vec3.lanes(), 3);
    }

    #[test]
    fn test_arithmetic_result() {
        assert_eq!(Type::Int.arithmetic_result(&Type::Int), Some(Type::Int));
        assert_eq!(Type::Int.arithmetic_result(&Type::Float), Some(Type::Float));
        assert_eq!(Type::Float.arithmetic_result(&Type::Vec3), Some(Type::Vec3));
        assert_eq!(Type::Mat2.arithmetic_result(&Type::Float), Some(Type::Mat2));
        assert_eq!(Type::Vec2.arithmetic_result(&Type::Vec3), None);
        assert_eq!(Type::Int.arithmetic_result(&Type::Vec3), None);
        assert_eq!(Type::Bool.arithmetic_result(&Type::Bool), None);
        assert_eq!(Type::Error.arithmetic_result(&Type::Bool), Some(Type::Error));
    }

    #[test]
    fn test_constructible_from() {
        assert!(Type::Vec3.constructible_from(&[Type::Float, Type::Int, Type::Float]));
        assert!(Type::Vec4.constructible_from(&[Type::Vec2, Type::Vec2]));
        assert!(Type::Vec3.constructible_from(&[Type::Float]));
        assert!(Type::Mat2.constructible_from(&[Type::Vec4]));
        assert!(!Type::Vec3.constructible_from(&[Type::Vec2]));
        assert!(!Type::Vec2.constructible_from(&[Type::Bool, Type::Float]));
        assert!(!Type::Vec2.constructible_from(&[]));
        assert!(Type::Float.constructible_from(&[Type::Int]));
        assert!(!Type::Int.constructible_from(&[Type::Vec2]));
        assert!(Type::Vec2.constructible_from(&[Type::Error]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::array(Type::Vec2, 3).to_string(), "vec2[3]");
        assert_eq!(Type::Mat4.to_string(), "mat4");
    }
}
