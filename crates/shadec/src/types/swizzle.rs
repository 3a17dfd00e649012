//! Swizzle validation
//!
//! A swizzle selects lanes of a vector by name (`v.xy`, `v.zzx`). Each
//! problem with a swizzle is reported on its own, so a single access such as
//! `v2.xqzw` on a vec2 yields both an invalid-letter and an out-of-bound
//! finding.

use super::Type;

/// Longest swizzle that still names a vector type
pub const MAX_SWIZZLE_LEN: usize = 4;

/// One problem found in a swizzle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwizzleIssue {
    /// A character outside `x`, `y`, `z`, `w`
    InvalidLetter,
    /// A lane past the base vector's arity (`z`/`w` on vec2, `w` on vec3)
    OutOfBound,
    /// More than four lanes selected
    Oversized,
    /// The base is not a vector at all
    NonVectorBase,
}

/// Outcome of validating a swizzle against its base type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwizzleCheck {
    pub issues: Vec<SwizzleIssue>,
    pub ty: Type,
}

impl SwizzleCheck {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Lane index named by a swizzle character
pub fn lane_index(c: char) -> Option<u32> {
    match c {
        'x' => Some(0),
        'y' => Some(1),
        'z' => Some(2),
        'w' => Some(3),
        _ => None,
    }
}

/// Lane indices selected by `field`, or `None` if any character is invalid
pub fn lane_mask(field: &str) -> Option<Vec<u32>> {
    field.chars().map(lane_index).collect()
}

/// Type of a swizzle selecting `len` lanes
pub fn result_type(len: usize) -> Type {
    match len {
        1 => Type::Float,
        n => Type::vector(n).unwrap_or(Type::Error),
    }
}

/// Validate `field` applied to a value of type `base`
///
/// An `error` base is absorbed silently: no issues and an `error` result.
pub fn validate(base: &Type, field: &str) -> SwizzleCheck {
    if base.is_error() {
        return SwizzleCheck { issues: Vec::new(), ty: Type::Error };
    }

    let mut issues = Vec::new();
    if !base.is_vector() {
        issues.push(SwizzleIssue::NonVectorBase);
    }

    let mask = lane_mask(field);
    if mask.is_none() {
        issues.push(SwizzleIssue::InvalidLetter);
    }

    if base.is_vector() {
        let arity = base.lanes() as u32;
        let out_of_bound = field
            .chars()
            .filter_map(lane_index)
            .any(|lane| lane >= arity);
        if out_of_bound {
            issues.push(SwizzleIssue::OutOfBound);
        }
    }

    if field.chars().count() > MAX_SWIZZLE_LEN {
        issues.push(SwizzleIssue::Oversized);
    }

    let ty = if issues.is_empty() {
        result_type(field.len())
    } else {
        Type::Error
    };
    SwizzleCheck { issues, ty }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xy_on_vec2() {
        let check = validate(&Type::Vec2, "xy");
        assert!(check.is_valid());
        assert_eq!(check.ty, Type::Vec2);
    }

    #[test]
    fn test_single_lane_is_float() {
        assert_eq!(validate(&Type::Vec4, "w").ty, Type::Float);
    }

    #[test]
    fn test_xyz_on_vec2_out_of_bound() {
        let check = validate(&Type::Vec2, "xyz");
        assert_eq!(check.issues, vec![SwizzleIssue::OutOfBound]);
        assert_eq!(check.ty, Type::Error);
    }

    #[test]
    fn test_w_on_vec3_out_of_bound() {
        let check = validate(&Type::Vec3, "w");
        assert_eq!(check.issues, vec![SwizzleIssue::OutOfBound]);
        assert_eq!(check.ty, Type::Error);
    }

    #[test]
    fn test_length_five_always_oversized() {
        for base in [Type::Vec2, Type::Vec3, Type::Vec4] {
            let check = validate(&base, "xxxxx");
            assert!(check.issues.contains(&SwizzleIssue::Oversized));
            assert_eq!(check.ty, Type::Error);
        }
        assert!(validate(&Type::Float, "xxxxx").issues.contains(&SwizzleIssue::Oversized));
    }

    #[test]
    fn test_independent_findings() {
        let check = validate(&Type::Vec2, "xqz");
        assert_eq!(
            check.issues,
            vec![SwizzleIssue::InvalidLetter, SwizzleIssue::OutOfBound]
        );
    }

    #[test]
    fn test_non_vector_base() {
        let check = validate(&Type::Float, "x");
        assert_eq!(check.issues, vec![SwizzleIssue::NonVectorBase]);
    }

    #[test]
    fn test_error_base_absorbed() {
        let check = validate(&Type::Error, "xyzwq");
        assert!(check.is_valid());
        assert_eq!(check.ty, Type::Error);
    }

    #[test]
    fn test_lane_mask() {
        assert_eq!(lane_mask("zyx"), Some(vec![2, 1, 0]));
        assert_eq!(lane_mask("xa"), None);
    }
}
