// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The static type lattice of Sable.

use std::fmt;

/// A static type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// The type of a statement-only expression
    Void,
    /// `boolean`
    Boolean,
    /// `int`, a 32-bit signed integer with wrapping arithmetic
    Int,
    /// `double`, an IEEE 754 double
    Double,
    /// `String`
    String,
}

impl Type {
    /// Returns true for `int` and `double`.
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    /// Returns true if a value of `self` can be used where `target` is
    /// expected without an explicit cast. The only widening is `int` to
    /// `double`.
    pub fn converts_to(self, target: Type) -> bool {
        self == target || (self == Type::Int && target == Type::Double)
    }

    /// The type two numeric operands are promoted to, if both are numeric.
    pub fn promote(left: Type, right: Type) -> Option<Type> {
        match (left, right) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(Type::Double),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Void => "void",
            Type::Boolean => "boolean",
            Type::Int => "int",
            Type::Double => "double",
            Type::String => "String",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening() {
        assert!(Type::Int.converts_to(Type::Double));
        assert!(!Type::Double.converts_to(Type::Int));
        assert!(!Type::Int.converts_to(Type::Boolean));
        assert!(Type::String.converts_to(Type::String));
    }

    #[test]
    fn test_promote() {
        assert_eq!(Type::promote(Type::Int, Type::Int), Some(Type::Int));
        assert_eq!(Type::promote(Type::Int, Type::Double), Some(Type::Double));
        assert_eq!(Type::promote(Type::Boolean, Type::Int), None);
    }
}
