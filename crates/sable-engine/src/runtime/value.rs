// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sable value representation.

use crate::ast::{BinaryOperator, ComparisonOperator};
use crate::types::Type;
use std::cmp::Ordering;
use std::fmt;

/// A Sable runtime value.
///
/// Values are plain data and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The result of a script that returns nothing
    #[default]
    Null,
    /// `boolean`
    Boolean(bool),
    /// `int`
    Int(i32),
    /// `double`
    Double(f64),
    /// `String`
    String(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // NaN is never equal to itself
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Returns the static type of this value, `None` for null.
    pub fn ty(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(Type::Boolean),
            Value::Int(_) => Some(Type::Int),
            Value::Double(_) => Some(Type::Double),
            Value::String(_) => Some(Type::String),
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the int payload, if this is an int.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric payload as a double, widening ints.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(f64::from(*n)),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parses a host-supplied argument for a parameter of type `ty`.
    pub fn parse_as(text: &str, ty: Type) -> Option<Value> {
        match ty {
            Type::Boolean => text.parse().ok().map(Value::Boolean),
            Type::Int => text.parse().ok().map(Value::Int),
            Type::Double => text.parse().ok().map(Value::Double),
            Type::String => Some(Value::String(text.to_string())),
            Type::Void => None,
        }
    }
}

/// Why an operation on two values failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Integer division or remainder by zero
    DivisionByZero,
    /// The operands have types the operator does not accept
    InvalidOperands,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::DivisionByZero => write!(f, "/ by zero"),
            OperationError::InvalidOperands => write!(f, "invalid operands"),
        }
    }
}

impl Value {
    /// Applies an arithmetic operator.
    ///
    /// Integer arithmetic wraps on overflow. `+` concatenates when either
    /// side is a string. Used both for constant folding and by the VM, so
    /// folded and executed results always agree.
    pub fn binary(
        operator: BinaryOperator,
        left: &Value,
        right: &Value,
    ) -> Result<Value, OperationError> {
        match (left, right) {
            (Value::String(_), _) | (_, Value::String(_)) if operator == BinaryOperator::Add => {
                Ok(Value::String(format!("{}{}", left, right)))
            }
            (Value::Int(a), Value::Int(b)) => {
                let (a, b) = (*a, *b);
                let result = match operator {
                    BinaryOperator::Add => a.wrapping_add(b),
                    BinaryOperator::Subtract => a.wrapping_sub(b),
                    BinaryOperator::Multiply => a.wrapping_mul(b),
                    BinaryOperator::Divide if b == 0 => {
                        return Err(OperationError::DivisionByZero);
                    }
                    BinaryOperator::Divide => a.wrapping_div(b),
                    BinaryOperator::Remainder if b == 0 => {
                        return Err(OperationError::DivisionByZero);
                    }
                    BinaryOperator::Remainder => a.wrapping_rem(b),
                };
                Ok(Value::Int(result))
            }
            _ => {
                let (Some(a), Some(b)) = (left.as_double(), right.as_double()) else {
                    return Err(OperationError::InvalidOperands);
                };
                let result = match operator {
                    BinaryOperator::Add => a + b,
                    BinaryOperator::Subtract => a - b,
                    BinaryOperator::Multiply => a * b,
                    BinaryOperator::Divide => a / b,
                    BinaryOperator::Remainder => a % b,
                };
                Ok(Value::Double(result))
            }
        }
    }

    /// Applies a comparison operator.
    ///
    /// Any comparison involving NaN is false except `!=`. Booleans and
    /// strings only support equality.
    pub fn compare(
        operator: ComparisonOperator,
        left: &Value,
        right: &Value,
    ) -> Result<bool, OperationError> {
        let ordering = match (left, right) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Boolean(_), Value::Boolean(_)) | (Value::String(_), Value::String(_)) => {
                return match operator {
                    ComparisonOperator::Equal => Ok(left == right),
                    ComparisonOperator::NotEqual => Ok(left != right),
                    _ => Err(OperationError::InvalidOperands),
                };
            }
            // Unset strings hold null
            (Value::Null, _) | (_, Value::Null) => {
                let same = left.is_null() && right.is_null();
                return match operator {
                    ComparisonOperator::Equal => Ok(same),
                    ComparisonOperator::NotEqual => Ok(!same),
                    _ => Err(OperationError::InvalidOperands),
                };
            }
            _ => match (left.as_double(), right.as_double()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => return Err(OperationError::InvalidOperands),
            },
        };

        Ok(match ordering {
            // Unordered (NaN)
            None => operator == ComparisonOperator::NotEqual,
            Some(ordering) => match operator {
                ComparisonOperator::Less => ordering == Ordering::Less,
                ComparisonOperator::LessEqual => ordering != Ordering::Greater,
                ComparisonOperator::Greater => ordering == Ordering::Greater,
                ComparisonOperator::GreaterEqual => ordering != Ordering::Less,
                ComparisonOperator::Equal => ordering == Ordering::Equal,
                ComparisonOperator::NotEqual => ordering != Ordering::Equal,
            },
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
        }
    }
}
