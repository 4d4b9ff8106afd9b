// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression typing, implicit casts and constant folding.

use super::Analyzer;
use super::tree::{ExpressionKind, TypedExpression};
use crate::ast::*;
use crate::error::{SemanticError, SemanticErrorKind};
use crate::location::Location;
use crate::runtime::Value;
use crate::scope::Locals;
use crate::types::Type;

/// What the surrounding context requires of an expression's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Any type is acceptable
    Any,
    /// The expression is cast to this type, or rejected
    Type(Type),
}

impl Analyzer {
    /// Analyzes an expression and casts it to the expected type.
    pub fn analyze_expression(
        &mut self,
        expr: &Expression,
        expected: Expected,
        locals: &mut Locals,
    ) -> Result<TypedExpression, SemanticError> {
        let typed = self.analyze_value(expr, locals)?;
        match expected {
            Expected::Any => Ok(typed),
            Expected::Type(ty) => cast(typed, ty),
        }
    }

    /// Analyzes a loop or `if` condition, which must be boolean.
    pub fn analyze_condition(
        &mut self,
        expr: &Expression,
        locals: &mut Locals,
    ) -> Result<TypedExpression, SemanticError> {
        self.analyze_expression(expr, Expected::Type(Type::Boolean), locals)
    }

    fn analyze_value(
        &mut self,
        expr: &Expression,
        locals: &mut Locals,
    ) -> Result<TypedExpression, SemanticError> {
        match expr {
            Expression::Literal(lit) => literal(&lit.value, false, lit.location),
            Expression::Variable(var) => {
                let variable = resolve(locals, &var.name, var.location)?;
                Ok(TypedExpression {
                    kind: ExpressionKind::Load(variable.slot),
                    ty: variable.ty,
                    constant: None,
                    location: var.location,
                })
            }
            Expression::Unary(e) => self.analyze_unary(e, locals),
            Expression::Binary(e) => {
                let left = self.analyze_value(&e.left, locals)?;
                let right = self.analyze_value(&e.right, locals)?;
                arithmetic(e.operator, left, right, e.location)
            }
            Expression::Comparison(e) => {
                let left = self.analyze_value(&e.left, locals)?;
                let right = self.analyze_value(&e.right, locals)?;
                comparison(e.operator, left, right, e.location)
            }
            Expression::Logical(e) => {
                let left = self.analyze_condition(&e.left, locals)?;
                let right = self.analyze_condition(&e.right, locals)?;
                let constant = match (left.constant_bool(), right.constant_bool()) {
                    (Some(l), Some(r)) => Some(match e.operator {
                        LogicalOperator::And => l && r,
                        LogicalOperator::Or => l || r,
                    }),
                    _ => None,
                };
                Ok(match constant {
                    Some(b) => constant_expression(Value::Boolean(b), Type::Boolean, e.location),
                    None => TypedExpression {
                        kind: ExpressionKind::Logical {
                            operator: e.operator,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        ty: Type::Boolean,
                        constant: None,
                        location: e.location,
                    },
                })
            }
            Expression::Assignment(e) => self.analyze_assignment(e, locals),
            Expression::Update(e) => {
                let variable = writable(locals, &e.target, e.location)?;
                if !variable.ty.is_numeric() {
                    return Err(SemanticError::new(
                        SemanticErrorKind::InvalidOperand,
                        e.location,
                        format!("Cannot apply [{}] to type [{}].", update_symbol(e.operator), variable.ty),
                    ));
                }
                Ok(TypedExpression {
                    kind: ExpressionKind::Update {
                        slot: variable.slot,
                        operator: e.operator,
                        prefix: e.prefix,
                    },
                    ty: variable.ty,
                    constant: None,
                    location: e.location,
                })
            }
        }
    }

    fn analyze_unary(
        &mut self,
        e: &UnaryExpression,
        locals: &mut Locals,
    ) -> Result<TypedExpression, SemanticError> {
        match e.operator {
            UnaryOperator::Not => {
                let operand = self.analyze_condition(&e.operand, locals)?;
                Ok(match operand.constant_bool() {
                    Some(b) => constant_expression(Value::Boolean(!b), Type::Boolean, e.location),
                    None => TypedExpression {
                        kind: ExpressionKind::Not(Box::new(operand)),
                        ty: Type::Boolean,
                        constant: None,
                        location: e.location,
                    },
                })
            }
            UnaryOperator::Minus => {
                // `-2147483648` is only representable once negated
                if let Expression::Literal(lit) = e.operand.as_ref() {
                    if matches!(lit.value, LiteralValue::Integer(_) | LiteralValue::Decimal(_)) {
                        return literal(&lit.value, true, e.location);
                    }
                }

                let operand = self.analyze_value(&e.operand, locals)?;
                let constant = match &operand.constant {
                    Some(Value::Int(n)) => Some(Value::Int(n.wrapping_neg())),
                    Some(Value::Double(n)) => Some(Value::Double(-n)),
                    _ => None,
                };
                if !operand.ty.is_numeric() {
                    return Err(SemanticError::new(
                        SemanticErrorKind::InvalidOperand,
                        e.location,
                        format!("Cannot apply [-] to type [{}].", operand.ty),
                    ));
                }
                let ty = operand.ty;
                Ok(match constant {
                    Some(value) => constant_expression(value, ty, e.location),
                    None => TypedExpression {
                        kind: ExpressionKind::Negate(Box::new(operand)),
                        ty,
                        constant: None,
                        location: e.location,
                    },
                })
            }
        }
    }

    fn analyze_assignment(
        &mut self,
        e: &AssignmentExpression,
        locals: &mut Locals,
    ) -> Result<TypedExpression, SemanticError> {
        let variable = writable(locals, &e.target, e.location)?;
        let (slot, ty) = (variable.slot, variable.ty);

        let value = match e.operator.binary_operator() {
            None => self.analyze_expression(&e.value, Expected::Type(ty), locals)?,
            Some(operator) => {
                let current = TypedExpression {
                    kind: ExpressionKind::Load(slot),
                    ty,
                    constant: None,
                    location: e.location,
                };
                let right = self.analyze_value(&e.value, locals)?;
                cast(arithmetic(operator, current, right, e.location)?, ty)?
            }
        };

        Ok(TypedExpression {
            kind: ExpressionKind::Assign {
                slot,
                value: Box::new(value),
            },
            ty,
            constant: None,
            location: e.location,
        })
    }
}

/// Applies the implicit cast to `target`, folding constants.
pub(crate) fn cast(expr: TypedExpression, target: Type) -> Result<TypedExpression, SemanticError> {
    if expr.ty == target {
        return Ok(expr);
    }
    if !expr.ty.converts_to(target) {
        return Err(SemanticError::new(
            SemanticErrorKind::TypeMismatch,
            expr.location,
            format!("Cannot cast from [{}] to [{}].", expr.ty, target),
        ));
    }

    let location = expr.location;
    Ok(match expr.constant.as_ref().and_then(Value::as_double) {
        Some(n) => constant_expression(Value::Double(n), target, location),
        None => TypedExpression {
            kind: ExpressionKind::Cast(Box::new(expr)),
            ty: target,
            constant: None,
            location,
        },
    })
}

fn constant_expression(value: Value, ty: Type, location: Location) -> TypedExpression {
    TypedExpression {
        kind: ExpressionKind::Constant(value.clone()),
        ty,
        constant: Some(value),
        location,
    }
}

fn literal(
    value: &LiteralValue,
    negate: bool,
    location: Location,
) -> Result<TypedExpression, SemanticError> {
    Ok(match value {
        LiteralValue::Integer(n) => {
            let n = if negate { -*n } else { *n };
            let n = i32::try_from(n).map_err(|_| {
                SemanticError::new(
                    SemanticErrorKind::InvalidOperand,
                    location,
                    format!("Invalid int constant [{}].", n),
                )
            })?;
            constant_expression(Value::Int(n), Type::Int, location)
        }
        LiteralValue::Decimal(n) => {
            let n = if negate { -*n } else { *n };
            constant_expression(Value::Double(n), Type::Double, location)
        }
        LiteralValue::Boolean(b) => constant_expression(Value::Boolean(*b), Type::Boolean, location),
        LiteralValue::String(s) => constant_expression(Value::String(s.clone()), Type::String, location),
    })
}

fn resolve<'l>(
    locals: &'l Locals,
    name: &str,
    location: Location,
) -> Result<&'l crate::scope::Variable, SemanticError> {
    locals.lookup(name).ok_or_else(|| {
        SemanticError::new(
            SemanticErrorKind::UndefinedVariable,
            location,
            format!("Variable [{}] is not defined.", name),
        )
    })
}

fn writable<'l>(
    locals: &'l Locals,
    name: &str,
    location: Location,
) -> Result<&'l crate::scope::Variable, SemanticError> {
    let variable = resolve(locals, name, location)?;
    if variable.read_only {
        return Err(SemanticError::new(
            SemanticErrorKind::ReadOnlyVariable,
            location,
            format!("Variable [{}] is read-only.", name),
        ));
    }
    Ok(variable)
}

fn arithmetic(
    operator: BinaryOperator,
    left: TypedExpression,
    right: TypedExpression,
    location: Location,
) -> Result<TypedExpression, SemanticError> {
    let concat = operator == BinaryOperator::Add
        && (left.ty == Type::String || right.ty == Type::String);

    let (left, right, ty) = if concat {
        (left, right, Type::String)
    } else {
        let Some(ty) = Type::promote(left.ty, right.ty) else {
            return Err(SemanticError::new(
                SemanticErrorKind::InvalidOperand,
                location,
                format!(
                    "Cannot apply [{}] to types [{}] and [{}].",
                    binary_symbol(operator),
                    left.ty,
                    right.ty
                ),
            ));
        };
        (cast(left, ty)?, cast(right, ty)?, ty)
    };

    // Division by zero is left for the VM to report
    if let (Some(l), Some(r)) = (&left.constant, &right.constant) {
        if let Ok(value) = Value::binary(operator, l, r) {
            return Ok(constant_expression(value, ty, location));
        }
    }

    Ok(TypedExpression {
        kind: ExpressionKind::Arithmetic {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
        constant: None,
        location,
    })
}

fn comparison(
    operator: ComparisonOperator,
    left: TypedExpression,
    right: TypedExpression,
    location: Location,
) -> Result<TypedExpression, SemanticError> {
    let equality = matches!(
        operator,
        ComparisonOperator::Equal | ComparisonOperator::NotEqual
    );

    let (left, right) = match Type::promote(left.ty, right.ty) {
        Some(ty) => (cast(left, ty)?, cast(right, ty)?),
        None if equality
            && left.ty == right.ty
            && matches!(left.ty, Type::Boolean | Type::String) =>
        {
            (left, right)
        }
        None => {
            return Err(SemanticError::new(
                SemanticErrorKind::InvalidOperand,
                location,
                format!(
                    "Cannot apply [{}] to types [{}] and [{}].",
                    comparison_symbol(operator),
                    left.ty,
                    right.ty
                ),
            ));
        }
    };

    if let (Some(l), Some(r)) = (&left.constant, &right.constant) {
        if let Ok(b) = Value::compare(operator, l, r) {
            return Ok(constant_expression(Value::Boolean(b), Type::Boolean, location));
        }
    }

    Ok(TypedExpression {
        kind: ExpressionKind::Compare {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty: Type::Boolean,
        constant: None,
        location,
    })
}

fn binary_symbol(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Remainder => "%",
    }
}

fn comparison_symbol(operator: ComparisonOperator) -> &'static str {
    match operator {
        ComparisonOperator::Less => "<",
        ComparisonOperator::LessEqual => "<=",
        ComparisonOperator::Greater => ">",
        ComparisonOperator::GreaterEqual => ">=",
        ComparisonOperator::Equal => "==",
        ComparisonOperator::NotEqual => "!=",
    }
}

fn update_symbol(operator: UpdateOperator) -> &'static str {
    match operator {
        UpdateOperator::Increment => "++",
        UpdateOperator::Decrement => "--",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze(src: &str, locals: &mut Locals) -> Result<TypedExpression, SemanticError> {
        let expr = Parser::new(src).parse_expression().unwrap();
        Analyzer::new().analyze_expression(&expr, Expected::Any, locals)
    }

    fn analyze_ok(src: &str) -> TypedExpression {
        analyze(src, &mut Locals::new(0)).unwrap()
    }

    fn analyze_err(src: &str) -> SemanticErrorKind {
        analyze(src, &mut Locals::new(0)).unwrap_err().kind
    }

    #[test]
    fn test_fold_arithmetic() {
        let expr = analyze_ok("1 + 2 * 3");
        assert_eq!(expr.constant, Some(Value::Int(7)));
        assert!(matches!(expr.kind, ExpressionKind::Constant(Value::Int(7))));
    }

    #[test]
    fn test_fold_promotes_to_double() {
        let expr = analyze_ok("1 + 0.5");
        assert_eq!(expr.ty, Type::Double);
        assert_eq!(expr.constant, Some(Value::Double(1.5)));
    }

    #[test]
    fn test_fold_comparison_and_logic() {
        assert_eq!(analyze_ok("1 < 2").constant, Some(Value::Boolean(true)));
        assert_eq!(analyze_ok("!(1 < 2) || false").constant, Some(Value::Boolean(false)));
        assert_eq!(analyze_ok("true && 3 == 3").constant, Some(Value::Boolean(true)));
    }

    #[test]
    fn test_division_by_zero_not_folded() {
        let expr = analyze_ok("1 / 0");
        assert_eq!(expr.constant, None);
        assert!(matches!(expr.kind, ExpressionKind::Arithmetic { .. }));
    }

    #[test]
    fn test_int_min_literal() {
        assert_eq!(analyze_ok("-2147483648").constant, Some(Value::Int(i32::MIN)));
        assert_eq!(analyze_err("2147483648"), SemanticErrorKind::InvalidOperand);
    }

    #[test]
    fn test_implicit_widening_inserts_cast() {
        let mut locals = Locals::new(0);
        locals.declare("i", Type::Int, Location::default()).unwrap();
        let expr = analyze("i + 1.0", &mut locals).unwrap();
        let ExpressionKind::Arithmetic { left, .. } = expr.kind else {
            panic!("expected arithmetic");
        };
        assert!(matches!(left.kind, ExpressionKind::Cast(_)));
        assert_eq!(left.ty, Type::Double);
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let expr = Parser::new("1").parse_expression().unwrap();
        let err = Analyzer::new()
            .analyze_condition(&expr, &mut Locals::new(0))
            .unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::TypeMismatch);
        assert_eq!(err.message, "Cannot cast from [int] to [boolean].");
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(analyze_err("x + 1"), SemanticErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_read_only_assignment() {
        let mut locals = Locals::new(0);
        locals.declare_parameter("n", Type::Int, Location::default()).unwrap();
        let err = analyze("n = 1", &mut locals).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::ReadOnlyVariable);
        assert!(analyze("n + 1", &mut locals).is_ok());
    }

    #[test]
    fn test_compound_assignment_must_fit() {
        let mut locals = Locals::new(0);
        locals.declare("i", Type::Int, Location::default()).unwrap();
        assert!(analyze("i += 2", &mut locals).is_ok());
        let err = analyze("i += 0.5", &mut locals).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::TypeMismatch);
    }

    #[test]
    fn test_string_concatenation() {
        let expr = analyze_ok("'a' + 1");
        assert_eq!(expr.ty, Type::String);
        assert_eq!(expr.constant, Some(Value::from("a1")));
    }

    #[test]
    fn test_invalid_operands() {
        assert_eq!(analyze_err("true + 1"), SemanticErrorKind::InvalidOperand);
        assert_eq!(analyze_err("'a' < 'b'"), SemanticErrorKind::InvalidOperand);
        assert_eq!(analyze_err("-true"), SemanticErrorKind::InvalidOperand);
    }

    #[test]
    fn test_update_requires_numeric() {
        let mut locals = Locals::new(0);
        locals.declare("b", Type::Boolean, Location::default()).unwrap();
        let err = analyze("b++", &mut locals).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::InvalidOperand);
    }
}
