//! Expression evaluation.

use crate::parser::ast::{
    BinaryOperator, ExpressionType, LiteralType, LogicalOperator, MemberExpressionType,
    NumberLiteralType, UnaryOperator, UpdateOperator,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::ObjectKind;
use crate::runner::ds::operations::test_and_comparison::{less_than, loose_equals, strict_equals};
use crate::runner::ds::operations::type_conversion::{
    get_type, number_from_f64, number_from_i64, to_boolean, to_int32, to_numeric, to_primitive,
    to_string, to_uint32, PreferredType, TYPE_STR_UNDEFINED,
};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::plugin::types::EvalContext;

use super::function::{call_value, construct_value, instantiate_function};
use super::types::{Reference, ReferenceBase, ReferenceResult, ValueResult};

/// Evaluate an expression and return its value.
pub fn evaluate_expression(expr: &ExpressionType, ctx: &mut EvalContext) -> ValueResult {
    match expr {
        ExpressionType::Literal(lit) => Ok(literal_value(&lit.value)),

        ExpressionType::Identifier(id) => {
            let reference = resolve_binding(&id.name, ctx)?;
            get_value(&reference, ctx)
        }

        ExpressionType::ThisExpression { .. } => Ok(ctx.this_value.clone()),

        ExpressionType::ArrayExpression { elements, .. } => {
            let mut values = Vec::with_capacity(elements.len());
            for e in elements {
                values.push(evaluate_expression(e, ctx)?);
            }
            Ok(JsValue::Object(ctx.new_array(values)?))
        }

        ExpressionType::ObjectExpression { properties, .. } => {
            let id = ctx.new_object()?;
            for (key, e) in properties {
                let value = evaluate_expression(e, ctx)?;
                ctx.put_property(&JsValue::Object(id), key, value)?;
            }
            Ok(JsValue::Object(id))
        }

        ExpressionType::FunctionExpression(data) => {
            let scope = ctx.scope;
            Ok(JsValue::Object(instantiate_function(data, scope, ctx)?))
        }

        ExpressionType::UnaryExpression {
            operator, argument, ..
        } => evaluate_unary_expression(*operator, argument, ctx),

        ExpressionType::UpdateExpression {
            operator,
            argument,
            prefix,
            ..
        } => {
            let reference = evaluate_reference(argument, ctx)?;
            let old_value = get_value(&reference, ctx)?;
            let old = to_numeric(&old_value, ctx)?;
            let one = JsNumberType::Integer(1);
            let new = match operator {
                UpdateOperator::PlusPlus => add_numbers(old, one),
                UpdateOperator::MinusMinus => subtract_numbers(old, one),
            };
            put_value(&reference, JsValue::Number(new), ctx)?;
            Ok(JsValue::Number(if *prefix { new } else { old }))
        }

        ExpressionType::BinaryExpression {
            operator,
            left,
            right,
            ..
        } => {
            let l = evaluate_expression(left, ctx)?;
            let r = evaluate_expression(right, ctx)?;
            apply_binary_operator(*operator, &l, &r, ctx)
        }

        ExpressionType::LogicalExpression {
            operator,
            left,
            right,
            ..
        } => {
            let l = evaluate_expression(left, ctx)?;
            let short_circuit = match operator {
                LogicalOperator::Or => to_boolean(&l),
                LogicalOperator::And => !to_boolean(&l),
            };
            if short_circuit {
                Ok(l)
            } else {
                evaluate_expression(right, ctx)
            }
        }

        ExpressionType::AssignmentExpression {
            operator,
            left,
            right,
            ..
        } => {
            let reference = evaluate_reference(left, ctx)?;
            let value = match operator.binary_operator() {
                None => evaluate_expression(right, ctx)?,
                Some(op) => {
                    let l = get_value(&reference, ctx)?;
                    let r = evaluate_expression(right, ctx)?;
                    apply_binary_operator(op, &l, &r, ctx)?
                }
            };
            put_value(&reference, value.clone(), ctx)?;
            Ok(value)
        }

        ExpressionType::ConditionalExpression {
            test,
            consequent,
            alternate,
            ..
        } => {
            if to_boolean(&evaluate_expression(test, ctx)?) {
                evaluate_expression(consequent, ctx)
            } else {
                evaluate_expression(alternate, ctx)
            }
        }

        ExpressionType::CallExpression {
            callee, arguments, ..
        } => evaluate_call_expression(callee, arguments, ctx),

        ExpressionType::NewExpression {
            callee, arguments, ..
        } => {
            let constructor = evaluate_expression(callee, ctx)?;
            let args = evaluate_arguments(arguments, ctx)?;
            if !ctx.is_callable(&constructor) {
                return Err(JErrorType::TypeError(format!(
                    "{} is not a constructor",
                    describe_expression(callee)
                )));
            }
            construct_value(&constructor, args, ctx)
        }

        ExpressionType::MemberExpression(member) => {
            let reference = evaluate_member_reference(member, ctx)?;
            get_value(&reference, ctx)
        }

        ExpressionType::SequenceExpression { expressions, .. } => {
            let mut last = JsValue::Undefined;
            for e in expressions {
                last = evaluate_expression(e, ctx)?;
            }
            Ok(last)
        }
    }
}

fn literal_value(literal: &LiteralType) -> JsValue {
    match literal {
        LiteralType::NullLiteral => JsValue::Null,
        LiteralType::BooleanLiteral(b) => JsValue::Boolean(*b),
        LiteralType::StringLiteral(s) => JsValue::String(s.clone()),
        LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(i)) => {
            JsValue::Number(number_from_i64(*i))
        }
        LiteralType::NumberLiteral(NumberLiteralType::FloatLiteral(f)) => {
            JsValue::Number(number_from_f64(*f))
        }
    }
}

// ============================================================================
// References
// ============================================================================

/// Walks the scope chain from the current environment outwards looking for `name`.
pub fn resolve_binding(name: &str, ctx: &EvalContext) -> ReferenceResult {
    let mut env = Some(ctx.scope);
    while let Some(id) = env {
        if ctx.heap.has_property(id, name)? {
            return Ok(Reference::environment(id, name));
        }
        env = ctx.heap.get(id)?.env_parent();
    }
    Ok(Reference::unresolvable(name))
}

pub fn evaluate_reference(expr: &ExpressionType, ctx: &mut EvalContext) -> ReferenceResult {
    match expr {
        ExpressionType::Identifier(id) => resolve_binding(&id.name, ctx),
        ExpressionType::MemberExpression(member) => evaluate_member_reference(member, ctx),
        _ => Err(JErrorType::ReferenceError(
            "invalid assignment target".to_string(),
        )),
    }
}

fn evaluate_member_reference(
    member: &MemberExpressionType,
    ctx: &mut EvalContext,
) -> ReferenceResult {
    match member {
        MemberExpressionType::SimpleMemberExpression {
            object, property, ..
        } => {
            let base = evaluate_expression(object, ctx)?;
            Ok(Reference::property(base, property.name.clone()))
        }
        MemberExpressionType::ComputedMemberExpression {
            object, property, ..
        } => {
            let base = evaluate_expression(object, ctx)?;
            let key = evaluate_expression(property, ctx)?;
            let key = to_string(&key, ctx)?;
            Ok(Reference::property(base, key))
        }
    }
}

pub fn get_value(reference: &Reference, ctx: &mut EvalContext) -> ValueResult {
    match &reference.base {
        ReferenceBase::Object(base) => ctx.get_property(base, &reference.referenced_name),
        ReferenceBase::Environment(env) => Ok(ctx
            .heap
            .lookup(*env, &reference.referenced_name)?
            .unwrap_or(JsValue::Undefined)),
        ReferenceBase::Unresolvable => Err(JErrorType::ReferenceError(format!(
            "{} is not defined",
            reference.referenced_name
        ))),
    }
}

/// Stores through a reference. Assigning an undeclared name creates a global property.
pub fn put_value(
    reference: &Reference,
    value: JsValue,
    ctx: &mut EvalContext,
) -> Result<(), JErrorType> {
    match &reference.base {
        ReferenceBase::Object(base) => {
            ctx.put_property(base, &reference.referenced_name, value)
        }
        ReferenceBase::Environment(env) => {
            ctx.put_property(&JsValue::Object(*env), &reference.referenced_name, value)
        }
        ReferenceBase::Unresolvable => {
            let global = JsValue::Object(ctx.global());
            ctx.put_property(&global, &reference.referenced_name, value)
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

fn evaluate_unary_expression(
    operator: UnaryOperator,
    argument: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    match operator {
        UnaryOperator::Delete => {
            if !argument.is_valid_simple_assignment_target() {
                evaluate_expression(argument, ctx)?;
                return Ok(JsValue::Boolean(true));
            }
            let reference = evaluate_reference(argument, ctx)?;
            let name = &reference.referenced_name;
            let deleted = match &reference.base {
                ReferenceBase::Object(JsValue::Object(id)) => ctx.heap.get_mut(*id)?.delete(name),
                ReferenceBase::Object(base) if base.is_nullish() => {
                    return Err(JErrorType::TypeError(format!(
                        "cannot delete property '{}' of {}",
                        name, base
                    )))
                }
                ReferenceBase::Object(_) => true,
                ReferenceBase::Environment(env) => ctx.heap.get_mut(*env)?.delete(name),
                ReferenceBase::Unresolvable => true,
            };
            Ok(JsValue::Boolean(deleted))
        }
        UnaryOperator::TypeOf => {
            let value = match argument {
                ExpressionType::Identifier(id) => {
                    let reference = resolve_binding(&id.name, ctx)?;
                    if reference.is_unresolvable() {
                        return Ok(JsValue::String(TYPE_STR_UNDEFINED.to_string()));
                    }
                    get_value(&reference, ctx)?
                }
                _ => evaluate_expression(argument, ctx)?,
            };
            Ok(JsValue::String(get_type(&value, ctx).to_string()))
        }
        UnaryOperator::Void => {
            evaluate_expression(argument, ctx)?;
            Ok(JsValue::Undefined)
        }
        UnaryOperator::Minus => {
            let value = evaluate_expression(argument, ctx)?;
            Ok(JsValue::Number(negate(to_numeric(&value, ctx)?)))
        }
        UnaryOperator::Plus => {
            let value = evaluate_expression(argument, ctx)?;
            Ok(JsValue::Number(to_numeric(&value, ctx)?))
        }
        UnaryOperator::LogicalNot => {
            let value = evaluate_expression(argument, ctx)?;
            Ok(JsValue::Boolean(!to_boolean(&value)))
        }
        UnaryOperator::BitwiseNot => {
            let value = evaluate_expression(argument, ctx)?;
            Ok(JsValue::from_i64(!to_int32(&value, ctx)? as i64))
        }
    }
}

fn negate(n: JsNumberType) -> JsNumberType {
    match n {
        JsNumberType::Integer(0) => JsNumberType::Float(-0.0),
        JsNumberType::Integer(i) => JsNumberType::Integer(-i),
        JsNumberType::Float(f) => number_from_f64(-f),
        JsNumberType::NaN => JsNumberType::NaN,
        JsNumberType::PositiveInfinity => JsNumberType::NegativeInfinity,
        JsNumberType::NegativeInfinity => JsNumberType::PositiveInfinity,
    }
}

pub fn add_numbers(a: JsNumberType, b: JsNumberType) -> JsNumberType {
    if let (JsNumberType::Integer(x), JsNumberType::Integer(y)) = (a, b) {
        return number_from_i64(x + y);
    }
    number_from_f64(a.as_f64() + b.as_f64())
}

pub fn subtract_numbers(a: JsNumberType, b: JsNumberType) -> JsNumberType {
    if let (JsNumberType::Integer(x), JsNumberType::Integer(y)) = (a, b) {
        return number_from_i64(x - y);
    }
    number_from_f64(a.as_f64() - b.as_f64())
}

fn multiply_numbers(a: JsNumberType, b: JsNumberType) -> JsNumberType {
    if let (JsNumberType::Integer(x), JsNumberType::Integer(y)) = (a, b) {
        match x.checked_mul(y) {
            Some(0) if x < 0 || y < 0 => return JsNumberType::Float(-0.0),
            Some(p) => return number_from_i64(p),
            None => {}
        }
    }
    number_from_f64(a.as_f64() * b.as_f64())
}

fn divide_numbers(a: JsNumberType, b: JsNumberType) -> JsNumberType {
    if let (JsNumberType::Integer(x), JsNumberType::Integer(y)) = (a, b) {
        if y != 0 && x % y == 0 {
            if x == 0 && y < 0 {
                return JsNumberType::Float(-0.0);
            }
            return JsNumberType::Integer(x / y);
        }
    }
    number_from_f64(a.as_f64() / b.as_f64())
}

fn remainder_numbers(a: JsNumberType, b: JsNumberType) -> JsNumberType {
    if let (JsNumberType::Integer(x), JsNumberType::Integer(y)) = (a, b) {
        if y != 0 {
            let r = x % y;
            if r == 0 && x < 0 {
                return JsNumberType::Float(-0.0);
            }
            return JsNumberType::Integer(r);
        }
    }
    number_from_f64(a.as_f64() % b.as_f64())
}

/// Applies a binary operator to two already evaluated operands.
pub fn apply_binary_operator(
    operator: BinaryOperator,
    l: &JsValue,
    r: &JsValue,
    ctx: &mut EvalContext,
) -> ValueResult {
    Ok(match operator {
        BinaryOperator::Add => {
            let lp = to_primitive(l, PreferredType::Default, ctx)?;
            let rp = to_primitive(r, PreferredType::Default, ctx)?;
            if matches!(lp, JsValue::String(_)) || matches!(rp, JsValue::String(_)) {
                let mut s = to_string(&lp, ctx)?;
                let tail = to_string(&rp, ctx)?;
                ctx.charge(s.len() + tail.len())?;
                s.push_str(&tail);
                JsValue::String(s)
            } else {
                JsValue::Number(add_numbers(to_numeric(&lp, ctx)?, to_numeric(&rp, ctx)?))
            }
        }
        BinaryOperator::Subtract => {
            JsValue::Number(subtract_numbers(to_numeric(l, ctx)?, to_numeric(r, ctx)?))
        }
        BinaryOperator::Multiply => {
            JsValue::Number(multiply_numbers(to_numeric(l, ctx)?, to_numeric(r, ctx)?))
        }
        BinaryOperator::Divide => {
            JsValue::Number(divide_numbers(to_numeric(l, ctx)?, to_numeric(r, ctx)?))
        }
        BinaryOperator::Modulo => {
            JsValue::Number(remainder_numbers(to_numeric(l, ctx)?, to_numeric(r, ctx)?))
        }

        BinaryOperator::LooselyEqual => JsValue::Boolean(loose_equals(l, r, ctx)?),
        BinaryOperator::LooselyUnequal => JsValue::Boolean(!loose_equals(l, r, ctx)?),
        BinaryOperator::StrictlyEqual => JsValue::Boolean(strict_equals(l, r)),
        BinaryOperator::StrictlyUnequal => JsValue::Boolean(!strict_equals(l, r)),

        BinaryOperator::LessThan => JsValue::Boolean(less_than(l, r, ctx)?.unwrap_or(false)),
        BinaryOperator::GreaterThan => JsValue::Boolean(less_than(r, l, ctx)?.unwrap_or(false)),
        BinaryOperator::LessThanEqual => {
            JsValue::Boolean(matches!(less_than(r, l, ctx)?, Some(false)))
        }
        BinaryOperator::GreaterThanEqual => {
            JsValue::Boolean(matches!(less_than(l, r, ctx)?, Some(false)))
        }

        BinaryOperator::BitwiseLeftShift => {
            let a = to_int32(l, ctx)?;
            let n = to_uint32(r, ctx)? & 31;
            JsValue::from_i64(a.wrapping_shl(n) as i64)
        }
        BinaryOperator::BitwiseRightShift => {
            let a = to_int32(l, ctx)?;
            let n = to_uint32(r, ctx)? & 31;
            JsValue::from_i64((a >> n) as i64)
        }
        BinaryOperator::BitwiseUnsignedRightShift => {
            let a = to_uint32(l, ctx)?;
            let n = to_uint32(r, ctx)? & 31;
            JsValue::from_i64((a >> n) as i64)
        }
        BinaryOperator::BitwiseAnd => {
            JsValue::from_i64((to_int32(l, ctx)? & to_int32(r, ctx)?) as i64)
        }
        BinaryOperator::BitwiseOr => {
            JsValue::from_i64((to_int32(l, ctx)? | to_int32(r, ctx)?) as i64)
        }
        BinaryOperator::BitwiseXor => {
            JsValue::from_i64((to_int32(l, ctx)? ^ to_int32(r, ctx)?) as i64)
        }

        BinaryOperator::In => {
            let id = match r {
                JsValue::Object(id) => *id,
                _ => {
                    return Err(JErrorType::TypeError(format!(
                        "cannot use 'in' operator to search for '{}' in {}",
                        l, r
                    )))
                }
            };
            let key = to_string(l, ctx)?;
            JsValue::Boolean(ctx.heap.has_property(id, &key)?)
        }
        BinaryOperator::InstanceOf => {
            if !ctx.is_callable(r) {
                return Err(JErrorType::TypeError(
                    "right-hand side of 'instanceof' is not callable".to_string(),
                ));
            }
            let id = match l {
                JsValue::Object(id) => *id,
                _ => return Ok(JsValue::Boolean(false)),
            };
            let prototype = match ctx.get_property(r, "prototype")? {
                JsValue::Object(p) => p,
                _ => {
                    return Err(JErrorType::TypeError(
                        "function has non-object prototype in instanceof check".to_string(),
                    ))
                }
            };
            JsValue::Boolean(ctx.heap.inherits_from(id, prototype)?)
        }
    })
}

// ============================================================================
// Calls
// ============================================================================

fn evaluate_arguments(
    arguments: &[ExpressionType],
    ctx: &mut EvalContext,
) -> Result<Vec<JsValue>, JErrorType> {
    let mut values = Vec::with_capacity(arguments.len());
    for a in arguments {
        values.push(evaluate_expression(a, ctx)?);
    }
    Ok(values)
}

fn evaluate_call_expression(
    callee: &ExpressionType,
    arguments: &[ExpressionType],
    ctx: &mut EvalContext,
) -> ValueResult {
    let (function, this) = match callee {
        ExpressionType::MemberExpression(member) => {
            let reference = evaluate_member_reference(member, ctx)?;
            let function = get_value(&reference, ctx)?;
            match reference.base {
                ReferenceBase::Object(base) => (function, base),
                _ => (function, JsValue::Undefined),
            }
        }
        ExpressionType::Identifier(id) => {
            let reference = resolve_binding(&id.name, ctx)?;
            let function = get_value(&reference, ctx)?;
            // Functions found on a dialog scope object are called as its methods.
            let this = match reference.base {
                ReferenceBase::Environment(env) => match ctx.heap.get(env)?.kind {
                    ObjectKind::Activation { .. } => JsValue::Undefined,
                    _ => JsValue::Object(env),
                },
                _ => JsValue::Undefined,
            };
            (function, this)
        }
        _ => (evaluate_expression(callee, ctx)?, JsValue::Undefined),
    };
    let args = evaluate_arguments(arguments, ctx)?;
    if !ctx.is_callable(&function) {
        return Err(JErrorType::TypeError(format!(
            "{} is not a function",
            describe_expression(callee)
        )));
    }
    call_value(&function, this, args, ctx)
}

/// Short source-like rendering of a callee for error messages.
fn describe_expression(expr: &ExpressionType) -> String {
    match expr {
        ExpressionType::Identifier(id) => id.name.clone(),
        ExpressionType::ThisExpression { .. } => "this".to_string(),
        ExpressionType::MemberExpression(MemberExpressionType::SimpleMemberExpression {
            object,
            property,
            ..
        }) => format!("{}.{}", describe_expression(object), property.name),
        ExpressionType::MemberExpression(MemberExpressionType::ComputedMemberExpression {
            object,
            ..
        }) => format!("{}[...]", describe_expression(object)),
        _ => "expression".to_string(),
    }
}
