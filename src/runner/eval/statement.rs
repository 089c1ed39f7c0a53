//! Statement execution.
//!
//! Every statement and every loop iteration consumes one step of the context budget before it
//! runs. The first statement to observe an error records its source position.

use std::collections::HashSet;

use crate::parser::ast::{
    BlockStatementData, CatchClauseData, ExpressionType, ForInTarget, ForIteratorData, HasMeta,
    ProgramData, StatementType, SwitchCaseData, VariableDeclarationData,
    VariableDeclarationOrExpression,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object::{JsObject, ObjectKind};
use crate::runner::ds::operations::test_and_comparison::strict_equals;
use crate::runner::ds::operations::type_conversion::to_boolean;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::EvalContext;

use super::expression::{evaluate_expression, evaluate_reference, put_value, resolve_binding};
use super::function::instantiate_declarations;
use super::types::{Completion, CompletionType, EvalResult, ValueResult};

/// Runs a whole program with `env` as both the variable object and `this`. Returns the value
/// of the last expression statement that produced one.
pub fn execute_program(program: &ProgramData, env: ObjectId, ctx: &mut EvalContext) -> ValueResult {
    let saved_scope = std::mem::replace(&mut ctx.scope, env);
    let saved_this = std::mem::replace(&mut ctx.this_value, JsValue::Object(env));
    ctx.call_depth = 0;
    ctx.error_position = None;
    let result = match instantiate_declarations(&program.body, env, ctx) {
        Ok(()) => execute_statements(&program.body, ctx),
        Err(e) => Err(e),
    };
    ctx.scope = saved_scope;
    ctx.this_value = saved_this;
    Ok(result?.get_value())
}

/// Executes statements in order, stopping at the first abrupt completion.
pub fn execute_statements(statements: &[StatementType], ctx: &mut EvalContext) -> EvalResult {
    let mut last = None;
    for stmt in statements {
        let completion = execute_statement(stmt, ctx)?;
        if completion.value.is_some() {
            last = completion.value.clone();
        }
        if completion.is_abrupt() {
            return Ok(completion.update_empty(last));
        }
    }
    Ok(Completion {
        completion_type: CompletionType::Normal,
        value: last,
    })
}

/// Execute a statement and return its completion.
pub fn execute_statement(stmt: &StatementType, ctx: &mut EvalContext) -> EvalResult {
    let result = match ctx.tick() {
        Ok(()) => execute_statement_kind(stmt, ctx),
        Err(e) => Err(e),
    };
    if result.is_err() && ctx.error_position.is_none() {
        let meta = stmt.get_meta();
        ctx.error_position = Some((meta.line, meta.column));
    }
    result
}

fn execute_statement_kind(stmt: &StatementType, ctx: &mut EvalContext) -> EvalResult {
    match stmt {
        StatementType::EmptyStatement { .. } => Ok(Completion::normal()),

        // Instantiated when the enclosing function or program is entered.
        StatementType::FunctionDeclaration(_) => Ok(Completion::normal()),

        StatementType::ExpressionStatement { expression, .. } => {
            let value = evaluate_expression(expression, ctx)?;
            Ok(Completion::normal_with_value(value))
        }

        StatementType::BlockStatement(block) => execute_statements(&block.body, ctx),

        StatementType::VariableDeclaration(decl) => {
            execute_variable_declaration(decl, ctx)?;
            Ok(Completion::normal())
        }

        StatementType::IfStatement {
            test,
            consequent,
            alternate,
            ..
        } => {
            if to_boolean(&evaluate_expression(test, ctx)?) {
                execute_statement(consequent, ctx)
            } else if let Some(alternate) = alternate {
                execute_statement(alternate, ctx)
            } else {
                Ok(Completion::normal())
            }
        }

        StatementType::WhileStatement { test, body, .. } => {
            execute_while_statement(test, body, ctx)
        }

        StatementType::DoWhileStatement { test, body, .. } => {
            execute_do_while_statement(body, test, ctx)
        }

        StatementType::ForStatement {
            init,
            test,
            update,
            body,
            ..
        } => execute_for_statement(init.as_ref(), test.as_ref(), update.as_ref(), body, ctx),

        StatementType::ForInStatement(data) => execute_for_in_statement(data, ctx),

        StatementType::SwitchStatement {
            discriminant,
            cases,
            ..
        } => execute_switch_statement(discriminant, cases, ctx),

        StatementType::BreakStatement { .. } => Ok(Completion::break_completion()),

        StatementType::ContinueStatement { .. } => Ok(Completion::continue_completion()),

        StatementType::ReturnStatement { argument, .. } => {
            let value = match argument {
                Some(arg) => evaluate_expression(arg, ctx)?,
                None => JsValue::Undefined,
            };
            Ok(Completion::return_value(value))
        }

        StatementType::ThrowStatement { argument, .. } => {
            let value = evaluate_expression(argument, ctx)?;
            Err(JErrorType::Thrown(value))
        }

        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => execute_try_statement(block, handler.as_ref(), finalizer.as_ref(), ctx),
    }
}

fn execute_variable_declaration(
    decl: &VariableDeclarationData,
    ctx: &mut EvalContext,
) -> Result<(), JErrorType> {
    for declarator in &decl.declarations {
        if let Some(init) = &declarator.init {
            let value = evaluate_expression(init, ctx)?;
            let reference = resolve_binding(&declarator.id.name, ctx)?;
            put_value(&reference, value, ctx)?;
        }
    }
    Ok(())
}

// ============================================================================
// Loops
// ============================================================================

enum LoopStep {
    Next,
    Exit,
    Return(Completion),
}

fn loop_step(completion: Completion, last: &mut Option<JsValue>) -> LoopStep {
    if completion.value.is_some() {
        *last = completion.value.clone();
    }
    match completion.completion_type {
        CompletionType::Normal | CompletionType::Continue => LoopStep::Next,
        CompletionType::Break => LoopStep::Exit,
        CompletionType::Return => LoopStep::Return(completion),
    }
}

fn loop_result(last: Option<JsValue>) -> EvalResult {
    Ok(Completion {
        completion_type: CompletionType::Normal,
        value: last,
    })
}

fn execute_while_statement(
    test: &ExpressionType,
    body: &StatementType,
    ctx: &mut EvalContext,
) -> EvalResult {
    let mut last = None;
    loop {
        ctx.tick()?;
        if !to_boolean(&evaluate_expression(test, ctx)?) {
            break;
        }
        match loop_step(execute_statement(body, ctx)?, &mut last) {
            LoopStep::Next => {}
            LoopStep::Exit => break,
            LoopStep::Return(c) => return Ok(c),
        }
    }
    loop_result(last)
}

fn execute_do_while_statement(
    body: &StatementType,
    test: &ExpressionType,
    ctx: &mut EvalContext,
) -> EvalResult {
    let mut last = None;
    loop {
        ctx.tick()?;
        match loop_step(execute_statement(body, ctx)?, &mut last) {
            LoopStep::Next => {}
            LoopStep::Exit => break,
            LoopStep::Return(c) => return Ok(c),
        }
        if !to_boolean(&evaluate_expression(test, ctx)?) {
            break;
        }
    }
    loop_result(last)
}

fn execute_for_statement(
    init: Option<&VariableDeclarationOrExpression>,
    test: Option<&ExpressionType>,
    update: Option<&ExpressionType>,
    body: &StatementType,
    ctx: &mut EvalContext,
) -> EvalResult {
    match init {
        Some(VariableDeclarationOrExpression::VariableDeclaration(decl)) => {
            execute_variable_declaration(decl, ctx)?
        }
        Some(VariableDeclarationOrExpression::Expression(e)) => {
            evaluate_expression(e, ctx)?;
        }
        None => {}
    }
    let mut last = None;
    loop {
        ctx.tick()?;
        if let Some(test) = test {
            if !to_boolean(&evaluate_expression(test, ctx)?) {
                break;
            }
        }
        match loop_step(execute_statement(body, ctx)?, &mut last) {
            LoopStep::Next => {}
            LoopStep::Exit => break,
            LoopStep::Return(c) => return Ok(c),
        }
        if let Some(update) = update {
            evaluate_expression(update, ctx)?;
        }
    }
    loop_result(last)
}

/// Enumerable property names of `value` and its prototypes, own properties first. A name
/// shadowed by a non-enumerable property further down the chain is not reported.
fn enumerable_keys(value: &JsValue, ctx: &EvalContext) -> Result<Vec<String>, JErrorType> {
    let mut keys = vec![];
    match value {
        JsValue::Object(id) => {
            let mut seen = HashSet::new();
            let mut current = Some(*id);
            while let Some(cid) = current {
                let object = ctx.heap.get(cid)?;
                for key in object.own_keys(false) {
                    if !seen.insert(key.clone()) {
                        continue;
                    }
                    let enumerable = object
                        .get_own_descriptor(&key)
                        .map(|d| d.is_enumerable())
                        .unwrap_or(true);
                    if enumerable {
                        keys.push(key);
                    }
                }
                current = object.prototype;
            }
        }
        JsValue::String(s) => keys.extend((0..s.encode_utf16().count()).map(|i| i.to_string())),
        _ => {}
    }
    Ok(keys)
}

fn execute_for_in_statement(data: &ForIteratorData, ctx: &mut EvalContext) -> EvalResult {
    let subject = evaluate_expression(&data.right, ctx)?;
    let keys = enumerable_keys(&subject, ctx)?;
    let mut last = None;
    for key in keys {
        ctx.tick()?;
        // Properties deleted by an earlier iteration are skipped.
        if let JsValue::Object(id) = &subject {
            if !ctx.heap.has_property(*id, &key)? {
                continue;
            }
        }
        let reference = match &data.left {
            ForInTarget::VariableDeclaration(id) => resolve_binding(&id.name, ctx)?,
            ForInTarget::Expression(e) => evaluate_reference(e, ctx)?,
        };
        put_value(&reference, JsValue::String(key), ctx)?;
        match loop_step(execute_statement(&data.body, ctx)?, &mut last) {
            LoopStep::Next => {}
            LoopStep::Exit => break,
            LoopStep::Return(c) => return Ok(c),
        }
    }
    loop_result(last)
}

// ============================================================================
// Switch and try
// ============================================================================

fn execute_switch_statement(
    discriminant: &ExpressionType,
    cases: &[SwitchCaseData],
    ctx: &mut EvalContext,
) -> EvalResult {
    let value = evaluate_expression(discriminant, ctx)?;
    let mut start = None;
    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = &case.test {
            if strict_equals(&value, &evaluate_expression(test, ctx)?) {
                start = Some(i);
                break;
            }
        }
    }
    let start = start.or_else(|| cases.iter().position(|c| c.test.is_none()));

    let mut last = None;
    if let Some(start) = start {
        for case in &cases[start..] {
            let completion = execute_statements(&case.consequent, ctx)?;
            if completion.value.is_some() {
                last = completion.value.clone();
            }
            match completion.completion_type {
                CompletionType::Normal => {}
                CompletionType::Break => break,
                CompletionType::Continue | CompletionType::Return => {
                    return Ok(completion.update_empty(last))
                }
            }
        }
    }
    loop_result(last)
}

fn execute_try_statement(
    block: &BlockStatementData,
    handler: Option<&CatchClauseData>,
    finalizer: Option<&BlockStatementData>,
    ctx: &mut EvalContext,
) -> EvalResult {
    let mut result = execute_statements(&block.body, ctx);

    if let Some(handler) = handler {
        let caught = match &result {
            Err(e) if e.is_catchable() => Some(e.clone()),
            _ => None,
        };
        if let Some(error) = caught {
            result = execute_catch_clause(handler, error, ctx);
        }
    }

    if let Some(finalizer) = finalizer {
        // Budget exhaustion and engine failures unwind without running finally blocks.
        if let Err(e) = &result {
            if !e.is_catchable() {
                return result;
            }
        }
        let pending_position = ctx.error_position.take();
        let completion = execute_statements(&finalizer.body, ctx)?;
        if completion.is_abrupt() {
            return Ok(completion);
        }
        ctx.error_position = pending_position;
    }
    result
}

fn execute_catch_clause(
    handler: &CatchClauseData,
    error: JErrorType,
    ctx: &mut EvalContext,
) -> EvalResult {
    ctx.error_position = None;
    let value = ctx.error_to_value(&error)?;
    let scope = ctx.scope;
    let env = ctx.alloc(JsObject::new(ObjectKind::Activation { parent: scope }, None))?;
    ctx.heap.get_mut(env)?.put(&handler.param.name, value);
    ctx.scope = env;
    let result = execute_statements(&handler.body.body, ctx);
    ctx.scope = scope;
    result
}
