use std::sync::Arc;

use crate::parser::api::ParseError;
use crate::parser::ast::{
    ForInTarget, FunctionData, Meta, ProgramData, StatementType,
    VariableDeclarationOrExpression,
};

#[derive(Clone, Copy)]
struct Semantics {
    in_function: bool,
    in_iteration: bool,
    in_breakable: bool,
}

impl Semantics {
    fn new_empty() -> Self {
        Semantics {
            in_function: false,
            in_iteration: false,
            in_breakable: false,
        }
    }

    fn new_function() -> Self {
        Semantics {
            in_function: true,
            in_iteration: false,
            in_breakable: false,
        }
    }

    fn enter_iteration(self) -> Self {
        Semantics {
            in_iteration: true,
            in_breakable: true,
            ..self
        }
    }

    fn enter_switch(self) -> Self {
        Semantics {
            in_breakable: true,
            ..self
        }
    }
}

fn early_error(meta: &Meta, message: &str) -> ParseError {
    ParseError {
        message: message.to_string(),
        line: meta.line,
        column: meta.column,
    }
}

/// Rejects `return` outside of functions and `break`/`continue` outside of the constructs they
/// target.
pub(crate) fn check_early_errors(program: &ProgramData) -> Result<(), ParseError> {
    check_statements(&program.body, Semantics::new_empty())
}

fn check_function(function: &FunctionData) -> Result<(), ParseError> {
    check_statements(&function.body, Semantics::new_function())
}

fn check_statements(statements: &[StatementType], semantics: Semantics) -> Result<(), ParseError> {
    for s in statements {
        check_statement(s, semantics)?;
    }
    Ok(())
}

fn check_statement(statement: &StatementType, semantics: Semantics) -> Result<(), ParseError> {
    match statement {
        StatementType::FunctionDeclaration(f) => check_function(f),
        StatementType::BlockStatement(b) => check_statements(&b.body, semantics),
        StatementType::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            check_statement(consequent, semantics)?;
            if let Some(a) = alternate {
                check_statement(a, semantics)?;
            }
            Ok(())
        }
        StatementType::WhileStatement { body, .. }
        | StatementType::DoWhileStatement { body, .. }
        | StatementType::ForStatement { body, .. } => {
            check_statement(body, semantics.enter_iteration())
        }
        StatementType::ForInStatement(data) => {
            check_statement(&data.body, semantics.enter_iteration())
        }
        StatementType::BreakStatement { meta } => {
            if semantics.in_breakable {
                Ok(())
            } else {
                Err(early_error(meta, "break must be inside loop or switch"))
            }
        }
        StatementType::ContinueStatement { meta } => {
            if semantics.in_iteration {
                Ok(())
            } else {
                Err(early_error(meta, "continue must be inside loop"))
            }
        }
        StatementType::ReturnStatement { meta, .. } => {
            if semantics.in_function {
                Ok(())
            } else {
                Err(early_error(meta, "return not in function"))
            }
        }
        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            check_statements(&block.body, semantics)?;
            if let Some(h) = handler {
                check_statements(&h.body.body, semantics)?;
            }
            if let Some(f) = finalizer {
                check_statements(&f.body, semantics)?;
            }
            Ok(())
        }
        StatementType::SwitchStatement { cases, .. } => {
            let inner = semantics.enter_switch();
            for case in cases {
                check_statements(&case.consequent, inner)?;
            }
            Ok(())
        }
        StatementType::ExpressionStatement { .. }
        | StatementType::EmptyStatement { .. }
        | StatementType::VariableDeclaration(_)
        | StatementType::ThrowStatement { .. } => Ok(()),
    }
}

/// Calls `visit` on every statement of the var scope formed by `body`: nested blocks, loop
/// bodies and clauses are entered, nested functions are not.
fn for_each_in_var_scope<'a, F: FnMut(&'a StatementType)>(body: &'a [StatementType], visit: &mut F) {
    for s in body {
        visit_statement(s, visit);
    }
}

fn visit_statement<'a, F: FnMut(&'a StatementType)>(statement: &'a StatementType, visit: &mut F) {
    visit(statement);
    match statement {
        StatementType::BlockStatement(b) => for_each_in_var_scope(&b.body, visit),
        StatementType::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            visit_statement(consequent, visit);
            if let Some(a) = alternate {
                visit_statement(a, visit);
            }
        }
        StatementType::WhileStatement { body, .. }
        | StatementType::DoWhileStatement { body, .. }
        | StatementType::ForStatement { body, .. } => visit_statement(body, visit),
        StatementType::ForInStatement(data) => visit_statement(&data.body, visit),
        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            for_each_in_var_scope(&block.body, visit);
            if let Some(h) = handler {
                for_each_in_var_scope(&h.body.body, visit);
            }
            if let Some(f) = finalizer {
                for_each_in_var_scope(&f.body, visit);
            }
        }
        StatementType::SwitchStatement { cases, .. } => {
            for case in cases {
                for_each_in_var_scope(&case.consequent, visit);
            }
        }
        _ => {}
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

/// Names declared with `var` anywhere in `body`, not descending into nested functions.
/// Order of first appearance is preserved and duplicates are dropped.
pub fn get_var_declared_names(body: &[StatementType]) -> Vec<String> {
    let mut names = vec![];
    for_each_in_var_scope(body, &mut |s| match s {
        StatementType::VariableDeclaration(v) => {
            for d in &v.declarations {
                push_unique(&mut names, &d.id.name);
            }
        }
        StatementType::ForStatement {
            init: Some(VariableDeclarationOrExpression::VariableDeclaration(v)),
            ..
        } => {
            for d in &v.declarations {
                push_unique(&mut names, &d.id.name);
            }
        }
        StatementType::ForInStatement(data) => {
            if let ForInTarget::VariableDeclaration(id) = &data.left {
                push_unique(&mut names, &id.name);
            }
        }
        _ => {}
    });
    names
}

/// Function declarations of the var scope formed by `body`, in source order. Declarations
/// inside blocks are included; all of them are instantiated before the first statement runs,
/// and a later declaration of the same name wins.
pub fn get_hoisted_functions(body: &[StatementType]) -> Vec<Arc<FunctionData>> {
    let mut functions = vec![];
    for_each_in_var_scope(body, &mut |s| {
        if let StatementType::FunctionDeclaration(f) = s {
            functions.push(f.clone());
        }
    });
    functions
}
