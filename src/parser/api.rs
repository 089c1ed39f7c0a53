use std::fmt;
use std::sync::Arc;

use pest::error::{Error, ErrorVariant, LineColLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::*;
use super::static_semantics::check_early_errors;

#[derive(Parser)]
#[grammar = "parser/script_grammar.pest"] // relative to src
pub struct JsParser;

/// A compile-time failure: the script was rejected before anything ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}

impl From<Error<Rule>> for ParseError {
    fn from(e: Error<Rule>) -> Self {
        let (line, column) = match e.line_col {
            LineColLocation::Pos(p) => p,
            LineColLocation::Span(p, _) => p,
        };
        let message = match &e.variant {
            ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                format!("syntax error, expected one of {:?}", positives)
            }
            ErrorVariant::ParsingError { .. } => "syntax error".to_string(),
            ErrorVariant::CustomError { message } => message.clone(),
        };
        ParseError {
            message,
            line,
            column,
        }
    }
}

impl JsParser {
    /// Parse a script into its AST, applying the early-error checks.
    pub fn parse_to_ast_from_str(script: &str) -> Result<ProgramData, ParseError> {
        let mut pairs = JsParser::parse(Rule::script, script)?;
        let script_pair = match pairs.next() {
            Some(p) => p,
            None => {
                return Err(ParseError {
                    message: "empty parse tree".to_string(),
                    line: 1,
                    column: 1,
                })
            }
        };
        let meta = get_meta(&script_pair);
        let mut body = vec![];
        for pair in script_pair.into_inner() {
            if pair.as_rule() == Rule::EOI {
                continue;
            }
            body.push(build_ast_from_statement(pair)?);
        }
        let program = ProgramData { meta, body };
        check_early_errors(&program)?;
        Ok(program)
    }
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    let span = pair.as_span();
    let (line, column) = span.start_pos().line_col();
    Meta {
        start_index: span.start(),
        end_index: span.end(),
        line,
        column,
    }
}

fn join_meta(start: &Meta, end: &Meta) -> Meta {
    Meta {
        start_index: start.start_index,
        end_index: end.end_index,
        line: start.line,
        column: start.column,
    }
}

fn get_unexpected_error(code: u32, pair: &Pair<Rule>) -> ParseError {
    let (line, column) = pair.as_span().start_pos().line_col();
    ParseError {
        message: format!("[{}] unexpected {:?} '{}'", code, pair.as_rule(), pair.as_str()),
        line,
        column,
    }
}

fn get_error_at(meta: &Meta, message: impl Into<String>) -> ParseError {
    ParseError {
        message: message.into(),
        line: meta.line,
        column: meta.column,
    }
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_var
            | Rule::kw_function
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_do
            | Rule::kw_while
            | Rule::kw_for
            | Rule::kw_in
            | Rule::kw_continue
            | Rule::kw_break
            | Rule::kw_return
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_catch
            | Rule::kw_finally
            | Rule::kw_switch
            | Rule::kw_case
            | Rule::kw_default
            | Rule::kw_new
    )
}

/// Children of a pair without the keyword tokens.
fn significant_children(pair: Pair<Rule>) -> Vec<Pair<Rule>> {
    pair.into_inner()
        .filter(|p| !is_keyword(p.as_rule()))
        .collect()
}

fn next_child<'i>(
    iter: &mut std::vec::IntoIter<Pair<'i, Rule>>,
    parent_meta: &Meta,
) -> Result<Pair<'i, Rule>, ParseError> {
    iter.next()
        .ok_or_else(|| get_error_at(parent_meta, "incomplete syntax tree"))
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

fn build_ast_from_statement(pair: Pair<Rule>) -> Result<StatementType, ParseError> {
    let meta = get_meta(&pair);
    Ok(match pair.as_rule() {
        Rule::function_declaration => {
            StatementType::FunctionDeclaration(Arc::new(build_function(pair)?))
        }
        Rule::block => StatementType::BlockStatement(build_block(pair)?),
        Rule::variable_statement => {
            StatementType::VariableDeclaration(build_variable_declarations(meta, pair)?)
        }
        Rule::empty_statement => StatementType::EmptyStatement { meta },
        Rule::expression_statement => {
            let mut children = significant_children(pair).into_iter();
            let expression = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            StatementType::ExpressionStatement { meta, expression }
        }
        Rule::if_statement => {
            let mut children = significant_children(pair).into_iter();
            let test = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            let consequent = Box::new(build_ast_from_statement(next_child(
                &mut children,
                &meta,
            )?)?);
            let alternate = match children.next() {
                Some(p) => Some(Box::new(build_ast_from_statement(p)?)),
                None => None,
            };
            StatementType::IfStatement {
                meta,
                test,
                consequent,
                alternate,
            }
        }
        Rule::do_while_statement => {
            let mut children = significant_children(pair).into_iter();
            let body = Box::new(build_ast_from_statement(next_child(&mut children, &meta)?)?);
            let test = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            StatementType::DoWhileStatement { meta, test, body }
        }
        Rule::while_statement => {
            let mut children = significant_children(pair).into_iter();
            let test = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            let body = Box::new(build_ast_from_statement(next_child(&mut children, &meta)?)?);
            StatementType::WhileStatement { meta, test, body }
        }
        Rule::for_statement => build_for_statement(meta, pair)?,
        Rule::for_in_statement => {
            let mut children = significant_children(pair).into_iter();
            let left_pair = next_child(&mut children, &meta)?;
            let left = build_for_in_target(left_pair)?;
            let right = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            let body = Box::new(build_ast_from_statement(next_child(&mut children, &meta)?)?);
            StatementType::ForInStatement(ForIteratorData {
                meta,
                left,
                right,
                body,
            })
        }
        Rule::continue_statement => StatementType::ContinueStatement { meta },
        Rule::break_statement => StatementType::BreakStatement { meta },
        Rule::return_statement => {
            let argument = match significant_children(pair).into_iter().next() {
                Some(p) => Some(build_ast_from_expression(p)?),
                None => None,
            };
            StatementType::ReturnStatement { meta, argument }
        }
        Rule::throw_statement => {
            let mut children = significant_children(pair).into_iter();
            let argument = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            StatementType::ThrowStatement { meta, argument }
        }
        Rule::try_statement => build_try_statement(meta, pair)?,
        Rule::switch_statement => {
            let mut children = significant_children(pair).into_iter();
            let discriminant = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            let mut cases = vec![];
            for clause in children {
                cases.push(build_switch_clause(clause)?);
            }
            StatementType::SwitchStatement {
                meta,
                discriminant,
                cases,
            }
        }
        _ => return Err(get_unexpected_error(1, &pair)),
    })
}

fn build_block(pair: Pair<Rule>) -> Result<BlockStatementData, ParseError> {
    let meta = get_meta(&pair);
    let mut body = vec![];
    for p in pair.into_inner() {
        body.push(build_ast_from_statement(p)?);
    }
    Ok(BlockStatementData { meta, body })
}

fn build_variable_declarations(
    meta: Meta,
    pair: Pair<Rule>,
) -> Result<VariableDeclarationData, ParseError> {
    let mut declarations = vec![];
    for p in significant_children(pair) {
        declarations.push(build_variable_declarator(p)?);
    }
    Ok(VariableDeclarationData { meta, declarations })
}

fn build_variable_declarator(pair: Pair<Rule>) -> Result<VariableDeclaratorData, ParseError> {
    let meta = get_meta(&pair);
    let mut children = significant_children(pair).into_iter();
    let id = build_identifier(next_child(&mut children, &meta)?);
    let init = match children.next() {
        Some(p) => Some(build_ast_from_expression(p)?),
        None => None,
    };
    Ok(VariableDeclaratorData { meta, id, init })
}

fn build_for_statement(meta: Meta, pair: Pair<Rule>) -> Result<StatementType, ParseError> {
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = None;
    for p in significant_children(pair) {
        match p.as_rule() {
            Rule::for_init => {
                let init_meta = get_meta(&p);
                let has_var = p.clone().into_inner().any(|c| c.as_rule() == Rule::kw_var);
                if has_var {
                    init = Some(VariableDeclarationOrExpression::VariableDeclaration(
                        build_variable_declarations(init_meta, p)?,
                    ));
                } else {
                    let mut children = significant_children(p).into_iter();
                    init = Some(VariableDeclarationOrExpression::Expression(
                        build_ast_from_expression(next_child(&mut children, &init_meta)?)?,
                    ));
                }
            }
            Rule::for_test => {
                let test_meta = get_meta(&p);
                let mut children = significant_children(p).into_iter();
                test = Some(build_ast_from_expression(next_child(&mut children, &test_meta)?)?);
            }
            Rule::for_update => {
                let update_meta = get_meta(&p);
                let mut children = significant_children(p).into_iter();
                update = Some(build_ast_from_expression(next_child(
                    &mut children,
                    &update_meta,
                )?)?);
            }
            _ => body = Some(Box::new(build_ast_from_statement(p)?)),
        }
    }
    let body = body.ok_or_else(|| get_error_at(&meta, "missing loop body"))?;
    Ok(StatementType::ForStatement {
        meta,
        init,
        test,
        update,
        body,
    })
}

fn build_for_in_target(pair: Pair<Rule>) -> Result<ForInTarget, ParseError> {
    let meta = get_meta(&pair);
    let has_var = pair.clone().into_inner().any(|c| c.as_rule() == Rule::kw_var);
    let mut children = significant_children(pair).into_iter();
    let child = next_child(&mut children, &meta)?;
    if has_var {
        Ok(ForInTarget::VariableDeclaration(build_identifier(child)))
    } else {
        let target = build_ast_from_expression(child)?;
        if !target.is_valid_simple_assignment_target() {
            return Err(get_error_at(&meta, "invalid for-in left-hand side"));
        }
        Ok(ForInTarget::Expression(target))
    }
}

fn build_try_statement(meta: Meta, pair: Pair<Rule>) -> Result<StatementType, ParseError> {
    let mut block = None;
    let mut handler = None;
    let mut finalizer = None;
    for p in significant_children(pair) {
        match p.as_rule() {
            Rule::block => block = Some(build_block(p)?),
            Rule::catch_clause => {
                let catch_meta = get_meta(&p);
                let mut children = significant_children(p).into_iter();
                let param = build_identifier(next_child(&mut children, &catch_meta)?);
                let body = build_block(next_child(&mut children, &catch_meta)?)?;
                handler = Some(CatchClauseData {
                    meta: catch_meta,
                    param,
                    body,
                });
            }
            Rule::finally_clause => {
                let finally_meta = get_meta(&p);
                let mut children = significant_children(p).into_iter();
                finalizer = Some(build_block(next_child(&mut children, &finally_meta)?)?);
            }
            _ => return Err(get_unexpected_error(2, &p)),
        }
    }
    let block = block.ok_or_else(|| get_error_at(&meta, "missing try block"))?;
    Ok(StatementType::TryStatement {
        meta,
        block,
        handler,
        finalizer,
    })
}

fn build_switch_clause(pair: Pair<Rule>) -> Result<SwitchCaseData, ParseError> {
    let meta = get_meta(&pair);
    let is_default = pair
        .clone()
        .into_inner()
        .next()
        .map(|p| p.as_rule() == Rule::kw_default)
        .unwrap_or(false);
    let mut children = significant_children(pair).into_iter();
    let test = if is_default {
        None
    } else {
        Some(build_ast_from_expression(next_child(&mut children, &meta)?)?)
    };
    let mut consequent = vec![];
    for p in children {
        consequent.push(build_ast_from_statement(p)?);
    }
    Ok(SwitchCaseData {
        meta,
        test,
        consequent,
    })
}

fn build_function(pair: Pair<Rule>) -> Result<FunctionData, ParseError> {
    let meta = get_meta(&pair);
    let mut id = None;
    let mut params = vec![];
    let mut body = vec![];
    for p in significant_children(pair) {
        match p.as_rule() {
            Rule::identifier => id = Some(build_identifier(p)),
            Rule::formal_parameters => {
                for param in p.into_inner() {
                    params.push(build_identifier(param));
                }
            }
            Rule::function_body => {
                for s in p.into_inner() {
                    body.push(build_ast_from_statement(s)?);
                }
            }
            _ => return Err(get_unexpected_error(3, &p)),
        }
    }
    Ok(FunctionData {
        meta,
        id,
        params,
        body,
    })
}

fn build_identifier(pair: Pair<Rule>) -> IdentifierData {
    IdentifierData {
        name: pair.as_str().to_string(),
        meta: get_meta(&pair),
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn build_ast_from_expression(pair: Pair<Rule>) -> Result<ExpressionType, ParseError> {
    let meta = get_meta(&pair);
    match pair.as_rule() {
        Rule::expression => {
            let mut expressions = vec![];
            for p in pair.into_inner() {
                expressions.push(build_ast_from_expression(p)?);
            }
            if expressions.len() == 1 {
                Ok(expressions.remove(0))
            } else {
                Ok(ExpressionType::SequenceExpression { meta, expressions })
            }
        }
        Rule::assignment_expression => {
            let mut children = pair.into_inner();
            let left_pair = children
                .next()
                .ok_or_else(|| get_error_at(&meta, "empty assignment"))?;
            let left = build_ast_from_expression(left_pair)?;
            match children.next() {
                None => Ok(left),
                Some(op_pair) => {
                    if !left.is_valid_simple_assignment_target() {
                        return Err(get_error_at(&meta, "invalid assignment left-hand side"));
                    }
                    let operator = build_assignment_operator(&op_pair)?;
                    let right_pair = children
                        .next()
                        .ok_or_else(|| get_error_at(&meta, "missing assigned value"))?;
                    let right = build_ast_from_expression(right_pair)?;
                    Ok(ExpressionType::AssignmentExpression {
                        meta,
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    })
                }
            }
        }
        Rule::conditional_expression => {
            let mut children = pair.into_inner();
            let test_pair = children
                .next()
                .ok_or_else(|| get_error_at(&meta, "empty conditional"))?;
            let test = build_ast_from_expression(test_pair)?;
            match (children.next(), children.next()) {
                (Some(c), Some(a)) => Ok(ExpressionType::ConditionalExpression {
                    meta,
                    test: Box::new(test),
                    consequent: Box::new(build_ast_from_expression(c)?),
                    alternate: Box::new(build_ast_from_expression(a)?),
                }),
                _ => Ok(test),
            }
        }
        Rule::logical_or_expression
        | Rule::logical_and_expression
        | Rule::bitwise_or_expression
        | Rule::bitwise_xor_expression
        | Rule::bitwise_and_expression
        | Rule::equality_expression
        | Rule::relational_expression
        | Rule::shift_expression
        | Rule::additive_expression
        | Rule::multiplicative_expression => build_binary_chain(pair),
        Rule::unary_expression => {
            let mut children = pair.into_inner();
            let first = children
                .next()
                .ok_or_else(|| get_error_at(&meta, "empty unary expression"))?;
            if first.as_rule() != Rule::unary_operator {
                return build_ast_from_expression(first);
            }
            let operand_pair = children
                .next()
                .ok_or_else(|| get_error_at(&meta, "missing unary operand"))?;
            let argument = build_ast_from_expression(operand_pair)?;
            let op = first.as_str();
            match op {
                "++" | "--" => {
                    if !argument.is_valid_simple_assignment_target() {
                        return Err(get_error_at(&meta, "invalid increment/decrement operand"));
                    }
                    Ok(ExpressionType::UpdateExpression {
                        meta,
                        operator: if op == "++" {
                            UpdateOperator::PlusPlus
                        } else {
                            UpdateOperator::MinusMinus
                        },
                        argument: Box::new(argument),
                        prefix: true,
                    })
                }
                _ => Ok(ExpressionType::UnaryExpression {
                    meta,
                    operator: build_unary_operator(&first)?,
                    argument: Box::new(argument),
                }),
            }
        }
        Rule::postfix_expression => {
            let mut children = pair.into_inner();
            let operand_pair = children
                .next()
                .ok_or_else(|| get_error_at(&meta, "empty postfix expression"))?;
            let argument = build_ast_from_expression(operand_pair)?;
            match children.next() {
                None => Ok(argument),
                Some(op) => {
                    if !argument.is_valid_simple_assignment_target() {
                        return Err(get_error_at(&meta, "invalid increment/decrement operand"));
                    }
                    Ok(ExpressionType::UpdateExpression {
                        meta,
                        operator: if op.as_str() == "++" {
                            UpdateOperator::PlusPlus
                        } else {
                            UpdateOperator::MinusMinus
                        },
                        argument: Box::new(argument),
                        prefix: false,
                    })
                }
            }
        }
        Rule::left_hand_side_expression | Rule::new_target => build_accessor_chain(pair),
        Rule::new_expression => {
            let mut children = significant_children(pair).into_iter();
            let callee = build_ast_from_expression(next_child(&mut children, &meta)?)?;
            let arguments = match children.next() {
                Some(p) => build_arguments(p)?,
                None => vec![],
            };
            Ok(ExpressionType::NewExpression {
                meta,
                callee: Box::new(callee),
                arguments,
            })
        }
        Rule::this_expression => Ok(ExpressionType::ThisExpression { meta }),
        Rule::function_expression => Ok(ExpressionType::FunctionExpression(Arc::new(
            build_function(pair)?,
        ))),
        Rule::null_literal => Ok(ExpressionType::Literal(LiteralData {
            meta,
            value: LiteralType::NullLiteral,
        })),
        Rule::boolean_literal => Ok(ExpressionType::Literal(LiteralData {
            meta,
            value: LiteralType::BooleanLiteral(pair.as_str() == "true"),
        })),
        Rule::numeric_literal => Ok(ExpressionType::Literal(LiteralData {
            value: LiteralType::NumberLiteral(parse_numeric_literal(pair.as_str(), &meta)?),
            meta,
        })),
        Rule::string_literal => Ok(ExpressionType::Literal(LiteralData {
            value: LiteralType::StringLiteral(unescape_string_literal(pair.as_str())),
            meta,
        })),
        Rule::identifier => Ok(ExpressionType::Identifier(build_identifier(pair))),
        Rule::array_literal => {
            let mut elements = vec![];
            for p in pair.into_inner() {
                elements.push(build_ast_from_expression(p)?);
            }
            Ok(ExpressionType::ArrayExpression { meta, elements })
        }
        Rule::object_literal => {
            let mut properties = vec![];
            for p in pair.into_inner() {
                let prop_meta = get_meta(&p);
                let mut children = p.into_inner();
                let key_pair = children
                    .next()
                    .ok_or_else(|| get_error_at(&prop_meta, "missing property name"))?;
                let key = match key_pair.as_rule() {
                    Rule::string_literal => unescape_string_literal(key_pair.as_str()),
                    Rule::numeric_literal => {
                        match parse_numeric_literal(key_pair.as_str(), &prop_meta)? {
                            NumberLiteralType::IntegerLiteral(i) => i.to_string(),
                            NumberLiteralType::FloatLiteral(f) => f.to_string(),
                        }
                    }
                    _ => key_pair.as_str().to_string(),
                };
                let value_pair = children
                    .next()
                    .ok_or_else(|| get_error_at(&prop_meta, "missing property value"))?;
                properties.push((key, build_ast_from_expression(value_pair)?));
            }
            Ok(ExpressionType::ObjectExpression { meta, properties })
        }
        _ => Err(get_unexpected_error(4, &pair)),
    }
}

fn build_binary_chain(pair: Pair<Rule>) -> Result<ExpressionType, ParseError> {
    let meta = get_meta(&pair);
    let mut children = pair.into_inner();
    let first = children
        .next()
        .ok_or_else(|| get_error_at(&meta, "empty binary expression"))?;
    let mut left = build_ast_from_expression(first)?;
    while let Some(op_pair) = children.next() {
        let right_pair = children
            .next()
            .ok_or_else(|| get_error_at(&meta, "missing right operand"))?;
        let right = build_ast_from_expression(right_pair)?;
        let joined = join_meta(left.get_meta(), right.get_meta());
        left = match op_pair.as_rule() {
            Rule::or_operator | Rule::and_operator => ExpressionType::LogicalExpression {
                meta: joined,
                operator: if op_pair.as_rule() == Rule::or_operator {
                    LogicalOperator::Or
                } else {
                    LogicalOperator::And
                },
                left: Box::new(left),
                right: Box::new(right),
            },
            _ => ExpressionType::BinaryExpression {
                meta: joined,
                operator: build_binary_operator(&op_pair)?,
                left: Box::new(left),
                right: Box::new(right),
            },
        };
    }
    Ok(left)
}

fn build_accessor_chain(pair: Pair<Rule>) -> Result<ExpressionType, ParseError> {
    let meta = get_meta(&pair);
    let mut children = pair.into_inner();
    let first = children
        .next()
        .ok_or_else(|| get_error_at(&meta, "empty member expression"))?;
    let mut expr = build_ast_from_expression(first)?;
    for accessor in children {
        let accessor_meta = get_meta(&accessor);
        let joined = join_meta(expr.get_meta(), &accessor_meta);
        expr = match accessor.as_rule() {
            Rule::arguments => ExpressionType::CallExpression {
                meta: joined,
                callee: Box::new(expr),
                arguments: build_arguments(accessor)?,
            },
            Rule::property_access => {
                let mut inner = accessor.into_inner();
                let name_pair = inner
                    .next()
                    .ok_or_else(|| get_error_at(&accessor_meta, "missing property name"))?;
                ExpressionType::MemberExpression(MemberExpressionType::SimpleMemberExpression {
                    meta: joined,
                    object: Box::new(expr),
                    property: build_identifier(name_pair),
                })
            }
            Rule::index_access => {
                let mut inner = accessor.into_inner();
                let index_pair = inner
                    .next()
                    .ok_or_else(|| get_error_at(&accessor_meta, "missing index expression"))?;
                ExpressionType::MemberExpression(MemberExpressionType::ComputedMemberExpression {
                    meta: joined,
                    object: Box::new(expr),
                    property: Box::new(build_ast_from_expression(index_pair)?),
                })
            }
            _ => return Err(get_unexpected_error(5, &accessor)),
        };
    }
    Ok(expr)
}

fn build_arguments(pair: Pair<Rule>) -> Result<Vec<ExpressionType>, ParseError> {
    let mut arguments = vec![];
    for p in pair.into_inner() {
        arguments.push(build_ast_from_expression(p)?);
    }
    Ok(arguments)
}

fn build_assignment_operator(pair: &Pair<Rule>) -> Result<AssignmentOperator, ParseError> {
    Ok(match pair.as_str() {
        "=" => AssignmentOperator::Equals,
        "+=" => AssignmentOperator::AddEquals,
        "-=" => AssignmentOperator::SubtractEquals,
        "*=" => AssignmentOperator::MultiplyEquals,
        "/=" => AssignmentOperator::DivideEquals,
        "%=" => AssignmentOperator::ModuloEquals,
        "<<=" => AssignmentOperator::BitwiseLeftShiftEquals,
        ">>=" => AssignmentOperator::BitwiseRightShiftEquals,
        ">>>=" => AssignmentOperator::BitwiseUnsignedRightShiftEquals,
        "|=" => AssignmentOperator::BitwiseOrEquals,
        "^=" => AssignmentOperator::BitwiseXorEquals,
        "&=" => AssignmentOperator::BitwiseAndEquals,
        _ => return Err(get_unexpected_error(6, pair)),
    })
}

fn build_unary_operator(pair: &Pair<Rule>) -> Result<UnaryOperator, ParseError> {
    Ok(match pair.as_str() {
        "-" => UnaryOperator::Minus,
        "+" => UnaryOperator::Plus,
        "!" => UnaryOperator::LogicalNot,
        "~" => UnaryOperator::BitwiseNot,
        "typeof" => UnaryOperator::TypeOf,
        "void" => UnaryOperator::Void,
        "delete" => UnaryOperator::Delete,
        _ => return Err(get_unexpected_error(7, pair)),
    })
}

fn build_binary_operator(pair: &Pair<Rule>) -> Result<BinaryOperator, ParseError> {
    Ok(match pair.as_str() {
        "==" => BinaryOperator::LooselyEqual,
        "!=" => BinaryOperator::LooselyUnequal,
        "===" => BinaryOperator::StrictlyEqual,
        "!==" => BinaryOperator::StrictlyUnequal,
        "<" => BinaryOperator::LessThan,
        "<=" => BinaryOperator::LessThanEqual,
        ">" => BinaryOperator::GreaterThan,
        ">=" => BinaryOperator::GreaterThanEqual,
        "<<" => BinaryOperator::BitwiseLeftShift,
        ">>" => BinaryOperator::BitwiseRightShift,
        ">>>" => BinaryOperator::BitwiseUnsignedRightShift,
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Subtract,
        "*" => BinaryOperator::Multiply,
        "/" => BinaryOperator::Divide,
        "%" => BinaryOperator::Modulo,
        "|" => BinaryOperator::BitwiseOr,
        "^" => BinaryOperator::BitwiseXor,
        "&" => BinaryOperator::BitwiseAnd,
        "in" => BinaryOperator::In,
        "instanceof" => BinaryOperator::InstanceOf,
        _ => return Err(get_unexpected_error(8, pair)),
    })
}

pub(crate) fn parse_numeric_literal(text: &str, meta: &Meta) -> Result<NumberLiteralType, ParseError> {
    if text.starts_with("0x") || text.starts_with("0X") {
        return match i64::from_str_radix(&text[2..], 16) {
            Ok(i) => Ok(NumberLiteralType::IntegerLiteral(i)),
            Err(_) => u64::from_str_radix(&text[2..], 16)
                .map(|u| NumberLiteralType::FloatLiteral(u as f64))
                .map_err(|_| get_error_at(meta, format!("invalid hex literal '{}'", text))),
        };
    }
    if !text.contains(|c| c == '.' || c == 'e' || c == 'E') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(NumberLiteralType::IntegerLiteral(i));
        }
    }
    text.parse::<f64>()
        .map(NumberLiteralType::FloatLiteral)
        .map_err(|_| get_error_at(meta, format!("invalid numeric literal '{}'", text)))
}

/// Strip the quotes of a string literal and resolve its escape sequences.
pub(crate) fn unescape_string_literal(raw: &str) -> String {
    let inner = if raw.len() >= 2 { &raw[1..raw.len() - 1] } else { raw };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('v') => out.push('\u{000B}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(std::char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('x');
                        out.push_str(&hex);
                    }
                }
            }
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(std::char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            // Line continuation.
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
