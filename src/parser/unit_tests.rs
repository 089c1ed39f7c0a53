use super::api::JsParser;
use super::api::Rule;
use super::ast::*;
use super::static_semantics::{get_hoisted_functions, get_var_declared_names};

use pest::{consumes_to, parses_to};
use pest::Parser;

fn parse_ok(code: &str) -> ProgramData {
    match JsParser::parse_to_ast_from_str(code) {
        Ok(p) => p,
        Err(e) => panic!("failed to parse {:?}: {}", code, e),
    }
}

fn single_expression(code: &str) -> ExpressionType {
    let program = parse_ok(code);
    assert_eq!(program.body.len(), 1, "expected exactly one statement");
    match program.body.into_iter().next() {
        Some(StatementType::ExpressionStatement { expression, .. }) => expression,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

// ============================================================================
// Lexical rules
// ============================================================================

#[test]
fn test_decimal_number_with_no_dot() {
    parses_to! {
        parser: JsParser,
        input: "10",
        rule: Rule::numeric_literal,
        tokens: [numeric_literal(0, 2)]
    };
}

#[test]
fn test_hex_number() {
    parses_to! {
        parser: JsParser,
        input: "0xFF",
        rule: Rule::numeric_literal,
        tokens: [numeric_literal(0, 4)]
    };
}

#[test]
fn test_single_quoted_string() {
    parses_to! {
        parser: JsParser,
        input: "'a\\'b'",
        rule: Rule::string_literal,
        tokens: [string_literal(0, 6)]
    };
}

#[test]
fn test_identifier_may_start_with_keyword() {
    parses_to! {
        parser: JsParser,
        input: "variable",
        rule: Rule::identifier,
        tokens: [identifier(0, 8)]
    };
}

#[test]
fn test_reserved_word_is_not_identifier() {
    assert!(JsParser::parse(Rule::identifier, "var").is_err());
    assert!(JsParser::parse(Rule::identifier, "instanceof").is_err());
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_number_literal_kinds() {
    match single_expression("42;") {
        ExpressionType::Literal(LiteralData {
            value: LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(42)),
            ..
        }) => {}
        other => panic!("unexpected {:?}", other),
    }
    match single_expression("1.5e2;") {
        ExpressionType::Literal(LiteralData {
            value: LiteralType::NumberLiteral(NumberLiteralType::FloatLiteral(f)),
            ..
        }) => assert_eq!(f, 150.0),
        other => panic!("unexpected {:?}", other),
    }
    match single_expression("0x10;") {
        ExpressionType::Literal(LiteralData {
            value: LiteralType::NumberLiteral(NumberLiteralType::IntegerLiteral(16)),
            ..
        }) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_string_escapes_are_resolved() {
    match single_expression(r#""a\tbA\x42\n";"#) {
        ExpressionType::Literal(LiteralData {
            value: LiteralType::StringLiteral(s),
            ..
        }) => assert_eq!(s, "a\tbAB\n"),
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    match single_expression("1 + 2 * 3;") {
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::Add,
            right,
            ..
        } => match *right {
            ExpressionType::BinaryExpression {
                operator: BinaryOperator::Multiply,
                ..
            } => {}
            other => panic!("unexpected right operand {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_subtraction_is_left_associative() {
    match single_expression("10 - 4 - 3;") {
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::Subtract,
            left,
            ..
        } => assert!(matches!(
            *left,
            ExpressionType::BinaryExpression {
                operator: BinaryOperator::Subtract,
                ..
            }
        )),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_instanceof_is_not_read_as_in() {
    assert!(matches!(
        single_expression("a instanceof B;"),
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::InstanceOf,
            ..
        }
    ));
    assert!(matches!(
        single_expression("'x' in o;"),
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::In,
            ..
        }
    ));
}

#[test]
fn test_assignment_is_right_associative() {
    match single_expression("a = b = 1;") {
        ExpressionType::AssignmentExpression {
            operator: AssignmentOperator::Equals,
            right,
            ..
        } => assert!(matches!(
            *right,
            ExpressionType::AssignmentExpression { .. }
        )),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_member_call_chain() {
    match single_expression("session.caller.name();") {
        ExpressionType::CallExpression { callee, arguments, .. } => {
            assert!(arguments.is_empty());
            match *callee {
                ExpressionType::MemberExpression(MemberExpressionType::SimpleMemberExpression {
                    property,
                    ..
                }) => assert_eq!(property.name, "name"),
                other => panic!("unexpected callee {:?}", other),
            }
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_new_with_arguments() {
    match single_expression("new Error('boom');") {
        ExpressionType::NewExpression { arguments, .. } => assert_eq!(arguments.len(), 1),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_postfix_and_prefix_updates() {
    assert!(matches!(
        single_expression("i++;"),
        ExpressionType::UpdateExpression { prefix: false, .. }
    ));
    assert!(matches!(
        single_expression("--i;"),
        ExpressionType::UpdateExpression { prefix: true, .. }
    ));
}

#[test]
fn test_object_literal_keys() {
    match single_expression("x = {a: 1, 'b c': 2, 3: 4};") {
        ExpressionType::AssignmentExpression { right, .. } => match *right {
            ExpressionType::ObjectExpression { properties, .. } => {
                let keys: Vec<&str> = properties.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["a", "b c", "3"]);
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_meta_line_and_column() {
    let program = parse_ok("var a = 1;\n  b = 2;");
    let meta = program.body[1].get_meta();
    assert_eq!(meta.line, 2);
    assert_eq!(meta.column, 3);
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_for_in_with_var() {
    let program = parse_ok("for (var k in o) { n++; }");
    match &program.body[0] {
        StatementType::ForInStatement(data) => match &data.left {
            ForInTarget::VariableDeclaration(id) => assert_eq!(id.name, "k"),
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_classic_for_is_not_for_in() {
    let program = parse_ok("for (var i = 0; i < 3; i++) {}");
    assert!(matches!(
        &program.body[0],
        StatementType::ForStatement {
            init: Some(VariableDeclarationOrExpression::VariableDeclaration(_)),
            test: Some(_),
            update: Some(_),
            ..
        }
    ));
}

#[test]
fn test_try_catch_finally() {
    let program = parse_ok("try { f(); } catch (e) { g(e); } finally { h(); }");
    match &program.body[0] {
        StatementType::TryStatement {
            handler: Some(handler),
            finalizer: Some(_),
            ..
        } => assert_eq!(handler.param.name, "e"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_switch_default_clause() {
    let program = parse_ok("switch (x) { case 1: a(); break; default: b(); }");
    match &program.body[0] {
        StatementType::SwitchStatement { cases, .. } => {
            assert_eq!(cases.len(), 2);
            assert!(cases[0].test.is_some());
            assert!(cases[1].test.is_none());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_if_else_chain() {
    let program = parse_ok("if (a) b(); else if (c) d(); else e();");
    match &program.body[0] {
        StatementType::IfStatement {
            alternate: Some(alt),
            ..
        } => assert!(matches!(**alt, StatementType::IfStatement { .. })),
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Early errors
// ============================================================================

#[test]
fn test_syntax_error_reports_position() {
    let err = JsParser::parse_to_ast_from_str("var x = ;").unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.column > 1);
}

#[test]
fn test_invalid_assignment_target() {
    assert!(JsParser::parse_to_ast_from_str("1 = 2;").is_err());
    assert!(JsParser::parse_to_ast_from_str("f() = 2;").is_err());
    assert!(JsParser::parse_to_ast_from_str("3++;").is_err());
}

#[test]
fn test_return_outside_function() {
    let err = JsParser::parse_to_ast_from_str("return 1;").unwrap_err();
    assert!(err.message.contains("return"));
    assert!(JsParser::parse_to_ast_from_str("function f() { return 1; }").is_ok());
}

#[test]
fn test_break_and_continue_placement() {
    assert!(JsParser::parse_to_ast_from_str("break;").is_err());
    assert!(JsParser::parse_to_ast_from_str("switch (a) { case 1: continue; }").is_err());
    assert!(JsParser::parse_to_ast_from_str("switch (a) { case 1: break; }").is_ok());
    assert!(JsParser::parse_to_ast_from_str("while (a) { if (b) continue; break; }").is_ok());
    assert!(JsParser::parse_to_ast_from_str("while (a) { function f() { break; } }").is_err());
}

// ============================================================================
// Hoisting
// ============================================================================

#[test]
fn test_var_names_are_collected_without_entering_functions() {
    let program = parse_ok(
        "var a = 1; if (x) { var b; } for (var i = 0; i < 1; i++) {} \
         for (var k in o) {} function f() { var inner; } var a;",
    );
    assert_eq!(get_var_declared_names(&program.body), vec!["a", "b", "i", "k"]);
}

#[test]
fn test_block_functions_are_hoisted_but_not_nested_ones() {
    let program =
        parse_ok("function a() { function inner() {} } { function b() {} } function c() {}");
    let names: Vec<String> = get_hoisted_functions(&program.body)
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}
