//! Language and standard library tests, run through a context.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use voxscript::{Context, ContextConfig, Runtime, RuntimeConfig, ScriptError, Value};

fn context_with(config: ContextConfig) -> (Arc<Runtime>, Context) {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let ctx = Context::new(&runtime, config).unwrap();
    (runtime, ctx)
}

/// Evaluates `code` in a fresh context and returns its result.
fn run(code: &str) -> Value {
    let (_runtime, mut ctx) = context_with(ContextConfig::new());
    match ctx.eval(code) {
        Ok(Some(v)) => v,
        other => panic!("{:?} returned {:?}", code, other),
    }
}

/// Evaluates `code`, expecting an uncaught exception, and returns the exception's name.
fn run_err(code: &str) -> String {
    let (_runtime, mut ctx) = context_with(ContextConfig::new());
    match ctx.eval(code) {
        Err(ScriptError::Exception { .. }) => {}
        other => panic!("{:?} returned {:?}", code, other),
    }
    let exception = ctx.last_exception().unwrap().as_map().unwrap();
    match exception.get("name") {
        Some(Value::String(name)) => name.clone(),
        other => panic!("exception without a name: {:?}", other),
    }
}

fn s(text: &str) -> Value {
    Value::from(text)
}

// ============================================================================
// Operators
// ============================================================================

mod operator_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("2 + 3 * 4"), Value::Integer(14));
        assert_eq!(run("(2 + 3) * 4"), Value::Integer(20));
        assert_eq!(run("10 % 3"), Value::Integer(1));
        assert_eq!(run("0.5 + 0.25"), Value::Double(0.75));
        assert_eq!(run("1 / 0 === Infinity"), Value::Boolean(true));
        assert_eq!(run("isNaN(0 / 0)"), Value::Boolean(true));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run("'a' + 'b'"), s("ab"));
        assert_eq!(run("1 + 2 + '3'"), s("33"));
        assert_eq!(run("'3' + 1 + 2"), s("312"));
        assert_eq!(run("'6' * '7'"), Value::Integer(42));
    }

    #[test]
    fn test_equality() {
        assert_eq!(run("null == undefined"), Value::Boolean(true));
        assert_eq!(run("null === undefined"), Value::Boolean(false));
        assert_eq!(run("'1' == 1"), Value::Boolean(true));
        assert_eq!(run("'1' === 1"), Value::Boolean(false));
        assert_eq!(run("NaN === NaN"), Value::Boolean(false));
        assert_eq!(run("var o = {}; o === o"), Value::Boolean(true));
    }

    #[test]
    fn test_typeof() {
        assert_eq!(run("typeof 1"), s("number"));
        assert_eq!(run("typeof 'x'"), s("string"));
        assert_eq!(run("typeof true"), s("boolean"));
        assert_eq!(run("typeof undefined"), s("undefined"));
        assert_eq!(run("typeof null"), s("object"));
        assert_eq!(run("typeof {}"), s("object"));
        assert_eq!(run("typeof function () {}"), s("function"));
        assert_eq!(run("typeof notDeclaredAnywhere"), s("undefined"));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(run("0 || 'fallback'"), s("fallback"));
        assert_eq!(run("'first' && 'second'"), s("second"));
        assert_eq!(run("var hit = false; false && (hit = true); hit"), Value::Boolean(false));
        assert_eq!(run("true ? 'yes' : 'no'"), s("yes"));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(run("5 & 3"), Value::Integer(1));
        assert_eq!(run("5 | 3"), Value::Integer(7));
        assert_eq!(run("5 ^ 3"), Value::Integer(6));
        assert_eq!(run("1 << 4"), Value::Integer(16));
        assert_eq!(run("-16 >> 2"), Value::Integer(-4));
        assert_eq!(run("~5"), Value::Integer(-6));
    }

    #[test]
    fn test_update_and_compound_assignment() {
        assert_eq!(run("var i = 1; var j = i++; i * 10 + j"), Value::Integer(21));
        assert_eq!(run("var i = 1; var j = ++i; i * 10 + j"), Value::Integer(22));
        assert_eq!(run("var t = 10; t -= 3; t *= 2; t"), Value::Integer(14));
    }

    #[test]
    fn test_in_and_delete() {
        assert_eq!(run("var o = { a: 1 }; 'a' in o"), Value::Boolean(true));
        assert_eq!(run("var o = { a: 1 }; delete o.a; 'a' in o"), Value::Boolean(false));
        assert_eq!(run("'toString' in {}"), Value::Boolean(true));
    }
}

// ============================================================================
// Statements
// ============================================================================

mod statement_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_if_else() {
        assert_eq!(
            run("var x = 5; var r; if (x > 3) { r = 'big'; } else { r = 'small'; } r"),
            s("big")
        );
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            run("var t = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; t += i; } t"),
            Value::Integer(20)
        );
        assert_eq!(run("var i = 0; do { i++; } while (i < 5); i"), Value::Integer(5));
        assert_eq!(
            run("var i = 0; while (true) { if (++i == 7) break; } i"),
            Value::Integer(7)
        );
    }

    #[test]
    fn test_for_in_enumerates_own_and_inherited() {
        assert_eq!(
            run("var o = { b: 2, a: 1 }; var ks = []; for (var k in o) ks.push(k); ks.sort().join()"),
            s("a,b")
        );
        assert_eq!(
            run("function P() { this.own = 1; } P.prototype.shared = 2;\n\
                 var ks = []; for (var k in new P()) ks.push(k); ks.sort().join()"),
            s("own,shared")
        );
    }

    #[test]
    fn test_switch_falls_through() {
        let code = "function pick(n) {\n\
                      var out = '';\n\
                      switch (n) {\n\
                        case 1: out += 'a';\n\
                        case 2: out += 'b';\n\
                        case 3: out += 'c'; break;\n\
                        default: out += 'd';\n\
                      }\n\
                      return out;\n\
                    }\n\
                    [pick(1), pick(2), pick(3), pick(9)].join('|')";
        assert_eq!(run(code), s("abc|bc|c|d"));
    }

    #[test]
    fn test_hoisting() {
        assert_eq!(run("var r = f(); function f() { return 7; } r"), Value::Integer(7));
        assert_eq!(run("var t = typeof later; var later = 1; t"), s("undefined"));
        assert_eq!(
            run("var r = inner(); if (true) { function inner() { return 'block'; } } r"),
            s("block")
        );
    }

    #[test]
    fn test_assignment_to_undeclared_creates_global() {
        assert_eq!(run("function set() { leaked = 3; } set(); leaked"), Value::Integer(3));
    }

    #[test]
    fn test_finally_runs_after_return() {
        let code = "var log = [];\n\
                    function f() { try { return 'try'; } finally { log.push('finally'); } }\n\
                    var r = f(); r + ':' + log.join()";
        assert_eq!(run(code), s("try:finally"));
    }

    #[test]
    fn test_rethrow_from_catch() {
        let code = "try {\n\
                      try { throw new Error('inner'); }\n\
                      catch (e) { throw new TypeError(e.message + '!'); }\n\
                    } catch (e2) { e2.name + ':' + e2.message }";
        assert_eq!(run(code), s("TypeError:inner!"));
    }

    #[test]
    fn test_catch_binding_is_scoped() {
        assert_eq!(
            run("var e = 'outer'; try { throw 'inner'; } catch (e) {} e"),
            s("outer")
        );
    }
}

// ============================================================================
// Functions and objects
// ============================================================================

mod function_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_closures_keep_state() {
        let code = "function counter() { var n = 0; return function () { return ++n; }; }\n\
                    var a = counter(); var b = counter();\n\
                    a(); a(); b();\n\
                    a() * 10 + b()";
        assert_eq!(run(code), Value::Integer(32));
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            run("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); } fact(10)"),
            Value::Integer(3_628_800)
        );
    }

    #[test]
    fn test_arguments_object() {
        let code = "function sum() { var t = 0; for (var i = 0; i < arguments.length; i++) t += arguments[i]; return t; }\n\
                    sum(1, 2, 3, 4)";
        assert_eq!(run(code), Value::Integer(10));
    }

    #[test]
    fn test_constructors_and_prototypes() {
        let code = "function Prompt(text) { this.text = text; }\n\
                    Prompt.prototype.say = function () { return 'say ' + this.text; };\n\
                    var p = new Prompt('hi');\n\
                    [p.say(), p instanceof Prompt, p.hasOwnProperty('say'), Object.getPrototypeOf(p) === Prompt.prototype].join()";
        assert_eq!(run(code), s("say hi,true,false,true"));
    }

    #[test]
    fn test_call_and_apply() {
        let code = "function f(a, b) { return this.x + a + b; }\n\
                    f.call({ x: 1 }, 2, 3) * 100 + f.apply({ x: 10 }, [20, 30])";
        assert_eq!(run(code), Value::Integer(660));
    }

    #[test]
    fn test_object_create_and_keys() {
        assert_eq!(
            run("var base = { greet: 'hi' }; var o = Object.create(base); o.own = 1; Object.keys(o).join() + '/' + o.greet"),
            s("own/hi")
        );
    }

    #[test]
    fn test_too_much_recursion() {
        let (_runtime, mut ctx) = context_with(ContextConfig::new().max_call_depth(64));
        assert!(matches!(
            ctx.eval("function r() { return r(); } r()"),
            Err(ScriptError::Exception { .. })
        ));
        let exception = ctx.last_exception().unwrap().as_map().unwrap();
        assert_eq!(exception.get("name"), Some(&s("RangeError")));
    }
}

// ============================================================================
// Standard library
// ============================================================================

mod std_lib_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_methods() {
        assert_eq!(run("'hello'.charAt(1)"), s("e"));
        assert_eq!(run("'hello'.indexOf('l')"), Value::Integer(2));
        assert_eq!(run("'hello'.lastIndexOf('l')"), Value::Integer(3));
        assert_eq!(run("'hello'.substring(1, 3)"), s("el"));
        assert_eq!(run("'hello'.slice(-3)"), s("llo"));
        assert_eq!(run("'hello'.replace('l', 'L')"), s("heLlo"));
        assert_eq!(run("'  pad  '.trim()"), s("pad"));
        assert_eq!(run("'Mixed'.toUpperCase() + 'Mixed'.toLowerCase()"), s("MIXEDmixed"));
        assert_eq!(run("'a,b,,c'.split(',').length"), Value::Integer(4));
        assert_eq!(run("String.fromCharCode(72, 105)"), s("Hi"));
    }

    #[test]
    fn test_strings_are_utf16() {
        assert_eq!(run("'😀'.length"), Value::Integer(2));
        assert_eq!(run("'😀'.charCodeAt(0)"), Value::Integer(0xD83D));
        assert_eq!(run("'a😀b'.indexOf('b')"), Value::Integer(3));
    }

    #[test]
    fn test_array_methods() {
        assert_eq!(run("[3, 1, 2].sort().join('-')"), s("1-2-3"));
        assert_eq!(run("[10, 9, 1].sort().join()"), s("1,10,9"));
        assert_eq!(run("[10, 9, 1].sort(function (a, b) { return a - b; }).join()"), s("1,9,10"));
        assert_eq!(
            run("[1, 2, 3, 4].filter(function (x) { return x % 2 == 0; }).length"),
            Value::Integer(2)
        );
        assert_eq!(
            run("[1, 2, 3, 4].reduce(function (a, b) { return a + b; }, 0)"),
            Value::Integer(10)
        );
        assert_eq!(run("var a = [1, 2, 3, 4]; a.splice(1, 2); a.join()"), s("1,4"));
        assert_eq!(run("[1, 2].concat([3], 4).join()"), s("1,2,3,4"));
        assert_eq!(run("var a = [1, 2]; a.push(3); a.reverse().join()"), s("3,2,1"));
        assert_eq!(run("Array.isArray([]) && !Array.isArray({})"), Value::Boolean(true));
    }

    #[test]
    fn test_array_length_tracks_indices() {
        assert_eq!(run("var a = []; a[4] = 'x'; a.length"), Value::Integer(5));
    }

    #[test]
    fn test_math() {
        assert_eq!(run("Math.max(1, 5, 3)"), Value::Integer(5));
        assert_eq!(run("Math.min()"), run("Infinity"));
        assert_eq!(run("Math.round(2.5)"), Value::Integer(3));
        assert_eq!(run("Math.round(-2.5)"), Value::Integer(-2));
        assert_eq!(run("Math.floor(-1.5)"), Value::Integer(-2));
        assert_eq!(run("Math.abs(-3)"), Value::Integer(3));
        assert_eq!(run("Math.sqrt(16)"), Value::Integer(4));
        assert_eq!(run("var r = Math.random(); r >= 0 && r < 1"), Value::Boolean(true));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(run("(3.14159).toFixed(2)"), s("3.14"));
        assert_eq!(run("(255).toString(16)"), s("ff"));
        assert_eq!(run("(10).toString()"), s("10"));
        assert_eq!(run("parseInt('42px')"), Value::Integer(42));
        assert_eq!(run("parseInt('0x1f')"), Value::Integer(31));
        assert_eq!(run("parseFloat('2.5kg')"), Value::Double(2.5));
        assert_eq!(run("isNaN('abc')"), Value::Boolean(true));
        assert_eq!(run("isFinite('12')"), Value::Boolean(true));
    }

    #[test]
    fn test_errors() {
        assert_eq!(run("new RangeError('x').toString()"), s("RangeError: x"));
        assert_eq!(run("new Error().toString()"), s("Error"));
        assert_eq!(run("new TypeError('a') instanceof Error"), Value::Boolean(true));
        assert_eq!(run("try { null.x; } catch (e) { e instanceof TypeError }"), Value::Boolean(true));
    }

    #[test]
    fn test_console_returns_undefined() {
        let (_runtime, mut ctx) = context_with(ContextConfig::new());
        assert_eq!(ctx.eval("console.log('prompt', 1, true)").unwrap(), None);
    }

    #[test]
    fn test_engine_error_names() {
        assert_eq!(run_err("undefinedFunction()"), "ReferenceError");
        assert_eq!(run_err("var n = 1; n()"), "TypeError");
        assert_eq!(run_err("null.x"), "TypeError");
        assert_eq!(run_err("(1).toFixed(100)"), "RangeError");
    }
}
