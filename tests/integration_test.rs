// Integration tests for the front-end: preprocessor and parser together

use cfront::config::FrontendConfig;
use cfront::lexer::{RawLexer, Token};
use cfront::parser::ast::{BinOp, NodeKind};
use cfront::parser::{ParseOutcome, Parser};
use cfront::pass::{run_plan, FrontendContext, PassId, PassStatus};
use cfront::preprocess::include::MemorySourceReader;
use cfront::preprocess::provider::{ProviderStack, TokenProvider};
use cfront::preprocess::Preprocessor;
use cfront::source::{FileId, Interner};
use std::path::Path;

fn parse(source: &str) -> ParseOutcome {
    Parser::from_source("main.c", source)
        .expect("Parser creation failed")
        .parse_translation_unit()
}

fn parse_with_files(main: &str, reader: MemorySourceReader) -> ParseOutcome {
    let config = FrontendConfig::default();
    let reader = reader.with_file("main.c", main);
    let mut pp = Preprocessor::new(&config, Box::new(reader));
    pp.push_file(Path::new("main.c")).expect("main.c is readable");
    Parser::new(pp, &config.limits).parse_translation_unit()
}

fn messages(outcome: &ParseOutcome) -> Vec<String> {
    outcome.diagnostics().iter().map(|d| d.to_string()).collect()
}

#[test]
fn test_end_to_end_main() {
    let outcome = parse("int main() { int x = 1 + 2; return x; }");
    assert!(outcome.diagnostics().is_empty(), "{:?}", messages(&outcome));

    let decls = outcome.ast.top_level();
    assert_eq!(decls.len(), 1);
    let NodeKind::Function {
        name,
        params,
        body: Some(body),
        ..
    } = outcome.ast.kind(decls[0])
    else {
        panic!("Expected function definition");
    };
    assert_eq!(outcome.name(*name), "main");
    assert!(params.is_empty());

    let NodeKind::Block { stmts, .. } = outcome.ast.kind(*body) else {
        panic!("Expected block body");
    };
    assert_eq!(stmts.len(), 2);

    let NodeKind::VarDecl {
        name: var,
        init: Some(init),
        ..
    } = outcome.ast.kind(stmts[0])
    else {
        panic!("Expected variable declaration");
    };
    assert_eq!(outcome.name(*var), "x");
    let NodeKind::Binary { op: BinOp::Add, lhs, rhs } = outcome.ast.kind(*init) else {
        panic!("Expected 1 + 2");
    };
    assert!(matches!(outcome.ast.kind(*lhs), NodeKind::IntLiteral { value: 1, .. }));
    assert!(matches!(outcome.ast.kind(*rhs), NodeKind::IntLiteral { value: 2, .. }));

    let NodeKind::Return { value: Some(value) } = outcome.ast.kind(stmts[1]) else {
        panic!("Expected return with value");
    };
    match outcome.ast.kind(*value) {
        NodeKind::Variable { name, decl } => {
            assert_eq!(outcome.name(*name), "x");
            assert_eq!(*decl, Some(stmts[0]));
        }
        other => panic!("Expected variable reference, got {other:?}"),
    }
}

#[test]
fn test_precedence_multiplication_binds_tighter() {
    let outcome = parse("int v = 1 + 2 * 3;");
    let NodeKind::VarDecl { init: Some(init), .. } = outcome.ast.kind(outcome.ast.top_level()[0]) else {
        panic!("Expected initialized declaration");
    };
    let NodeKind::Binary { op: BinOp::Add, lhs, rhs } = outcome.ast.kind(*init) else {
        panic!("Expected addition at the root");
    };
    assert!(matches!(outcome.ast.kind(*lhs), NodeKind::IntLiteral { value: 1, .. }));
    assert!(matches!(outcome.ast.kind(*rhs), NodeKind::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_macros_feed_the_parser() {
    let source = r#"
        #define N 10
        #define SQUARE(x) ((x) * (x))
        #define DEBUG 0
        int table[N];
        int main() {
        #if DEBUG
            this would not parse
        #else
            return SQUARE(N);
        #endif
        }
    "#;
    let outcome = parse(source);
    assert!(outcome.diagnostics().is_empty(), "{:?}", messages(&outcome));

    let decls = outcome.ast.top_level();
    let NodeKind::VarDecl { var_type, .. } = outcome.ast.kind(decls[0]) else {
        panic!("Expected array declaration");
    };
    assert_eq!(var_type.array_dims, vec![Some(10)]);
}

#[test]
fn test_macro_nested_in_its_own_argument_parses() {
    let outcome = parse("#define MAX(a,b) ((a)>(b)?(a):(b))\nint m = MAX(MAX(1,2),3);\n");
    assert!(outcome.diagnostics().is_empty(), "{:?}", messages(&outcome));
    let NodeKind::VarDecl { init: Some(init), .. } = outcome.ast.kind(outcome.ast.top_level()[0]) else {
        panic!("Expected initialized declaration");
    };
    assert!(matches!(outcome.ast.kind(*init), NodeKind::Conditional { .. }));
}

#[test]
fn test_non_utf8_identifiers_are_distinct() {
    let config = FrontendConfig::default();
    let mut pp = Preprocessor::new(&config, Box::new(MemorySourceReader::new()));
    pp.push_source("main.c", b"int \xff; int \xfe; int \xff;\n").expect("source");
    let outcome = Parser::new(pp, &config.limits).parse_translation_unit();

    let msgs = messages(&outcome);
    assert_eq!(msgs.len(), 1, "{msgs:?}");
    assert!(msgs[0].starts_with("main.c:1:19:"), "{msgs:?}");
    assert!(msgs[0].contains("redeclaration"));
    assert_eq!(outcome.ast.top_level().len(), 3);
}

#[test]
fn test_prototypes_from_included_header() {
    let reader = MemorySourceReader::new()
        .with_file("math.h", "#pragma once\nint add(int a, int b);\n")
        .with_file("include/config.h", "#define LIMIT 3\n");
    let mut config = FrontendConfig::default();
    config.include.user_dirs.push("include".into());

    let main = "#include \"math.h\"\n#include \"math.h\"\n#include <config.h>\nint main() { return add(1, LIMIT); }\n";
    let reader = reader.with_file("main.c", main);
    let mut pp = Preprocessor::new(&config, Box::new(reader));
    pp.push_file(Path::new("main.c")).expect("main.c is readable");
    let outcome = Parser::new(pp, &config.limits).parse_translation_unit();

    assert!(outcome.diagnostics().is_empty(), "{:?}", messages(&outcome));
    // prototype once, then main
    assert_eq!(outcome.ast.top_level().len(), 2);
}

#[test]
fn test_diagnostics_carry_file_and_line() {
    let outcome = parse_with_files(
        "#include \"bad.h\"\nint ok;\n",
        MemorySourceReader::new().with_file("bad.h", "int a\n"),
    );
    let msgs = messages(&outcome);
    assert_eq!(msgs.len(), 1, "{msgs:?}");
    assert!(msgs[0].starts_with("main.c:2:"), "{msgs:?}");
    assert!(msgs[0].contains("expected ';' after declaration"));
}

#[test]
fn test_errors_do_not_stop_the_parse() {
    let source = r#"
        int first() { return 1 }
        int second() { int y = ; return 2; }
        int third() { return undefined_call(); }
        int fourth() { return 4; }
    "#;
    let outcome = parse(source);
    assert_eq!(outcome.diagnostics().error_count(), 3, "{:?}", messages(&outcome));
    assert_eq!(outcome.ast.top_level().len(), 4);
}

#[test]
fn test_empty_stream_over_raw_yields_raw_tokens() {
    let mut interner = Interner::new();
    let lexer = RawLexer::new("t.c", FileId(0), b"a b c").expect("lexer");

    let mut stack = ProviderStack::new();
    stack.push(TokenProvider::raw(lexer, None, 0));
    stack.push(TokenProvider::stream(Vec::<Token>::new()));

    let mut spelled = Vec::new();
    loop {
        let token = stack.pull(&mut interner);
        if token.is_eof() {
            break;
        }
        spelled.push(interner.resolve(token.text).to_string());
    }
    assert_eq!(spelled, vec!["a", "b", "c"]);
    assert!(stack.pull(&mut interner).is_eof());
}

#[test]
fn test_pass_plan_from_config() {
    let mut ctx = FrontendContext::for_source(
        "main.c",
        "int f(int n) { return n > 1 ? n * f(n - 1) : 1; }",
        Box::new(MemorySourceReader::new()),
    );
    let status = run_plan(&mut ctx, &FrontendConfig::default()).expect("plan runs");
    assert_eq!(status, PassStatus::Ok);
    assert!(ctx.completed().contains(PassId::Preprocess));
    assert!(ctx.completed().contains(PassId::Parse));
    assert!(ctx.ast.is_some());
}
