//! End-to-end compilation from source text

use pretty_assertions::assert_eq;
use shade_compiler::frontend::parser::parse;
use shade_compiler::frontend::sema::{DiagnosticSink, SemanticError};
use shade_compiler::ir::{self, Inst, Terminator, Value};
use shade_compiler::{check, emit, emit_program, CompileError, Session, SessionConfig};

fn compile(source: &str) -> shade_compiler::Compilation {
    Session::default().compile(source).unwrap()
}

#[test]
fn test_module_text() {
    let compilation = compile("void main() { int x; x = 2 + 3; }");
    let expected = "\
; module shader

define void @main() {
entry:
  %t0 = alloca i32 ; x
  %t1 = add i32 2, 3
  store %t1, %t0
  ret void
}
";
    assert_eq!(compilation.module.to_string(), expected);
}

#[test]
fn test_container_holds_module_text() {
    let compilation = compile("float k = 0.5; float scale(float v) { return v * k; }");
    let payload = ir::verify_container(&compilation.bytes).unwrap();
    assert_eq!(payload, compilation.module.to_string());
    assert_eq!(&compilation.bytes[..4], &ir::CONTAINER_MAGIC);
}

#[test]
fn test_corrupted_container_rejected() {
    let mut bytes = compile("void main() { }").bytes;
    let last = bytes.len() - 3;
    bytes[last] ^= 0x40;
    assert!(matches!(
        ir::verify_container(&bytes),
        Err(CompileError::Container { .. })
    ));
}

#[test]
fn test_repeated_compilations_identical() {
    let source = "
        int counter;
        void tick() {
            for (int i = 0; i < 4; i++) {
                if (i == 2) continue;
                counter += i;
            }
        }
    ";
    let first = compile(source);
    let second = compile(source);
    assert_eq!(first.module, second.module);
    assert_eq!(first.bytes, second.bytes);
}

#[test]
fn test_invalid_program_reports_every_diagnostic() {
    let source = "
        int f(int a) { return a; }
        void main() {
            vec2 v;
            v.xyz = vec3(1.0);
            f(1, 2);
            missing = 3;
        }
    ";
    let program = parse(source).unwrap();
    let mut sink = DiagnosticSink::new();
    assert!(check(&program, &mut sink).is_none());
    let errors: Vec<&SemanticError> = sink.diagnostics().iter().map(|d| &d.error).collect();
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], SemanticError::SwizzleOutOfBound { .. }));
    assert!(matches!(errors[1], SemanticError::ExtraFormals { .. }));
    assert!(matches!(errors[2], SemanticError::IdentifierNotDeclared { .. }));
}

#[test]
fn test_unchecked_program_never_lowered() {
    let program = parse("void main() { bool b = 1 + true; }").unwrap();
    match emit_program(&program) {
        Err(CompileError::UncheckedProgram { diagnostics }) => assert!(!diagnostics.is_empty()),
        other => panic!("expected refusal, got {:?}", other),
    }
    assert!(matches!(
        Session::default().compile("void main() { bool b = 1 + true; }"),
        Err(CompileError::UncheckedProgram { .. })
    ));
}

#[test]
fn test_check_then_emit() {
    let program = parse("vec4 tint(vec4 c) { return c * 0.5; }").unwrap();
    let mut sink = DiagnosticSink::new();
    let checked = check(&program, &mut sink).unwrap();
    let module = emit(&checked).unwrap();
    let tint = module.function("tint").unwrap();
    assert!(tint.insts().any(|i| matches!(i, Inst::Binary { .. })));
}

#[test]
fn test_clean_programs_always_emit() {
    let sources = [
        "void main() { int i; float f; f = (i < 2.0); }",
        "void main() { int i; int k; float f; k = (f = i); }",
        "void main() { vec2 a; vec2 b; bool c; c = a < b; c = a >= b; }",
        "void main() { bool p; bool q; bool c; c = p < q; c = p == q; }",
        "void main() { int i; float f; vec3 v; v = vec3(f = i); switch (f = i) { default: break; } while (i < 2.0) { i++; } }",
        "float g; void main() { int i; vec4 w; w = w + (i < 2.0); g = -(g = i); }",
        "void v() { } void main() { bool b; b ? v() : v(); }",
    ];
    for source in sources {
        let diagnostics = Session::default().check(source).unwrap();
        assert!(diagnostics.is_empty(), "{}: {:?}", source, diagnostics);
        let compilation = Session::default()
            .compile(source)
            .unwrap_or_else(|e| panic!("{}: {}", source, e));
        assert!(ir::verify_container(&compilation.bytes).is_ok());
    }
}

#[test]
fn test_equality_converts_left_operand_only() {
    let session = Session::default();
    assert!(session
        .check("void main() { float f; int i; bool b; b = i == f; }")
        .unwrap()
        .is_empty());
    assert_eq!(
        session
            .check("void main() { float f; int i; bool b; b = f == i; }")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_every_block_terminated() {
    let source = "
        int classify(int n) {
            int result = 0;
            switch (n) {
                case 0: result = 10;
                case 1: result += 1; break;
                default: result = -1;
            }
            while (result > 100) {
                result -= 1;
                if (result == 50) break;
            }
            return result > 0 ? result : 0;
        }
    ";
    let compilation = compile(source);
    let func = compilation.module.function("classify").unwrap();
    for block in &func.blocks {
        assert!(block.is_terminated(), "block {} is open", block.name);
    }
    assert!(func.blocks.iter().any(|b| matches!(b.terminator, Some(Terminator::Switch { .. }))));
}

#[test]
fn test_compound_assign_broadcast() {
    let compilation = compile("void main() { float f; vec3 v; v += f; }");
    let main = compilation.module.function("main").unwrap();
    let inserts = main
        .insts()
        .filter(|i| matches!(i, Inst::InsertLane { .. }))
        .count();
    let adds = main
        .insts()
        .filter(|i| matches!(i, Inst::Binary { .. }))
        .count();
    assert_eq!(inserts, 3);
    assert_eq!(adds, 1);
}

#[test]
fn test_module_named_after_session() {
    let session = Session::new(SessionConfig {
        module_name: "water".into(),
        ..SessionConfig::default()
    });
    let compilation = session.compile("int g = 4;").unwrap();
    assert_eq!(compilation.module.name, "water");
    assert_eq!(compilation.module.global("g").unwrap().init, Some(Value::IntConst(4)));
}
