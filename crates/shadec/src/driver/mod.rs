//! Compilation driver and pipeline orchestration
//!
//! A [`Session`] runs lexer, parser, checker, code generator and serializer
//! in order. Every call starts from fresh symbol tables and a fresh builder,
//! so consecutive compilations never see each other's state.

use tracing::{debug, info, instrument};

use crate::codegen::{CodeGen, DEFAULT_MODULE_NAME};
use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::Program;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::parse;
use crate::frontend::sema::{check, Diagnostic, DiagnosticSink};
use crate::ir::{self, IrModule};

/// Options for a compilation session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name recorded in the emitted module
    pub module_name: String,
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_ir: bool,
    /// Stop after checking; no module is emitted
    pub check_only: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.to_string(),
            dump_tokens: false,
            dump_ast: false,
            dump_ir: false,
            check_only: false,
        }
    }
}

/// Result of a successful compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    pub module: IrModule,
    /// The module serialized into its binary container
    pub bytes: Vec<u8>,
}

pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline as configured
    ///
    /// Returns `None` in check-only mode once the program checked clean.
    pub fn run(&self, source: &str) -> CompileResult<Option<Compilation>> {
        if self.config.check_only {
            let diagnostics = self.check(source)?;
            if diagnostics.is_empty() {
                return Ok(None);
            }
            return Err(CompileError::UncheckedProgram { diagnostics });
        }
        self.compile(source).map(Some)
    }

    /// Parse and check `source`, returning every diagnostic found
    #[instrument(skip_all)]
    pub fn check(&self, source: &str) -> CompileResult<Vec<Diagnostic>> {
        let program = self.parse(source)?;
        let mut sink = DiagnosticSink::new();
        check(&program, &mut sink);
        info!(diagnostics = sink.len(), "checked");
        Ok(sink.into_diagnostics())
    }

    /// Compile `source` down to a serialized module
    ///
    /// Fails with [`CompileError::UncheckedProgram`] when the checker reports
    /// anything.
    #[instrument(skip_all, fields(module = %self.config.module_name))]
    pub fn compile(&self, source: &str) -> CompileResult<Compilation> {
        let program = self.parse(source)?;

        let mut sink = DiagnosticSink::new();
        let Some(checked) = check(&program, &mut sink) else {
            info!(diagnostics = sink.len(), "check failed");
            return Err(CompileError::UncheckedProgram {
                diagnostics: sink.into_diagnostics(),
            });
        };

        let mut codegen = CodeGen::new(&self.config.module_name);
        codegen.emit_program(checked.program())?;
        let module = codegen.finish();
        info!(
            functions = module.functions.len(),
            globals = module.globals.len(),
            "emitted module"
        );

        if self.config.dump_ir {
            eprintln!("=== IR ===");
            eprintln!("{}", module);
            eprintln!("=== End IR ===\n");
        }

        let bytes = ir::serialize(&module);
        debug!(bytes = bytes.len(), "serialized");
        Ok(Compilation { module, bytes })
    }

    fn parse(&self, source: &str) -> CompileResult<Program> {
        debug!(bytes = source.len(), "parsing");
        if self.config.dump_tokens {
            let tokens = Lexer::new(source).tokenize_all()?;
            eprintln!("=== Tokens ===");
            for token in &tokens {
                eprintln!("{:?}", token);
            }
            eprintln!("=== End Tokens ===\n");
        }

        let program = parse(source)?;
        debug!(decls = program.decls.len(), "parsed");

        if self.config.dump_ast {
            eprintln!("=== AST ===");
            eprintln!("{:#?}", program);
            eprintln!("=== End AST ===\n");
        }
        Ok(program)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_produces_verified_container() {
        let compilation = Session::default()
            .compile("int x; void main() { x = 2 + 3; }")
            .unwrap();
        let payload = ir::verify_container(&compilation.bytes).unwrap();
        assert_eq!(payload, compilation.module.to_string());
    }

    #[test]
    fn test_module_name_from_config() {
        let session = Session::new(SessionConfig {
            module_name: "blur".into(),
            ..SessionConfig::default()
        });
        let compilation = session.compile("void main() { }").unwrap();
        assert_eq!(compilation.module.name, "blur");
    }

    #[test]
    fn test_check_collects_every_diagnostic() {
        let diagnostics = Session::default()
            .check("void main() { a = 1; b = 2; }")
            .unwrap();
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_check_only_run() {
        let session = Session::new(SessionConfig {
            check_only: true,
            ..SessionConfig::default()
        });
        assert!(session.run("void main() { }").unwrap().is_none());
        assert!(matches!(
            session.run("void main() { y = 1; }"),
            Err(CompileError::UncheckedProgram { .. })
        ));
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        assert!(matches!(
            Session::default().compile("void main( {"),
            Err(CompileError::Parser { .. })
        ));
    }
}
