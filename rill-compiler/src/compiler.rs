use anyhow::{bail, Result};

use crate::ast::Program;
use crate::codegen::CodeGenerator;
use crate::diagnostics::{Diagnostics, Stage};
use crate::dump;
use crate::lexer::{Lexer, Token};
use crate::parser::Parser;
use crate::source::SourceFile;
use crate::typechecker::TypeChecker;

#[derive(Debug, Default)]
pub struct CompileOptions {
    /// Print the token stream to stderr before parsing.
    pub dump_tokens: bool,
}

/// Everything a successful pipeline run produced: the token stream, the
/// typed AST (with its scope arena) and the generated Go source.
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub program: Program,
    pub go_source: String,
}

/// Drives the pipeline: lex, parse, type check, emit. Each stage's
/// diagnostics are folded into one collection and the pipeline aborts
/// before the next stage on error.
pub struct Compiler {
    diagnostics: Diagnostics,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn compile(&mut self, source: &SourceFile) -> Result<Compilation> {
        let mut lexer = Lexer::new(source);
        let tokens = match lexer.tokenize() {
            Ok(tokens) => tokens,
            Err(err) => {
                self.diagnostics
                    .push(Stage::Lex, err.to_string(), err.line(), err.column());
                bail!("lexing failed");
            }
        };

        if self.options.dump_tokens {
            eprint!("{}", dump::dump_tokens(&tokens));
        }

        let mut parser = Parser::new(source, tokens.clone());
        let parsed = parser.parse();
        let parse_diagnostics = parser.into_diagnostics();
        self.diagnostics.extend(parse_diagnostics);
        let mut program = match parsed {
            Ok(program) => program,
            Err(_) => bail!("parsing failed"),
        };

        let mut checker = TypeChecker::new();
        checker.check_program(&mut program);
        let type_diagnostics = checker.into_diagnostics();
        let type_errors = type_diagnostics.has_errors();
        self.diagnostics.extend(type_diagnostics);
        if type_errors {
            bail!("type checking failed");
        }

        let mut generator = CodeGenerator::new(&program);
        let go_source = generator.generate();
        let emit_diagnostics = generator.into_diagnostics();
        let emit_errors = emit_diagnostics.has_errors();
        self.diagnostics.extend(emit_diagnostics);
        if emit_errors {
            bail!("code generation failed");
        }

        Ok(Compilation {
            tokens,
            program,
            go_source,
        })
    }
}
