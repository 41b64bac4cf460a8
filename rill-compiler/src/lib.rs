mod ast;
pub mod builtins;
mod codegen;
mod compiler;
mod diagnostics;
mod dump;
mod lexer;
mod parser;
pub mod preludes;
mod scope;
mod source;
mod typechecker;
mod types;

pub use crate::ast::{
    Argument, Assign, BinaryOp, Block, ElseBody, Expression, ExpressionKind, FailStatement,
    ForeachStatement, Function, FunctionCall, GeneratorBody, IfStatement, Parameter, Program,
    ReturnStatement, Statement,
};
pub use crate::codegen::CodeGenerator;
pub use crate::compiler::{Compilation, CompileOptions, Compiler};
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics, Stage};
pub use crate::dump::{dump_program, dump_tokens, format_expression, reconstruct_source};
pub use crate::lexer::{Keyword, Lexer, LexerError, Token, TokenKind};
pub use crate::parser::Parser;
pub use crate::scope::{Scope, ScopeArena, ScopeId, Symbol, SymbolKind};
pub use crate::source::{SourceFile, SourceId};
pub use crate::typechecker::TypeChecker;
pub use crate::types::{common_type, Type};
