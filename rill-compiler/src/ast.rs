use std::collections::{BTreeSet, HashMap};

use crate::lexer::{Token, TokenKind};
use crate::scope::{ScopeArena, ScopeId};
use crate::types::Type;

/// Top-level node: the ordered list of function declarations plus the
/// imports the parser already knows the emitted program will need. The
/// program owns the scope arena every block's `ScopeId` points into.
#[derive(Debug)]
pub struct Program {
    pub functions: Vec<Function>,
    pub imports: BTreeSet<String>,
    pub scopes: ScopeArena,
}

#[derive(Debug)]
pub struct Function {
    pub name: Token,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    pub return_type: Type,
    pub fallible: bool,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub token: Token,
    pub name: String,
    pub ty: Type,
    pub default: Option<Expression>,
}

/// A braced compound statement owning its lexical scope.
#[derive(Debug, Clone)]
pub struct Block {
    pub token: Token,
    pub statements: Vec<Statement>,
    pub scope: ScopeId,
}

#[derive(Debug, Clone)]
pub enum Statement {
    NoOp,
    Assign(Assign),
    Call(FunctionCall),
    Compound(Block),
    Return(ReturnStatement),
    Fail(FailStatement),
    If(IfStatement),
    Foreach(ForeachStatement),
    Inc(Token),
    Dec(Token),
    Continue(Token),
    Break(Token),
}

#[derive(Debug, Clone)]
pub struct Assign {
    /// LHS variable name token.
    pub target: Token,
    pub value: Expression,
    /// First binding of the name (emits the declaration operator).
    pub declaration: bool,
    /// Assignment-expression form, hoisted into a pre-statement.
    pub expression: bool,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub token: Token,
    pub expr: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct FailStatement {
    pub token: Token,
    pub expr: Expression,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub token: Token,
    pub condition: Expression,
    /// Inferred type of the condition, filled by the type checker.
    pub comp_type: Type,
    pub body: Block,
    pub else_body: ElseBody,
}

#[derive(Debug, Clone)]
pub enum ElseBody {
    None,
    Block(Block),
    If(Box<IfStatement>),
}

#[derive(Debug, Clone)]
pub struct ForeachStatement {
    pub token: Token,
    pub iterator: Expression,
    pub variable: Token,
    pub index: Option<Token>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub token: Token,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub is_builtin: bool,
    /// The first argument was synthesized from `recv.f(...)` chaining.
    pub method_receiver: bool,
    /// Parameter name to bound argument, populated (at most once) by the
    /// type checker.
    pub resolved_args: HashMap<String, Argument>,
    /// Callee return type after generator specialization, filled by the
    /// type checker.
    pub resolved_return_type: Type,
    /// Call carried a bare `?`.
    pub propagates: bool,
    /// Inline `?{ ... }` handler; its scope declares `err : String`.
    pub error_body: Option<Block>,
    pub generator: Option<GeneratorBody>,
}

#[derive(Debug, Clone)]
pub struct GeneratorBody {
    pub variable: Token,
    pub index: Option<Token>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub token: Token,
    pub expr: Expression,
    /// Parameter name for named arguments.
    pub name: Option<String>,
    /// Position among the call's arguments, for positional binding.
    pub order: usize,
    /// Inferred type, filled by the type checker.
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub token: Token,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    NoOp,
    NumLiteral,
    BoolLiteral(bool),
    StringLiteral,
    Var {
        name: String,
    },
    IndexedVar {
        name: String,
        index: Box<Expression>,
    },
    Range {
        from: Box<Expression>,
        to: Box<Expression>,
    },
    SliceLiteral {
        elements: Vec<Expression>,
        /// Strongest element type, filled by the type checker.
        element_type: Type,
    },
    SetLiteral {
        elements: Vec<Expression>,
        element_type: Type,
    },
    Unary {
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Assign(Box<Assign>),
    Call(Box<FunctionCall>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Subtract),
            TokenKind::Star => Some(BinaryOp::Multiply),
            TokenKind::Slash => Some(BinaryOp::Divide),
            TokenKind::DoubleEqual => Some(BinaryOp::Equal),
            TokenKind::BangEqual => Some(BinaryOp::NotEqual),
            TokenKind::Greater => Some(BinaryOp::Greater),
            TokenKind::GreaterEqual => Some(BinaryOp::GreaterEqual),
            TokenKind::Less => Some(BinaryOp::Less),
            TokenKind::LessEqual => Some(BinaryOp::LessEqual),
            TokenKind::AmpersandAmpersand => Some(BinaryOp::And),
            TokenKind::PipePipe => Some(BinaryOp::Or),
            _ => None,
        }
    }

    /// Lowest binds loosest; used both for parsing and for deciding
    /// parenthesization in the emitted program.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::And | BinaryOp::Or => 1,
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual => 2,
            BinaryOp::Add | BinaryOp::Subtract => 3,
            BinaryOp::Multiply | BinaryOp::Divide => 4,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
                | BinaryOp::Less
                | BinaryOp::LessEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl Expression {
    pub fn new(token: Token, kind: ExpressionKind) -> Self {
        Self { token, kind }
    }

    /// Natural type of a numeric literal, from its token kind.
    pub fn literal_num_type(&self) -> Type {
        match self.token.kind {
            TokenKind::IntegerLiteral => Type::Int,
            TokenKind::FloatLiteral => Type::Float,
            _ => unreachable!("literal_num_type on non-numeric token"),
        }
    }
}
