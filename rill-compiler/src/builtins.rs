use crate::ast::{Expression, ExpressionKind, Parameter};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::source::SourceId;
use crate::types::Type;

/// Signature of a builtin function: return type, parameter list with
/// optional default lexemes, and whether the call takes a trailing
/// generator body or returns through the error channel.
#[derive(Debug, Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub return_type: Type,
    pub parameters: Vec<BuiltinParam>,
    pub generator: bool,
    pub fallible: bool,
}

#[derive(Debug, Clone)]
pub struct BuiltinParam {
    pub name: &'static str,
    pub ty: Type,
    /// Literal lexeme substituted when the argument is omitted.
    pub default: Option<&'static str>,
}

impl Builtin {
    /// The signature as an AST parameter list, with defaults synthesized
    /// into literal expressions, so argument resolution treats builtins
    /// and user functions uniformly.
    pub fn parameter_list(&self) -> Vec<Parameter> {
        self.parameters
            .iter()
            .map(|parameter| {
                let token = synthetic_token(parameter);
                let default = parameter.default.map(|lexeme| {
                    let literal_token = synthetic_literal_token(&parameter.ty, lexeme);
                    let kind = match parameter.ty {
                        Type::Bool => ExpressionKind::BoolLiteral(lexeme == "true"),
                        Type::String => ExpressionKind::StringLiteral,
                        _ => ExpressionKind::NumLiteral,
                    };
                    Expression::new(literal_token, kind)
                });
                Parameter {
                    token,
                    name: parameter.name.to_string(),
                    ty: parameter.ty.clone(),
                    default,
                }
            })
            .collect()
    }
}

fn synthetic_token(parameter: &BuiltinParam) -> Token {
    Token {
        kind: TokenKind::Identifier,
        lexeme: parameter.name.to_string(),
        line: 0,
        column: 0,
        file_id: SourceId(0),
    }
}

fn synthetic_literal_token(ty: &Type, lexeme: &str) -> Token {
    let kind = match ty {
        Type::Int => TokenKind::IntegerLiteral,
        Type::Float => TokenKind::FloatLiteral,
        Type::String => TokenKind::StringLiteral,
        Type::Bool => {
            if lexeme == "true" {
                TokenKind::Keyword(Keyword::True)
            } else {
                TokenKind::Keyword(Keyword::False)
            }
        }
        _ => TokenKind::Identifier,
    };
    Token {
        kind,
        lexeme: lexeme.to_string(),
        line: 0,
        column: 0,
        file_id: SourceId(0),
    }
}

fn param(name: &'static str, ty: Type) -> BuiltinParam {
    BuiltinParam {
        name,
        ty,
        default: None,
    }
}

fn param_with_default(name: &'static str, ty: Type, default: &'static str) -> BuiltinParam {
    BuiltinParam {
        name,
        ty,
        default: Some(default),
    }
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

pub fn lookup(name: &str) -> Option<Builtin> {
    let builtin = match name {
        "len" => Builtin {
            name: "len",
            return_type: Type::Int,
            parameters: vec![param("var", Type::Appendable)],
            generator: false,
            fallible: false,
        },
        "append" => Builtin {
            name: "append",
            return_type: Type::Void,
            parameters: vec![param("dest", Type::Appendable), param("var", Type::Any)],
            generator: false,
            fallible: false,
        },
        "add" => Builtin {
            name: "add",
            return_type: Type::Void,
            parameters: vec![
                param("dest", Type::Set(Box::new(Type::Any))),
                param("var", Type::Any),
            ],
            generator: false,
            fallible: false,
        },
        "has" => Builtin {
            name: "has",
            return_type: Type::Bool,
            parameters: vec![
                param("haystack", Type::Set(Box::new(Type::Any))),
                param("needle", Type::Any),
            ],
            generator: false,
            fallible: false,
        },
        "del" => Builtin {
            name: "del",
            return_type: Type::Bool,
            parameters: vec![
                param("set", Type::Set(Box::new(Type::Any))),
                param("value", Type::Any),
            ],
            generator: false,
            fallible: false,
        },
        "join" => Builtin {
            name: "join",
            return_type: Type::String,
            parameters: vec![
                param("list", Type::Slice(Box::new(Type::Any))),
                param("sep", Type::String),
            ],
            generator: false,
            fallible: false,
        },
        "split" => Builtin {
            name: "split",
            return_type: Type::Slice(Box::new(Type::String)),
            parameters: vec![param("string", Type::String), param("sep", Type::String)],
            generator: false,
            fallible: false,
        },
        "match" => Builtin {
            name: "match",
            return_type: Type::Bool,
            parameters: vec![param("haystack", Type::String), param("regex", Type::String)],
            generator: false,
            fallible: false,
        },
        "capture" => Builtin {
            name: "capture",
            return_type: Type::Slice(Box::new(Type::String)),
            parameters: vec![param("haystack", Type::String), param("regex", Type::String)],
            generator: false,
            fallible: false,
        },
        "find" => Builtin {
            name: "find",
            return_type: Type::Slice(Box::new(Type::String)),
            parameters: vec![param("haystack", Type::String), param("regex", Type::String)],
            generator: false,
            fallible: false,
        },
        "slurp" => Builtin {
            name: "slurp",
            return_type: Type::String,
            parameters: vec![param("path", Type::String)],
            generator: false,
            fallible: false,
        },
        "read" => Builtin {
            name: "read",
            return_type: Type::Generator(Box::new(Type::Undetermined)),
            parameters: vec![
                param("path", Type::String),
                param_with_default("chomp", Type::Bool, "true"),
                param_with_default("sep", Type::String, ""),
            ],
            generator: true,
            fallible: false,
        },
        "stringToInt" => Builtin {
            name: "stringToInt",
            return_type: Type::Int,
            parameters: vec![param("var", Type::String)],
            generator: false,
            fallible: true,
        },
        "stringToFloat" => Builtin {
            name: "stringToFloat",
            return_type: Type::Float,
            parameters: vec![param("var", Type::String)],
            generator: false,
            fallible: true,
        },
        _ => return None,
    };
    Some(builtin)
}
