//! template body parser - converts tokens to the syntax tree
//!
//! recursive descent for statements, one function per precedence level for
//! expressions. nesting is bounded so evaluation cannot exhaust the stack.

use super::error::ScriptError;
use super::lexer::{tokenize, Punct, Spanned, Token};
use super::types::{BinaryOp, Expr, Literal, LogicalOp, Program, Stmt, UnaryOp};

/// deepest nesting of statements and expressions accepted
pub const MAX_DEPTH: usize = 64;

/// words that are valid JavaScript but not part of the template language
const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "finally", "for", "function", "import", "in", "instanceof", "new",
    "super", "switch", "this", "throw", "try", "void", "while", "with", "yield",
];

/// parse a full expression body
pub fn parse_program(source: &str) -> Result<Program, ScriptError> {
    let mut parser = Parser::new(source, 0)?;
    let mut body = Vec::new();

    while parser.peek() != &Token::Eof {
        body.push(parser.parse_statement()?);
    }

    Ok(Program { body })
}

/// parse a single expression, e.g. a template literal substitution
pub fn parse_expression(source: &str) -> Result<Expr, ScriptError> {
    Parser::new(source, 0)?.parse_standalone_expression()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(source: &str, depth: usize) -> Result<Self, ScriptError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            depth,
        })
    }

    fn parse_standalone_expression(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.parse_expression()?;
        if self.peek() != &Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    // ------------------------------------------------------------------------
    // token helpers
    // ------------------------------------------------------------------------

    fn current(&self) -> &Spanned {
        // tokenize always ends with Eof and the parser never advances past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn at_punct(&self, punct: Punct) -> bool {
        self.peek() == &Token::Punct(punct)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == keyword)
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> Result<(), ScriptError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ScriptError {
        let message = match self.peek() {
            Token::Eof => "Unexpected end of input".to_string(),
            Token::Number(_) => "Unexpected number".to_string(),
            Token::String(_) => "Unexpected string".to_string(),
            Token::Template { .. } => "Unexpected template string".to_string(),
            Token::Ident(name) if is_keyword(name) => format!("Unexpected token '{}'", name),
            Token::Ident(name) => format!("Unexpected identifier '{}'", name),
            Token::Punct(p) => format!("Unexpected token '{}'", p),
        };
        ScriptError::syntax(message)
    }

    /// run `f` one nesting level deeper
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        if self.depth >= MAX_DEPTH {
            return Err(ScriptError::syntax("Expression nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// a statement ends at `;`, before `}` or end of input, or at a line break
    fn end_statement(&mut self) -> Result<(), ScriptError> {
        if self.eat_punct(Punct::Semicolon)
            || self.at_punct(Punct::RBrace)
            || self.peek() == &Token::Eof
            || self.current().newline_before
        {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // ------------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.nested(|p| {
            if p.eat_punct(Punct::Semicolon) {
                return Ok(Stmt::Empty);
            }
            if p.eat_punct(Punct::LBrace) {
                return p.parse_block();
            }
            if p.at_keyword("return") {
                p.advance();
                let value = if p.at_punct(Punct::Semicolon)
                    || p.at_punct(Punct::RBrace)
                    || p.peek() == &Token::Eof
                {
                    None
                } else {
                    Some(p.parse_expression()?)
                };
                p.end_statement()?;
                return Ok(Stmt::Return(value));
            }
            if p.at_keyword("if") {
                return p.parse_if();
            }
            if p.at_keyword("const") || p.at_keyword("let") || p.at_keyword("var") {
                return p.parse_declaration();
            }

            let expr = p.parse_expression()?;
            p.end_statement()?;
            Ok(Stmt::Expr(expr))
        })
    }

    fn parse_block(&mut self) -> Result<Stmt, ScriptError> {
        let mut body = Vec::new();
        while !self.eat_punct(Punct::RBrace) {
            if self.peek() == &Token::Eof {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        Ok(Stmt::Block(body))
    }

    fn parse_if(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;

        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.at_keyword("else") {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_declaration(&mut self) -> Result<Stmt, ScriptError> {
        let is_const = self.at_keyword("const");
        self.advance();

        let name = match self.peek() {
            Token::Ident(name) if !is_keyword(name) => name.clone(),
            _ => return Err(self.unexpected()),
        };
        self.advance();

        let init = if self.eat_punct(Punct::Assign) {
            Some(self.parse_expression()?)
        } else if is_const {
            return Err(ScriptError::syntax("Missing initializer in const declaration"));
        } else {
            None
        };

        self.end_statement()?;
        Ok(Stmt::Declare { name, init })
    }

    // ------------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, ScriptError> {
        self.nested(|p| p.parse_conditional())
    }

    fn parse_conditional(&mut self) -> Result<Expr, ScriptError> {
        let test = self.parse_logical(0)?;

        if !self.eat_punct(Punct::Question) {
            return Ok(test);
        }

        let consequent = self.parse_expression()?;
        self.expect_punct(Punct::Colon)?;
        let alternate = self.parse_expression()?;

        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// `??`, `||`, `&&` from loosest to tightest
    fn parse_logical(&mut self, level: usize) -> Result<Expr, ScriptError> {
        static LEVELS: [(Punct, LogicalOp); 3] = [
            (Punct::Nullish, LogicalOp::Nullish),
            (Punct::OrOr, LogicalOp::Or),
            (Punct::AndAnd, LogicalOp::And),
        ];

        let Some(&(punct, op)) = LEVELS.get(level) else {
            return self.parse_binary(0);
        };

        let mut left = self.parse_logical(level + 1)?;
        let mut chained = 0;
        while self.eat_punct(punct) {
            self.enter_chain(&mut chained)?;
            let right = self.parse_logical(level + 1)?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    /// equality, relational, additive, multiplicative from loosest to tightest
    fn parse_binary(&mut self, level: usize) -> Result<Expr, ScriptError> {
        static LEVELS: [&[(Punct, BinaryOp)]; 4] = [
            &[
                (Punct::EqEq, BinaryOp::Eq),
                (Punct::NotEq, BinaryOp::Ne),
                (Punct::EqEqEq, BinaryOp::StrictEq),
                (Punct::NotEqEq, BinaryOp::StrictNe),
            ],
            &[
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Le, BinaryOp::Le),
                (Punct::Gt, BinaryOp::Gt),
                (Punct::Ge, BinaryOp::Ge),
            ],
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Rem),
            ],
        ];

        let Some(ops) = LEVELS.get(level) else {
            return self.parse_unary();
        };

        let mut left = self.parse_binary(level + 1)?;
        let mut chained = 0;
        loop {
            let Some(&(_, op)) = ops.iter().find(|(punct, _)| self.at_punct(*punct)) else {
                break;
            };
            self.advance();
            self.enter_chain(&mut chained)?;
            let right = self.parse_binary(level + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    /// left-associative chains nest the tree without recursing in the parser
    fn enter_chain(&mut self, chained: &mut usize) -> Result<(), ScriptError> {
        if self.depth >= MAX_DEPTH {
            return Err(ScriptError::syntax("Expression nested too deeply"));
        }
        self.depth += 1;
        *chained += 1;
        Ok(())
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.peek() {
            Token::Punct(Punct::Bang) => UnaryOp::Not,
            Token::Punct(Punct::Minus) => UnaryOp::Neg,
            Token::Punct(Punct::Plus) => UnaryOp::Plus,
            Token::Ident(name) if name == "typeof" => UnaryOp::TypeOf,
            _ => return self.parse_postfix(),
        };
        self.advance();

        let operand = self.nested(|p| p.parse_unary())?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.parse_primary()?;
        let mut optional_chain = false;
        let mut chained = 0;

        loop {
            let optional = self.eat_punct(Punct::QuestionDot);
            optional_chain |= optional;

            let next = match self.peek() {
                Token::Punct(Punct::LParen) => {
                    self.advance();
                    let args = self.parse_arguments()?;
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional,
                    }
                }
                Token::Punct(Punct::LBracket) => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect_punct(Punct::RBracket)?;
                    Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(property),
                        optional,
                    }
                }
                Token::Punct(Punct::Dot) if !optional => {
                    self.advance();
                    let name = self.parse_property_name()?;
                    Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(Expr::string(name)),
                        optional,
                    }
                }
                Token::Ident(_) if optional => {
                    let name = self.parse_property_name()?;
                    Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(Expr::string(name)),
                        optional,
                    }
                }
                Token::Template { quasis, exprs } if !optional => {
                    let (quasis, exprs) = (quasis.clone(), exprs.clone());
                    self.advance();
                    Expr::Tagged {
                        tag: Box::new(expr),
                        quasis,
                        exprs: self.parse_substitutions(&exprs)?,
                    }
                }
                _ if optional => return Err(self.unexpected()),
                _ => break,
            };

            self.enter_chain(&mut chained)?;
            expr = next;
        }
        self.depth -= chained;

        if optional_chain {
            Ok(Expr::OptionalChain(Box::new(expr)))
        } else {
            Ok(expr)
        }
    }

    fn parse_property_name(&mut self) -> Result<String, ScriptError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();
        while !self.eat_punct(Punct::RParen) {
            args.push(self.parse_expression()?);
            if !self.at_punct(Punct::RParen) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(args)
    }

    fn parse_substitutions(&mut self, sources: &[String]) -> Result<Vec<Expr>, ScriptError> {
        sources
            .iter()
            .map(|source| {
                self.nested(|p| {
                    let mut inner = Parser::new(source, p.depth)?;
                    inner.parse_standalone_expression()
                })
            })
            .collect()
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::string(s))
            }
            Token::Template { quasis, exprs } => {
                self.advance();
                Ok(Expr::Template {
                    quasis,
                    exprs: self.parse_substitutions(&exprs)?,
                })
            }
            Token::Ident(name) => {
                let literal = match name.as_str() {
                    "true" => Some(Literal::Bool(true)),
                    "false" => Some(Literal::Bool(false)),
                    "null" => Some(Literal::Null),
                    "undefined" => Some(Literal::Undefined),
                    "NaN" => Some(Literal::Number(f64::NAN)),
                    "Infinity" => Some(Literal::Number(f64::INFINITY)),
                    _ => None,
                };
                if let Some(literal) = literal {
                    self.advance();
                    return Ok(Expr::Literal(literal));
                }
                if is_keyword(&name) {
                    return Err(self.unexpected());
                }
                self.advance();
                Ok(Expr::ident(name))
            }
            Token::Punct(Punct::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                Ok(expr)
            }
            Token::Punct(Punct::LBracket) => {
                self.advance();
                self.nested(|p| {
                    let mut items = Vec::new();
                    while !p.eat_punct(Punct::RBracket) {
                        items.push(p.parse_expression()?);
                        if !p.at_punct(Punct::RBracket) {
                            p.expect_punct(Punct::Comma)?;
                        }
                    }
                    Ok(Expr::Array(items))
                })
            }
            _ => Err(self.unexpected()),
        }
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "return" | "if" | "const" | "let" | "var" | "typeof" | "true" | "false" | "null"
    ) || RESERVED.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        parse_expression(source).unwrap()
    }

    fn syntax_error(source: &str) -> String {
        parse_program(source).unwrap_err().message
    }

    #[test]
    fn test_parse_return_statement() {
        let program = parse_program("return null;").unwrap();
        assert_eq!(
            program.body,
            vec![Stmt::Return(Some(Expr::Literal(Literal::Null)))]
        );
    }

    #[test]
    fn test_parse_bare_return() {
        let program = parse_program("return ").unwrap();
        assert_eq!(program.body, vec![Stmt::Return(None)]);
    }

    #[test]
    fn test_parse_return_of_expression_statement_with_semicolon() {
        // "${null;}" becomes "return null;"
        let program = parse_program("return null;").unwrap();
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::number(1.0)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::number(2.0)),
                    right: Box::new(Expr::number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            expr("8 - 4 - 2"),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: Box::new(Expr::number(8.0)),
                    right: Box::new(Expr::number(4.0)),
                }),
                right: Box::new(Expr::number(2.0)),
            }
        );
    }

    #[test]
    fn test_equality_binds_looser_than_relational() {
        match expr("a < b == c") {
            Expr::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Eq);
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Lt, .. }));
            }
            other => panic!("expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_member_access_chain() {
        assert_eq!(
            expr("hass.states['light.a'].state"),
            Expr::Member {
                object: Box::new(Expr::Member {
                    object: Box::new(Expr::Member {
                        object: Box::new(Expr::ident("hass")),
                        property: Box::new(Expr::string("states")),
                        optional: false,
                    }),
                    property: Box::new(Expr::string("light.a")),
                    optional: false,
                }),
                property: Box::new(Expr::string("state")),
                optional: false,
            }
        );
    }

    #[test]
    fn test_optional_chain_is_wrapped() {
        match expr("user?.name.length") {
            Expr::OptionalChain(inner) => match *inner {
                Expr::Member { object, .. } => {
                    assert!(matches!(*object, Expr::Member { optional: true, .. }));
                }
                other => panic!("expected Member, got {:?}", other),
            },
            other => panic!("expected OptionalChain, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_and_logical() {
        match expr("a && b ? 'x' : c ?? 'y'") {
            Expr::Conditional {
                test, alternate, ..
            } => {
                assert!(matches!(*test, Expr::Logical { op: LogicalOp::And, .. }));
                assert!(matches!(
                    *alternate,
                    Expr::Logical {
                        op: LogicalOp::Nullish,
                        ..
                    }
                ));
            }
            other => panic!("expected Conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_method_call() {
        match expr("state.toUpperCase()") {
            Expr::Call { callee, args, .. } => {
                assert!(args.is_empty());
                assert!(matches!(*callee, Expr::Member { .. }));
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_tagged_template() {
        match expr("html`<b>${state}</b>`") {
            Expr::Tagged { tag, quasis, exprs } => {
                assert_eq!(*tag, Expr::ident("html"));
                assert_eq!(quasis, vec!["<b>".to_string(), "</b>".to_string()]);
                assert_eq!(exprs, vec![Expr::ident("state")]);
            }
            other => panic!("expected Tagged, got {:?}", other),
        }
    }

    #[test]
    fn test_array_literal_trailing_comma() {
        assert_eq!(
            expr("[1, 'a',]"),
            Expr::Array(vec![Expr::number(1.0), Expr::string("a")])
        );
    }

    #[test]
    fn test_if_else_and_declarations() {
        let program =
            parse_program("const t = state; if (t == 'on') return 'a'; else { return 'b' }")
                .unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(matches!(program.body[0], Stmt::Declare { .. }));
        assert!(matches!(
            program.body[1],
            Stmt::If {
                alternate: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_statements_separated_by_newline() {
        let program = parse_program("const a = 1\nreturn a").unwrap();
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(syntax_error("return ("), "Unexpected end of input");
        assert_eq!(syntax_error("return 1 2"), "Unexpected number");
        assert_eq!(syntax_error("return a b"), "Unexpected identifier 'b'");
        assert_eq!(syntax_error("return state = 1"), "Unexpected token '='");
        assert_eq!(syntax_error("return if"), "Unexpected token 'if'");
        assert_eq!(syntax_error("return new Date()"), "Unexpected token 'new'");
        assert_eq!(
            syntax_error("const x"),
            "Missing initializer in const declaration"
        );
    }

    #[test]
    fn test_empty_substitution_is_error() {
        assert!(parse_expression("`${}`").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(
            parse_expression(&deep).unwrap_err().message,
            "Expression nested too deeply"
        );

        let long_chain = vec!["1"; MAX_DEPTH * 2].join(" + ");
        assert!(parse_expression(&long_chain).is_err());

        assert!(parse_expression("((((1))))").is_ok());
    }
}
