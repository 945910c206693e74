//! Parameter-list and call-argument syntax.
//!
//! ```text
//! (a, b = a + 1, *rest, c, &blk)   method parameters
//! |(a, b), c|                      block parameters
//! 1, [2, 3], "x", &blk             call arguments
//! ```

use crate::language::{
    ast::{BinaryOp, CallableKind, DeclaredParam, Expr, ParamSpec, Parameter},
    errors::{ConfigurationError, SyntaxError, SyntaxErrors},
    span::{Span, Spanned},
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, anychar, char, digit1},
    combinator::{recognize, value},
    multi::many0,
    sequence::{delimited, pair},
    IResult,
};

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Identifier(String),
    Integer(i64),
    IntegerOutOfRange(String),
    Str(String),
    Nil,
    True,
    False,
    Comma,
    Equals,
    Star,
    Ampersand,
    Pipe,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Plus,
    Minus,
    Slash,
    Unknown(char),
}

#[derive(Debug, Clone)]
pub struct LexToken {
    pub token: Token,
    pub span: Span,
}

/// A parsed parameter list, still in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub kind: CallableKind,
    pub params: Vec<DeclaredParam>,
    pub span: Span,
}

impl Signature {
    pub fn into_spec(self) -> Result<ParamSpec, ConfigurationError> {
        ParamSpec::from_declared(self.params)
    }
}

/// Parsed call arguments: literal expressions plus an optional block name.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSite {
    pub args: Vec<Spanned<Expr>>,
    pub block: Option<String>,
}

fn parse_identifier(input: &str) -> IResult<&str, Token> {
    let (input, ident) = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)?;
    let token = match ident {
        "nil" => Token::Nil,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Identifier(ident.to_string()),
    };
    Ok((input, token))
}

fn parse_integer(input: &str) -> IResult<&str, Token> {
    let (input, digits) = digit1(input)?;
    let token = match digits.parse::<i64>() {
        Ok(num) => Token::Integer(num),
        Err(_) => Token::IntegerOutOfRange(digits.to_string()),
    };
    Ok((input, token))
}

fn parse_string(input: &str) -> IResult<&str, Token> {
    let (input, text) = delimited(char('"'), take_while(|c: char| c != '"'), char('"'))(input)?;
    Ok((input, Token::Str(text.to_string())))
}

fn parse_symbol(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Comma, char(',')),
        value(Token::Equals, char('=')),
        value(Token::Star, char('*')),
        value(Token::Ampersand, char('&')),
        value(Token::Pipe, char('|')),
        value(Token::LeftParen, char('(')),
        value(Token::RightParen, char(')')),
        value(Token::LeftBracket, char('[')),
        value(Token::RightBracket, char(']')),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Slash, char('/')),
    ))(input)
}

fn parse_any(input: &str) -> IResult<&str, Token> {
    let (input, ch) = anychar(input)?;
    Ok((input, Token::Unknown(ch)))
}

pub fn tokenize(input: &str) -> Vec<LexToken> {
    let mut tokens = Vec::new();
    let mut remaining_input = input;
    let mut offset = 0usize;

    while !remaining_input.is_empty() {
        let trimmed = remaining_input.trim_start();
        offset += remaining_input.len() - trimmed.len();
        remaining_input = trimmed;

        if remaining_input.is_empty() {
            break;
        }

        let result = parse_identifier(remaining_input)
            .or_else(|_| parse_integer(remaining_input))
            .or_else(|_| parse_string(remaining_input))
            .or_else(|_| parse_symbol(remaining_input))
            .or_else(|_| parse_any(remaining_input));

        match result {
            Ok((remaining, token)) => {
                let consumed = remaining_input.len() - remaining.len();
                tokens.push(LexToken {
                    token,
                    span: Span::new(offset, offset + consumed),
                });
                remaining_input = remaining;
                offset += consumed;
            }
            // `parse_any` only fails on empty input, which the loop excludes.
            Err(_) => break,
        }
    }

    tokens
}

pub fn parse_signature(source: &str) -> Result<Signature, SyntaxErrors> {
    let tokens = tokenize(source);
    let mut parser = AstParser::new(&tokens);
    let signature = parser.parse_signature();
    parser.finish(signature)
}

pub fn parse_arguments(source: &str) -> Result<CallSite, SyntaxErrors> {
    let tokens = tokenize(source);
    let mut parser = AstParser::new(&tokens);
    let call = parser.parse_call_site();
    parser.finish(call)
}

/// Deepest `(`, `[` or unary `-` nesting the parser descends into.
const MAX_NESTING: usize = 128;

struct AstParser<'a> {
    tokens: &'a [LexToken],
    position: usize,
    depth: usize,
    last_span: Option<Span>,
    errors: Vec<SyntaxError>,
}

impl<'a> AstParser<'a> {
    fn new(tokens: &'a [LexToken]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            last_span: None,
            errors: Vec::new(),
        }
    }

    fn finish<T>(self, parsed: T) -> Result<T, SyntaxErrors> {
        if self.errors.is_empty() {
            Ok(parsed)
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_signature(&mut self) -> Signature {
        let start = self.peek_span().start;
        let (kind, close) = match self.peek_token() {
            Some(Token::Pipe) => {
                self.advance();
                (CallableKind::Block, Some(Token::Pipe))
            }
            Some(Token::LeftParen) if self.wraps_everything() => {
                self.advance();
                (CallableKind::Method, Some(Token::RightParen))
            }
            _ => (CallableKind::Method, None),
        };

        let params = self.parse_list(close.as_ref(), Self::parse_param);

        if let Some(close) = &close {
            let help = match close {
                Token::Pipe => "Block parameters are written `|a, b|`",
                _ => "Method parameters are written `(a, b)`",
            };
            if let Err(err) = self.consume(close, "Expected the parameter list to be closed") {
                self.report_error(err.with_help(help));
            }
        }
        self.expect_end("Unexpected tokens after the parameter list");

        let end = self.last_span.map(|span| span.end).unwrap_or(start);
        Signature {
            kind,
            params,
            span: Span::new(start, end),
        }
    }

    fn parse_call_site(&mut self) -> CallSite {
        let close = if self.check(&Token::LeftParen) && self.wraps_everything() {
            self.advance();
            Some(Token::RightParen)
        } else {
            None
        };

        let mut block = None;
        let items = self.parse_list(close.as_ref(), |parser| {
            if parser.check(&Token::Ampersand) {
                parser.advance();
                let (name, _) = parser.expect_identifier("Expected a block name after '&'")?;
                return Ok(Err(name));
            }
            let expr = parser.parse_expression()?;
            if let Some(span) = first_identifier(&expr) {
                return Err(SyntaxError::new("Call arguments must be literal values", span)
                    .with_help("Use numbers, strings, nil, true, false or [arrays]"));
            }
            Ok(Ok(expr))
        });

        let mut args = Vec::new();
        for item in items {
            match item {
                Ok(expr) if block.is_none() => args.push(expr),
                Ok(expr) => self.report_error(
                    SyntaxError::new("The block argument must come last", expr.span)
                        .with_help("Move `&block` to the end of the argument list"),
                ),
                Err(name) if block.is_none() => block = Some(name),
                Err(_) => {
                    let span = self.last_span.unwrap_or_default();
                    self.report_error(SyntaxError::new("Only one block can be passed", span));
                }
            }
        }

        if let Some(close) = &close {
            if let Err(err) = self.consume(close, "Expected ')' after the arguments") {
                self.report_error(err);
            }
        }
        self.expect_end("Unexpected tokens after the arguments");

        CallSite { args, block }
    }

    /// Comma-separated items up to `close` (or the end of input), recovering
    /// at the next comma after an error.
    fn parse_list<T>(
        &mut self,
        close: Option<&Token>,
        mut item: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Vec<T> {
        let mut items = Vec::new();
        if self.is_at_end() || close.is_some_and(|close| self.check(close)) {
            return items;
        }
        loop {
            match item(self) {
                Ok(parsed) => items.push(parsed),
                Err(err) => {
                    self.report_error(err);
                    self.synchronize(close);
                }
            }
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        items
    }

    fn parse_param(&mut self) -> Result<DeclaredParam, SyntaxError> {
        let lex = match self.peek_lex() {
            Some(lex) => lex,
            None => return Err(self.error("Expected a parameter", self.eof_span())),
        };
        match &lex.token {
            Token::Star => {
                self.advance();
                let (name, span) = self.expect_identifier("Expected a name after '*'")?;
                let param = Parameter::binding(name, 0).with_span(lex.span.join(span));
                Ok(DeclaredParam::Rest(param))
            }
            Token::Ampersand => {
                self.advance();
                let (name, span) = self.expect_identifier("Expected a name after '&'")?;
                let param = Parameter::binding(name, 0).with_span(lex.span.join(span));
                Ok(DeclaredParam::Continuation(param))
            }
            Token::LeftParen => Ok(DeclaredParam::Required(self.parse_destructure()?)),
            Token::Identifier(name) => {
                self.advance();
                let param = Parameter::binding(name.clone(), 0).with_span(lex.span);
                if self.check(&Token::Equals) {
                    self.advance();
                    let default = self.parse_expression()?;
                    Ok(DeclaredParam::Optional(param, default))
                } else {
                    Ok(DeclaredParam::Required(param))
                }
            }
            token => Err(self
                .error(format!("Expected a parameter, found {token:?}"), lex.span)
                .with_help(param_syntax_help())),
        }
    }

    fn parse_destructure(&mut self) -> Result<Parameter, SyntaxError> {
        let span = self.peek_span();
        self.nested(span, Self::parse_destructure_group)
    }

    fn parse_destructure_group(&mut self) -> Result<Parameter, SyntaxError> {
        let start = self.consume(&Token::LeftParen, "Expected '('")?;
        let mut children = Vec::new();
        loop {
            let child = match self.peek_lex() {
                Some(LexToken {
                    token: Token::Identifier(name),
                    span,
                }) => {
                    self.advance();
                    Parameter::binding(name.clone(), children.len()).with_span(*span)
                }
                Some(LexToken {
                    token: Token::LeftParen,
                    ..
                }) => {
                    let mut nested = self.parse_destructure()?;
                    nested.position = children.len();
                    nested
                }
                Some(LexToken {
                    token: Token::Star,
                    span,
                }) => {
                    return Err(self.error(
                        "Splat parameters are not supported inside a destructuring group",
                        *span,
                    ));
                }
                Some(lex) => {
                    return Err(self
                        .error(
                            format!("Expected a name inside '(...)', found {:?}", lex.token),
                            lex.span,
                        )
                        .with_help(param_syntax_help()));
                }
                None => return Err(self.error("Expected a name inside '(...)'", self.eof_span())),
            };
            children.push(child);
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.consume(
            &Token::RightParen,
            "Expected ')' to close the destructuring group",
        )?;
        Ok(Parameter::destructure(children, 0).with_span(start.join(end)))
    }

    fn parse_expression(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut expr = self.parse_term()?;

        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = binary(expr, op, right);
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let mut expr = self.parse_factor()?;

        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            expr = binary(expr, op, right);
        }

        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Spanned<Expr>, SyntaxError> {
        let lex = match self.advance() {
            Some(lex) => lex,
            None => {
                return Err(self.error(
                    "Unexpected end of input while reading expression",
                    self.eof_span(),
                ));
            }
        };
        let node = match &lex.token {
            Token::Integer(value) => Expr::Integer(*value),
            Token::Str(value) => Expr::Str(value.clone()),
            Token::Nil => Expr::Nil,
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Identifier(name) => Expr::Identifier(name.clone()),
            Token::IntegerOutOfRange(_) => {
                return Err(self
                    .error("Integer literal out of range", lex.span)
                    .with_help(format!("Integers may be at most {}", i64::MAX)));
            }
            Token::Minus => {
                let inner = self.nested(lex.span, Self::parse_factor)?;
                let span = lex.span.join(inner.span);
                return Ok(Spanned::new(Expr::Negate(Box::new(inner)), span));
            }
            Token::LeftParen => {
                let expr = self.nested(lex.span, Self::parse_expression)?;
                self.consume(&Token::RightParen, "Expected ')' after expression")?;
                return Ok(expr);
            }
            Token::LeftBracket => {
                let mut items = Vec::new();
                if !self.check(&Token::RightBracket) {
                    loop {
                        items.push(self.nested(lex.span, Self::parse_expression)?);
                        if self.check(&Token::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                let end = self.consume(&Token::RightBracket, "Expected ']' after array items")?;
                return Ok(Spanned::new(Expr::Array(items), lex.span.join(end)));
            }
            token => {
                return Err(self.error(
                    format!("Unexpected token {token:?} in expression"),
                    lex.span,
                ));
            }
        };
        Ok(Spanned::new(node, lex.span))
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        span: Span,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self
                .error("Nesting too deep", span)
                .with_help(format!("At most {MAX_NESTING} levels may be nested")));
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    /// True when the opening token's matching `)` is the last token.
    fn wraps_everything(&self) -> bool {
        let mut depth = 0usize;
        for (index, lex) in self.tokens.iter().enumerate().skip(self.position) {
            match lex.token {
                Token::LeftParen => depth += 1,
                Token::RightParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return index + 1 == self.tokens.len();
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn expect_identifier(&mut self, message: &str) -> Result<(String, Span), SyntaxError> {
        match self.peek_lex() {
            Some(LexToken {
                token: Token::Identifier(name),
                span,
            }) => {
                self.advance();
                Ok((name.clone(), *span))
            }
            Some(lex) => Err(self.error(format!("{}: found {:?}", message, lex.token), lex.span)),
            None => Err(self.error(
                format!("{}: reached end of input", message),
                self.eof_span(),
            )),
        }
    }

    fn expect_end(&mut self, message: &str) {
        if let Some(lex) = self.peek_lex() {
            let span = lex.span.join(self.tokens.last().map(|t| t.span).unwrap_or(lex.span));
            self.report_error(self.error(message, span));
            self.position = self.tokens.len();
        }
    }

    fn consume(&mut self, expected: &Token, message: &str) -> Result<Span, SyntaxError> {
        match self.peek_lex() {
            Some(lex) if &lex.token == expected => {
                self.advance();
                Ok(lex.span)
            }
            Some(lex) => Err(self.error(format!("{}: found {:?}", message, lex.token), lex.span)),
            None => Err(self.error(
                format!("{}: reached end of input", message),
                self.eof_span(),
            )),
        }
    }

    fn peek_token(&self) -> Option<&'a Token> {
        self.peek_lex().map(|lex| &lex.token)
    }

    fn peek_lex(&self) -> Option<&'a LexToken> {
        self.tokens.get(self.position)
    }

    fn peek_span(&self) -> Span {
        self.peek_lex()
            .map(|lex| lex.span)
            .unwrap_or_else(|| self.eof_span())
    }

    fn advance(&mut self) -> Option<&'a LexToken> {
        let token = self.tokens.get(self.position);
        if let Some(lex) = token {
            self.position += 1;
            self.last_span = Some(lex.span);
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        matches!(self.peek_token(), Some(token) if token == expected)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn eof_span(&self) -> Span {
        match self.last_span.or_else(|| self.tokens.last().map(|t| t.span)) {
            Some(span) => Span::new(span.end, span.end),
            None => Span::new(0, 0),
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> SyntaxError {
        SyntaxError::new(message, span)
    }

    fn report_error(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    /// Skips to the next top-level comma or to `close`.
    fn synchronize(&mut self, close: Option<&Token>) {
        let mut depth = 0usize;
        while let Some(token) = self.peek_token() {
            match token {
                Token::Comma if depth == 0 => break,
                Token::LeftParen | Token::LeftBracket => depth += 1,
                Token::RightParen | Token::RightBracket if depth > 0 => depth -= 1,
                token if depth == 0 && close == Some(token) => break,
                _ => {}
            }
            self.advance();
        }
    }
}

fn binary(left: Spanned<Expr>, op: BinaryOp, right: Spanned<Expr>) -> Spanned<Expr> {
    let span = left.span.join(right.span);
    Spanned::new(
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn first_identifier(expr: &Spanned<Expr>) -> Option<Span> {
    match &expr.node {
        Expr::Identifier(_) => Some(expr.span),
        Expr::Array(items) => items.iter().find_map(first_identifier),
        Expr::Negate(inner) => first_identifier(inner),
        Expr::Binary { left, right, .. } => {
            first_identifier(left).or_else(|| first_identifier(right))
        }
        Expr::Nil | Expr::Bool(_) | Expr::Integer(_) | Expr::Str(_) => None,
    }
}

fn param_syntax_help() -> String {
    "Parameters look like `a`, `b = 1`, `*rest`, `(c, d)` or `&block`".into()
}
