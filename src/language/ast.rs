use crate::language::{
    errors::ConfigurationError,
    span::{Span, Spanned},
};
use std::fmt;

/// Whether a callable binds its arguments strictly (methods) or leniently
/// (blocks, where missing required arguments become nil).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Method,
    Block,
}

impl CallableKind {
    pub fn is_lenient(self) -> bool {
        matches!(self, CallableKind::Block)
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableKind::Method => write!(f, "method"),
            CallableKind::Block => write!(f, "block"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKind {
    LeadingRequired,
    Optional,
    Rest,
    TrailingRequired,
    Continuation,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GroupKind::LeadingRequired => "required parameter",
            GroupKind::Optional => "optional parameter",
            GroupKind::Rest => "rest parameter",
            GroupKind::TrailingRequired => "trailing required parameter",
            GroupKind::Continuation => "block parameter",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub position: usize,
    pub kind: ParamKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamKind {
    Binding(String),
    /// Children are filled from the elements of the single argument at this position.
    Destructure(Vec<Parameter>),
}

impl Parameter {
    pub fn binding(name: impl Into<String>, position: usize) -> Self {
        Self {
            position,
            kind: ParamKind::Binding(name.into()),
            span: Span::default(),
        }
    }

    pub fn destructure(children: Vec<Parameter>, position: usize) -> Self {
        Self {
            position,
            kind: ParamKind::Destructure(children),
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ParamKind::Binding(name) => Some(name),
            ParamKind::Destructure(_) => None,
        }
    }

    pub fn is_destructure(&self) -> bool {
        matches!(self.kind, ParamKind::Destructure(_))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParamKind::Binding(name) => f.write_str(name),
            ParamKind::Destructure(children) => {
                write!(f, "(")?;
                for (idx, child) in children.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionalParam {
    pub param: Parameter,
    pub default: Spanned<Expr>,
}

/// Declared formal parameters of one callable, grouped the way they bind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamSpec {
    pub leading_required: Vec<Parameter>,
    pub optional: Vec<OptionalParam>,
    pub trailing_required: Vec<Parameter>,
    pub rest: Option<Parameter>,
    pub continuation: Option<Parameter>,
}

/// A parameter as it appears in source, before grouping.
#[derive(Clone, Debug, PartialEq)]
pub enum DeclaredParam {
    Required(Parameter),
    Optional(Parameter, Spanned<Expr>),
    Rest(Parameter),
    Continuation(Parameter),
}

impl DeclaredParam {
    fn group(&self) -> GroupKind {
        match self {
            DeclaredParam::Required(_) => GroupKind::LeadingRequired,
            DeclaredParam::Optional(..) => GroupKind::Optional,
            DeclaredParam::Rest(_) => GroupKind::Rest,
            DeclaredParam::Continuation(_) => GroupKind::Continuation,
        }
    }

    fn param(&self) -> &Parameter {
        match self {
            DeclaredParam::Required(param)
            | DeclaredParam::Optional(param, _)
            | DeclaredParam::Rest(param)
            | DeclaredParam::Continuation(param) => param,
        }
    }
}

impl ParamSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leading_count(&self) -> usize {
        self.leading_required.len()
    }

    pub fn optional_count(&self) -> usize {
        self.optional.len()
    }

    pub fn trailing_count(&self) -> usize {
        self.trailing_required.len()
    }

    /// Groups parameters listed in declaration order, assigning each its
    /// position within its group.
    ///
    /// Accepted shape: `required* optional* rest? required* continuation?`.
    pub fn from_declared(params: Vec<DeclaredParam>) -> Result<Self, ConfigurationError> {
        let mut spec = ParamSpec::new();
        let mut stage = GroupKind::LeadingRequired;

        for declared in params {
            let group = match declared.group() {
                GroupKind::LeadingRequired if stage == GroupKind::LeadingRequired => {
                    GroupKind::LeadingRequired
                }
                GroupKind::LeadingRequired if stage < GroupKind::Continuation => {
                    GroupKind::TrailingRequired
                }
                GroupKind::Optional if stage <= GroupKind::Optional => GroupKind::Optional,
                GroupKind::Rest if stage <= GroupKind::Optional => GroupKind::Rest,
                GroupKind::Continuation if stage < GroupKind::Continuation => {
                    GroupKind::Continuation
                }
                requested => {
                    let param = declared.param();
                    return Err(ConfigurationError::OutOfOrder {
                        parameter: param.to_string(),
                        group: requested,
                        after: stage,
                        span: param.span,
                    });
                }
            };
            stage = group;

            match declared {
                DeclaredParam::Required(mut param) => {
                    if group == GroupKind::LeadingRequired {
                        param.position = spec.leading_required.len();
                        spec.leading_required.push(param);
                    } else {
                        param.position = spec.trailing_required.len();
                        spec.trailing_required.push(param);
                    }
                }
                DeclaredParam::Optional(mut param, default) => {
                    param.position = spec.optional.len();
                    spec.optional.push(OptionalParam { param, default });
                }
                DeclaredParam::Rest(mut param) => {
                    param.position = 0;
                    spec.rest = Some(param);
                }
                DeclaredParam::Continuation(mut param) => {
                    param.position = 0;
                    spec.continuation = Some(param);
                }
            }
        }

        Ok(spec)
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        parts.extend(self.leading_required.iter().map(|p| p.to_string()));
        parts.extend(
            self.optional
                .iter()
                .map(|opt| format!("{} = {}", opt.param, opt.default.node.as_source())),
        );
        if let Some(rest) = &self.rest {
            parts.push(format!("*{rest}"));
        }
        parts.extend(self.trailing_required.iter().map(|p| p.to_string()));
        if let Some(block) = &self.continuation {
            parts.push(format!("&{block}"));
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// Default-value expressions. Deliberately small: the pass only hands them
/// to a [`DefaultCompiler`](crate::language::lower::DefaultCompiler).
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Nil,
    Bool(bool),
    Integer(i64),
    Str(String),
    Identifier(String),
    Array(Vec<Spanned<Expr>>),
    Negate(Box<Spanned<Expr>>),
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinaryOp,
        right: Box<Spanned<Expr>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Expr {
    pub fn as_source(&self) -> String {
        match self {
            Expr::Nil => "nil".into(),
            Expr::Bool(value) => value.to_string(),
            Expr::Integer(value) => value.to_string(),
            Expr::Str(value) => format!("{value:?}"),
            Expr::Identifier(name) => name.clone(),
            Expr::Array(items) => {
                let items: Vec<String> = items.iter().map(|item| item.node.as_source()).collect();
                format!("[{}]", items.join(", "))
            }
            Expr::Negate(inner) => format!("-{}", inner.node.as_source()),
            Expr::Binary { left, op, right } => format!(
                "{} {} {}",
                left.node.as_source(),
                op.symbol(),
                right.node.as_source()
            ),
        }
    }
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}
