use crate::language::{
    ast::{BinaryOp, Expr},
    errors::ConfigurationError,
    span::Spanned,
};
use crate::runtime::{environment::SlotId, value::Value};

/// Compiles the default-value expression of an optional parameter.
///
/// `locals` holds every parameter bound before this one, in declaration
/// order; nothing declared later is visible.
pub trait DefaultCompiler {
    type Output;

    fn compile_default(
        &mut self,
        parameter: &str,
        expr: &Spanned<Expr>,
        locals: &BoundLocals,
    ) -> Result<Self::Output, ConfigurationError>;
}

#[derive(Clone, Debug, Default)]
pub struct BoundLocals {
    entries: Vec<(String, SlotId)>,
}

impl BoundLocals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, slot: SlotId) {
        self.entries.push((name.into(), slot));
    }

    pub fn resolve(&self, name: &str) -> Option<SlotId> {
        self.entries
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, slot)| *slot)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default expression with identifiers resolved to frame slots.
#[derive(Clone, Debug, PartialEq)]
pub enum CompiledExpr {
    Const(Value),
    Local(SlotId),
    Array(Vec<CompiledExpr>),
    Negate(Box<CompiledExpr>),
    Binary {
        left: Box<CompiledExpr>,
        op: BinaryOp,
        right: Box<CompiledExpr>,
    },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalExprCompiler;

impl LocalExprCompiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(
        &self,
        parameter: &str,
        expr: &Spanned<Expr>,
        locals: &BoundLocals,
    ) -> Result<CompiledExpr, ConfigurationError> {
        let compiled = match &expr.node {
            Expr::Nil => CompiledExpr::Const(Value::Nil),
            Expr::Bool(value) => CompiledExpr::Const(Value::Bool(*value)),
            Expr::Integer(value) => CompiledExpr::Const(Value::Int(*value)),
            Expr::Str(value) => CompiledExpr::Const(Value::Str(value.clone())),
            Expr::Identifier(name) => match locals.resolve(name) {
                Some(slot) => CompiledExpr::Local(slot),
                None => {
                    return Err(ConfigurationError::UnresolvedName {
                        parameter: parameter.to_string(),
                        name: name.clone(),
                        span: expr.span,
                    });
                }
            },
            Expr::Array(items) => CompiledExpr::Array(
                items
                    .iter()
                    .map(|item| self.compile(parameter, item, locals))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Negate(inner) => {
                CompiledExpr::Negate(Box::new(self.compile(parameter, inner, locals)?))
            }
            Expr::Binary { left, op, right } => CompiledExpr::Binary {
                left: Box::new(self.compile(parameter, left, locals)?),
                op: *op,
                right: Box::new(self.compile(parameter, right, locals)?),
            },
        };
        Ok(compiled)
    }
}

impl DefaultCompiler for LocalExprCompiler {
    type Output = CompiledExpr;

    fn compile_default(
        &mut self,
        parameter: &str,
        expr: &Spanned<Expr>,
        locals: &BoundLocals,
    ) -> Result<CompiledExpr, ConfigurationError> {
        self.compile(parameter, expr, locals)
    }
}
