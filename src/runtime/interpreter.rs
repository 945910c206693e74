use crate::language::{
    ast::{BinaryOp, CallableKind, ParamSpec},
    errors::ConfigurationError,
    lower::{lower_parameters, CompiledExpr, LocalExprCompiler},
    plan::{BindPlan, BindStep, OnMissing},
};
use crate::runtime::{
    environment::{Frame, FrameDescriptor},
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use std::sync::Arc;
use tracing::trace;

/// What the invocation machinery lends a plan while it binds one call.
pub trait Host<D> {
    /// Evaluates a compiled default with the parameters bound so far in `frame`.
    fn eval_default(&mut self, default: &D, frame: &Frame) -> RuntimeResult<Value>;

    /// Views the value held by a destructuring slot as a sequence.
    fn to_sequence(&mut self, value: &Value) -> Vec<Value> {
        sequence_elements(value)
    }
}

/// Arrays yield their elements, nil yields nothing, and any other value is a
/// one-element sequence.
pub fn sequence_elements(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Nil => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Actual arguments of one call.
#[derive(Clone, Copy, Debug)]
pub struct Call<'a> {
    pub args: &'a [Value],
    pub block: Option<&'a Value>,
}

impl<'a> Call<'a> {
    pub fn new(args: &'a [Value]) -> Self {
        Self { args, block: None }
    }

    pub fn with_block(mut self, block: &'a Value) -> Self {
        self.block = Some(block);
        self
    }
}

/// Runs every step of `plan` against `call`, writing into `frame`.
pub fn bind_arguments<D, H>(
    plan: &BindPlan<D>,
    call: Call<'_>,
    frame: &mut Frame,
    host: &mut H,
) -> RuntimeResult<()>
where
    H: Host<D> + ?Sized,
{
    let actual = call.args.len();
    for step in plan.steps() {
        match step {
            BindStep::CheckArity(arity) => {
                if !arity.accepts(actual) {
                    return Err(RuntimeError::WrongArgumentCount {
                        expected: *arity,
                        received: actual,
                    });
                }
            }
            BindStep::Positional {
                target,
                index,
                on_missing,
            } => {
                let value = match call.args.get(*index) {
                    Some(value) => value.clone(),
                    None => missing(*on_missing, *index, actual)?,
                };
                frame.set(*target, value);
            }
            BindStep::EndOffset {
                target,
                index,
                from_end,
                on_missing,
            } => {
                let value = match actual.checked_sub(*from_end).and_then(|i| call.args.get(i)) {
                    Some(value) => value.clone(),
                    None => {
                        let position = plan.leading_count() + plan.optional_count() + index;
                        missing(*on_missing, position, actual)?
                    }
                };
                frame.set(*target, value);
            }
            BindStep::Optional {
                target,
                index,
                threshold,
                default,
            } => {
                let supplied = if actual >= *threshold {
                    call.args.get(*index).cloned()
                } else {
                    None
                };
                let value = match supplied {
                    Some(value) => value,
                    None => host.eval_default(default, frame)?,
                };
                frame.set(*target, value);
            }
            BindStep::Rest {
                target,
                start,
                reserved_tail,
            } => {
                let end = actual.saturating_sub(*reserved_tail);
                let captured = if end > *start {
                    call.args[*start..end].to_vec()
                } else {
                    Vec::new()
                };
                frame.set(*target, Value::Array(captured));
            }
            BindStep::Continuation { target } => {
                frame.set(*target, call.block.cloned().unwrap_or(Value::Nil));
            }
            BindStep::Coerce { slot } => {
                let elements = host.to_sequence(&frame.value(*slot));
                frame.set(*slot, Value::Array(elements));
            }
            BindStep::Element {
                target,
                array,
                index,
            } => {
                let value = match frame.get(*array) {
                    Some(Value::Array(items)) => items.get(*index).cloned().unwrap_or(Value::Nil),
                    _ => Value::Nil,
                };
                frame.set(*target, value);
            }
        }
        trace!(%step, given = actual, "bound");
    }
    Ok(())
}

fn missing(on_missing: OnMissing, position: usize, received: usize) -> RuntimeResult<Value> {
    match on_missing {
        OnMissing::Nil => Ok(Value::Nil),
        OnMissing::ArityError => Err(RuntimeError::MissingArgument { position, received }),
    }
}

impl<D> BindPlan<D> {
    pub fn bind<H>(&self, call: Call<'_>, frame: &mut Frame, host: &mut H) -> RuntimeResult<()>
    where
        H: Host<D> + ?Sized,
    {
        bind_arguments(self, call, frame, host)
    }
}

/// Evaluates [`CompiledExpr`] defaults.
#[derive(Clone, Copy, Debug, Default)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, expr: &CompiledExpr, frame: &Frame) -> RuntimeResult<Value> {
        match expr {
            CompiledExpr::Const(value) => Ok(value.clone()),
            CompiledExpr::Local(slot) => Ok(frame.value(*slot)),
            CompiledExpr::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, frame))
                .collect::<RuntimeResult<Vec<_>>>()
                .map(Value::Array),
            CompiledExpr::Negate(inner) => match self.evaluate(inner, frame)? {
                Value::Int(value) => value
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or(RuntimeError::Overflow { operation: "-" }),
                other => Err(RuntimeError::TypeMismatch {
                    message: format!("cannot negate {}", other.type_name()),
                }),
            },
            CompiledExpr::Binary { left, op, right } => {
                let lhs = self.evaluate(left, frame)?;
                let rhs = self.evaluate(right, frame)?;
                eval_binary(*op, lhs, rhs)
            }
        }
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> RuntimeResult<Value> {
    match (op, lhs, rhs) {
        (BinaryOp::Div, Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (op, Value::Int(l), Value::Int(r)) => {
            let result = match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                BinaryOp::Div => l.checked_div(r),
            };
            result.map(Value::Int).ok_or(RuntimeError::Overflow {
                operation: op.symbol(),
            })
        }
        (BinaryOp::Add, Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
        (BinaryOp::Add, Value::Array(mut l), Value::Array(r)) => {
            l.extend(r);
            Ok(Value::Array(l))
        }
        (op, lhs, rhs) => Err(RuntimeError::TypeMismatch {
            message: format!(
                "`{}` is not defined for {} and {}",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            ),
        }),
    }
}

impl Host<CompiledExpr> for Interpreter {
    fn eval_default(&mut self, default: &CompiledExpr, frame: &Frame) -> RuntimeResult<Value> {
        self.evaluate(default, frame)
    }
}

/// A defined callable: its frame layout and its cached bind plan.
#[derive(Clone, Debug)]
pub struct Callable {
    descriptor: FrameDescriptor,
    plan: Arc<BindPlan<CompiledExpr>>,
}

impl Callable {
    pub fn define(spec: &ParamSpec, kind: CallableKind) -> Result<Self, ConfigurationError> {
        let mut descriptor = FrameDescriptor::new();
        let plan = lower_parameters(spec, kind, &mut descriptor, &mut LocalExprCompiler::new())?;
        Ok(Self {
            descriptor,
            plan: Arc::new(plan),
        })
    }

    pub fn descriptor(&self) -> &FrameDescriptor {
        &self.descriptor
    }

    pub fn plan(&self) -> &Arc<BindPlan<CompiledExpr>> {
        &self.plan
    }

    /// Binds one call into a fresh frame.
    pub fn invoke(&self, args: &[Value], block: Option<&Value>) -> RuntimeResult<Frame> {
        let mut frame = self.descriptor.new_frame();
        let call = Call { args, block };
        self.plan.bind(call, &mut frame, &mut Interpreter::new())?;
        Ok(frame)
    }

    /// User-visible locals of `frame`, in slot order.
    pub fn bindings(&self, frame: &Frame) -> Vec<(String, Value)> {
        self.descriptor
            .visible_slots()
            .map(|(slot, name)| (name.to_string(), frame.value(slot)))
            .collect()
    }

    pub fn local(&self, frame: &Frame, name: &str) -> Option<Value> {
        self.descriptor
            .find_slot(name)
            .map(|slot| frame.value(slot))
    }
}
