//! Lowers a [`ParamSpec`] into a [`BindPlan`].
//!
//! Groups are visited in a fixed order: leading required, optional,
//! trailing required, rest, continuation. Required parameters are read
//! forward from the start in the leading group and backward from the end in
//! the trailing group; inside a destructuring group every read is an
//! element of the group's synthetic slot instead.

mod context;
mod defaults;

#[cfg(test)]
mod tests;

pub use context::DestructureStack;
pub use defaults::{BoundLocals, CompiledExpr, DefaultCompiler, LocalExprCompiler};

use crate::language::{
    ast::{CallableKind, GroupKind, OptionalParam, ParamKind, ParamSpec, Parameter},
    errors::ConfigurationError,
    plan::{Arity, BindPlan, BindStep, OnMissing},
    span::Span,
};
use crate::runtime::environment::{SlotAllocator, SlotId};
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Pre,
    Post,
}

impl Mode {
    fn group(self) -> GroupKind {
        match self {
            Mode::Pre => GroupKind::LeadingRequired,
            Mode::Post => GroupKind::TrailingRequired,
        }
    }
}

/// Lowers `spec` for a callable of the given kind.
///
/// Slots come from `slots`; default expressions go through `defaults` with the
/// parameters bound before them visible. Fails only when `spec` itself is
/// malformed.
pub fn lower_parameters<A, C>(
    spec: &ParamSpec,
    kind: CallableKind,
    slots: &mut A,
    defaults: &mut C,
) -> Result<BindPlan<C::Output>, ConfigurationError>
where
    A: SlotAllocator,
    C: DefaultCompiler,
{
    let mut stack = DestructureStack::new();
    let plan = lower_with_stack(spec, kind, slots, defaults, &mut stack)?;
    debug_assert!(stack.is_empty(), "unbalanced destructuring contexts");
    debug!(
        %kind,
        leading = plan.leading_count(),
        optional = plan.optional_count(),
        trailing = plan.trailing_count(),
        rest = plan.has_rest(),
        steps = plan.steps().len(),
        nesting = stack.deepest(),
        "lowered parameter list"
    );
    Ok(plan)
}

fn lower_with_stack<A, C>(
    spec: &ParamSpec,
    kind: CallableKind,
    slots: &mut A,
    defaults: &mut C,
    stack: &mut DestructureStack,
) -> Result<BindPlan<C::Output>, ConfigurationError>
where
    A: SlotAllocator,
    C: DefaultCompiler,
{
    let mut lowering = Lowering {
        spec,
        kind,
        slots,
        defaults,
        bound: BoundLocals::new(),
        steps: Vec::new(),
    };

    if !kind.is_lenient() {
        lowering.steps.push(BindStep::CheckArity(Arity {
            required: spec.leading_count() + spec.trailing_count(),
            optional: spec.optional_count(),
            rest: spec.rest.is_some(),
        }));
    }

    for (declared, param) in spec.leading_required.iter().enumerate() {
        check_position(param, declared, GroupKind::LeadingRequired)?;
        lowering.lower_required(param, Mode::Pre, stack)?;
    }
    for (declared, optional) in spec.optional.iter().enumerate() {
        check_position(&optional.param, declared, GroupKind::Optional)?;
        lowering.lower_optional(optional)?;
    }
    for (declared, param) in spec.trailing_required.iter().enumerate() {
        check_position(param, declared, GroupKind::TrailingRequired)?;
        lowering.lower_required(param, Mode::Post, stack)?;
    }
    if let Some(rest) = &spec.rest {
        lowering.lower_rest(rest)?;
    }
    if let Some(block) = &spec.continuation {
        lowering.lower_continuation(block)?;
    }

    Ok(BindPlan::new(
        kind,
        lowering.steps,
        spec.leading_count(),
        spec.optional_count(),
        spec.trailing_count(),
        spec.rest.is_some(),
    ))
}

fn check_position(
    param: &Parameter,
    declared: usize,
    group: GroupKind,
) -> Result<(), ConfigurationError> {
    if param.position == declared {
        Ok(())
    } else {
        Err(ConfigurationError::PositionMismatch {
            parameter: param.to_string(),
            group,
            recorded: param.position,
            declared,
            span: param.span,
        })
    }
}

struct Lowering<'a, A, C: DefaultCompiler> {
    spec: &'a ParamSpec,
    kind: CallableKind,
    slots: &'a mut A,
    defaults: &'a mut C,
    bound: BoundLocals,
    steps: Vec<BindStep<C::Output>>,
}

impl<A, C> Lowering<'_, A, C>
where
    A: SlotAllocator,
    C: DefaultCompiler,
{
    fn on_missing(&self) -> OnMissing {
        if self.kind.is_lenient() {
            OnMissing::Nil
        } else {
            OnMissing::ArityError
        }
    }

    fn lower_required(
        &mut self,
        param: &Parameter,
        mode: Mode,
        stack: &mut DestructureStack,
    ) -> Result<(), ConfigurationError> {
        let target = self.required_target(param)?;
        let step = match stack.active() {
            Some(array) => BindStep::Element {
                target,
                array,
                index: param.position,
            },
            None => match mode {
                Mode::Pre => BindStep::Positional {
                    target,
                    index: param.position,
                    on_missing: self.on_missing(),
                },
                Mode::Post => BindStep::EndOffset {
                    target,
                    index: param.position,
                    from_end: self.spec.trailing_count() - param.position,
                    on_missing: self.on_missing(),
                },
            },
        };
        trace!(parameter = %param, %step, depth = stack.depth(), "required");
        self.steps.push(step);

        if let ParamKind::Destructure(children) = &param.kind {
            self.steps.push(BindStep::Coerce { slot: target });
            stack.within(target, |stack| -> Result<(), ConfigurationError> {
                for (declared, child) in children.iter().enumerate() {
                    check_position(child, declared, mode.group())?;
                    self.lower_required(child, mode, stack)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn required_target(&mut self, param: &Parameter) -> Result<SlotId, ConfigurationError> {
        match &param.kind {
            ParamKind::Binding(name) => self.bind_local(name, param.span),
            ParamKind::Destructure(_) if !self.kind.is_lenient() => {
                Err(ConfigurationError::DestructuringInMethod {
                    parameter: param.to_string(),
                    span: param.span,
                })
            }
            ParamKind::Destructure(_) => Ok(self.slots.synthetic_slot()),
        }
    }

    fn lower_optional(&mut self, optional: &OptionalParam) -> Result<(), ConfigurationError> {
        let param = &optional.param;
        let name = binding_name(param, GroupKind::Optional)?;
        // Compiled before the parameter itself is bound: a default never sees its own name.
        let default = self
            .defaults
            .compile_default(name, &optional.default, &self.bound)?;
        let target = self.bind_local(name, param.span)?;
        let index = self.spec.leading_count() + param.position;
        let step = BindStep::Optional {
            target,
            index,
            threshold: index + self.spec.trailing_count() + 1,
            default,
        };
        trace!(parameter = %param, %step, "optional");
        self.steps.push(step);
        Ok(())
    }

    fn lower_rest(&mut self, rest: &Parameter) -> Result<(), ConfigurationError> {
        let name = binding_name(rest, GroupKind::Rest)?;
        let target = self.bind_local(name, rest.span)?;
        let step = BindStep::Rest {
            target,
            start: self.spec.leading_count() + self.spec.optional_count(),
            reserved_tail: self.spec.trailing_count(),
        };
        trace!(parameter = %rest, %step, "rest");
        self.steps.push(step);
        Ok(())
    }

    fn lower_continuation(&mut self, block: &Parameter) -> Result<(), ConfigurationError> {
        let name = binding_name(block, GroupKind::Continuation)?;
        let target = self.bind_local(name, block.span)?;
        let step = BindStep::Continuation { target };
        trace!(parameter = %block, %step, "continuation");
        self.steps.push(step);
        Ok(())
    }

    fn bind_local(&mut self, name: &str, span: Span) -> Result<SlotId, ConfigurationError> {
        if !name.starts_with('_') && self.bound.contains(name) {
            return Err(ConfigurationError::DuplicateParameter {
                name: name.to_string(),
                span,
            });
        }
        let slot = self.slots.slot_for(name);
        self.bound.push(name, slot);
        Ok(slot)
    }
}

fn binding_name(param: &Parameter, group: GroupKind) -> Result<&str, ConfigurationError> {
    param
        .name()
        .ok_or_else(|| ConfigurationError::DestructuringNotAllowed {
            parameter: param.to_string(),
            group,
            span: param.span,
        })
}
