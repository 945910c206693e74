use super::*;
use crate::language::{
    ast::{Expr, OptionalParam},
    span::Spanned,
};
use crate::parser::parse_signature;
use crate::runtime::environment::FrameDescriptor;

fn spec_of(source: &str) -> (ParamSpec, CallableKind) {
    let signature = parse_signature(source).expect("signature parses");
    let kind = signature.kind;
    (signature.into_spec().expect("well-formed parameters"), kind)
}

fn lower(source: &str) -> Result<(BindPlan<CompiledExpr>, FrameDescriptor), ConfigurationError> {
    let (spec, kind) = spec_of(source);
    let mut descriptor = FrameDescriptor::new();
    let plan = lower_parameters(&spec, kind, &mut descriptor, &mut LocalExprCompiler::new())?;
    Ok((plan, descriptor))
}

fn slot(descriptor: &FrameDescriptor, name: &str) -> SlotId {
    descriptor
        .find_slot(name)
        .unwrap_or_else(|| panic!("no slot for `{name}`"))
}

#[test]
fn fixed_reads_match_group_counts() {
    let (plan, _) = lower("(a, b, c = 1, d = 2, *rest, e, &blk)").expect("lower");
    let fixed = plan.steps().iter().filter(|step| step.is_fixed_read()).count();
    assert_eq!(
        fixed,
        plan.leading_count() + plan.optional_count() + plan.trailing_count()
    );
    assert_eq!(
        (
            plan.leading_count(),
            plan.optional_count(),
            plan.trailing_count()
        ),
        (2, 2, 1)
    );
    assert!(plan.has_rest());
}

#[test]
fn method_plan_opens_with_arity_check() {
    let (plan, _) = lower("(a, b = 1, *rest, c)").expect("lower");
    assert_eq!(
        plan.steps().first(),
        Some(&BindStep::CheckArity(Arity {
            required: 2,
            optional: 1,
            rest: true,
        }))
    );

    let (plan, _) = lower("|a, b = 1, *rest, c|").expect("lower");
    assert!(
        !plan
            .steps()
            .iter()
            .any(|step| matches!(step, BindStep::CheckArity(_))),
        "blocks never reject a call outright"
    );
}

#[test]
fn optional_thresholds_leave_room_for_trailing() {
    let (plan, descriptor) = lower("(a, b = 1, c = 2, *r, d, e)").expect("lower");
    let optionals: Vec<_> = plan
        .steps()
        .iter()
        .filter_map(|step| match step {
            BindStep::Optional {
                target,
                index,
                threshold,
                ..
            } => Some((*target, *index, *threshold)),
            _ => None,
        })
        .collect();
    assert_eq!(
        optionals,
        vec![
            (slot(&descriptor, "b"), 1, 4),
            (slot(&descriptor, "c"), 2, 5),
        ]
    );
}

#[test]
fn trailing_reads_count_back_from_the_end() {
    let (plan, descriptor) = lower("(a, *r, d, e)").expect("lower");
    let trailing: Vec<_> = plan
        .steps()
        .iter()
        .filter_map(|step| match step {
            BindStep::EndOffset {
                target,
                index,
                from_end,
                on_missing,
            } => Some((*target, *index, *from_end, *on_missing)),
            _ => None,
        })
        .collect();
    assert_eq!(
        trailing,
        vec![
            (slot(&descriptor, "d"), 0, 2, OnMissing::ArityError),
            (slot(&descriptor, "e"), 1, 1, OnMissing::ArityError),
        ]
    );
    assert!(plan.steps().contains(&BindStep::Rest {
        target: slot(&descriptor, "r"),
        start: 1,
        reserved_tail: 2,
    }));
}

#[test]
fn block_reads_substitute_nil() {
    let (plan, descriptor) = lower("|a, b|").expect("lower");
    assert_eq!(
        plan.steps(),
        &[
            BindStep::Positional {
                target: slot(&descriptor, "a"),
                index: 0,
                on_missing: OnMissing::Nil,
            },
            BindStep::Positional {
                target: slot(&descriptor, "b"),
                index: 1,
                on_missing: OnMissing::Nil,
            },
        ]
    );
}

#[test]
fn nested_groups_read_from_the_innermost_array() {
    let (plan, descriptor) = lower("|(a, (b, c)), d|").expect("lower");
    let outer = SlotId::new(0);
    let inner = SlotId::new(2);
    assert!(descriptor.is_synthetic(outer));
    assert!(descriptor.is_synthetic(inner));
    assert_eq!(
        plan.steps(),
        &[
            BindStep::Positional {
                target: outer,
                index: 0,
                on_missing: OnMissing::Nil,
            },
            BindStep::Coerce { slot: outer },
            BindStep::Element {
                target: slot(&descriptor, "a"),
                array: outer,
                index: 0,
            },
            BindStep::Element {
                target: inner,
                array: outer,
                index: 1,
            },
            BindStep::Coerce { slot: inner },
            BindStep::Element {
                target: slot(&descriptor, "b"),
                array: inner,
                index: 0,
            },
            BindStep::Element {
                target: slot(&descriptor, "c"),
                array: inner,
                index: 1,
            },
            BindStep::Positional {
                target: slot(&descriptor, "d"),
                index: 1,
                on_missing: OnMissing::Nil,
            },
        ]
    );
}

#[test]
fn trailing_group_is_read_from_the_end_before_destructuring() {
    let (plan, descriptor) = lower("|*r, (a, b)|").expect("lower");
    let group = SlotId::new(0);
    assert_eq!(
        &plan.steps()[..4],
        &[
            BindStep::EndOffset {
                target: group,
                index: 0,
                from_end: 1,
                on_missing: OnMissing::Nil,
            },
            BindStep::Coerce { slot: group },
            BindStep::Element {
                target: slot(&descriptor, "a"),
                array: group,
                index: 0,
            },
            BindStep::Element {
                target: slot(&descriptor, "b"),
                array: group,
                index: 1,
            },
        ]
    );
}

#[test]
fn destructuring_contexts_are_balanced() {
    let (spec, kind) = spec_of("|(a, (b, (c, d))), e, (f, g)|");
    let mut stack = DestructureStack::new();
    lower_with_stack(
        &spec,
        kind,
        &mut FrameDescriptor::new(),
        &mut LocalExprCompiler::new(),
        &mut stack,
    )
    .expect("lower");
    assert!(stack.is_empty());
    assert_eq!(stack.deepest(), 3);
}

#[test]
fn failed_lowering_still_pops_contexts() {
    let (spec, kind) = spec_of("|(a, (b, a))|");
    let mut stack = DestructureStack::new();
    let err = lower_with_stack(
        &spec,
        kind,
        &mut FrameDescriptor::new(),
        &mut LocalExprCompiler::new(),
        &mut stack,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::DuplicateParameter { ref name, .. } if name == "a"));
    assert!(stack.is_empty());
}

#[test]
fn methods_reject_destructuring() {
    let err = lower("((a, b), c)").unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::DestructuringInMethod { ref parameter, .. } if parameter == "(a, b)"
    ));
}

#[test]
fn underscore_names_may_repeat() {
    assert!(lower("|_, _, x|").is_ok());
    assert!(matches!(
        lower("(x, y, x)").unwrap_err(),
        ConfigurationError::DuplicateParameter { ref name, .. } if name == "x"
    ));
}

#[test]
fn defaults_only_see_earlier_parameters() {
    assert!(lower("(a, b = a + 1, c = [a, b])").is_ok());

    let err = lower("(a, b = c, c = 1)").unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::UnresolvedName { ref parameter, ref name, .. }
            if parameter == "b" && name == "c"
    ));

    let err = lower("(a = a)").unwrap_err();
    assert!(matches!(err, ConfigurationError::UnresolvedName { .. }));
}

#[test]
fn recorded_positions_must_match_declaration_order() {
    let spec = ParamSpec {
        leading_required: vec![Parameter::binding("a", 0), Parameter::binding("b", 3)],
        ..ParamSpec::new()
    };
    let err = lower_parameters(
        &spec,
        CallableKind::Method,
        &mut FrameDescriptor::new(),
        &mut LocalExprCompiler::new(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::PositionMismatch {
            parameter: "b".into(),
            group: GroupKind::LeadingRequired,
            recorded: 3,
            declared: 1,
            span: Span::default(),
        }
    );
}

#[test]
fn only_required_groups_destructure() {
    let spec = ParamSpec {
        optional: vec![OptionalParam {
            param: Parameter::destructure(vec![Parameter::binding("a", 0)], 0),
            default: Spanned::new(Expr::Nil, Span::default()),
        }],
        ..ParamSpec::new()
    };
    let err = lower_parameters(
        &spec,
        CallableKind::Block,
        &mut FrameDescriptor::new(),
        &mut LocalExprCompiler::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::DestructuringNotAllowed {
            group: GroupKind::Optional,
            ..
        }
    ));
}

#[derive(Default)]
struct RecordingCompiler {
    seen: Vec<(String, Vec<String>)>,
}

impl DefaultCompiler for RecordingCompiler {
    type Output = String;

    fn compile_default(
        &mut self,
        parameter: &str,
        expr: &Spanned<Expr>,
        locals: &BoundLocals,
    ) -> Result<String, ConfigurationError> {
        self.seen.push((
            parameter.to_string(),
            locals.names().map(str::to_string).collect(),
        ));
        Ok(expr.node.as_source())
    }
}

#[test]
fn default_compiler_sees_locals_in_declaration_order() {
    let (spec, kind) = spec_of("|(a, b), c = a, d = c * 2, *rest, e|");
    let mut compiler = RecordingCompiler::default();
    let plan = lower_parameters(&spec, kind, &mut FrameDescriptor::new(), &mut compiler)
        .expect("lower");
    assert_eq!(
        compiler.seen,
        vec![
            ("c".to_string(), vec!["a".to_string(), "b".to_string()]),
            (
                "d".to_string(),
                vec!["a".to_string(), "b".to_string(), "c".to_string()]
            ),
        ]
    );
    let defaults: Vec<&str> = plan
        .steps()
        .iter()
        .filter_map(|step| match step {
            BindStep::Optional { default, .. } => Some(default.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(defaults, vec!["a", "c * 2"]);
}
