use crate::language::{
    ast::{CallableKind, Expr, OptionalParam, ParamSpec, Parameter},
    lower::{lower_parameters, CompiledExpr, LocalExprCompiler},
    plan::BindPlan,
    span::{Span, Spanned},
};
use crate::parser::{parse_arguments, parse_signature};
use crate::runtime::{
    environment::{Frame, FrameDescriptor},
    error::RuntimeResult,
    interpreter::{bind_arguments, Call, Host, Interpreter},
    value::Value,
};
use proptest::prelude::*;

const DEFAULT_BASE: i64 = 1_000;

#[derive(Clone, Copy, Debug)]
struct Shape {
    leading: usize,
    optional: usize,
    trailing: usize,
    rest: bool,
}

impl Shape {
    fn fixed(&self) -> usize {
        self.leading + self.optional + self.trailing
    }
}

fn shape() -> impl Strategy<Value = Shape> {
    (0usize..4, 0usize..3, 0usize..4, any::<bool>()).prop_map(
        |(leading, optional, trailing, rest)| Shape {
            leading,
            optional,
            trailing,
            rest,
        },
    )
}

fn numbered(prefix: &str, count: usize) -> Vec<Parameter> {
    (0..count)
        .map(|position| Parameter::binding(format!("{prefix}{position}"), position))
        .collect()
}

fn spec_for(shape: Shape) -> ParamSpec {
    ParamSpec {
        leading_required: numbered("l", shape.leading),
        optional: (0..shape.optional)
            .map(|position| OptionalParam {
                param: Parameter::binding(format!("o{position}"), position),
                default: Spanned::new(
                    Expr::Integer(DEFAULT_BASE + position as i64),
                    Span::default(),
                ),
            })
            .collect(),
        trailing_required: numbered("t", shape.trailing),
        rest: shape.rest.then(|| Parameter::binding("rest", 0)),
        continuation: None,
    }
}

fn lower(shape: Shape, kind: CallableKind) -> (BindPlan<CompiledExpr>, FrameDescriptor) {
    let mut descriptor = FrameDescriptor::new();
    let plan = lower_parameters(
        &spec_for(shape),
        kind,
        &mut descriptor,
        &mut LocalExprCompiler::new(),
    )
    .expect("generated parameter lists are well formed");
    (plan, descriptor)
}

struct CountingHost {
    evaluations: usize,
}

impl Host<CompiledExpr> for CountingHost {
    fn eval_default(&mut self, default: &CompiledExpr, frame: &Frame) -> RuntimeResult<Value> {
        self.evaluations += 1;
        Interpreter::new().evaluate(default, frame)
    }
}

struct Bound {
    frame: Frame,
    descriptor: FrameDescriptor,
    evaluations: usize,
}

impl Bound {
    fn local(&self, name: &str) -> Value {
        let slot = self
            .descriptor
            .find_slot(name)
            .unwrap_or_else(|| panic!("`{name}` has no slot"));
        self.frame.value(slot)
    }
}

fn args(actual: usize) -> Vec<Value> {
    (0..actual as i64).map(Value::Int).collect()
}

fn bind_block(shape: Shape, actual: usize) -> Bound {
    let (plan, descriptor) = lower(shape, CallableKind::Block);
    let args = args(actual);
    let mut frame = descriptor.new_frame();
    let mut host = CountingHost { evaluations: 0 };
    bind_arguments(&plan, Call::new(&args), &mut frame, &mut host)
        .expect("blocks accept any argument count");
    Bound {
        frame,
        descriptor,
        evaluations: host.evaluations,
    }
}

proptest! {
    #[test]
    fn fixed_reads_match_declared_counts(shape in shape()) {
        for kind in [CallableKind::Method, CallableKind::Block] {
            let (plan, _) = lower(shape, kind);
            let fixed = plan.steps().iter().filter(|step| step.is_fixed_read()).count();
            prop_assert_eq!(fixed, shape.fixed());
            prop_assert_eq!(plan.leading_count(), shape.leading);
            prop_assert_eq!(plan.optional_count(), shape.optional);
            prop_assert_eq!(plan.trailing_count(), shape.trailing);
            prop_assert_eq!(plan.has_rest(), shape.rest);
        }
    }

    #[test]
    fn trailing_parameters_take_the_last_arguments(shape in shape(), extra in 0usize..8) {
        let actual = shape.trailing + extra;
        let bound = bind_block(shape, actual);
        for index in 0..shape.trailing {
            let expected = (actual - shape.trailing + index) as i64;
            prop_assert_eq!(bound.local(&format!("t{index}")), Value::Int(expected));
        }
    }

    #[test]
    fn optional_binds_only_when_enough_arguments_remain(shape in shape(), actual in 0usize..12) {
        let bound = bind_block(shape, actual);
        let mut defaulted = 0;
        for index in 0..shape.optional {
            let absolute = shape.leading + index;
            let expected = if actual >= absolute + shape.trailing + 1 {
                Value::Int(absolute as i64)
            } else {
                defaulted += 1;
                Value::Int(DEFAULT_BASE + index as i64)
            };
            prop_assert_eq!(bound.local(&format!("o{index}")), expected);
        }
        prop_assert_eq!(bound.evaluations, defaulted);
    }

    #[test]
    fn rest_captures_the_unclaimed_middle(shape in shape(), actual in 0usize..12) {
        prop_assume!(shape.rest);
        let bound = bind_block(shape, actual);
        let start = shape.leading + shape.optional;
        let expected: Vec<Value> = (start..actual.saturating_sub(shape.trailing))
            .map(|index| Value::Int(index as i64))
            .collect();
        prop_assert_eq!(expected.len(), actual.saturating_sub(shape.fixed()));
        prop_assert_eq!(bound.local("rest"), Value::Array(expected));
    }

    #[test]
    fn methods_bind_exactly_the_accepted_counts(shape in shape(), actual in 0usize..12) {
        let (plan, descriptor) = lower(shape, CallableKind::Method);
        let required = shape.leading + shape.trailing;
        let accepted = actual >= required && (shape.rest || actual <= shape.fixed());
        let mut frame = descriptor.new_frame();
        let result = plan.bind(Call::new(&args(actual)), &mut frame, &mut Interpreter::new());
        match result {
            Ok(()) => {
                prop_assert!(accepted);
                let bound = Bound {
                    frame,
                    descriptor,
                    evaluations: 0,
                };
                for index in 0..shape.trailing {
                    let expected = (actual - shape.trailing + index) as i64;
                    prop_assert_eq!(bound.local(&format!("t{index}")), Value::Int(expected));
                }
                for index in 0..shape.optional {
                    let absolute = shape.leading + index;
                    let expected = if actual >= absolute + shape.trailing + 1 {
                        Value::Int(absolute as i64)
                    } else {
                        Value::Int(DEFAULT_BASE + index as i64)
                    };
                    prop_assert_eq!(bound.local(&format!("o{index}")), expected);
                }
                for index in 0..shape.leading {
                    prop_assert_eq!(bound.local(&format!("l{index}")), Value::Int(index as i64));
                }
            }
            Err(err) => {
                prop_assert!(!accepted);
                prop_assert!(err.is_arity_error());
            }
        }
    }

    #[test]
    fn parsers_never_panic_on_arbitrary_text(
        input in prop::collection::vec(any::<char>(), 0..256)
            .prop_map(|chars| chars.into_iter().collect::<String>())
    ) {
        let _ = parse_signature(&input);
        let _ = parse_arguments(&input);
    }
}
