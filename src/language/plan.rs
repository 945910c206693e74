use crate::language::ast::CallableKind;
use crate::runtime::environment::SlotId;
use std::fmt;

/// What a required read does when the call supplied too few arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnMissing {
    Nil,
    ArityError,
}

/// Accepted argument counts of a callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arity {
    pub required: usize,
    pub optional: usize,
    pub rest: bool,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required && (self.rest || count <= self.required + self.optional)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rest {
            write!(f, "{}+", self.required)
        } else if self.optional > 0 {
            write!(f, "{}..{}", self.required, self.required + self.optional)
        } else {
            write!(f, "{}", self.required)
        }
    }
}

/// One instruction of a [`BindPlan`]. `D` is whatever the default-value
/// compiler produced for optional parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum BindStep<D> {
    /// Rejects the call up front when the argument count is out of range.
    CheckArity(Arity),
    /// `args[index]`.
    Positional {
        target: SlotId,
        index: usize,
        on_missing: OnMissing,
    },
    /// `args[actual - from_end]`, where `from_end = trailing_count - index`.
    EndOffset {
        target: SlotId,
        index: usize,
        from_end: usize,
        on_missing: OnMissing,
    },
    /// `args[index]` when `actual >= threshold`, otherwise `default`.
    Optional {
        target: SlotId,
        index: usize,
        threshold: usize,
        default: D,
    },
    /// `args[start .. actual - reserved_tail]`, empty when that span is not positive.
    Rest {
        target: SlotId,
        start: usize,
        reserved_tail: usize,
    },
    Continuation {
        target: SlotId,
    },
    /// Replaces the value in `slot` with its sequence form. Emitted once per
    /// destructuring group, before any of its elements are read.
    Coerce {
        slot: SlotId,
    },
    /// Element `index` of the coerced array held in `array`; nil when absent.
    Element {
        target: SlotId,
        array: SlotId,
        index: usize,
    },
}

impl<D> BindStep<D> {
    /// Reads a fixed-position top-level argument.
    pub fn is_fixed_read(&self) -> bool {
        matches!(
            self,
            BindStep::Positional { .. } | BindStep::EndOffset { .. } | BindStep::Optional { .. }
        )
    }
}

impl<D> fmt::Display for BindStep<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindStep::CheckArity(arity) => write!(f, "check-arity {arity}"),
            BindStep::Positional {
                target,
                index,
                on_missing,
            } => {
                let missing = match on_missing {
                    OnMissing::Nil => "nil",
                    OnMissing::ArityError => "error",
                };
                write!(f, "{target} = args[{index}] (missing: {missing})")
            }
            BindStep::EndOffset {
                target, from_end, ..
            } => write!(f, "{target} = args[-{from_end}]"),
            BindStep::Optional {
                target,
                index,
                threshold,
                ..
            } => write!(
                f,
                "{target} = args[{index}] if given >= {threshold} else default"
            ),
            BindStep::Rest {
                target,
                start,
                reserved_tail,
            } => write!(f, "{target} = args[{start}..-{reserved_tail}]"),
            BindStep::Continuation { target } => write!(f, "{target} = block"),
            BindStep::Coerce { slot } => write!(f, "{slot} = to_sequence({slot})"),
            BindStep::Element {
                target,
                array,
                index,
            } => write!(f, "{target} = {array}[{index}]"),
        }
    }
}

/// Lowered parameter binding of one callable. Built once, then replayed
/// unchanged for every call.
#[derive(Clone, Debug, PartialEq)]
pub struct BindPlan<D> {
    kind: CallableKind,
    steps: Vec<BindStep<D>>,
    leading_count: usize,
    optional_count: usize,
    trailing_count: usize,
    has_rest: bool,
}

impl<D> BindPlan<D> {
    pub(crate) fn new(
        kind: CallableKind,
        steps: Vec<BindStep<D>>,
        leading_count: usize,
        optional_count: usize,
        trailing_count: usize,
        has_rest: bool,
    ) -> Self {
        Self {
            kind,
            steps,
            leading_count,
            optional_count,
            trailing_count,
            has_rest,
        }
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn steps(&self) -> &[BindStep<D>] {
        &self.steps
    }

    pub fn leading_count(&self) -> usize {
        self.leading_count
    }

    pub fn optional_count(&self) -> usize {
        self.optional_count
    }

    pub fn trailing_count(&self) -> usize {
        self.trailing_count
    }

    pub fn has_rest(&self) -> bool {
        self.has_rest
    }

    pub fn arity(&self) -> Arity {
        Arity {
            required: self.leading_count + self.trailing_count,
            optional: self.optional_count,
            rest: self.has_rest,
        }
    }
}

impl<D> fmt::Display for BindPlan<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{idx:>3}: {step}")?;
        }
        Ok(())
    }
}
