//! Applicability combinators: tests over a whole argument list, built from
//! registered predicates.
//!
//! Two applicabilities are equal iff they are the same combinator over the
//! same predicates (by the identity of their tests) in the same order. Stores rely on that equality to replace a rule's handler instead of
//! adding a second rule.
//!
//! Every combinator is pure: the same applicability applied to the same
//! arguments always gives the same answer, which is what makes handler
//! caching sound.

use std::fmt;

use crate::error::PredicateResult;
use crate::predicate::{Predicate, PredicateFn, PredicateRegistry};
use crate::value::Value;

/// Which combinator an [`Applicability`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicabilityKind {
    /// Argument `i` satisfies predicate `i`; the argument count must equal
    /// the predicate count.
    MatchArgs,
    /// Every argument (any count) satisfies the predicate.
    AllMatch,
    /// At least one argument satisfies the predicate.
    OneOfArgsMatch,
    /// Exactly one argument, accepted by any of the predicates.
    MatchOneOfPreds,
}

impl ApplicabilityKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::MatchArgs => "match_args",
            Self::AllMatch => "all_match",
            Self::OneOfArgsMatch => "one_of_args_match",
            Self::MatchOneOfPreds => "match_one_of_preds",
        }
    }
}

impl fmt::Display for ApplicabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A combinator over an ordered list of predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Applicability {
    kind: ApplicabilityKind,
    predicates: Vec<Predicate>,
}

impl Applicability {
    pub fn match_args(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            kind: ApplicabilityKind::MatchArgs,
            predicates: predicates.into_iter().collect(),
        }
    }

    pub fn all_match(predicate: Predicate) -> Self {
        Self {
            kind: ApplicabilityKind::AllMatch,
            predicates: vec![predicate],
        }
    }

    pub fn one_of_args_match(predicate: Predicate) -> Self {
        Self {
            kind: ApplicabilityKind::OneOfArgsMatch,
            predicates: vec![predicate],
        }
    }

    pub fn match_one_of_preds(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self {
            kind: ApplicabilityKind::MatchOneOfPreds,
            predicates: predicates.into_iter().collect(),
        }
    }

    /// [`match_args`](Self::match_args) over raw tests, resolved through `registry`.
    ///
    /// Fails with `UnregisteredPredicate` before anything is built.
    pub fn match_args_of(registry: &PredicateRegistry, tests: &[PredicateFn]) -> PredicateResult<Self> {
        Ok(Self::match_args(registry.resolve_tests(tests)?))
    }

    pub fn all_match_of(registry: &PredicateRegistry, test: &PredicateFn) -> PredicateResult<Self> {
        let mut resolved = registry.resolve_tests(std::slice::from_ref(test))?;
        Ok(Self::all_match(resolved.remove(0)))
    }

    pub fn one_of_args_match_of(
        registry: &PredicateRegistry,
        test: &PredicateFn,
    ) -> PredicateResult<Self> {
        let mut resolved = registry.resolve_tests(std::slice::from_ref(test))?;
        Ok(Self::one_of_args_match(resolved.remove(0)))
    }

    pub fn match_one_of_preds_of(
        registry: &PredicateRegistry,
        tests: &[PredicateFn],
    ) -> PredicateResult<Self> {
        Ok(Self::match_one_of_preds(registry.resolve_tests(tests)?))
    }

    /// [`match_args`](Self::match_args) over predicate names.
    pub fn match_args_named(registry: &PredicateRegistry, names: &[&str]) -> PredicateResult<Self> {
        Ok(Self::match_args(registry.resolve_names(names)?))
    }

    pub fn kind(&self) -> ApplicabilityKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether this applicability accepts `args`.
    pub fn test(&self, args: &[Value]) -> bool {
        let preds = &self.predicates;
        match self.kind {
            ApplicabilityKind::MatchArgs => {
                args.len() == preds.len()
                    && preds.iter().zip(args).all(|(p, arg)| p.execute(arg))
            }
            ApplicabilityKind::AllMatch => {
                args.iter().all(|arg| preds.iter().all(|p| p.execute(arg)))
            }
            ApplicabilityKind::OneOfArgsMatch => {
                args.iter().any(|arg| preds.iter().all(|p| p.execute(arg)))
            }
            ApplicabilityKind::MatchOneOfPreds => match args {
                [arg] => preds.iter().any(|p| p.execute(arg)),
                _ => false,
            },
        }
    }

    /// `"<kind> predicates: p1, p2"`.
    pub fn summary(&self) -> String {
        let preds: Vec<String> = self.predicates.iter().map(Predicate::summary).collect();
        format!("{} predicates: {}", self.name(), preds.join(", "))
    }

    /// Summary with each predicate's outcome on the argument(s) it inspects.
    pub fn summary_with_args(&self, args: &[Value]) -> String {
        let mut lines = vec![format!("{} predicates:", self.name())];
        match self.kind {
            ApplicabilityKind::MatchArgs => {
                for (i, p) in self.predicates.iter().enumerate() {
                    match args.get(i) {
                        Some(arg) => lines.push(p.summary_with_arg(arg)),
                        None => lines.push(format!("{} arg: <missing>", p.summary())),
                    }
                }
            }
            _ => {
                for p in &self.predicates {
                    for arg in args {
                        lines.push(p.summary_with_arg(arg));
                    }
                }
            }
        }
        lines.join("\n")
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
