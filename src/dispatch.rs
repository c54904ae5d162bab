//! Cross-constructor dispatch.
//!
//! Per constructor, in declaration order: `(C, C)`, `(C, _)`, `(_, C)`.
//! Because arms are tried in order, `(C, _)` can only see a later right-hand
//! constructor and `(_, C)` only a later left-hand one, so n constructors
//! need 3n arms rather than n² pairs. The last constructor gets only its
//! `(C, C)` arm; its catch-alls could never match.
use crate::ir::{Dispatch, DispatchArm, Resolution};

pub fn build(constructor_count: usize) -> Dispatch {
    let mut arms = Vec::with_capacity(constructor_count * 3);
    for i in 0..constructor_count {
        arms.push(DispatchArm::Same(i));
        if i + 1 < constructor_count {
            arms.push(DispatchArm::LeftFirst(i));
            arms.push(DispatchArm::RightFirst(i));
        }
    }
    Dispatch { arms }
}

impl DispatchArm {
    fn matches(self, left: usize, right: usize) -> bool {
        match self {
            DispatchArm::Same(c) => left == c && right == c,
            DispatchArm::LeftFirst(c) => left == c,
            DispatchArm::RightFirst(c) => right == c,
        }
    }

    fn outcome(self) -> Resolution {
        match self {
            DispatchArm::Same(c) => Resolution::Same(c),
            DispatchArm::LeftFirst(_) => Resolution::Less,
            DispatchArm::RightFirst(_) => Resolution::Greater,
        }
    }
}

impl Dispatch {
    /// Walk the arms the way a `match` would.
    pub fn resolve(&self, left: usize, right: usize) -> Option<Resolution> {
        self.arms
            .iter()
            .find(|arm| arm.matches(left, right))
            .map(|arm| arm.outcome())
    }
}
