//! Convergence evaluators.
//!
//! An evaluator decides, from one poll's aggregate counts, whether the
//! declared capacity has been reached. Two strategies exist:
//!
//! - **Create** treats every bound as a minimum ("at least").
//! - **Update** only checks dimensions with a positive desired count, and
//!   requires an exact match.
//!
//! Which one applies is the caller's choice (create vs. update workflow).

use capwait_core::CapacityBounds;
use capwait_health::CapacityCounts;

/// Result of evaluating one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Satisfied,
    Unsatisfied { reason: String },
}

impl Decision {
    pub fn unsatisfied(reason: impl Into<String>) -> Self {
        Decision::Unsatisfied {
            reason: reason.into(),
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Decision::Satisfied)
    }

    /// Why the decision is unsatisfied; empty when satisfied.
    pub fn reason(&self) -> &str {
        match self {
            Decision::Satisfied => "",
            Decision::Unsatisfied { reason } => reason,
        }
    }
}

/// Pluggable convergence predicate over aggregate counts.
pub trait Evaluate {
    fn evaluate(&self, counts: CapacityCounts) -> Decision;
}

impl<F> Evaluate for F
where
    F: Fn(CapacityCounts) -> Decision,
{
    fn evaluate(&self, counts: CapacityCounts) -> Decision {
        self(counts)
    }
}

/// "At least" semantics, used while bringing a new group up to capacity.
///
/// Positive desired counts override the corresponding minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationEvaluator {
    bounds: CapacityBounds,
}

impl CreationEvaluator {
    pub fn new(bounds: CapacityBounds) -> Self {
        Self { bounds }
    }
}

impl Evaluate for CreationEvaluator {
    fn evaluate(&self, counts: CapacityCounts) -> Decision {
        let min_members = self.bounds.effective_min_members();
        if counts.members < min_members {
            return Decision::unsatisfied(format!(
                "Need at least {min_members} healthy instances in ASG, have {}",
                counts.members
            ));
        }

        let min_attached = self.bounds.effective_min_attached();
        if counts.attached_healthy < min_attached {
            return Decision::unsatisfied(format!(
                "Need at least {min_attached} healthy instances in ELB, have {}",
                counts.attached_healthy
            ));
        }

        Decision::Satisfied
    }
}

/// "Exactly" semantics, used when reconciling an existing group to a new size.
///
/// A desired count of zero skips that dimension entirely. This cannot be
/// told apart from a caller that really wants zero members or zero
/// attached members; such a caller should use a scale-down wait instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateEvaluator {
    bounds: CapacityBounds,
}

impl UpdateEvaluator {
    pub fn new(bounds: CapacityBounds) -> Self {
        Self { bounds }
    }
}

impl Evaluate for UpdateEvaluator {
    fn evaluate(&self, counts: CapacityCounts) -> Decision {
        let want_members = self.bounds.desired_members;
        if want_members > 0 && counts.members != want_members {
            return Decision::unsatisfied(format!(
                "Need exactly {want_members} healthy instances in ASG, have {}",
                counts.members
            ));
        }

        let want_attached = self.bounds.desired_attached;
        if want_attached > 0 && counts.attached_healthy != want_attached {
            return Decision::unsatisfied(format!(
                "Need exactly {want_attached} healthy instances in ELB, have {}",
                counts.attached_healthy
            ));
        }

        Decision::Satisfied
    }
}

/// The two built-in strategies behind one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Create(CreationEvaluator),
    Update(UpdateEvaluator),
}

impl Convergence {
    pub fn create(bounds: CapacityBounds) -> Self {
        Convergence::Create(CreationEvaluator::new(bounds))
    }

    pub fn update(bounds: CapacityBounds) -> Self {
        Convergence::Update(UpdateEvaluator::new(bounds))
    }
}

impl Evaluate for Convergence {
    fn evaluate(&self, counts: CapacityCounts) -> Decision {
        match self {
            Convergence::Create(e) => e.evaluate(counts),
            Convergence::Update(e) => e.evaluate(counts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min: u32, desired: u32, min_attached: u32, desired_attached: u32) -> CapacityBounds {
        CapacityBounds {
            min_members: min,
            desired_members: desired,
            min_attached,
            desired_attached,
        }
    }

    #[test]
    fn create_min_only_ignores_attached() {
        let e = CreationEvaluator::new(bounds(3, 0, 0, 0));

        assert!(!e.evaluate(CapacityCounts::new(2, 2)).is_satisfied());
        assert!(e.evaluate(CapacityCounts::new(3, 0)).is_satisfied());
        assert!(e.evaluate(CapacityCounts::new(7, 0)).is_satisfied());
    }

    #[test]
    fn create_desired_overrides_min() {
        let e = CreationEvaluator::new(bounds(2, 5, 0, 0));

        let decision = e.evaluate(CapacityCounts::new(4, 4));
        assert_eq!(
            decision,
            Decision::unsatisfied("Need at least 5 healthy instances in ASG, have 4")
        );
        assert!(e.evaluate(CapacityCounts::new(5, 0)).is_satisfied());
    }

    #[test]
    fn create_checks_attached_after_members() {
        let e = CreationEvaluator::new(bounds(2, 0, 1, 2));

        let decision = e.evaluate(CapacityCounts::new(1, 0));
        assert!(decision.reason().contains("in ASG"));

        let decision = e.evaluate(CapacityCounts::new(2, 1));
        assert_eq!(
            decision,
            Decision::unsatisfied("Need at least 2 healthy instances in ELB, have 1")
        );

        assert!(e.evaluate(CapacityCounts::new(2, 2)).is_satisfied());
    }

    #[test]
    fn create_with_no_bounds_is_satisfied_immediately() {
        let e = CreationEvaluator::new(CapacityBounds::default());
        assert!(e.evaluate(CapacityCounts::default()).is_satisfied());
    }

    #[test]
    fn update_skips_zero_desired_attached() {
        let e = UpdateEvaluator::new(bounds(0, 4, 0, 0));
        assert!(e.evaluate(CapacityCounts::new(4, 1)).is_satisfied());
    }

    #[test]
    fn update_requires_exact_member_count() {
        let e = UpdateEvaluator::new(bounds(0, 4, 0, 0));

        let decision = e.evaluate(CapacityCounts::new(3, 3));
        assert!(!decision.is_satisfied());
        assert!(decision.reason().contains('4'));
        assert!(decision.reason().contains('3'));

        // Overshooting is also a mismatch.
        let decision = e.evaluate(CapacityCounts::new(5, 5));
        assert_eq!(
            decision,
            Decision::unsatisfied("Need exactly 4 healthy instances in ASG, have 5")
        );
    }

    #[test]
    fn update_ignores_minimums() {
        let e = UpdateEvaluator::new(bounds(10, 0, 10, 0));
        assert!(e.evaluate(CapacityCounts::new(1, 0)).is_satisfied());
    }

    #[test]
    fn update_checks_attached_when_desired() {
        let e = UpdateEvaluator::new(bounds(0, 3, 0, 2));

        assert_eq!(
            e.evaluate(CapacityCounts::new(3, 3)),
            Decision::unsatisfied("Need exactly 2 healthy instances in ELB, have 3")
        );
        assert!(e.evaluate(CapacityCounts::new(3, 2)).is_satisfied());
    }

    #[test]
    fn convergence_dispatches_to_strategy() {
        let b = bounds(0, 2, 0, 0);
        let counts = CapacityCounts::new(3, 3);

        assert!(Convergence::create(b).evaluate(counts).is_satisfied());
        assert!(!Convergence::update(b).evaluate(counts).is_satisfied());
    }

    #[test]
    fn closures_are_evaluators() {
        let at_least_one = |c: CapacityCounts| {
            if c.members >= 1 {
                Decision::Satisfied
            } else {
                Decision::unsatisfied("empty")
            }
        };
        assert!(at_least_one.evaluate(CapacityCounts::new(1, 0)).is_satisfied());
        assert_eq!(at_least_one.evaluate(CapacityCounts::default()).reason(), "empty");
    }
}
