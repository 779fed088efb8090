use std::fmt;

/// A provisional per-frame decision that can be counted as a vote.
///
/// Implemented by every candidate type a classifier produces, so one
/// [`crate::TemporalStabilizer`] works for identity and expression streams
/// alike.
pub trait Ballot {
    /// What the vote is for. Two ballots with equal labels are the same vote.
    type Label: Eq + Clone + fmt::Debug;

    fn label(&self) -> Self::Label;

    /// Dissimilarity of the underlying match. Lower is better.
    fn distance(&self) -> f32;

    /// Confidence in `[0, 1]`. Higher is better.
    fn confidence(&self) -> f32;
}

/// Outcome of classifying one feature vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<C> {
    Match(C),
    /// Nothing trustworthy: too far, ambiguous, or no candidates at all.
    NoMatch,
}

impl<C> Verdict<C> {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match(_))
    }

    pub fn candidate(&self) -> Option<&C> {
        match self {
            Verdict::Match(c) => Some(c),
            Verdict::NoMatch => None,
        }
    }

    pub fn into_candidate(self) -> Option<C> {
        match self {
            Verdict::Match(c) => Some(c),
            Verdict::NoMatch => None,
        }
    }
}

impl<C> From<Option<C>> for Verdict<C> {
    fn from(c: Option<C>) -> Self {
        match c {
            Some(c) => Verdict::Match(c),
            None => Verdict::NoMatch,
        }
    }
}
