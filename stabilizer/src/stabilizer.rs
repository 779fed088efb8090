use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::verdict::{Ballot, Verdict};

/// Configuration for [`TemporalStabilizer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Number of most recent verdicts kept in the vote window (default: 8).
    pub history: usize,
    /// Votes a new label needs inside the window before the stable label
    /// switches to it (default: 5).
    pub quorum: usize,
    /// Minimum confidence for the stable label to be surfaced (default: 0.5).
    pub min_display: f32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            history: 8,
            quorum: 5,
            min_display: 0.5,
        }
    }
}

impl StabilizerConfig {
    /// Replaces out-of-range values with usable ones.
    ///
    /// A zero window falls back to 8, a zero quorum to 5, and a quorum larger
    /// than the window is capped at the window size so a switch stays possible.
    pub fn with_defaults(mut self) -> Self {
        if self.history == 0 {
            self.history = 8;
        }
        if self.quorum == 0 {
            self.quorum = 5;
        }
        if self.quorum > self.history {
            self.quorum = self.history;
        }
        if !(0.0..=1.0).contains(&self.min_display) {
            self.min_display = 0.5;
        }
        self
    }
}

/// Externally visible state of a stabilized stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStatus {
    /// No stable label yet, or the previous one decayed.
    Unset,
    /// A stable label is set and surfaced.
    Stable,
    /// A stable label is set but its confidence is below the display threshold.
    Gated,
}

impl fmt::Display for LabelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Stable => write!(f, "stable"),
            Self::Gated => write!(f, "gated"),
        }
    }
}

/// Output of [`TemporalStabilizer::feed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stabilized<L> {
    /// Label surfaced to callers. `None` means unknown: either no stable
    /// label or one below the display threshold.
    pub label: Option<L>,
    /// Internal stable label, regardless of display gating.
    pub stable: Option<L>,
    /// Running confidence of the stable label, 0 when unset.
    pub confidence: f32,
    /// Votes for the stable label currently in the window.
    pub votes: usize,
    /// Occupied window slots.
    pub filled: usize,
    /// The stable label changed on this verdict.
    pub changed: bool,
    pub status: LabelStatus,
}

#[derive(Debug, Clone)]
struct Vote<L> {
    /// `None` is the "unknown" vote cast by `NoMatch`.
    label: Option<L>,
    distance: f32,
    confidence: f32,
}

#[derive(Debug, Clone)]
struct Current<L> {
    label: L,
    confidence: f32,
}

struct Tally<'a, L> {
    label: &'a Option<L>,
    count: usize,
    distance_sum: f64,
    confidence_sum: f64,
    /// Position of the newest vote for this label, oldest = 0.
    last_seen: usize,
}

impl<L> Tally<'_, L> {
    fn mean_distance(&self) -> f64 {
        self.distance_sum / self.count as f64
    }

    fn mean_confidence(&self) -> f64 {
        self.confidence_sum / self.count as f64
    }
}

/// Turns a stream of per-frame verdicts into one stable label.
///
/// # Algorithm
///
/// The stabilizer keeps the last `history` verdicts in a circular buffer.
/// `NoMatch` counts as a vote for "unknown". On each [`feed`] it tallies the
/// window and picks a winner: most votes, then lowest mean distance, then
/// highest mean confidence, then the most recent vote.
///
/// - Winner equals the stable label: refresh its confidence.
/// - Winner differs: switch only if it holds at least `quorum` votes.
///   A winning "unknown" with quorum clears the stable label.
/// - Stable label absent from the whole window: clear it (decay).
///
/// A stable label whose confidence is below `min_display` is reported as
/// unknown, but kept internally.
///
/// [`feed`]: TemporalStabilizer::feed
pub struct TemporalStabilizer<L> {
    window: Vec<Option<Vote<L>>>,
    pos: usize,
    filled: usize,
    cfg: StabilizerConfig,
    current: Option<Current<L>>,
}

impl<L: Eq + Clone + fmt::Debug> TemporalStabilizer<L> {
    /// Creates a stabilizer with default configuration (history=8, quorum=5).
    pub fn new() -> Self {
        Self::with_config(StabilizerConfig::default())
    }

    pub fn with_config(cfg: StabilizerConfig) -> Self {
        let cfg = cfg.with_defaults();
        Self {
            window: vec![None; cfg.history],
            pos: 0,
            filled: 0,
            cfg,
            current: None,
        }
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.cfg
    }

    /// Stable label and its confidence, ignoring display gating.
    pub fn current(&self) -> Option<(&L, f32)> {
        self.current.as_ref().map(|c| (&c.label, c.confidence))
    }

    /// Current stabilized state without casting a vote.
    pub fn state(&self) -> Stabilized<L> {
        self.output(false)
    }

    /// Adds one verdict to the window and returns the stabilized state.
    pub fn feed<C>(&mut self, verdict: &Verdict<C>) -> Stabilized<L>
    where
        C: Ballot<Label = L>,
    {
        let vote = match verdict {
            Verdict::Match(c) => Vote {
                label: Some(c.label()),
                distance: c.distance(),
                confidence: c.confidence().clamp(0.0, 1.0),
            },
            Verdict::NoMatch => Vote {
                label: None,
                distance: f32::INFINITY,
                confidence: 0.0,
            },
        };

        self.window[self.pos] = Some(vote);
        self.pos = (self.pos + 1) % self.window.len();
        if self.filled < self.window.len() {
            self.filled += 1;
        }

        let before = self.current.as_ref().map(|c| c.label.clone());

        // Decay: evidence for the stable label has left the window.
        if let Some(cur) = &self.current {
            if self.count_of(&cur.label) == 0 {
                debug!(label = ?cur.label, "stabilizer: stable label decayed");
                self.current = None;
            }
        }

        if let Some((label, count, confidence)) = self.winner() {
            let same = match (&label, &self.current) {
                (Some(w), Some(cur)) => *w == cur.label,
                (None, None) => true,
                _ => false,
            };
            if same {
                if let Some(cur) = &mut self.current {
                    cur.confidence = confidence;
                }
            } else if count >= self.cfg.quorum {
                self.current = label.map(|label| Current { label, confidence });
            }
        }

        let after = self.current.as_ref().map(|c| c.label.clone());
        let changed = before != after;
        if changed {
            debug!(from = ?before, to = ?after, "stabilizer: stable label changed");
        }
        self.output(changed)
    }

    /// Clears the window and the stable label.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.filled = 0;
        self.current = None;
        for slot in &mut self.window {
            *slot = None;
        }
    }

    /// Votes in chronological order, oldest first.
    fn votes(&self) -> impl Iterator<Item = &Vote<L>> {
        let len = self.window.len();
        (0..self.filled).filter_map(move |i| {
            let idx = (self.pos + len - self.filled + i) % len;
            self.window[idx].as_ref()
        })
    }

    fn count_of(&self, label: &L) -> usize {
        self.votes()
            .filter(|v| v.label.as_ref() == Some(label))
            .count()
    }

    /// Winning label with its vote count and mean confidence.
    fn winner(&self) -> Option<(Option<L>, usize, f32)> {
        let mut tallies: Vec<Tally<'_, L>> = Vec::with_capacity(4);
        for (i, vote) in self.votes().enumerate() {
            match tallies.iter_mut().find(|t| *t.label == vote.label) {
                Some(t) => {
                    t.count += 1;
                    t.distance_sum += vote.distance as f64;
                    t.confidence_sum += vote.confidence as f64;
                    t.last_seen = i;
                }
                None => tallies.push(Tally {
                    label: &vote.label,
                    count: 1,
                    distance_sum: vote.distance as f64,
                    confidence_sum: vote.confidence as f64,
                    last_seen: i,
                }),
            }
        }

        tallies
            .into_iter()
            .min_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then(a.mean_distance().total_cmp(&b.mean_distance()))
                    .then(b.mean_confidence().total_cmp(&a.mean_confidence()))
                    .then(b.last_seen.cmp(&a.last_seen))
            })
            .map(|t| (t.label.clone(), t.count, t.mean_confidence() as f32))
    }

    fn output(&self, changed: bool) -> Stabilized<L> {
        match &self.current {
            None => Stabilized {
                label: None,
                stable: None,
                confidence: 0.0,
                votes: 0,
                filled: self.filled,
                changed,
                status: LabelStatus::Unset,
            },
            Some(cur) => {
                let shown = cur.confidence >= self.cfg.min_display;
                Stabilized {
                    label: shown.then(|| cur.label.clone()),
                    stable: Some(cur.label.clone()),
                    confidence: cur.confidence,
                    votes: self.count_of(&cur.label),
                    filled: self.filled,
                    changed,
                    status: if shown {
                        LabelStatus::Stable
                    } else {
                        LabelStatus::Gated
                    },
                }
            }
        }
    }
}

impl<L: Eq + Clone + fmt::Debug> Default for TemporalStabilizer<L> {
    fn default() -> Self {
        Self::new()
    }
}
