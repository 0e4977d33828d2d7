//! Deadline kinds and the deadline set handed to a restart.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// The failure modes the detector watches, in dispatch priority order.
///
/// When several deadlines have elapsed by the time the alarm fires they are
/// reported in this order, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    /// Early warning that the path may be failing.
    PathDegrading,
    /// Large packets appear to be black-holed; the path MTU should shrink.
    MtuReduction,
    /// No forward progress for long enough that the path is considered dead.
    Blackhole,
}

impl DeadlineKind {
    /// All kinds, in dispatch order.
    pub const ALL: [DeadlineKind; 3] = [
        DeadlineKind::PathDegrading,
        DeadlineKind::MtuReduction,
        DeadlineKind::Blackhole,
    ];

    pub(crate) const fn index(self) -> usize {
        match self {
            DeadlineKind::PathDegrading => 0,
            DeadlineKind::MtuReduction => 1,
            DeadlineKind::Blackhole => 2,
        }
    }
}

impl fmt::Display for DeadlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineKind::PathDegrading => write!(f, "path_degrading"),
            DeadlineKind::MtuReduction => write!(f, "path_mtu_reduction"),
            DeadlineKind::Blackhole => write!(f, "blackhole"),
        }
    }
}

/// A full set of deadlines for one detection round.
///
/// The blackhole deadline is mandatory; the other two stages may be left out
/// of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionDeadlines {
    pub path_degrading: Option<Timestamp>,
    pub blackhole: Timestamp,
    pub path_mtu_reduction: Option<Timestamp>,
}

impl DetectionDeadlines {
    /// Deadlines watching only for a blackhole
    pub fn blackhole_only(blackhole: Timestamp) -> Self {
        Self {
            path_degrading: None,
            blackhole,
            path_mtu_reduction: None,
        }
    }

    /// The deadline for `kind`, if that stage is part of this round
    pub fn get(&self, kind: DeadlineKind) -> Option<Timestamp> {
        match kind {
            DeadlineKind::PathDegrading => self.path_degrading,
            DeadlineKind::MtuReduction => self.path_mtu_reduction,
            DeadlineKind::Blackhole => Some(self.blackhole),
        }
    }

    pub fn earliest(&self) -> Timestamp {
        DeadlineKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind))
            .min()
            .unwrap_or(self.blackhole)
    }

    /// Whether blackhole is the last stage of the round, as callers are
    /// expected to arrange.
    pub fn blackhole_is_last(&self) -> bool {
        DeadlineKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind))
            .all(|deadline| deadline <= self.blackhole)
    }
}
