use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FissClaim, McsClaim};
use crate::source::Sequenced;

/// Smallest sequence number a producer assigns.
pub const MIN_SEQUENCE_NUM: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

/// One change event for a claim of type `C`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimChange<C> {
    pub timestamp: DateTime<Utc>,
    pub seq: i64,
    pub change_type: ChangeType,
    pub claim: C,
}

pub type FissClaimChange = ClaimChange<FissClaim>;
pub type McsClaimChange = ClaimChange<McsClaim>;

impl<C> ClaimChange<C> {
    pub fn update(seq: i64, timestamp: DateTime<Utc>, claim: C) -> Self {
        Self {
            timestamp,
            seq,
            change_type: ChangeType::Update,
            claim,
        }
    }
}

impl<C> Sequenced for ClaimChange<C> {
    fn sequence_number(&self) -> i64 {
        self.seq
    }
}
