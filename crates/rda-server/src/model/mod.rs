//! Claim change records carried by the RDA feed
//!
//! Two claim shapes travel on the feed: FISS (institutional) claims and MCS
//! (professional) claims. Both arrive wrapped in a [`ClaimChange`] carrying the
//! producer-assigned sequence number.

use serde::{Deserialize, Serialize};

macro_rules! claim_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident),+ $(,)? }
        sentinels: [$($sentinel:ident),+]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $crate::model::ClaimEnum for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn is_sentinel(self) -> bool {
                matches!(self, $($name::$sentinel)|+)
            }
        }
    };
}

pub(crate) use claim_enum;

pub mod change;
pub mod fiss;
pub mod mcs;

pub use change::{ChangeType, ClaimChange, FissClaimChange, McsClaimChange, MIN_SEQUENCE_NUM};
pub use fiss::*;
pub use mcs::*;

/// A closed set of coded values that may also hold sentinel members
/// representing malformed upstream data.
pub trait ClaimEnum: Copy + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn is_sentinel(self) -> bool;
}

/// Every member of `E` that valid data may carry, in declaration order.
pub fn valid_values<E: ClaimEnum>() -> Vec<E> {
    E::ALL.iter().copied().filter(|value| !value.is_sentinel()).collect()
}

/// A field holding either a known code or the raw text received upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Coded<E> {
    Enum(E),
    Unrecognized(String),
}

impl<E> Coded<E> {
    pub fn as_enum(&self) -> Option<&E> {
        match self {
            Coded::Enum(value) => Some(value),
            Coded::Unrecognized(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_values_exclude_sentinels() {
        let statuses = valid_values::<McsStatusCode>();
        assert!(!statuses.contains(&McsStatusCode::NotUsed));
        assert!(!statuses.contains(&McsStatusCode::Unrecognized));
        assert_eq!(statuses.len(), McsStatusCode::ALL.len() - 2);

        let sexes = valid_values::<McsBeneficiarySex>();
        assert_eq!(
            sexes,
            vec![
                McsBeneficiarySex::Male,
                McsBeneficiarySex::Female,
                McsBeneficiarySex::Unknown
            ]
        );
    }

    #[test]
    fn test_coded_json_shape() {
        let coded: Coded<FissClaimStatus> = Coded::Enum(FissClaimStatus::Approved);
        assert_eq!(
            serde_json::to_string(&coded).unwrap(),
            r#"{"enum":"APPROVED"}"#
        );

        let raw: Coded<FissClaimStatus> = serde_json::from_str(r#"{"unrecognized":"Q"}"#).unwrap();
        assert_eq!(raw, Coded::Unrecognized("Q".to_string()));
        assert!(raw.as_enum().is_none());
    }

    #[test]
    fn test_payer_json_shape() {
        let payer = FissPayer::InsuredPayer(FissInsuredPayer {
            rda_position: 2,
            payers_id: Some(Coded::Enum(FissPayersCode::BlackLung)),
            ..FissInsuredPayer::default()
        });
        let json = serde_json::to_value(&payer).unwrap();
        assert_eq!(json["insuredPayer"]["rdaPosition"], 2);
        assert_eq!(json["insuredPayer"]["payersId"]["enum"], "BLACK_LUNG");

        let back: FissPayer = serde_json::from_value(json).unwrap();
        assert_eq!(back.rda_position(), 2);
    }
}
