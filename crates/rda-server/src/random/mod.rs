//! Deterministic synthetic claim generators
//!
//! Every record is derived from `(seed, index)` alone, so the same
//! configuration always yields the same feed and resuming at an arbitrary
//! position costs nothing.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rda_common::{RdaError, Result};
use std::sync::Arc;

use crate::model::{
    valid_values, ClaimEnum, Coded, FissBillClassification, FissBillClassificationForClinics,
    FissBillClassificationForSpecialFacilities, FissBillFacilityType, FissBillFrequency,
    FissAssignmentOfBenefitsIndicator, FissBeneficiarySex, FissClaimStatus, FissCurrentLocation2,
    FissDiagnosisPresentOnAdmissionIndicator, FissNdcQtyQual, FissNonBillRevCode,
    FissPatientRelationshipCode, FissPayersCode, FissProcessingType, FissReleaseOfInformation,
    McsBeneficiarySex,
    McsBillingProviderIndicator, McsBillingProviderStatusCode, McsClaimAssignmentCode,
    McsClaimLevelIndicator, McsClaimType, McsCutbackAuditDisposition, McsCutbackAuditIndicator,
    McsDetailStatus, McsDiagnosisIcdType, McsLocationActivityCode, McsStatusCode,
};

pub mod fiss;
pub mod mcs;
pub mod source;

pub use fiss::FissClaimGenerator;
pub use mcs::McsClaimGenerator;
pub use source::RandomClaimSource;

const ALPHA: &[u8] = b"bcdfghjkmnpqrstvwxz";
const DIGIT: &[u8] = b"0123456789";
const MAX_DAYS_AGO: u64 = 180;

/// Length of values written into length-limited fields by error injection.
pub const INJECTED_VALUE_LENGTH: usize = 50;

/// Source of "now" for generated timestamps and dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(instant) => *instant,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Valid members of every enumerated claim field.
#[derive(Debug, Clone)]
pub struct EnumDomains {
    pub fiss_claim_status: Vec<FissClaimStatus>,
    pub fiss_processing_type: Vec<FissProcessingType>,
    pub fiss_current_location2: Vec<FissCurrentLocation2>,
    pub fiss_diag_poa: Vec<FissDiagnosisPresentOnAdmissionIndicator>,
    pub fiss_facility_type: Vec<FissBillFacilityType>,
    pub fiss_classification: Vec<FissBillClassification>,
    pub fiss_clinic_classification: Vec<FissBillClassificationForClinics>,
    pub fiss_special_classification: Vec<FissBillClassificationForSpecialFacilities>,
    pub fiss_frequency: Vec<FissBillFrequency>,
    pub fiss_non_bill_rev_code: Vec<FissNonBillRevCode>,
    pub fiss_ndc_qty_qual: Vec<FissNdcQtyQual>,
    pub fiss_payers_code: Vec<FissPayersCode>,
    pub fiss_release_of_information: Vec<FissReleaseOfInformation>,
    pub fiss_assignment_of_benefits: Vec<FissAssignmentOfBenefitsIndicator>,
    pub fiss_patient_relationship: Vec<FissPatientRelationshipCode>,
    pub fiss_beneficiary_sex: Vec<FissBeneficiarySex>,
    pub mcs_claim_type: Vec<McsClaimType>,
    pub mcs_bene_sex: Vec<McsBeneficiarySex>,
    pub mcs_status_code: Vec<McsStatusCode>,
    pub mcs_billing_provider_indicator: Vec<McsBillingProviderIndicator>,
    pub mcs_billing_provider_status: Vec<McsBillingProviderStatusCode>,
    pub mcs_assignment: Vec<McsClaimAssignmentCode>,
    pub mcs_claim_level: Vec<McsClaimLevelIndicator>,
    pub mcs_audit_indicator: Vec<McsCutbackAuditIndicator>,
    pub mcs_audit_disposition: Vec<McsCutbackAuditDisposition>,
    pub mcs_icd_type: Vec<McsDiagnosisIcdType>,
    pub mcs_detail_status: Vec<McsDetailStatus>,
    pub mcs_location_activity: Vec<McsLocationActivityCode>,
}

impl EnumDomains {
    pub fn valid() -> Self {
        Self {
            fiss_claim_status: valid_values(),
            fiss_processing_type: valid_values(),
            fiss_current_location2: valid_values(),
            fiss_diag_poa: valid_values(),
            fiss_facility_type: valid_values(),
            fiss_classification: valid_values(),
            fiss_clinic_classification: valid_values(),
            fiss_special_classification: valid_values(),
            fiss_frequency: valid_values(),
            fiss_non_bill_rev_code: valid_values(),
            fiss_ndc_qty_qual: valid_values(),
            fiss_payers_code: valid_values(),
            fiss_release_of_information: valid_values(),
            fiss_assignment_of_benefits: valid_values(),
            fiss_patient_relationship: valid_values(),
            fiss_beneficiary_sex: valid_values(),
            mcs_claim_type: valid_values(),
            mcs_bene_sex: valid_values(),
            mcs_status_code: valid_values(),
            mcs_billing_provider_indicator: valid_values(),
            mcs_billing_provider_status: valid_values(),
            mcs_assignment: valid_values(),
            mcs_claim_level: valid_values(),
            mcs_audit_indicator: valid_values(),
            mcs_audit_disposition: valid_values(),
            mcs_icd_type: valid_values(),
            mcs_detail_status: valid_values(),
            mcs_location_activity: valid_values(),
        }
    }

    /// Fails if any field has no values to draw from.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("fiss_claim_status", self.fiss_claim_status.len()),
            ("fiss_processing_type", self.fiss_processing_type.len()),
            ("fiss_current_location2", self.fiss_current_location2.len()),
            ("fiss_diag_poa", self.fiss_diag_poa.len()),
            ("fiss_facility_type", self.fiss_facility_type.len()),
            ("fiss_classification", self.fiss_classification.len()),
            ("fiss_clinic_classification", self.fiss_clinic_classification.len()),
            ("fiss_special_classification", self.fiss_special_classification.len()),
            ("fiss_frequency", self.fiss_frequency.len()),
            ("fiss_non_bill_rev_code", self.fiss_non_bill_rev_code.len()),
            ("fiss_ndc_qty_qual", self.fiss_ndc_qty_qual.len()),
            ("fiss_payers_code", self.fiss_payers_code.len()),
            ("fiss_release_of_information", self.fiss_release_of_information.len()),
            ("fiss_assignment_of_benefits", self.fiss_assignment_of_benefits.len()),
            ("fiss_patient_relationship", self.fiss_patient_relationship.len()),
            ("fiss_beneficiary_sex", self.fiss_beneficiary_sex.len()),
            ("mcs_claim_type", self.mcs_claim_type.len()),
            ("mcs_bene_sex", self.mcs_bene_sex.len()),
            ("mcs_status_code", self.mcs_status_code.len()),
            ("mcs_billing_provider_indicator", self.mcs_billing_provider_indicator.len()),
            ("mcs_billing_provider_status", self.mcs_billing_provider_status.len()),
            ("mcs_assignment", self.mcs_assignment.len()),
            ("mcs_claim_level", self.mcs_claim_level.len()),
            ("mcs_audit_indicator", self.mcs_audit_indicator.len()),
            ("mcs_audit_disposition", self.mcs_audit_disposition.len()),
            ("mcs_icd_type", self.mcs_icd_type.len()),
            ("mcs_detail_status", self.mcs_detail_status.len()),
            ("mcs_location_activity", self.mcs_location_activity.len()),
        ];
        match sizes.iter().find(|(_, len)| *len == 0) {
            Some((name, _)) => Err(RdaError::Config(format!(
                "No generator values configured for {name}"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for EnumDomains {
    fn default() -> Self {
        Self::valid()
    }
}

/// Immutable settings shared by every record a generator produces.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub seed: i64,
    pub force_optional_fields: bool,
    /// Every Nth record carries an oversized value when N > 0.
    pub error_injection_rate: u64,
    pub max_unique_claim_ids: u64,
    pub max_unique_mbis: u64,
    pub clock: Clock,
    /// Set through [`GeneratorConfigBuilder::domains`], which checks that
    /// every field has values.
    pub(crate) domains: Arc<EnumDomains>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            force_optional_fields: false,
            error_injection_rate: 0,
            max_unique_claim_ids: 0,
            max_unique_mbis: 0,
            clock: Clock::System,
            domains: Arc::new(EnumDomains::valid()),
        }
    }
}

impl GeneratorConfig {
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    pub(crate) fn should_inject_error(&self, index: u64) -> bool {
        self.error_injection_rate > 0 && (index + 1) % self.error_injection_rate == 0
    }

    pub(crate) fn rng_for(&self, index: u64) -> StdRng {
        let mixed = (self.seed as u64) ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        StdRng::seed_from_u64(mixed)
    }
}

#[derive(Debug, Default)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn seed(mut self, seed: i64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn force_optional_fields(mut self, force: bool) -> Self {
        self.config.force_optional_fields = force;
        self
    }

    pub fn error_injection_rate(mut self, rate: u64) -> Self {
        self.config.error_injection_rate = rate;
        self
    }

    pub fn max_unique_claim_ids(mut self, max: u64) -> Self {
        self.config.max_unique_claim_ids = max;
        self
    }

    pub fn max_unique_mbis(mut self, max: u64) -> Self {
        self.config.max_unique_mbis = max;
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.config.clock = clock;
        self
    }

    pub fn domains(mut self, domains: Arc<EnumDomains>) -> Self {
        self.config.domains = domains;
        self
    }

    pub fn build(self) -> Result<GeneratorConfig> {
        self.config.domains.validate()?;
        Ok(self.config)
    }
}

/// Produces the claim at a given index.
pub trait ClaimGenerator: Send + Sync {
    type Claim: Send + 'static;

    fn config(&self) -> &GeneratorConfig;

    fn generate(&self, index: u64) -> Self::Claim;
}

/// Random field values drawn from one record's generator.
pub(crate) struct RandomValues<'a> {
    rng: StdRng,
    config: &'a GeneratorConfig,
}

impl<'a> RandomValues<'a> {
    pub(crate) fn new(config: &'a GeneratorConfig, index: u64) -> Self {
        Self {
            rng: config.rng_for(index),
            config,
        }
    }

    pub(crate) fn config(&self) -> &'a GeneratorConfig {
        self.config
    }

    pub(crate) fn domains(&self) -> &'a EnumDomains {
        &self.config.domains
    }

    /// Uniform in `[0, max)`, or zero when `max` is zero.
    pub(crate) fn int(&mut self, max: usize) -> usize {
        if max == 0 {
            0
        } else {
            self.rng.random_range(0..max)
        }
    }

    pub(crate) fn digits(&mut self, min_len: usize, max_len: usize) -> String {
        self.string_from(DIGIT, min_len, max_len)
    }

    pub(crate) fn letters(&mut self, min_len: usize, max_len: usize) -> String {
        self.string_from(ALPHA, min_len, max_len)
    }

    pub(crate) fn alphanumeric(&mut self, min_len: usize, max_len: usize) -> String {
        let len = self.length(min_len, max_len);
        (0..len)
            .map(|_| {
                if self.rng.random_bool(0.5) {
                    self.pick_char(ALPHA)
                } else {
                    self.pick_char(DIGIT)
                }
            })
            .collect()
    }

    /// Zero-padded number in `[0, max)`.
    pub(crate) fn padded_number(&mut self, max: u64, width: usize) -> String {
        let value = self.rng.random_range(0..max);
        format!("{value:0width$}")
    }

    /// A date within the last six months.
    pub(crate) fn date(&mut self) -> String {
        let days_ago = self.rng.random_range(0..MAX_DAYS_AGO);
        let today = self.config.clock.today();
        today
            .checked_sub_days(Days::new(days_ago))
            .unwrap_or(today)
            .format("%Y-%m-%d")
            .to_string()
    }

    pub(crate) fn amount(&mut self) -> String {
        let dollar_digits = 1 + self.int(5);
        let mut amount = String::with_capacity(dollar_digits + 3);
        amount.push(char::from(DIGIT[1 + self.int(DIGIT.len() - 1)]));
        for _ in 1..dollar_digits {
            amount.push(self.pick_char(DIGIT));
        }
        amount.push('.');
        amount.push_str(&self.digits(2, 2));
        amount
    }

    /// Populates an optional field. The coin is drawn even when fields are
    /// forced so both settings consume the stream identically.
    pub(crate) fn optional<V>(&mut self, value: impl FnOnce(&mut Self) -> V) -> Option<V> {
        let hit = self.rng.random_bool(0.5);
        if hit || self.config.force_optional_fields {
            Some(value(self))
        } else {
            None
        }
    }

    /// One of two alternatives, chosen uniformly.
    pub(crate) fn either<V>(
        &mut self,
        first: impl FnOnce(&mut Self) -> V,
        second: impl FnOnce(&mut Self) -> V,
    ) -> V {
        if self.rng.random_bool(0.5) {
            first(self)
        } else {
            second(self)
        }
    }

    pub(crate) fn enum_value<E: ClaimEnum>(&mut self, domain: &[E]) -> E {
        match domain.choose(&mut self.rng) {
            Some(value) => *value,
            None => E::ALL[0],
        }
    }

    /// An enum value or raw upstream text of `raw_len` characters.
    pub(crate) fn coded<E: ClaimEnum>(&mut self, domain: &[E], raw_len: usize) -> Coded<E> {
        self.either(
            |values| Coded::Enum(values.enum_value(domain)),
            |values| Coded::Unrecognized(values.alphanumeric(raw_len, raw_len)),
        )
    }

    fn length(&mut self, min_len: usize, max_len: usize) -> usize {
        if max_len <= min_len {
            min_len
        } else {
            self.rng.random_range(min_len..=max_len)
        }
    }

    fn string_from(&mut self, alphabet: &[u8], min_len: usize, max_len: usize) -> String {
        let len = self.length(min_len, max_len);
        (0..len).map(|_| self.pick_char(alphabet)).collect()
    }

    fn pick_char(&mut self, alphabet: &[u8]) -> char {
        char::from(alphabet[self.rng.random_range(0..alphabet.len())])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_config() -> GeneratorConfig {
        GeneratorConfig::builder()
            .seed(7)
            .clock(Clock::Fixed(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_value_alphabets() {
        let config = fixed_config();
        let mut values = RandomValues::new(&config, 3);

        for _ in 0..50 {
            let letters = values.letters(1, 8);
            assert!((1..=8).contains(&letters.len()));
            assert!(letters.bytes().all(|b| ALPHA.contains(&b)));

            let digits = values.digits(4, 4);
            assert_eq!(digits.len(), 4);
            assert!(digits.bytes().all(|b| b.is_ascii_digit()));

            let amount = values.amount();
            let (dollars, cents) = amount.split_once('.').unwrap();
            assert!((1..=5).contains(&dollars.len()));
            assert!(!dollars.starts_with('0'));
            assert_eq!(cents.len(), 2);
        }
    }

    #[test]
    fn test_dates_fall_within_window() {
        let config = fixed_config();
        let mut values = RandomValues::new(&config, 0);
        let today = config.clock.today();
        for _ in 0..100 {
            let date = NaiveDate::parse_from_str(&values.date(), "%Y-%m-%d").unwrap();
            assert!(date <= today);
            assert!((today - date).num_days() < MAX_DAYS_AGO as i64);
        }
    }

    #[test]
    fn test_forced_optional_fields_keep_stream_aligned() {
        let free = fixed_config();
        let forced = GeneratorConfig {
            force_optional_fields: true,
            ..fixed_config()
        };

        for index in 0..20 {
            let first = RandomValues::new(&free, index).optional(|v| v.digits(5, 5));
            let second = RandomValues::new(&forced, index).optional(|v| v.digits(5, 5));
            assert!(second.is_some());
            if first.is_some() {
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_error_injection_is_every_nth_record() {
        let config = GeneratorConfig {
            error_injection_rate: 3,
            ..GeneratorConfig::default()
        };
        let injected: Vec<u64> = (0..9).filter(|i| config.should_inject_error(*i)).collect();
        assert_eq!(injected, vec![2, 5, 8]);
        assert!(!GeneratorConfig::default().should_inject_error(0));
    }

    #[test]
    fn test_empty_domain_is_rejected() {
        let domains = EnumDomains {
            fiss_payers_code: Vec::new(),
            ..EnumDomains::valid()
        };
        let error = GeneratorConfig::builder()
            .domains(Arc::new(domains))
            .build()
            .unwrap_err();
        match error {
            RdaError::Config(message) => assert!(message.contains("fiss_payers_code")),
            other => panic!("unexpected error {other:?}"),
        }

        assert!(EnumDomains::valid().validate().is_ok());
    }

    #[test]
    fn test_enum_values_come_from_domain() {
        let config = fixed_config();
        let mut values = RandomValues::new(&config, 1);
        for _ in 0..50 {
            let status = values.enum_value(&config.domains.mcs_status_code);
            assert!(!status.is_sentinel());
        }
    }
}
