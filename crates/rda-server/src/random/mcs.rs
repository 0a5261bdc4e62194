use crate::model::{
    McsAdjustment, McsAudit, McsClaim, McsDetail, McsDiagnosisCode, McsLocation,
};

use super::{ClaimGenerator, GeneratorConfig, RandomValues, INJECTED_VALUE_LENGTH};

const MAX_DETAILS: usize = 4;
const MAX_ADJUSTMENTS: usize = 10;
const MAX_AUDITS: usize = 20;
const MAX_DIAG_CODES: usize = 7;
const MAX_LOCATIONS: usize = 8;
const MAX_AUDIT_NUMBER: usize = 32767;

pub const MCS_CLAIM_ID_LENGTH: usize = 15;
pub const MBI_LENGTH: usize = 11;

/// Synthesizes MCS claims.
#[derive(Debug, Clone)]
pub struct McsClaimGenerator {
    config: GeneratorConfig,
}

impl McsClaimGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

impl ClaimGenerator for McsClaimGenerator {
    type Claim = McsClaim;

    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn generate(&self, index: u64) -> McsClaim {
        let mut values = RandomValues::new(&self.config, index);
        let detail_count = 1 + values.int(MAX_DETAILS);
        let icn = values.digits(MCS_CLAIM_ID_LENGTH, MCS_CLAIM_ID_LENGTH);

        let mut claim = header(&mut values, icn, detail_count);
        add_adjustments(&mut values, &mut claim);
        add_audits(&mut values, &mut claim);
        add_diagnosis_codes(&mut values, &mut claim);
        add_details(&mut values, &mut claim, detail_count);
        add_locations(&mut values, &mut claim);
        set_service_dates_from_details(&mut claim);
        apply_overrides(&mut values, &mut claim, index);
        claim
    }
}

fn header(values: &mut RandomValues<'_>, icn: String, detail_count: usize) -> McsClaim {
    let domains = values.domains();
    McsClaim {
        idr_clm_hd_icn: icn,
        idr_contr_id: values.digits(1, 5),
        idr_hic: values.optional(|v| v.digits(1, 12)),
        idr_claim_type: Some(values.coded(&domains.mcs_claim_type, 1)),
        idr_dtl_cnt: detail_count as u32,
        idr_bene_last_1_6: values.optional(|v| v.letters(1, 6)),
        idr_bene_first_init: values.optional(|v| v.letters(1, 1)),
        idr_bene_mid_init: values.optional(|v| v.letters(1, 1)),
        idr_bene_sex: Some(values.coded(&domains.mcs_bene_sex, 1)),
        idr_status_code: Some(values.enum_value(&domains.mcs_status_code)),
        idr_status_date: values.optional(RandomValues::date),
        idr_bill_prov_npi: values.optional(|v| v.alphanumeric(1, 10)),
        idr_bill_prov_num: values.optional(|v| v.digits(1, 10)),
        idr_bill_prov_ein: values.optional(|v| v.alphanumeric(1, 10)),
        idr_bill_prov_type: values.optional(|v| v.letters(1, 2)),
        idr_bill_prov_spec: values.optional(|v| v.alphanumeric(1, 2)),
        idr_bill_prov_group_ind: Some(values.coded(&domains.mcs_billing_provider_indicator, 1)),
        idr_tot_allowed: values.optional(RandomValues::amount),
        idr_coinsurance: values.optional(RandomValues::amount),
        idr_deductible: values.optional(RandomValues::amount),
        idr_bill_prov_status_cd: Some(values.coded(&domains.mcs_billing_provider_status, 1)),
        idr_tot_billed_amt: values.optional(RandomValues::amount),
        idr_claim_receipt_date: values.optional(RandomValues::date),
        idr_claim_mbi: values.optional(|v| v.alphanumeric(MBI_LENGTH, MBI_LENGTH)),
        idr_assignment: Some(values.coded(&domains.mcs_assignment, 1)),
        idr_clm_level_ind: Some(values.coded(&domains.mcs_claim_level, 1)),
        idr_hdr_audit: values.optional(|v| v.int(MAX_AUDIT_NUMBER) as u32),
        ..McsClaim::default()
    }
}

fn add_adjustments(values: &mut RandomValues<'_>, claim: &mut McsClaim) {
    let count = values.int(MAX_ADJUSTMENTS);
    for position in 1..=count {
        claim.mcs_adjustments.push(McsAdjustment {
            rda_position: position as u32,
            idr_adj_date: values.optional(RandomValues::date),
            idr_xref_icn: values.optional(|v| v.alphanumeric(1, 15)),
            idr_adj_clerk: values.optional(|v| v.alphanumeric(1, 4)),
            idr_init_ccn: values.optional(|v| v.alphanumeric(1, 15)),
            idr_adj_chk_wrt_dt: values.optional(RandomValues::date),
            idr_adj_b_eomb_amt: values.optional(RandomValues::amount),
            idr_adj_p_eomb_amt: values.optional(RandomValues::amount),
        });
    }
}

fn add_audits(values: &mut RandomValues<'_>, claim: &mut McsClaim) {
    let domains = values.domains();
    let count = values.int(MAX_AUDITS);
    for position in 1..=count {
        claim.mcs_audits.push(McsAudit {
            rda_position: position as u32,
            idr_j_audit_num: values.optional(|v| v.int(MAX_AUDIT_NUMBER) as u32),
            idr_j_audit_ind: Some(values.coded(&domains.mcs_audit_indicator, 1)),
            idr_j_audit_disp: Some(values.coded(&domains.mcs_audit_disposition, 1)),
        });
    }
}

/// Diagnosis codes repeat the claim's ICN.
fn add_diagnosis_codes(values: &mut RandomValues<'_>, claim: &mut McsClaim) {
    let domains = values.domains();
    let count = values.int(MAX_DIAG_CODES);
    for position in 1..=count {
        let idr_diag_icd_type = Some(values.coded(&domains.mcs_icd_type, 1));
        claim.mcs_diagnosis_codes.push(McsDiagnosisCode {
            rda_position: position as u32,
            idr_clm_hd_icn: claim.idr_clm_hd_icn.clone(),
            idr_diag_icd_type,
            idr_diag_code: values.alphanumeric(1, 7),
        });
    }
}

fn add_details(values: &mut RandomValues<'_>, claim: &mut McsClaim, count: usize) {
    let domains = values.domains();
    for number in 1..=count {
        let idr_dtl_status = Some(values.coded(&domains.mcs_detail_status, 1));
        let dates = values.optional(|v| {
            let (first, second) = (v.date(), v.date());
            if first <= second {
                (first, second)
            } else {
                (second, first)
            }
        });
        let (idr_dtl_from_date, idr_dtl_to_date) = dates.unzip();

        claim.mcs_details.push(McsDetail {
            idr_dtl_number: number as u32,
            idr_dtl_status,
            idr_dtl_from_date,
            idr_dtl_to_date,
            idr_proc_code: values.optional(|v| v.alphanumeric(1, 5)),
            idr_mod_one: values.optional(|v| v.alphanumeric(1, 2)),
            idr_mod_two: values.optional(|v| v.alphanumeric(1, 2)),
            idr_dtl_diag_icd_type: Some(values.coded(&domains.mcs_icd_type, 1)),
            idr_dtl_primary_diag_code: values.optional(|v| v.alphanumeric(1, 7)),
            idr_k_pos_city: values.optional(|v| v.letters(1, 30)),
            idr_k_pos_state: values.optional(|v| v.letters(1, 2)),
            idr_k_pos_zip: values.optional(|v| v.digits(1, 15)),
            idr_dtl_rend_npi: values.optional(|v| v.alphanumeric(1, 10)),
            idr_dtl_ndc: values.optional(|v| v.alphanumeric(1, 48)),
        });
    }
}

fn add_locations(values: &mut RandomValues<'_>, claim: &mut McsClaim) {
    let domains = values.domains();
    let count = values.int(MAX_LOCATIONS);
    for position in 1..=count {
        claim.mcs_locations.push(McsLocation {
            rda_position: position as u32,
            idr_loc_clerk: values.optional(|v| v.alphanumeric(1, 4)),
            idr_loc_code: values.optional(|v| v.alphanumeric(1, 3)),
            idr_loc_date: values.optional(RandomValues::date),
            idr_loc_actv_code: Some(values.coded(&domains.mcs_location_activity, 1)),
        });
    }
}

/// Header service dates span the details, and stay unset unless every
/// detail carries both of its dates.
fn set_service_dates_from_details(claim: &mut McsClaim) {
    let ranges: Option<Vec<(&String, &String)>> = claim
        .mcs_details
        .iter()
        .map(|detail| {
            detail
                .idr_dtl_from_date
                .as_ref()
                .zip(detail.idr_dtl_to_date.as_ref())
        })
        .collect();

    let Some(ranges) = ranges else {
        return;
    };
    let from = ranges.iter().map(|(from, _)| *from).min().cloned();
    let to = ranges.iter().map(|(_, to)| *to).max().cloned();
    if let (Some(from), Some(to)) = (from, to) {
        claim.idr_hdr_from_dos = Some(from);
        claim.idr_hdr_to_dos = Some(to);
    }
}

fn apply_overrides(values: &mut RandomValues<'_>, claim: &mut McsClaim, index: u64) {
    let config = values.config();
    if config.max_unique_claim_ids > 0 {
        let icn = values.padded_number(config.max_unique_claim_ids, MCS_CLAIM_ID_LENGTH);
        for code in &mut claim.mcs_diagnosis_codes {
            code.idr_clm_hd_icn = icn.clone();
        }
        claim.idr_clm_hd_icn = icn;
    }
    if config.max_unique_mbis > 0 && claim.idr_claim_mbi.is_some() {
        claim.idr_claim_mbi = Some(values.padded_number(config.max_unique_mbis, MBI_LENGTH));
    }
    if config.should_inject_error(index) {
        let oversized = values.digits(INJECTED_VALUE_LENGTH, INJECTED_VALUE_LENGTH);
        if values.int(2) == 0 {
            claim.idr_contr_id = oversized;
        } else {
            claim.idr_hic = Some(oversized);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{McsDetail, McsStatusCode};
    use crate::random::Clock;
    use chrono::{TimeZone, Utc};

    fn generator(config: GeneratorConfig) -> McsClaimGenerator {
        McsClaimGenerator::new(GeneratorConfig {
            clock: Clock::Fixed(Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap()),
            ..config
        })
    }

    fn detail(from: Option<&str>, to: Option<&str>) -> McsDetail {
        McsDetail {
            idr_dtl_from_date: from.map(str::to_string),
            idr_dtl_to_date: to.map(str::to_string),
            ..McsDetail::default()
        }
    }

    #[test]
    fn test_same_seed_same_claims() {
        let a = generator(GeneratorConfig::builder().seed(17).build().unwrap());
        let b = generator(GeneratorConfig::builder().seed(17).build().unwrap());
        for index in 0..25 {
            assert_eq!(a.generate(index), b.generate(index));
        }
    }

    #[test]
    fn test_claim_shape() {
        let generator = generator(GeneratorConfig::builder().seed(4).build().unwrap());
        for index in 0..100 {
            let claim = generator.generate(index);
            assert_eq!(claim.idr_clm_hd_icn.len(), MCS_CLAIM_ID_LENGTH);
            assert_eq!(claim.idr_dtl_cnt as usize, claim.mcs_details.len());
            assert!((1..=MAX_DETAILS).contains(&claim.mcs_details.len()));
            assert_ne!(claim.idr_status_code, Some(McsStatusCode::NotUsed));
            assert!(claim
                .mcs_diagnosis_codes
                .iter()
                .all(|code| code.idr_clm_hd_icn == claim.idr_clm_hd_icn));
            assert_eq!(
                claim.idr_hdr_from_dos.is_some(),
                claim.idr_hdr_to_dos.is_some()
            );
            for detail in &claim.mcs_details {
                if let (Some(from), Some(to)) = (&detail.idr_dtl_from_date, &detail.idr_dtl_to_date)
                {
                    assert!(from <= to);
                }
            }
        }
    }

    #[test]
    fn test_header_dates_span_details() {
        let mut claim = McsClaim {
            mcs_details: vec![
                detail(Some("2024-01-05"), Some("2024-01-09")),
                detail(Some("2024-01-02"), Some("2024-01-03")),
            ],
            ..McsClaim::default()
        };
        set_service_dates_from_details(&mut claim);
        assert_eq!(claim.idr_hdr_from_dos.as_deref(), Some("2024-01-02"));
        assert_eq!(claim.idr_hdr_to_dos.as_deref(), Some("2024-01-09"));
    }

    #[test]
    fn test_header_dates_unset_when_any_detail_lacks_dates() {
        let mut claim = McsClaim {
            mcs_details: vec![
                detail(Some("2024-01-05"), Some("2024-01-09")),
                detail(None, None),
            ],
            ..McsClaim::default()
        };
        set_service_dates_from_details(&mut claim);
        assert!(claim.idr_hdr_from_dos.is_none());
        assert!(claim.idr_hdr_to_dos.is_none());

        let mut empty = McsClaim::default();
        set_service_dates_from_details(&mut empty);
        assert!(empty.idr_hdr_from_dos.is_none());
    }

    #[test]
    fn test_unique_icn_override_flows_into_diagnosis_codes() {
        let generator = generator(
            GeneratorConfig::builder()
                .seed(12)
                .max_unique_claim_ids(3)
                .build()
                .unwrap(),
        );
        for index in 0..30 {
            let claim = generator.generate(index);
            assert!(claim.idr_clm_hd_icn.parse::<u64>().unwrap() < 3);
            assert!(claim
                .mcs_diagnosis_codes
                .iter()
                .all(|code| code.idr_clm_hd_icn == claim.idr_clm_hd_icn));
        }
    }

    #[test]
    fn test_error_injection() {
        let generator = generator(
            GeneratorConfig::builder()
                .seed(21)
                .error_injection_rate(5)
                .build()
                .unwrap(),
        );
        for index in 0..15 {
            let claim = generator.generate(index);
            let oversized = claim.idr_contr_id.len() == INJECTED_VALUE_LENGTH
                || claim.idr_hic.as_ref().map(String::len) == Some(INJECTED_VALUE_LENGTH);
            assert_eq!(oversized, (index + 1) % 5 == 0, "index {index}");
        }
    }
}
