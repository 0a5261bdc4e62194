use crate::model::{
    ClaimEnum, Coded, FissAuditTrail, FissBeneZPayer, FissClaim, FissDiagnosisCode,
    FissInsuredPayer, FissPayer, FissProcedureCode, FissRevenueLine, FissServiceType,
};

use super::{ClaimGenerator, GeneratorConfig, RandomValues, INJECTED_VALUE_LENGTH};

const MAX_PROC_CODES: usize = 7;
const MAX_DIAG_CODES: usize = 7;
const MAX_PAYERS: usize = 5;
const MAX_AUDITS: usize = 20;
const MAX_REVENUE_LINES: usize = 10;
const MAX_UNITS_BILLED: usize = 50;
const MAX_SERV_UNIT_COUNT: usize = 50;
const MAX_NDC_QTY_DIGITS: usize = 11;

pub const FISS_CLAIM_ID_LENGTH: usize = 32;
pub const MBI_LENGTH: usize = 11;

/// Synthesizes FISS claims.
#[derive(Debug, Clone)]
pub struct FissClaimGenerator {
    config: GeneratorConfig,
}

impl FissClaimGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

impl ClaimGenerator for FissClaimGenerator {
    type Claim = FissClaim;

    fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn generate(&self, index: u64) -> FissClaim {
        let mut values = RandomValues::new(&self.config, index);
        let mut claim = header(&mut values);
        add_proc_codes(&mut values, &mut claim);
        add_diagnosis_codes(&mut values, &mut claim);
        add_payers(&mut values, &mut claim);
        add_audits(&mut values, &mut claim);
        add_revenue_lines(&mut values, &mut claim);
        apply_overrides(&mut values, &mut claim, index);
        claim
    }
}

fn header(values: &mut RandomValues<'_>) -> FissClaim {
    let domains = values.domains();
    let rda_claim_key = values.digits(FISS_CLAIM_ID_LENGTH, FISS_CLAIM_ID_LENGTH);
    let dcn = values.digits(23, 23);
    let intermediary_nb = values.digits(5, 5);
    let hic_no = values.digits(12, 12);
    let curr_status = Some(values.enum_value(&domains.fiss_claim_status));
    let curr_loc1 = Some(values.coded(&domains.fiss_processing_type, 1));
    let curr_loc2 = Some(values.either(
        |v| Coded::Enum(v.enum_value(&domains.fiss_current_location2)),
        |v| Coded::Unrecognized(v.letters(1, 5)),
    ));
    let prov_state_cd = values.optional(|v| v.alphanumeric(2, 2));
    let prov_dept_id = values.optional(|v| v.alphanumeric(3, 3));
    let meda_prov_id = values.optional(|v| v.alphanumeric(13, 13));
    let meda_prov_6 = meda_prov_id.as_ref().map(|id| id[..6].to_string());
    let total_charge_amount = values.optional(RandomValues::amount);
    let recd_dt_cymd = values.optional(RandomValues::date);
    let curr_tran_dt_cymd = values.optional(RandomValues::date);
    let adm_diag_code = values.optional(|v| v.letters(1, 7));
    let npi_number = values.optional(|v| v.digits(10, 10));
    let mbi = values.optional(|v| v.alphanumeric(MBI_LENGTH, MBI_LENGTH));
    let fed_tax_nb = values.optional(|v| v.digits(10, 10));
    let stmt_cov_from_cymd = values.optional(RandomValues::date);
    let stmt_cov_to_cymd = values.optional(RandomValues::date);
    let lob_cd = Some(values.coded(&domains.fiss_facility_type, 1));
    let serv_type_cd = Some(match values.int(4) {
        0 => FissServiceType::Classification(values.enum_value(&domains.fiss_classification)),
        1 => FissServiceType::ClinicClassification(
            values.enum_value(&domains.fiss_clinic_classification),
        ),
        2 => FissServiceType::SpecialFacilityClassification(
            values.enum_value(&domains.fiss_special_classification),
        ),
        _ => FissServiceType::Unrecognized(values.letters(1, 1)),
    });
    let freq_cd = Some(values.either(
        |v| Coded::Enum(v.enum_value(&domains.fiss_frequency)),
        |v| Coded::Unrecognized(v.letters(1, 1)),
    ));
    let primary_payer_code = Some(values.coded(&domains.fiss_payers_code, 1));

    FissClaim {
        rda_claim_key,
        dcn,
        intermediary_nb,
        hic_no,
        curr_status,
        curr_loc1,
        curr_loc2,
        prov_state_cd,
        prov_dept_id,
        meda_prov_id,
        meda_prov_6,
        total_charge_amount,
        recd_dt_cymd,
        curr_tran_dt_cymd,
        adm_diag_code,
        npi_number,
        mbi,
        fed_tax_nb,
        stmt_cov_from_cymd,
        stmt_cov_to_cymd,
        lob_cd,
        serv_type_cd,
        freq_cd,
        primary_payer_code,
        ..FissClaim::default()
    }
}

/// The first procedure code always repeats the principal diagnosis.
fn add_proc_codes(values: &mut RandomValues<'_>, claim: &mut FissClaim) {
    let count = values.int(MAX_PROC_CODES);
    if count == 0 {
        return;
    }

    let principle_diag = values.letters(1, 7);
    claim.principle_diag = Some(principle_diag.clone());

    for position in 1..=count {
        let proc_cd = if position == 1 {
            principle_diag.clone()
        } else {
            values.letters(1, 7)
        };
        claim.fiss_proc_codes.push(FissProcedureCode {
            rda_position: position as u32,
            proc_cd,
            proc_flag: values.optional(|v| v.letters(1, 4)),
            proc_dt: values.optional(RandomValues::date),
        });
    }
}

fn add_diagnosis_codes(values: &mut RandomValues<'_>, claim: &mut FissClaim) {
    let domains = values.domains();
    let count = values.int(MAX_DIAG_CODES);
    for position in 1..=count {
        let diag_cd2 = values.optional(|v| v.letters(1, 7));
        let diag_poa_ind = Some(values.either(
            |v| Coded::Enum(v.enum_value(&domains.fiss_diag_poa)),
            |v| Coded::Unrecognized(v.letters(1, 1)),
        ));
        claim.fiss_diag_codes.push(FissDiagnosisCode {
            rda_position: position as u32,
            diag_cd2,
            diag_poa_ind,
            bit_flags: values.optional(|v| v.letters(1, 4)),
        });
    }
}

fn add_payers(values: &mut RandomValues<'_>, claim: &mut FissClaim) {
    let count = 1 + values.int(MAX_PAYERS);
    for position in 1..=count {
        let payer = values.either(
            |v| FissPayer::BeneZPayer(bene_z_payer(v, position as u32)),
            |v| FissPayer::InsuredPayer(insured_payer(v, position as u32)),
        );
        claim.fiss_payers.push(payer);
    }
}

/// A coded value whose raw form is `len` random digits.
fn coded_digits<E: ClaimEnum>(
    values: &mut RandomValues<'_>,
    domain: &[E],
    len: usize,
) -> Coded<E> {
    values.either(
        |v| Coded::Enum(v.enum_value(domain)),
        |v| Coded::Unrecognized(v.digits(len, len)),
    )
}

/// A coded value whose raw form is `len` random letters.
fn coded_letters<E: ClaimEnum>(
    values: &mut RandomValues<'_>,
    domain: &[E],
    len: usize,
) -> Coded<E> {
    values.either(
        |v| Coded::Enum(v.enum_value(domain)),
        |v| Coded::Unrecognized(v.letters(len, len)),
    )
}

fn bene_z_payer(values: &mut RandomValues<'_>, rda_position: u32) -> FissBeneZPayer {
    let domains = values.domains();
    FissBeneZPayer {
        rda_position,
        payers_id: Some(values.coded(&domains.fiss_payers_code, 1)),
        payers_name: values.optional(|v| v.alphanumeric(1, 32)),
        rel_ind: Some(coded_letters(values, &domains.fiss_release_of_information, 1)),
        assign_ind: Some(coded_letters(values, &domains.fiss_assignment_of_benefits, 1)),
        provider_number: values.optional(|v| v.alphanumeric(1, 13)),
        adj_dcn_icn: values.optional(|v| v.alphanumeric(1, 23)),
        prior_pmt: values.optional(RandomValues::amount),
        est_amt_due: values.optional(RandomValues::amount),
        bene_rel: Some(coded_digits(values, &domains.fiss_patient_relationship, 2)),
        bene_last_name: values.optional(|v| v.letters(1, 15)),
        bene_first_name: values.optional(|v| v.letters(1, 10)),
        bene_mid_init: values.optional(|v| v.letters(1, 1)),
        bene_ssn_hic: values.optional(|v| v.alphanumeric(1, 19)),
        insured_group_name: values.optional(|v| v.letters(1, 17)),
        bene_dob: values.optional(RandomValues::date),
        bene_sex: Some(coded_letters(values, &domains.fiss_beneficiary_sex, 1)),
        treat_auth_cd: values.optional(|v| v.letters(1, 1)),
        insured_sex: Some(coded_letters(values, &domains.fiss_beneficiary_sex, 1)),
        insured_rel_x12: Some(coded_digits(values, &domains.fiss_patient_relationship, 2)),
    }
}

fn insured_payer(values: &mut RandomValues<'_>, rda_position: u32) -> FissInsuredPayer {
    let domains = values.domains();
    let mut payer = FissInsuredPayer {
        rda_position,
        payers_id: Some(values.coded(&domains.fiss_payers_code, 1)),
        payers_name: values.optional(|v| v.letters(1, 32)),
        rel_ind: Some(coded_letters(values, &domains.fiss_release_of_information, 1)),
        assign_ind: Some(coded_letters(values, &domains.fiss_assignment_of_benefits, 1)),
        provider_number: values.optional(|v| v.letters(8, 13)),
        adj_dcn_icn: values.optional(|v| v.letters(23, 23)),
        prior_pmt: values.optional(RandomValues::amount),
        est_amt_due: values.optional(RandomValues::amount),
        insured_rel: Some(coded_digits(values, &domains.fiss_patient_relationship, 2)),
        insured_name: values.optional(|v| v.letters(1, 25)),
        insured_ssn_hic: values.optional(|v| v.letters(1, 19)),
        insured_group_name: values.optional(|v| v.letters(1, 17)),
        insured_group_nbr: values.optional(|v| v.letters(1, 20)),
        treat_auth_cd: values.optional(|v| v.alphanumeric(1, 18)),
        insured_sex: Some(coded_letters(values, &domains.fiss_beneficiary_sex, 1)),
        insured_rel_x12: Some(coded_digits(values, &domains.fiss_patient_relationship, 2)),
        ..FissInsuredPayer::default()
    };
    if let Some(dob) = values.optional(RandomValues::date) {
        payer.insured_dob_text = Some(month_day_year(&dob));
        payer.insured_dob = Some(dob);
    }
    payer
}

/// `YYYY-MM-DD` as `MMDDYYYY`.
fn month_day_year(date: &str) -> String {
    let digits: String = date.chars().filter(|c| *c != '-').collect();
    match (digits.get(4..), digits.get(..4)) {
        (Some(month_day), Some(year)) => format!("{month_day}{year}"),
        _ => digits,
    }
}

fn add_audits(values: &mut RandomValues<'_>, claim: &mut FissClaim) {
    let domains = values.domains();
    let count = 1 + values.int(MAX_AUDITS);
    for position in 1..=count {
        claim.fiss_audit_trail.push(FissAuditTrail {
            rda_position: position as u32,
            badt_status: Some(values.coded(&domains.fiss_claim_status, 1)),
            badt_loc: values.optional(|v| v.alphanumeric(1, 5)),
            badt_oper_id: values.optional(|v| v.alphanumeric(1, 9)),
            badt_reas: values.optional(|v| v.alphanumeric(1, 5)),
            badt_curr_date_cymd: values.optional(RandomValues::date),
        });
    }
}

fn add_revenue_lines(values: &mut RandomValues<'_>, claim: &mut FissClaim) {
    let domains = values.domains();
    let count = 1 + values.int(MAX_REVENUE_LINES);
    for position in 1..=count {
        let non_bill_rev_code = values
            .optional(|v| v.coded(&domains.fiss_non_bill_rev_code, 1));
        let rev_cd = values.optional(|v| v.alphanumeric(1, 4));
        let rev_units_billed = values.optional(|v| v.int(MAX_UNITS_BILLED) as u32);
        let rev_serv_unit_cnt = values.optional(|v| v.int(MAX_SERV_UNIT_COUNT) as u32);
        let serv_dt_cymd = values.optional(RandomValues::date);
        let hcpc_cd = values.optional(|v| v.alphanumeric(1, 5));
        let hcpc_modifier = values.optional(|v| v.alphanumeric(1, 2));
        let ndc = values.optional(|v| v.alphanumeric(1, 11));
        let ndc_qty = values.optional(|v| v.digits(1, MAX_NDC_QTY_DIGITS));
        let ndc_qty_qual = values.optional(|v| v.enum_value(&domains.fiss_ndc_qty_qual));

        claim.fiss_revenue_lines.push(FissRevenueLine {
            rda_position: position as u32,
            non_bill_rev_code,
            rev_cd,
            rev_units_billed,
            rev_serv_unit_cnt,
            serv_dt_cymd,
            hcpc_cd,
            hcpc_modifier,
            ndc,
            ndc_qty,
            ndc_qty_qual,
        });
    }
}

fn apply_overrides(values: &mut RandomValues<'_>, claim: &mut FissClaim, index: u64) {
    let config = values.config();
    if config.max_unique_claim_ids > 0 {
        claim.rda_claim_key =
            values.padded_number(config.max_unique_claim_ids, FISS_CLAIM_ID_LENGTH);
    }
    if config.max_unique_mbis > 0 {
        claim.mbi = Some(values.padded_number(config.max_unique_mbis, MBI_LENGTH));
    }
    if config.should_inject_error(index) {
        let oversized = values.digits(INJECTED_VALUE_LENGTH, INJECTED_VALUE_LENGTH);
        if values.int(2) == 0 {
            claim.dcn = oversized;
        } else {
            claim.intermediary_nb = oversized;
        }
    }
}
