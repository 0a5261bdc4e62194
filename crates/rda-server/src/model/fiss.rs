//! FISS (institutional) claim shape

use serde::{Deserialize, Serialize};

use super::{claim_enum, Coded};

claim_enum! {
    FissClaimStatus {
        Moved,
        Approved,
        Suspense,
        Rejected,
        Denied,
        ReturnToProvider,
        Paid,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissProcessingType {
        Manual,
        Driver,
        BatchEdits,
        Online,
        Other,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissCurrentLocation2 {
        Cable,
        Spell,
        Pricer,
        Final,
        Suspense,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissDiagnosisPresentOnAdmissionIndicator {
        Yes,
        No,
        Unknown,
        ClinicallyUndetermined,
        Unreported,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissBillFacilityType {
        Hospital,
        SkilledNursing,
        HomeHealth,
        ReligiousNonmedicalHospital,
        ClinicOrHospitalBasedRenalDialysis,
        SpecialFacility,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissBillClassification {
        InpatientPartA,
        InpatientPartB,
        Outpatient,
        Other,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissBillClassificationForClinics {
        RuralHealthClinic,
        HospitalBasedDialysis,
        FreeStandingProvider,
        OutpatientRehabilitation,
        CommunityMentalHealthCenter,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissBillClassificationForSpecialFacilities {
        Hospice,
        HospiceHospitalBased,
        AmbulatorySurgicalCenter,
        FreeStandingBirthingCenter,
        CriticalAccessHospital,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissBillFrequency {
        NonPayment,
        AdmitThroughDischarge,
        InterimFirstClaim,
        InterimContinuingClaim,
        InterimLastClaim,
        Replacement,
        Void,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissNonBillRevCode {
        Esrd,
        Laboratory,
        Ambulance,
        Pharmacy,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissNdcQtyQual {
        InternationalUnit,
        Gram,
        Milligram,
        Milliliter,
        Unit,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissPayersCode {
        Medicare,
        WorkingAge,
        EsrdBeneficiary,
        ConditionalPayment,
        AutoNoFault,
        WorkersCompensation,
        PublicHealthService,
        BlackLung,
        VeteransAdministration,
        DisabilityBeneficiary,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissReleaseOfInformation {
        SignedStatementWasObtained,
        NoReleaseOnFile,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissAssignmentOfBenefitsIndicator {
        BenefitsAssigned,
        NoBenefitsAssigned,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    FissPatientRelationshipCode {
        Spouse,
        Child,
        Grandchild,
        Employee,
        LifePartner,
        ReservedForNationalAssignment74,
        ReservedForNationalAssignment77,
        Default,
        Unrecognized,
    }
    sentinels: [Default, Unrecognized]
}

claim_enum! {
    FissBeneficiarySex {
        Female,
        Male,
        Unknown,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

/// Service type code: one of three classification tables, or raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FissServiceType {
    Classification(FissBillClassification),
    ClinicClassification(FissBillClassificationForClinics),
    SpecialFacilityClassification(FissBillClassificationForSpecialFacilities),
    Unrecognized(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FissClaim {
    pub rda_claim_key: String,
    pub dcn: String,
    pub intermediary_nb: String,
    pub hic_no: String,
    pub curr_status: Option<FissClaimStatus>,
    pub curr_loc1: Option<Coded<FissProcessingType>>,
    pub curr_loc2: Option<Coded<FissCurrentLocation2>>,
    pub prov_state_cd: Option<String>,
    pub prov_dept_id: Option<String>,
    pub meda_prov_id: Option<String>,
    pub meda_prov_6: Option<String>,
    pub total_charge_amount: Option<String>,
    pub recd_dt_cymd: Option<String>,
    pub curr_tran_dt_cymd: Option<String>,
    pub adm_diag_code: Option<String>,
    pub principle_diag: Option<String>,
    pub npi_number: Option<String>,
    pub mbi: Option<String>,
    pub fed_tax_nb: Option<String>,
    pub stmt_cov_from_cymd: Option<String>,
    pub stmt_cov_to_cymd: Option<String>,
    pub lob_cd: Option<Coded<FissBillFacilityType>>,
    pub serv_type_cd: Option<FissServiceType>,
    pub freq_cd: Option<Coded<FissBillFrequency>>,
    pub primary_payer_code: Option<Coded<FissPayersCode>>,
    pub fiss_proc_codes: Vec<FissProcedureCode>,
    pub fiss_diag_codes: Vec<FissDiagnosisCode>,
    pub fiss_payers: Vec<FissPayer>,
    pub fiss_audit_trail: Vec<FissAuditTrail>,
    pub fiss_revenue_lines: Vec<FissRevenueLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FissProcedureCode {
    pub rda_position: u32,
    pub proc_cd: String,
    pub proc_flag: Option<String>,
    pub proc_dt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FissDiagnosisCode {
    pub rda_position: u32,
    pub diag_cd2: Option<String>,
    pub diag_poa_ind: Option<Coded<FissDiagnosisPresentOnAdmissionIndicator>>,
    pub bit_flags: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FissAuditTrail {
    pub rda_position: u32,
    pub badt_status: Option<Coded<FissClaimStatus>>,
    pub badt_loc: Option<String>,
    pub badt_oper_id: Option<String>,
    pub badt_reas: Option<String>,
    pub badt_curr_date_cymd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FissRevenueLine {
    pub rda_position: u32,
    pub non_bill_rev_code: Option<Coded<FissNonBillRevCode>>,
    pub rev_cd: Option<String>,
    pub rev_units_billed: Option<u32>,
    pub rev_serv_unit_cnt: Option<u32>,
    pub serv_dt_cymd: Option<String>,
    pub hcpc_cd: Option<String>,
    pub hcpc_modifier: Option<String>,
    pub ndc: Option<String>,
    pub ndc_qty: Option<String>,
    pub ndc_qty_qual: Option<FissNdcQtyQual>,
}

/// A payer on a FISS claim. The beneficiary (`Z`) payer and other insured
/// payers carry different fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FissPayer {
    BeneZPayer(FissBeneZPayer),
    InsuredPayer(FissInsuredPayer),
}

impl FissPayer {
    pub fn rda_position(&self) -> u32 {
        match self {
            FissPayer::BeneZPayer(payer) => payer.rda_position,
            FissPayer::InsuredPayer(payer) => payer.rda_position,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FissBeneZPayer {
    pub rda_position: u32,
    pub payers_id: Option<Coded<FissPayersCode>>,
    pub payers_name: Option<String>,
    pub rel_ind: Option<Coded<FissReleaseOfInformation>>,
    pub assign_ind: Option<Coded<FissAssignmentOfBenefitsIndicator>>,
    pub provider_number: Option<String>,
    pub adj_dcn_icn: Option<String>,
    pub prior_pmt: Option<String>,
    pub est_amt_due: Option<String>,
    pub bene_rel: Option<Coded<FissPatientRelationshipCode>>,
    pub bene_last_name: Option<String>,
    pub bene_first_name: Option<String>,
    pub bene_mid_init: Option<String>,
    pub bene_ssn_hic: Option<String>,
    pub insured_group_name: Option<String>,
    pub bene_dob: Option<String>,
    pub bene_sex: Option<Coded<FissBeneficiarySex>>,
    pub treat_auth_cd: Option<String>,
    pub insured_sex: Option<Coded<FissBeneficiarySex>>,
    pub insured_rel_x12: Option<Coded<FissPatientRelationshipCode>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FissInsuredPayer {
    pub rda_position: u32,
    pub payers_id: Option<Coded<FissPayersCode>>,
    pub payers_name: Option<String>,
    pub rel_ind: Option<Coded<FissReleaseOfInformation>>,
    pub assign_ind: Option<Coded<FissAssignmentOfBenefitsIndicator>>,
    pub provider_number: Option<String>,
    pub adj_dcn_icn: Option<String>,
    pub prior_pmt: Option<String>,
    pub est_amt_due: Option<String>,
    pub insured_rel: Option<Coded<FissPatientRelationshipCode>>,
    pub insured_name: Option<String>,
    pub insured_ssn_hic: Option<String>,
    pub insured_group_name: Option<String>,
    pub insured_group_nbr: Option<String>,
    pub treat_auth_cd: Option<String>,
    pub insured_sex: Option<Coded<FissBeneficiarySex>>,
    pub insured_rel_x12: Option<Coded<FissPatientRelationshipCode>>,
    pub insured_dob: Option<String>,
    /// `insured_dob` as `MMDDYYYY`.
    pub insured_dob_text: Option<String>,
}
