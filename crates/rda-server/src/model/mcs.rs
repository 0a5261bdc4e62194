//! MCS (professional) claim shape

use serde::{Deserialize, Serialize};

use super::{claim_enum, Coded};

claim_enum! {
    McsClaimType {
        Medical,
        Ambulance,
        Laboratory,
        DurableMedicalEquipment,
        Chiropractic,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsBeneficiarySex {
        Male,
        Female,
        Unknown,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    /// `NotUsed` is a placeholder code that valid claims never carry.
    McsStatusCode {
        NotUsed,
        Active,
        Approved,
        Suspended,
        Denied,
        Paid,
        Adjusted,
        Deleted,
        Unrecognized,
    }
    sentinels: [NotUsed, Unrecognized]
}

claim_enum! {
    McsBillingProviderIndicator {
        Group,
        Solo,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsBillingProviderStatusCode {
        Participating,
        NonParticipating,
        LimitedParticipation,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsClaimAssignmentCode {
        Assigned,
        NonAssigned,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsClaimLevelIndicator {
        Original,
        Adjustment,
        Void,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsCutbackAuditIndicator {
        Audit,
        Cutback,
        Edit,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsCutbackAuditDisposition {
        Pay,
        Deny,
        Suspend,
        Develop,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsDiagnosisIcdType {
        Icd9,
        Icd10,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsDetailStatus {
        Active,
        Denied,
        Rejected,
        Paid,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

claim_enum! {
    McsLocationActivityCode {
        CaptureClaim,
        ReleaseClaim,
        UpdateClaim,
        SuspendClaim,
        Unrecognized,
    }
    sentinels: [Unrecognized]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct McsClaim {
    pub idr_clm_hd_icn: String,
    pub idr_contr_id: String,
    pub idr_hic: Option<String>,
    pub idr_claim_type: Option<Coded<McsClaimType>>,
    pub idr_dtl_cnt: u32,
    pub idr_bene_last_1_6: Option<String>,
    pub idr_bene_first_init: Option<String>,
    pub idr_bene_mid_init: Option<String>,
    pub idr_bene_sex: Option<Coded<McsBeneficiarySex>>,
    pub idr_status_code: Option<McsStatusCode>,
    pub idr_status_date: Option<String>,
    pub idr_bill_prov_npi: Option<String>,
    pub idr_bill_prov_num: Option<String>,
    pub idr_bill_prov_ein: Option<String>,
    pub idr_bill_prov_type: Option<String>,
    pub idr_bill_prov_spec: Option<String>,
    pub idr_bill_prov_group_ind: Option<Coded<McsBillingProviderIndicator>>,
    pub idr_tot_allowed: Option<String>,
    pub idr_coinsurance: Option<String>,
    pub idr_deductible: Option<String>,
    pub idr_bill_prov_status_cd: Option<Coded<McsBillingProviderStatusCode>>,
    pub idr_tot_billed_amt: Option<String>,
    pub idr_claim_receipt_date: Option<String>,
    pub idr_claim_mbi: Option<String>,
    pub idr_hdr_from_dos: Option<String>,
    pub idr_hdr_to_dos: Option<String>,
    pub idr_assignment: Option<Coded<McsClaimAssignmentCode>>,
    pub idr_clm_level_ind: Option<Coded<McsClaimLevelIndicator>>,
    pub idr_hdr_audit: Option<u32>,
    pub mcs_adjustments: Vec<McsAdjustment>,
    pub mcs_audits: Vec<McsAudit>,
    pub mcs_diagnosis_codes: Vec<McsDiagnosisCode>,
    pub mcs_details: Vec<McsDetail>,
    pub mcs_locations: Vec<McsLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct McsAdjustment {
    pub rda_position: u32,
    pub idr_adj_date: Option<String>,
    pub idr_xref_icn: Option<String>,
    pub idr_adj_clerk: Option<String>,
    pub idr_init_ccn: Option<String>,
    pub idr_adj_chk_wrt_dt: Option<String>,
    pub idr_adj_b_eomb_amt: Option<String>,
    pub idr_adj_p_eomb_amt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct McsAudit {
    pub rda_position: u32,
    pub idr_j_audit_num: Option<u32>,
    pub idr_j_audit_ind: Option<Coded<McsCutbackAuditIndicator>>,
    pub idr_j_audit_disp: Option<Coded<McsCutbackAuditDisposition>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct McsDiagnosisCode {
    pub rda_position: u32,
    pub idr_clm_hd_icn: String,
    pub idr_diag_icd_type: Option<Coded<McsDiagnosisIcdType>>,
    pub idr_diag_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct McsDetail {
    pub idr_dtl_number: u32,
    pub idr_dtl_status: Option<Coded<McsDetailStatus>>,
    pub idr_dtl_from_date: Option<String>,
    pub idr_dtl_to_date: Option<String>,
    pub idr_proc_code: Option<String>,
    pub idr_mod_one: Option<String>,
    pub idr_mod_two: Option<String>,
    pub idr_dtl_diag_icd_type: Option<Coded<McsDiagnosisIcdType>>,
    pub idr_dtl_primary_diag_code: Option<String>,
    pub idr_k_pos_city: Option<String>,
    pub idr_k_pos_state: Option<String>,
    pub idr_k_pos_zip: Option<String>,
    pub idr_dtl_rend_npi: Option<String>,
    pub idr_dtl_ndc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct McsLocation {
    pub rda_position: u32,
    pub idr_loc_clerk: Option<String>,
    pub idr_loc_code: Option<String>,
    pub idr_loc_date: Option<String>,
    pub idr_loc_actv_code: Option<Coded<McsLocationActivityCode>>,
}
