//! Caregiver identity and billing terms attached to a round.

use serde::{Deserialize, Serialize};

/// Caregiver sex, as recorded on the caregiver's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Male,
    Female,
}

/// Bank account the caregiver's settlement is paid into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub bank: Option<String>,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
}

/// The caregiver assigned to a round.
///
/// Replaced wholesale on every re-assignment; two values are the same
/// caregiver assignment only if every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregiverInfo {
    /// External caregiving organization the caregiver belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_organization_id: Option<String>,
    pub name: String,
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    pub phone_number: String,
    /// Daily charge billed for this caregiver.
    #[serde(default)]
    pub daily_caregiving_charge: u32,
    #[serde(default)]
    pub commission_fee: u32,
    #[serde(default)]
    pub insured: bool,
    pub account_info: AccountInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "name": "Kim Minji",
            "sex": "FEMALE",
            "phoneNumber": "01012345678",
            "accountInfo": {"bank": null, "accountNumber": null, "accountHolder": null}
        }"#;
        let info: CaregiverInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.sex, Sex::Female);
        assert_eq!(info.daily_caregiving_charge, 0);
        assert!(!info.insured);
        assert!(info.caregiver_organization_id.is_none());
    }

    #[test]
    fn omits_absent_optional_fields() {
        let info = CaregiverInfo {
            caregiver_organization_id: None,
            name: "Park".to_string(),
            sex: Sex::Male,
            birth_date: None,
            phone_number: "01000000000".to_string(),
            daily_caregiving_charge: 150_000,
            commission_fee: 3_000,
            insured: true,
            account_info: AccountInfo::default(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("birthDate").is_none());
        assert_eq!(json["dailyCaregivingCharge"], 150_000);
    }
}
