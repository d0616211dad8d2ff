use serde_json::{json, Value};

use crate::types::Instruction;

pub const COGNITO_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
pub const COGNITO_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Slots stored under the `connected` sub-table of the custom temperatures.
const CONNECTED_SLOT_PREFIX: &str = "presence_";

pub fn housings_path() -> String {
    "/park/housings".to_string()
}

pub fn connected_objects_path(housing: &str) -> String {
    format!("/park/housings/{housing}/connected-objects")
}

pub fn thermal_details_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/thermal-details")
}

pub fn custom_temperatures_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/custom-temperatures")
}

pub fn schedules_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/schedules")
}

pub fn programs_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/programs")
}

pub fn active_program_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/programs/active")
}

pub fn activate_program_path(housing: &str, program: &str) -> String {
    format!("/thermal/housings/{housing}/programs/{program}/activate")
}

pub fn temporary_instruction_path(housing: &str, zone: &str) -> String {
    format!("/thermal/housings/{housing}/zones/{zone}/temporary-instruction")
}

pub fn zone_schedule_path(housing: &str, zone: &str) -> String {
    format!("/thermal/housings/{housing}/zones/{zone}/schedule")
}

pub fn heating_system_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/heating-system")
}

/// Holiday period (`absence` event).
pub fn holiday_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/absence")
}

/// Short absence (`time_shift` event).
pub fn absence_path(housing: &str) -> String {
    format!("/thermal/housings/{housing}/time-shift")
}

pub fn auth_request(client_id: &str, username: &str, password: &str) -> Value {
    json!({
        "AuthFlow": "USER_PASSWORD_AUTH",
        "ClientId": client_id,
        "AuthParameters": {
            "USERNAME": username,
            "PASSWORD": password
        }
    })
}

pub fn temporary_instruction_data(instruction: &Instruction, duration_minutes: Option<u32>) -> Value {
    let mut data = json!({
        "set_point": { "instruction": instruction }
    });
    if let Some(minutes) = duration_minutes {
        data["duration"] = json!(minutes);
    }
    data
}

pub fn custom_temperature_data(slot: &str, value: f64) -> Value {
    if slot.starts_with(CONNECTED_SLOT_PREFIX) {
        json!({ "connected": { slot: value } })
    } else {
        json!({ slot: value })
    }
}

pub fn zone_schedule_data(schedule_id: &str) -> Value {
    json!({ "schedule_id": schedule_id })
}

pub fn heating_system_data(on: bool) -> Value {
    json!({ "heating_system_state": if on { "on" } else { "off" } })
}

pub fn parse_auth_response(body: &Value) -> Option<(String, u64)> {
    let result = body.get("AuthenticationResult")?;
    let token = result.get("AccessToken")?.as_str()?.to_string();
    let expires_in = result
        .get("ExpiresIn")
        .and_then(Value::as_u64)
        .unwrap_or(3600);
    Some((token, expires_in))
}
