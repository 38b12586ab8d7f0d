use serde::{Deserialize, Serialize};

/// One entry of a user's meeting history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingVisit {
    pub room_code: String,
    pub when: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddHistoryRequest {
    pub token: Option<String>,
    pub meeting_code: Option<String>,
}
