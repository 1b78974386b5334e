use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Numeric shift identifier as issued by the service.
pub type ShiftId = u64;

/// Owner id the service uses for a shift nobody is assigned to.
pub const UNASSIGNED_USER_ID: u64 = 0;

/// A scheduled or open work period.
///
/// The record is kept exactly as the service sent it, so no field type can
/// fail decoding and every key (null ones included) is written back out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shift {
    pub fields: Map<String, Value>,
}

impl Shift {
    /// Owner marker. Usually a number, but older payloads send strings.
    pub fn user_id(&self) -> Option<&Value> {
        self.fields.get("user_id")
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get("id")
    }

    pub fn is_unassigned(&self) -> bool {
        match self.user_id() {
            Some(Value::Number(n)) => n.as_u64() == Some(UNASSIGNED_USER_ID),
            Some(Value::String(s)) => s.trim() == UNASSIGNED_USER_ID.to_string(),
            _ => false,
        }
    }
}

/// Body of the shifts collection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftsResponse {
    #[serde(default)]
    pub shifts: Vec<Shift>,
    /// Side-loaded collections (users, locations, swaps, ...)
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ShiftsResponse {
    /// Copy of this response holding only the shifts with no owner.
    pub fn unassigned_only(&self) -> ShiftsResponse {
        ShiftsResponse {
            shifts: self
                .shifts
                .iter()
                .filter(|s| s.is_unassigned())
                .cloned()
                .collect(),
            rest: self.rest.clone(),
        }
    }
}

/// Outcome of a call that claims or releases shifts.
///
/// The transport call succeeded in both cases; `NotApplied` means the
/// service answered without confirming the change.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftAction {
    Applied { response: Value },
    NotApplied { response: Value },
}

impl ShiftAction {
    /// Applied when the service lists at least one affected shift.
    pub fn from_unassign_response(response: Value) -> Self {
        let released = response
            .get("shifts")
            .and_then(Value::as_array)
            .is_some_and(|shifts| !shifts.is_empty());

        if released {
            ShiftAction::Applied { response }
        } else {
            ShiftAction::NotApplied { response }
        }
    }

    /// Applied when the returned shift is explicitly no longer open.
    pub fn from_take_response(response: Value) -> Self {
        let taken = response
            .get("shift")
            .and_then(|shift| shift.get("is_open"))
            .and_then(Value::as_bool)
            == Some(false);

        if taken {
            ShiftAction::Applied { response }
        } else {
            ShiftAction::NotApplied { response }
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ShiftAction::Applied { .. })
    }

    pub fn response(&self) -> &Value {
        match self {
            ShiftAction::Applied { response } | ShiftAction::NotApplied { response } => response,
        }
    }
}
