//! Data models for When I Work entities.
//!
//! Shifts are mostly passed through as the service sent them. The client
//! only looks at the id, the owner marker and the open flag.

pub mod shift;

pub use shift::{Shift, ShiftAction, ShiftId, ShiftsResponse, UNASSIGNED_USER_ID};
