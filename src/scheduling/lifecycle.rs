use crate::db::models::AppointmentStatus;
use crate::scheduling::SchedulingError;

/// All statuses an appointment may move to from `from`. `Completed` and
/// `Cancelled` are terminal.
pub fn valid_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[Completed, Cancelled],
        Completed => &[],
        Cancelled => &[],
    }
}

pub fn is_terminal(status: AppointmentStatus) -> bool {
    valid_transitions(status).is_empty()
}

/// Rescheduling keeps the current status, so it is only meaningful before a
/// terminal state is reached.
pub fn can_reschedule(status: AppointmentStatus) -> bool {
    !is_terminal(status)
}

pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), SchedulingError> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(SchedulingError::InvalidTransition { from, to })
    }
}
