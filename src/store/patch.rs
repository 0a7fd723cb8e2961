use crate::gateway::{ReportId, ReportStatus, SubmittedReport};

/// Applies `patch` to the record with `id`. Returns whether a record matched.
pub fn apply_patch<F>(records: &mut [SubmittedReport], id: &ReportId, patch: F) -> bool
where
    F: FnOnce(&mut SubmittedReport),
{
    match records.iter_mut().find(|record| &record.id == id) {
        Some(record) => {
            patch(record);
            true
        }
        None => false,
    }
}

/// Optimistic status update after a confirmed approve/reject.
pub fn apply_status(records: &mut [SubmittedReport], id: &ReportId, status: ReportStatus) -> bool {
    apply_patch(records, id, |record| record.status = status)
}
