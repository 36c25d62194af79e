//! The article review ladder. Agents own the NEW → triage half; this
//! table covers every transition an editorial actor may request.

use tahrir_common::NewsStatus;

/// Whether `from -> to` is a legal article transition.
pub fn transition_allowed(from: NewsStatus, to: NewsStatus) -> bool {
    use NewsStatus::*;
    matches!(
        (from, to),
        // Router triage
        (New, Classified)
            | (New, Candidate)
            | (New, Archived)
            | (New, Rejected)
            // Editor decisions
            | (Candidate, ApprovedHandoff)
            | (Classified, ApprovedHandoff)
            | (Candidate, Rejected)
            | (Classified, Rejected)
            // Scribe
            | (ApprovedHandoff, DraftGenerated)
            // Draft acceptance
            | (DraftGenerated, Approved)
            // Policy gate
            | (Approved, ReadyForChiefApproval)
            | (Approved, ApprovalRequestWithReservations)
            // Chief + director
            | (ReadyForChiefApproval, ReadyForManualPublish)
            | (ReadyForManualPublish, Published)
            // Director unpublish
            | (Published, Approved)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tahrir_common::NewsStatus::*;

    #[test]
    fn happy_path_is_allowed() {
        let ladder = [
            (New, Candidate),
            (Candidate, ApprovedHandoff),
            (ApprovedHandoff, DraftGenerated),
            (DraftGenerated, Approved),
            (Approved, ReadyForChiefApproval),
            (ReadyForChiefApproval, ReadyForManualPublish),
            (ReadyForManualPublish, Published),
        ];
        for (from, to) in ladder {
            assert!(transition_allowed(from, to), "{from} -> {to}");
        }
    }

    #[test]
    fn unpublish_is_the_only_exit_from_published() {
        assert!(transition_allowed(Published, Approved));
        assert!(!transition_allowed(Published, Candidate));
        assert!(!transition_allowed(Published, Rejected));
    }

    #[test]
    fn terminals_stay_terminal() {
        for terminal in [Rejected, Archived] {
            for to in [New, Candidate, Approved, Published] {
                assert!(!transition_allowed(terminal, to), "{terminal} -> {to}");
            }
        }
    }

    #[test]
    fn no_skipping_the_chief() {
        assert!(!transition_allowed(Approved, ReadyForManualPublish));
        assert!(!transition_allowed(Approved, Published));
        assert!(!transition_allowed(Candidate, Published));
    }
}
