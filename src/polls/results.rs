//! Per-option tallies.

use crate::models::{OptionResult, Poll, PollResults};
use crate::store::Store;

/// Count recorded responses per option, in the poll's current option order.
///
/// Responses pointing at option ids the poll no longer has (after its options
/// were replaced) match nothing and are left out of every count.
pub fn aggregate(store: &Store, poll: &Poll) -> Vec<OptionResult> {
    poll.options
        .iter()
        .map(|option| OptionResult {
            option_id: option.id.clone(),
            text: option.text.clone(),
            count: store
                .responses_for(&poll.id)
                .filter(|r| r.option_id == option.id)
                .count(),
        })
        .collect()
}

/// [`aggregate`] wrapped with the poll id, as broadcast in `poll:results`.
pub fn poll_results(store: &Store, poll: &Poll) -> PollResults {
    PollResults {
        poll_id: poll.id.clone(),
        results: aggregate(store, poll),
    }
}
