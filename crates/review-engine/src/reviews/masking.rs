use super::access::MaskScope;
use super::domain::Review;

/// Strip fields from an otherwise-readable record before it leaves the
/// system. Query-level filtering only narrows the set of reviews returned;
/// field-level visibility is enforced here, per record.
pub fn mask_review(review: &Review, scope: MaskScope) -> Review {
    let mut masked = review.clone();
    masked.initial_score = None;
    masked.final_score = None;

    if scope == MaskScope::Full {
        masked.review_items.clear();
        masked.appeals.clear();
        masked.submitter_handle = None;
        masked.submitter_max_rating = None;
        masked.metadata = None;
        masked.type_id = None;
        masked.committed = false;
    }

    masked
}
