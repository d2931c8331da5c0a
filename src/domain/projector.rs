//! Filter/sort projection of the lead list. Pure; the input is never mutated.

use crate::domain::{FilterCriteria, Lead, SortDirection};

/// Returns the leads matching `criteria`, ordered by score.
///
/// Search is a case-insensitive substring match on name or company (empty term
/// matches everything), ANDed with the status filter. Equal scores keep their
/// original relative order.
pub fn project(leads: &[Lead], criteria: &FilterCriteria) -> Vec<Lead> {
    let needle = criteria.search_term.to_lowercase();
    let mut visible: Vec<Lead> = leads
        .iter()
        .filter(|lead| matches_search(lead, &needle) && criteria.status_filter.matches(lead.status))
        .cloned()
        .collect();

    // sort_by is stable, which gives the tie-break for free.
    match criteria.sort_direction {
        SortDirection::Desc => visible.sort_by(|a, b| b.score.cmp(&a.score)),
        SortDirection::Asc => visible.sort_by(|a, b| a.score.cmp(&b.score)),
    }
    visible
}

fn matches_search(lead: &Lead, needle: &str) -> bool {
    needle.is_empty()
        || lead.name.to_lowercase().contains(needle)
        || lead.company.to_lowercase().contains(needle)
}
