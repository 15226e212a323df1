//! Client-side contact search.
//!
//! The server returns the full role-filtered contact list; narrowing by a
//! search term happens here, against display names only.

use tutoria_shared::types::Contact;

/// Case-insensitive substring filter on display names.  An empty or
/// whitespace-only term matches everything.
pub fn filter_contacts<'a>(contacts: &'a [Contact], term: &str) -> Vec<&'a Contact> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return contacts.iter().collect();
    }

    contacts
        .iter()
        .filter(|c| c.display_name.to_lowercase().contains(&term))
        .collect()
}
