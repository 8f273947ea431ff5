//! Entity and field schemas.
//!
//! [`EntityType`] describes how records are shaped and stored; both backends
//! walk it to resolve key paths. [`FieldSchema`] maps the names used in query
//! text onto attribute paths of an entity type. [`Entity`] is the read side
//! used by the in-memory matcher, implemented here for `serde_json::Value`
//! and string-keyed maps.

mod access;
mod entity;
mod fields;
mod json;
mod path;

pub(crate) use path::{resolve_path, AttributePath};
pub use access::{Entity, FieldValue};
pub use entity::{
    Attribute, AttributeKind, CollectionStorage, Element, EntityType, EntityTypeBuilder,
};
pub use fields::{FieldSchema, QueryField, SUB_ATTRIBUTE_SEPARATOR};

use strsim::levenshtein;

/// Maximum Levenshtein distance for "did you mean" suggestions.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Finds the best matching name from a list of candidates using Levenshtein distance.
///
/// Returns the best match if its edit distance is within the threshold,
/// otherwise returns `None`.
pub(crate) fn find_similar_name<'a>(
    query: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> Option<String> {
    let query_lower = query.to_lowercase();

    let (best_match, best_distance) = candidates
        .filter(|name| !name.is_empty())
        .map(|name| {
            let distance = levenshtein(&query_lower, &name.to_lowercase());
            (name.to_string(), distance)
        })
        .min_by_key(|(_, d)| *d)?;

    // Only suggest if the distance is within threshold and not an exact match
    if best_distance > 0 && best_distance <= MAX_SUGGESTION_DISTANCE {
        Some(best_match)
    } else {
        None
    }
}
