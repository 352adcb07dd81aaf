//! Parent-first ordering of fetched pages

use crate::model::ContentItem;

/// Order `items` so that shallower pages come before deeper ones.
///
/// Stable sort on ancestor-chain length only: ties keep input order and no
/// check is made that the named ancestors are actually in the batch. This is
/// enough as long as the source listing is self-consistent; an orphaned
/// ancestor reference later misses the identity map and the page lands at
/// the root of the destination space.
pub fn sort_parent_first(mut items: Vec<ContentItem>) -> Vec<ContentItem> {
    items.sort_by_key(ContentItem::depth);
    items
}
