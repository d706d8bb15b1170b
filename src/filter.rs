use crate::catalog::ContentItem;

/// Lowercased with every space removed; both sides of a match go through this.
fn normalize(value: &str) -> String {
    value.replace(' ', "").to_lowercase()
}

/// Keeps the items whose name contains `filter`, ignoring case and spaces.
/// Input order is preserved; an empty filter keeps everything.
pub fn filter_items(items: &[ContentItem], filter: &str) -> Vec<ContentItem> {
    let needle = normalize(filter);
    if needle.is_empty() {
        return items.to_vec();
    }

    items
        .iter()
        .filter(|item| normalize(&item.name).contains(&needle))
        .cloned()
        .collect()
}
