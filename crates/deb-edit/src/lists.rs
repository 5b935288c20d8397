//! Comma separated field values (`Uploaders`, `Testsuite-Triggers`, ...)
//!
//! Items keep the whitespace in front of them, so removing an item leaves
//! the separator style of the remaining ones alone.

use crate::deb822::Paragraph;
use crate::error::Result;

/// Items of a comma separated list, trimmed, empty items skipped
pub fn list_items(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Remove every item for which `matches` returns true.
///
/// Removing the first item hands its leading whitespace to the new first
/// item; removing the last item trims the new last one.
pub fn delete_matching(list: &str, mut matches: impl FnMut(&str) -> bool) -> String {
    let mut items: Vec<String> = list.split(',').map(str::to_string).collect();
    let mut index = 0;
    while index < items.len() {
        if items[index].trim().is_empty() || !matches(items[index].trim()) {
            index += 1;
            continue;
        }
        let deleted = items.remove(index);
        let head = &deleted[..deleted.len() - deleted.trim_start().len()];
        if index == 0 && !items.is_empty() {
            items[0] = format!("{head}{}", items[0].trim_start());
        } else if index == items.len() && index > 0 {
            let last = items[index - 1].trim_end().to_string();
            items[index - 1] = last;
        }
    }
    let joined = items.join(",");
    if list_items(&joined).is_empty() {
        String::new()
    } else {
        joined
    }
}

/// Remove the given items, compared after trimming.
pub fn delete_from_list(list: &str, to_delete: &[&str]) -> String {
    let to_delete: Vec<&str> = to_delete.iter().map(|s| s.trim()).collect();
    delete_matching(list, |item| to_delete.contains(&item))
}

/// Append an item, copying the separator used before the last item.
pub fn add_to_list(list: &str, item: &str) -> String {
    if list_items(list).is_empty() {
        return item.to_string();
    }
    let trimmed = list.trim_end();
    let separator = match trimmed.rsplit_once(',') {
        Some((_, last)) => &last[..last.len() - last.trim_start().len()],
        None => " ",
    };
    let separator = if separator.is_empty() { " " } else { separator };
    format!("{trimmed},{separator}{item}")
}

/// Remove matching items from a list field, dropping the field once empty.
///
/// Returns the removed items; a missing field removes nothing.
pub fn remove_from_field(
    paragraph: &mut Paragraph,
    field: &str,
    mut matches: impl FnMut(&str) -> bool,
) -> Result<Vec<String>> {
    let Some(value) = paragraph.get(field) else {
        return Ok(Vec::new());
    };
    let mut removed = Vec::new();
    let updated = delete_matching(value, |item| {
        let hit = matches(item);
        if hit {
            removed.push(item.to_string());
        }
        hit
    });
    if removed.is_empty() {
        return Ok(removed);
    }
    if updated.is_empty() {
        paragraph.remove(field)?;
    } else {
        paragraph.replace(field, updated)?;
    }
    Ok(removed)
}
