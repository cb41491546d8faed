//! Exact-hash rename detection.
//!
//! Post-processes a flat tree-diff result: for each Deleted entry, finds
//! the first not-yet-consumed Added entry with an identical new hash and
//! folds the pair into a single Renamed entry.

use crate::{DiffEntry, DiffStatus};

/// Detect renames in a flat diff-entry list (in place).
///
/// Deletions with no matching addition remain Deleted. Additions beyond the
/// number of matched deletions remain Added. Duplicate hashes on the added
/// side never double-claim a single deletion — each addition is consumed at
/// most once, matched against deletions in iteration order.
pub fn detect_renames(entries: &mut Vec<DiffEntry>) {
    let deleted: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.status == DiffStatus::Deleted)
        .map(|(i, _)| i)
        .collect();

    if deleted.is_empty() {
        return;
    }

    let added: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.status == DiffStatus::Added)
        .map(|(i, _)| i)
        .collect();

    if added.is_empty() {
        return;
    }

    let mut matched_added = vec![false; added.len()];
    let mut renames: Vec<(usize, usize)> = Vec::new(); // (deleted_idx, added_idx)

    for &del_idx in &deleted {
        let del_hash = match entries[del_idx].old_oid {
            Some(oid) => oid,
            None => continue,
        };

        for (ai, &add_idx) in added.iter().enumerate() {
            if matched_added[ai] {
                continue;
            }
            if entries[add_idx].new_oid == Some(del_hash) {
                matched_added[ai] = true;
                renames.push((del_idx, add_idx));
                break;
            }
        }
    }

    for (del_idx, add_idx) in &renames {
        let old_path = entries[*del_idx].path.clone();
        let old_mode = entries[*del_idx].old_mode;
        let old_oid = entries[*del_idx].old_oid;

        let added_entry = &mut entries[*add_idx];
        added_entry.status = DiffStatus::Renamed;
        added_entry.old_path = Some(old_path);
        added_entry.old_mode = old_mode;
        added_entry.old_oid = old_oid;
    }

    // Drop the consumed deleted entries, highest index first so earlier
    // indices stay valid during removal.
    let mut consumed: Vec<usize> = renames.iter().map(|(d, _)| *d).collect();
    consumed.sort_unstable_by(|a, b| b.cmp(a));
    for idx in consumed {
        entries.remove(idx);
    }
}
