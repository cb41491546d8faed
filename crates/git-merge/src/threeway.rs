//! Structured three-way content diff (§4.14).
//!
//! Diffs base→ours and base→theirs with Myers' algorithm, converts each
//! edit script into contiguous change blocks, then walks both block lists
//! in base-line order producing a list of [`MergeRegion`]: context lines
//! both sides agree on, a clean one-side change, or a conflict carrying
//! both sides' content. No conflict markers are embedded in any region —
//! callers render those themselves if they want to.

use bstr::BString;
use git_hash::ObjectId;
use git_object::Object;
use git_odb::ObjectDatabase;

use crate::{ConflictType, MergeError};

/// The kind of change a [`MergeRegion`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionType {
    /// Base lines left untouched by both sides.
    Context,
    /// Only `ours` changed this range.
    Ours,
    /// Only `theirs` changed this range.
    Theirs,
    /// Both sides changed this range differently.
    Conflict,
}

/// A contiguous run of base lines and the content replacing them, if any.
#[derive(Debug, Clone)]
pub struct MergeRegion {
    pub region_type: RegionType,
    /// 1-based start line in base.
    pub base_start: u32,
    /// Base content spanned by this region (empty for a pure insertion).
    pub base_lines: Vec<BString>,
    /// Set for `Ours` and `Conflict` regions.
    pub ours_lines: Option<Vec<BString>>,
    /// Set for `Theirs` and `Conflict` regions.
    pub theirs_lines: Option<Vec<BString>>,
}

/// The result of a three-way diff over a single path.
#[derive(Debug, Clone)]
pub struct ThreeWayFileDiff {
    pub path: BString,
    pub conflict_type: ConflictType,
    pub is_binary: bool,
    /// Set when a side exceeded the size gate; `regions` is empty.
    pub truncated: bool,
    pub regions: Vec<MergeRegion>,
}

/// Gate matching [`git_diff::MAX_DIFF_BLOB`] (§4.11); re-declared here so
/// this crate's public contract doesn't depend on re-exporting a constant
/// from `git_diff` that callers may not otherwise need.
const MAX_DIFF_BLOB: usize = git_diff::MAX_DIFF_BLOB;

/// Compute the structured three-way diff for a single path, given the blob
/// hash on each side (`None` meaning the path doesn't exist on that side).
pub fn compute_three_way_diff(
    odb: &ObjectDatabase,
    base: Option<&ObjectId>,
    ours: Option<&ObjectId>,
    theirs: Option<&ObjectId>,
    path: &bstr::BStr,
) -> Result<ThreeWayFileDiff, MergeError> {
    let structural = classify_structural(base, ours, theirs);

    let base_data = read_blob_opt(odb, base)?;
    let ours_data = read_blob_opt(odb, ours)?;
    let theirs_data = read_blob_opt(odb, theirs)?;

    let binary = git_diff::binary::is_binary(&base_data)
        || git_diff::binary::is_binary(&ours_data)
        || git_diff::binary::is_binary(&theirs_data);
    let too_large = base_data.len() > MAX_DIFF_BLOB
        || ours_data.len() > MAX_DIFF_BLOB
        || theirs_data.len() > MAX_DIFF_BLOB;

    if binary || too_large {
        return Ok(ThreeWayFileDiff {
            path: path.to_owned(),
            conflict_type: structural.unwrap_or(ConflictType::None),
            is_binary: binary,
            truncated: too_large,
            regions: Vec::new(),
        });
    }

    let regions = merge_walk(&base_data, &ours_data, &theirs_data);
    let conflict_type = structural.unwrap_or_else(|| {
        if regions.iter().any(|r| r.region_type == RegionType::Conflict) {
            ConflictType::Conflicting
        } else {
            ConflictType::None
        }
    });

    Ok(ThreeWayFileDiff {
        path: path.to_owned(),
        conflict_type,
        is_binary: false,
        truncated: false,
        regions,
    })
}

fn classify_structural(
    base: Option<&ObjectId>,
    ours: Option<&ObjectId>,
    theirs: Option<&ObjectId>,
) -> Option<ConflictType> {
    match (base.is_some(), ours.is_some(), theirs.is_some()) {
        (false, true, true) => Some(ConflictType::BothAdded),
        (true, false, true) | (true, true, false) => Some(ConflictType::DeleteModify),
        _ => None,
    }
}

fn read_blob_opt(odb: &ObjectDatabase, oid: Option<&ObjectId>) -> Result<Vec<u8>, MergeError> {
    match oid {
        None => Ok(Vec::new()),
        Some(oid) => {
            let obj = odb.read(oid)?.ok_or(MergeError::ObjectNotFound(*oid))?;
            match obj {
                Object::Blob(blob) => Ok(blob.data),
                other => Err(MergeError::UnexpectedObjectType {
                    oid: *oid,
                    expected: "blob",
                    actual: other.object_type().to_string(),
                }),
            }
        }
    }
}

/// A contiguous change relative to base, in base-line coordinates.
/// `base_start == base_end` for a pure insertion.
#[derive(Debug, Clone, Copy)]
struct EditBlock {
    base_start: usize,
    base_end: usize,
    new_start: usize,
    new_end: usize,
}

/// Convert an edit script into contiguous change blocks (§4.14 step 3).
fn edits_to_blocks(edits: &[git_diff::algorithm::Edit]) -> Vec<EditBlock> {
    use git_diff::algorithm::EditOp;

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < edits.len() {
        if edits[i].op == EditOp::Equal {
            i += 1;
            continue;
        }
        let base_start = edits[i].old_index;
        let new_start = edits[i].new_index;
        let mut base_end = base_start;
        let mut new_end = new_start;
        while i < edits.len() && edits[i].op != EditOp::Equal {
            match edits[i].op {
                EditOp::Delete => base_end = edits[i].old_index + 1,
                EditOp::Insert => new_end = edits[i].new_index + 1,
                EditOp::Equal => unreachable!(),
            }
            i += 1;
        }
        blocks.push(EditBlock {
            base_start,
            base_end,
            new_start,
            new_end,
        });
    }
    blocks
}

fn owned_lines(lines: &[&[u8]], start: usize, end: usize) -> Vec<BString> {
    lines[start.min(lines.len())..end.min(lines.len())]
        .iter()
        .map(|l| BString::from(*l))
        .collect()
}

fn overlaps_or_touches(a: &EditBlock, b: &EditBlock) -> bool {
    a.base_start <= b.base_end && b.base_start <= a.base_end
}

/// Walk base lines alongside both sides' change blocks, emitting regions
/// (§4.14 step 4-5). Every base line appears in exactly one region.
fn merge_walk(base: &[u8], ours: &[u8], theirs: &[u8]) -> Vec<MergeRegion> {
    let base_lines = git_diff::algorithm::split_lines(base);
    let ours_lines = git_diff::algorithm::split_lines(ours);
    let theirs_lines = git_diff::algorithm::split_lines(theirs);

    let ours_blocks = edits_to_blocks(&git_diff::algorithm::diff_edits(base, ours));
    let theirs_blocks = edits_to_blocks(&git_diff::algorithm::diff_edits(base, theirs));

    let mut regions = Vec::new();
    let mut base_pos = 0usize;
    let mut oi = 0usize;
    let mut ti = 0usize;

    let push_context = |regions: &mut Vec<MergeRegion>, from: usize, to: usize| {
        if from < to {
            regions.push(MergeRegion {
                region_type: RegionType::Context,
                base_start: (from + 1) as u32,
                base_lines: owned_lines(&base_lines, from, to),
                ours_lines: None,
                theirs_lines: None,
            });
        }
    };

    while oi < ours_blocks.len() || ti < theirs_blocks.len() {
        match (ours_blocks.get(oi), theirs_blocks.get(ti)) {
            (Some(o), None) => {
                push_context(&mut regions, base_pos, o.base_start);
                regions.push(MergeRegion {
                    region_type: RegionType::Ours,
                    base_start: (o.base_start + 1) as u32,
                    base_lines: owned_lines(&base_lines, o.base_start, o.base_end),
                    ours_lines: Some(owned_lines(&ours_lines, o.new_start, o.new_end)),
                    theirs_lines: None,
                });
                base_pos = o.base_end;
                oi += 1;
            }
            (None, Some(t)) => {
                push_context(&mut regions, base_pos, t.base_start);
                regions.push(MergeRegion {
                    region_type: RegionType::Theirs,
                    base_start: (t.base_start + 1) as u32,
                    base_lines: owned_lines(&base_lines, t.base_start, t.base_end),
                    ours_lines: None,
                    theirs_lines: Some(owned_lines(&theirs_lines, t.new_start, t.new_end)),
                });
                base_pos = t.base_end;
                ti += 1;
            }
            (Some(o), Some(t)) => {
                if !overlaps_or_touches(o, t) {
                    if o.base_start <= t.base_start {
                        push_context(&mut regions, base_pos, o.base_start);
                        regions.push(MergeRegion {
                            region_type: RegionType::Ours,
                            base_start: (o.base_start + 1) as u32,
                            base_lines: owned_lines(&base_lines, o.base_start, o.base_end),
                            ours_lines: Some(owned_lines(&ours_lines, o.new_start, o.new_end)),
                            theirs_lines: None,
                        });
                        base_pos = o.base_end;
                        oi += 1;
                    } else {
                        push_context(&mut regions, base_pos, t.base_start);
                        regions.push(MergeRegion {
                            region_type: RegionType::Theirs,
                            base_start: (t.base_start + 1) as u32,
                            base_lines: owned_lines(&base_lines, t.base_start, t.base_end),
                            ours_lines: None,
                            theirs_lines: Some(owned_lines(&theirs_lines, t.new_start, t.new_end)),
                        });
                        base_pos = t.base_end;
                        ti += 1;
                    }
                    continue;
                }

                // Consume every chained overlapping block from both sides.
                let mut ours_chain = vec![*o];
                let mut theirs_chain = vec![*t];
                oi += 1;
                ti += 1;
                let mut union_end = o.base_end.max(t.base_end);

                loop {
                    let mut grew = false;
                    if let Some(next_o) = ours_blocks.get(oi) {
                        if next_o.base_start <= union_end {
                            union_end = union_end.max(next_o.base_end);
                            ours_chain.push(*next_o);
                            oi += 1;
                            grew = true;
                        }
                    }
                    if let Some(next_t) = theirs_blocks.get(ti) {
                        if next_t.base_start <= union_end {
                            union_end = union_end.max(next_t.base_end);
                            theirs_chain.push(*next_t);
                            ti += 1;
                            grew = true;
                        }
                    }
                    if !grew {
                        break;
                    }
                }

                let union_start = o.base_start.min(t.base_start);
                push_context(&mut regions, base_pos, union_start);

                let ours_union_start = ours_chain.iter().map(|b| b.base_start).min().unwrap();
                let ours_union_end = ours_chain.iter().map(|b| b.base_end).max().unwrap();
                let theirs_union_start = theirs_chain.iter().map(|b| b.base_start).min().unwrap();
                let theirs_union_end = theirs_chain.iter().map(|b| b.base_end).max().unwrap();

                let ours_content: Vec<BString> = ours_chain
                    .iter()
                    .flat_map(|b| owned_lines(&ours_lines, b.new_start, b.new_end))
                    .collect();
                let theirs_content: Vec<BString> = theirs_chain
                    .iter()
                    .flat_map(|b| owned_lines(&theirs_lines, b.new_start, b.new_end))
                    .collect();

                let is_clean = ours_chain.len() == 1
                    && theirs_chain.len() == 1
                    && ours_content == theirs_content
                    && ours_union_start == theirs_union_start
                    && ours_union_end == theirs_union_end;

                let base_lines_span = owned_lines(&base_lines, union_start, union_end);
                if is_clean {
                    regions.push(MergeRegion {
                        region_type: RegionType::Ours,
                        base_start: (union_start + 1) as u32,
                        base_lines: base_lines_span,
                        ours_lines: Some(ours_content),
                        theirs_lines: None,
                    });
                } else {
                    regions.push(MergeRegion {
                        region_type: RegionType::Conflict,
                        base_start: (union_start + 1) as u32,
                        base_lines: base_lines_span,
                        ours_lines: Some(ours_content),
                        theirs_lines: Some(theirs_content),
                    });
                }
                base_pos = union_end;
            }
            (None, None) => unreachable!(),
        }
    }

    push_context(&mut regions, base_pos, base_lines.len());
    regions
}
