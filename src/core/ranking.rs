//! Ranks the files of a tree by size, largest first.

use rayon::prelude::*;
use serde::Serialize;

use super::model::walk_tree;
use super::TreeEntry;

/// A file and its reported size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedFile {
    pub path: String,
    pub size: u64,
}

/// Returns up to `limit` files ordered by size descending, ties broken by path.
///
/// Files without a reported size are left out.
pub fn files_by_size(tree: &[TreeEntry], limit: usize) -> Vec<RankedFile> {
    let mut files = Vec::new();
    walk_tree(tree, |entry| {
        if let (false, Some(size)) = (entry.is_directory, entry.size) {
            files.push(RankedFile {
                path: entry.path.clone(),
                size,
            });
        }
    });

    files.par_sort_unstable_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    files.truncate(limit);
    files
}
