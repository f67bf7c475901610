//! Folding a referenced schema into the node that referenced it.
//!
//! Every keyword of the referent overwrites the referencing node, except
//! `title` (matched case-insensitively), which is never taken from the
//! referent. Keywords that only the referencing node has are kept. The
//! consumed `$ref` is removed.

use serde_json::{Map, Value};

use crate::schema::{Schema, REF, TITLE};

/// Merge `source` into `target` and drop `target`'s `$ref`.
pub fn merge(target: &mut Schema, source: Schema) {
    merge_into(target.as_map_mut(), source.into_map());
}

pub(crate) fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (keyword, value) in source {
        if keyword == REF || keyword.eq_ignore_ascii_case(TITLE) {
            continue;
        }
        target.insert(keyword, value);
    }

    target.shift_remove(REF);
}
