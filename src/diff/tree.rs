//! Generic JSON tree diff
//!
//! Produces add/remove/replace deltas with segment paths between two value
//! trees, in a stable depth-first traversal order. Array elements are
//! compared positionally, but only while the elements at a position share a
//! natural key; past that point the original's surplus becomes removes and
//! the updated's surplus becomes adds. The alignment pass in
//! [`super::generate`] reorders lists so that key-sharing elements sit in
//! that common prefix.
//!
//! Remove and replace indices are intermediate-state indices, the way RFC
//! 6902 generators emit them: each remove shifts the elements behind it, so
//! consecutive removes land on the same index. The translation pass undoes
//! this with its per-attribute offset.

use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;

use crate::resource::get_field;

/// Kind of a tree delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    /// Value present only in the updated tree
    Add,
    /// Value present only in the original tree
    Remove,
    /// Value differs between the trees
    Replace,
}

/// One step of a delta path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
}

/// Delta path; SCIM documents are shallow, so paths rarely spill
pub type SegmentPath = SmallVec<[Segment; 4]>;

/// One difference between the two trees
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDelta {
    /// What happened at the path
    pub kind: DeltaKind,
    /// Where it happened
    pub path: SegmentPath,
    /// The updated-side value (`None` for removes)
    pub value: Option<Value>,
}

impl fmt::Display for TreeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DeltaKind::Add => "add",
            DeltaKind::Remove => "remove",
            DeltaKind::Replace => "replace",
        };
        write!(f, "{kind} ")?;
        for segment in &self.path {
            match segment {
                Segment::Key(k) => write!(f, "/{k}")?,
                Segment::Index(i) => write!(f, "/{i}")?,
            }
        }
        Ok(())
    }
}

/// The discriminator identifying a multi-valued element across versions:
/// its `type` sub-attribute if present, else its `value` sub-attribute,
/// else the scalar (or whole) value itself.
pub fn natural_key(element: &Value) -> Value {
    if element.is_object() {
        if let Some(t) = get_field(element, "type") {
            return t.clone();
        }
        if let Some(v) = get_field(element, "value") {
            return v.clone();
        }
    }
    element.clone()
}

/// Diff two value trees
pub fn diff_trees(original: &Value, updated: &Value) -> Vec<TreeDelta> {
    let mut deltas = Vec::new();
    diff_value(original, updated, &mut SegmentPath::new(), &mut deltas);
    deltas
}

fn diff_value(original: &Value, updated: &Value, path: &mut SegmentPath, out: &mut Vec<TreeDelta>) {
    match (original, updated) {
        (Value::Object(_), Value::Object(_)) => diff_objects(original, updated, path, out),
        (Value::Array(orig), Value::Array(upd)) => diff_arrays(orig, upd, path, out),
        (o, u) if o == u => {}
        (_, u) => out.push(TreeDelta {
            kind: DeltaKind::Replace,
            path: path.clone(),
            value: Some(u.clone()),
        }),
    }
}

fn diff_objects(original: &Value, updated: &Value, path: &mut SegmentPath, out: &mut Vec<TreeDelta>) {
    let orig_map = original.as_object().expect("checked object");
    let upd_map = updated.as_object().expect("checked object");

    for (key, orig_value) in orig_map {
        path.push(Segment::Key(key.clone()));
        match get_field(updated, key) {
            Some(upd_value) => diff_value(orig_value, upd_value, path, out),
            None => out.push(TreeDelta {
                kind: DeltaKind::Remove,
                path: path.clone(),
                value: None,
            }),
        }
        path.pop();
    }

    for (key, upd_value) in upd_map {
        if get_field(original, key).is_some() {
            continue;
        }
        path.push(Segment::Key(key.clone()));
        out.push(TreeDelta {
            kind: DeltaKind::Add,
            path: path.clone(),
            value: Some(upd_value.clone()),
        });
        path.pop();
    }
}

fn diff_arrays(original: &[Value], updated: &[Value], path: &mut SegmentPath, out: &mut Vec<TreeDelta>) {
    // positional prefix of key-matching pairs; the alignment pass has already
    // moved key-sharing elements to the front on both sides
    let mut prefix = 0;
    while prefix < original.len()
        && prefix < updated.len()
        && natural_key(&original[prefix]) == natural_key(&updated[prefix])
    {
        prefix += 1;
    }

    for i in 0..prefix {
        path.push(Segment::Index(i));
        diff_value(&original[i], &updated[i], path, out);
        path.pop();
    }

    // surplus original elements vanish one by one at the same visible index
    for _ in prefix..original.len() {
        path.push(Segment::Index(prefix));
        out.push(TreeDelta {
            kind: DeltaKind::Remove,
            path: path.clone(),
            value: None,
        });
        path.pop();
    }

    for (i, element) in updated.iter().enumerate().skip(prefix) {
        path.push(Segment::Index(i));
        out.push(TreeDelta {
            kind: DeltaKind::Add,
            path: path.clone(),
            value: Some(element.clone()),
        });
        path.pop();
    }
}
