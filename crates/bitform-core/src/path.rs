//! C5 — slash-separated path resolution over a field tree (spec §4.5).
//!
//! A path is a sequence of `/`-separated segments. A leading `/` makes it
//! absolute (resolved from the tree's root); otherwise it is resolved
//! relative to a given field set. Segments `.` and `..` navigate without
//! consuming a child; `name[n]` addresses an explicit array index;
//! `name[]` addresses the last sibling materialized so far under `name`,
//! driving the generator one step if none exists yet. Resolution only
//! materializes as many children as the path actually needs (spec §3
//! invariant 6, "lazy boundedness").

use crate::error::{Error, PathError};
use crate::fieldset::{FieldSet, Node};
use std::rc::Rc;

/// Resolves `path` against `from`, honoring a leading `/` as "start over at
/// `root`" rather than `from`.
pub fn resolve(root: &Rc<FieldSet>, from: &Rc<FieldSet>, path: &str) -> Result<Node, Error> {
    let (mut cursor, rest) = if let Some(rest) = path.strip_prefix('/') {
        (Rc::clone(root), rest)
    } else {
        (Rc::clone(from), path)
    };

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Ok(Node::Set(cursor));
    }

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == segments.len() - 1;

        if *segment == "." {
            continue;
        }
        if *segment == ".." {
            // Root has no parent; ".." from root stays at root (spec §3
            // invariant 8), rather than erroring.
            cursor = cursor.parent().unwrap_or(cursor);
            continue;
        }

        let child = resolve_segment(&cursor, segment)?;

        let Some(child) = child else {
            return Err(PathError::NotFound {
                path: path.to_owned(),
                segment: (*segment).to_owned(),
            }
            .into());
        };

        if is_last {
            return Ok((*child).clone());
        }

        match &*child {
            Node::Set(set) => cursor = Rc::clone(set),
            Node::Leaf(_) => {
                return Err(PathError::NotAFieldSet {
                    path: path.to_owned(),
                    segment: (*segment).to_owned(),
                }
                .into())
            }
        }
    }

    Ok(Node::Set(cursor))
}

/// `name`, `name[n]` or `name[]` against one field set's children.
fn resolve_segment(set: &Rc<FieldSet>, segment: &str) -> Result<Option<Rc<Node>>, Error> {
    if let Some(base) = segment.strip_suffix("[]") {
        return set.last_in_array(base);
    }

    if let Some(open) = segment.find('[') {
        if let Some(idx_str) = segment[open + 1..].strip_suffix(']') {
            if let Ok(idx) = idx_str.parse::<u64>() {
                let base = &segment[..open];
                return set.child_by_name(&format!("{base}[{idx}]"));
            }
        }
    }

    set.child_by_name(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::Endian;
    use crate::fieldset::{FnGenerator, GenCtx};
    use crate::settings::Settings;
    use crate::stream::{Charset, InputStream};

    fn tree() -> Rc<FieldSet> {
        let stream = Rc::new(InputStream::from_bytes(b"ABCDwxyz".to_vec()));
        let mut made_inner = false;
        let mut made_trailer = false;
        FieldSet::new(
            "root".to_owned(),
            0,
            stream,
            Endian::Big,
            Settings::default(),
            None,
            Box::new(FnGenerator::new(move |ctx: &GenCtx| {
                if !made_inner {
                    made_inner = true;
                    let mut entry_i = 0u32;
                    return Ok(Some(ctx.field_set(
                        "entries[]",
                        None,
                        Some(32),
                        Box::new(FnGenerator::new(move |inner: &GenCtx| {
                            if entry_i >= 2 {
                                return Ok(None);
                            }
                            entry_i += 1;
                            Ok(Some(inner.string(2, Charset::Ascii, None, "tag[]")?))
                        })),
                    )));
                }
                if !made_trailer {
                    made_trailer = true;
                    return Ok(Some(ctx.string(4, Charset::Ascii, None, "trailer")?));
                }
                Ok(None)
            })),
        )
    }

    #[test]
    fn absolute_descent_into_array_entry() {
        let root = tree();
        let node = resolve(&root, &root, "/entries[0]/tag[1]").unwrap();
        assert_eq!(node.value().as_text(), Some("CD"));
    }

    #[test]
    fn last_sibling_shorthand() {
        let root = tree();
        let node = resolve(&root, &root, "/entries[]/tag[]").unwrap();
        assert_eq!(node.name(), "tag[1]");
    }

    #[test]
    fn dotdot_returns_to_parent() {
        let root = tree();
        let entries = resolve(&root, &root, "/entries[0]").unwrap();
        let Node::Set(entries_set) = entries else {
            panic!("expected a field set");
        };
        let back = resolve(&root, &entries_set, "..").unwrap();
        assert_eq!(back.name(), "root");
    }

    #[test]
    fn not_found_reports_segment() {
        let root = tree();
        let err = resolve(&root, &root, "/nope").unwrap_err();
        assert!(matches!(err, Error::Path(PathError::NotFound { .. })));
    }

    #[test]
    fn descending_through_leaf_is_an_error() {
        let root = tree();
        let err = resolve(&root, &root, "/trailer/anything").unwrap_err();
        assert!(matches!(err, Error::Path(PathError::NotAFieldSet { .. })));
    }

    #[test]
    fn lazy_boundedness_stops_at_target() {
        let root = tree();
        resolve(&root, &root, "/entries[0]/tag[0]").unwrap();
        // The trailer hasn't been asked for, so it must not be materialized.
        assert_eq!(root.materialized_len(), 1);
    }
}
