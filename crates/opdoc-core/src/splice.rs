use opdoc_tree::{Document, NodeId};
use tracing::debug;

use crate::operation::MAX_SNIPPET_LEVEL;

/// Move the top-level nodes of `fragment` under `parent` in `document`.
///
/// Sections land one level below `parent` (never deeper than the deepest
/// section marker) and blocks at `parent`'s level;
/// descendants keep their relative depth. Section kinds are recomputed for the
/// enclosing doctype and the id registry is rebuilt from the whole tree so the
/// new anchors resolve. Returns the ids of the inserted nodes, in order.
pub fn splice(fragment: &Document, document: &mut Document, parent: NodeId) -> Vec<NodeId> {
    let parent_level = document.node(parent).level;
    let section_level = (parent_level + 1).min(MAX_SNIPPET_LEVEL);
    let mut inserted = Vec::new();

    for child in fragment.children(fragment.root()) {
        let grafted = document.graft(fragment, *child, parent);
        let level = if document.node(grafted).is_section() {
            section_level
        } else {
            parent_level
        };
        document.relevel(grafted, level);
        document.classify_sections(grafted);
        inserted.push(grafted);
    }

    document.rebuild_catalog();
    debug!(
        parent = parent.index(),
        inserted = inserted.len(),
        "spliced fragment"
    );
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use opdoc_tree::{load, LoadOptions, NodeKind, SectionKind};

    #[test]
    fn relevels_and_reparents_fragment_nodes() {
        let mut document = load("= Book\n:doctype: book\n\n= Part\n\n== Chapter\n", LoadOptions::new());
        let chapter = document.find_by_id("_chapter").unwrap();
        assert_eq!(document.node(chapter).level, 1);

        let fragment = load(
            "Intro\n\n[[_chapter_links]]\n=== Links\n\n==== Nested\n",
            LoadOptions::new().with_parent_level(1),
        );
        let inserted = splice(&fragment, &mut document, chapter);

        assert_eq!(inserted.len(), 2);
        assert_eq!(document.children(chapter), inserted.as_slice());
        assert_eq!(document.node(inserted[0]).kind, NodeKind::Paragraph);
        assert_eq!(document.node(inserted[0]).level, 1);

        let links = inserted[1];
        assert_eq!(document.parent(links), Some(chapter));
        assert_eq!(document.node(links).level, 2);
        assert_eq!(document.node(links).section_kind, Some(SectionKind::Section));
        let nested = document.children(links)[0];
        assert_eq!(document.node(nested).level, 3);
        assert_eq!(document.find_by_id("_chapter_links"), Some(links));
        assert_eq!(document.find_by_id("_nested"), Some(nested));
    }

    #[test]
    fn duplicate_anchor_is_reported() {
        let mut document = load("[[_links]]\n== Links\n", LoadOptions::new());
        let root = document.root();
        let fragment = load("[[_links]]\n== Links again\n", LoadOptions::new());

        splice(&fragment, &mut document, root);
        assert_eq!(document.warnings().count(), 1);
        assert_eq!(document.sections().len(), 2);
    }
}
