use opdoc_tree::{
    load, load_file, outline, to_asciidoc, to_tree, BlockMacroProcessor, Document, ExtensionError,
    Extensions, IncludeProcessor, LoadOptions, MacroInvocation, Node, NodeKind, Preprocessor,
    Severity,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

struct Echo;

impl BlockMacroProcessor for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn process(
        &self,
        invocation: &MacroInvocation,
        document: &mut Document,
    ) -> Result<(), ExtensionError> {
        if invocation.target == "fail" {
            return Err(ExtensionError::Failed("refused".into()));
        }
        let mut node = Node::new(NodeKind::Paragraph);
        node.lines.push(format!(
            "{} at line {}",
            invocation.target, invocation.cursor.line
        ));
        document.append(invocation.parent, node);
        Ok(())
    }
}

struct DefaultSnippets;

impl Preprocessor for DefaultSnippets {
    fn name(&self) -> &str {
        "default-snippets"
    }

    fn process(&self, document: &mut Document) -> Result<(), ExtensionError> {
        document
            .attributes_mut()
            .set_default("snippets", "generated");
        Ok(())
    }
}

struct Broken;

impl Preprocessor for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn process(&self, _document: &mut Document) -> Result<(), ExtensionError> {
        Err(ExtensionError::Failed("nope".into()))
    }
}

struct Greeting;

impl IncludeProcessor for Greeting {
    fn name(&self) -> &str {
        "greeting"
    }

    fn handles(&self, target: &str) -> bool {
        target.starts_with("greet:")
    }

    fn process(
        &self,
        invocation: &MacroInvocation,
        _document: &mut Document,
    ) -> Result<String, ExtensionError> {
        match invocation.target.strip_prefix("greet:") {
            Some("") => Err(ExtensionError::Failed("no one to greet".into())),
            Some(who) => Ok(format!("=== Hello {who}\n\nWelcome.\n")),
            None => Ok(String::new()),
        }
    }
}

fn section_ids(document: &Document) -> Vec<String> {
    document
        .sections()
        .into_iter()
        .filter_map(|id| document.node(id).id.clone())
        .collect()
}

#[test]
fn header_attributes_and_api_locks() {
    let input = "= Guide\n:snippets: from-doc\n:product: Widgets\n\n== About {product}\n";
    let document = load(input, LoadOptions::new().with_attribute("snippets", "api"));

    assert_eq!(document.title(), Some("Guide"));
    assert_eq!(document.attribute("snippets"), Some("api"));
    assert_eq!(document.attribute("product"), Some("Widgets"));
    assert_eq!(section_ids(&document), vec!["_about_widgets".to_string()]);
}

#[test]
fn generated_ids_are_unique_and_anchors_win() {
    let document = load(
        "== Links\n\n== Links\n\n[[custom]]\n== Other\n",
        LoadOptions::new(),
    );

    assert_eq!(
        section_ids(&document),
        vec!["_links", "_links_2", "custom"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
    let custom = document.find_by_id("custom").unwrap();
    assert!(!document.node(custom).generated_id);
}

#[test]
fn warns_when_sections_skip_levels() {
    let document = load("= Doc\n\n== One\n\n==== Too deep\n", LoadOptions::new());
    let warnings: Vec<_> = document.warnings().collect();

    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "section title out of sequence: expected level 2, got level 3"
    );
    assert_eq!(warnings[0].cursor.as_ref().map(|c| c.line), Some(5));
}

#[test]
fn block_macros_dispatch_to_registered_processors() {
    let options = LoadOptions::new().with_extensions(Extensions::new().block_macro(Echo));
    let document = load(
        "== Section\n\necho::hello[]\n\necho::fail[]\n\nother::thing[x]\n",
        options,
    );

    let section = document.sections()[0];
    let children: Vec<_> = document
        .children(section)
        .iter()
        .map(|id| document.node(*id))
        .collect();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].kind, NodeKind::Paragraph);
    assert_eq!(children[0].lines, vec!["hello at line 3".to_string()]);
    assert_eq!(children[1].kind, NodeKind::BlockMacro);
    assert_eq!(children[1].attributes.positional(0), Some("x"));

    let errors: Vec<_> = document
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "echo block macro failed: refused");
    assert_eq!(errors[0].cursor.as_ref().map(|c| c.line), Some(5));
}

#[test]
fn preprocessors_see_header_attributes() {
    let extensions = Extensions::new().preprocessor(DefaultSnippets);

    let defaulted = load(
        "= Doc\n\nBody\n",
        LoadOptions::new().with_extensions(extensions.clone()),
    );
    assert_eq!(defaulted.attribute("snippets"), Some("generated"));

    let explicit = load(
        "= Doc\n:snippets: custom\n\nBody\n",
        LoadOptions::new().with_extensions(extensions),
    );
    assert_eq!(explicit.attribute("snippets"), Some("custom"));
}

#[test]
fn failing_preprocessor_is_a_warning() {
    let document = load(
        "Body\n",
        LoadOptions::new().with_extensions(Extensions::new().preprocessor(Broken)),
    );
    let warnings: Vec<_> = document.warnings().map(|w| w.message.clone()).collect();
    assert_eq!(warnings, vec!["broken preprocessor failed: nope".to_string()]);
    assert_eq!(document.children(document.root()).len(), 1);
}

#[test]
fn asciidoc_writer_reproduces_normalised_source() {
    let input = "= Guide\n:sectnums:\n\n== Getting started\n\nIntro text.\n\n[source,bash]\n----\n$ curl localhost\n----\n\n=== Details\n\nNOTE: Remember this.\n";
    let document = load(input, LoadOptions::new());

    assert_eq!(to_asciidoc(&document), input);

    let reparsed = load(&to_asciidoc(&document), LoadOptions::new());
    assert_eq!(to_asciidoc(&reparsed), input);
}

#[test]
fn outline_numbers_sections_when_enabled() {
    let input = "= Guide\n:sectnums:\n\n== Getting started\n\n=== Details\n\n== Reference\n";
    let document = load(input, LoadOptions::new());

    assert_eq!(
        outline(&document),
        "Guide\n1. Getting started [_getting_started]\n  1.1. Details [_details]\n2. Reference [_reference]\n"
    );
}

#[test]
fn reports_unresolved_references() {
    let document = load(
        "== Target\n\nSee <<_target>> and <<_missing,gone>>.\n",
        LoadOptions::new(),
    );
    let unresolved = document.unresolved_references();

    assert_eq!(document.references().len(), 2);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].target, "_missing");
    assert_eq!(unresolved[0].text.as_deref(), Some("gone"));
}

#[test]
fn load_file_sets_document_location_attributes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("guide.adoc");
    std::fs::write(&path, "= Guide\n\n== One\n").unwrap();

    let document = load_file(&path, LoadOptions::new()).unwrap();
    let expected_dir = dir.path().canonicalize().unwrap().display().to_string();

    assert_eq!(document.attribute("docname"), Some("guide"));
    assert_eq!(document.attribute("docdir"), Some(expected_dir.as_str()));
    assert_eq!(document.source_path(), Some(path.as_path()));
}

#[test]
fn tree_serialises_to_json() {
    let document = load("== One\n\nText\n", LoadOptions::new());
    let value = serde_json::to_value(to_tree(&document)).unwrap();

    assert_eq!(value["kind"], "document");
    assert_eq!(value["children"][0]["kind"], "section");
    assert_eq!(value["children"][0]["id"], "_one");
    assert_eq!(value["children"][0]["section_kind"], "section");
    assert_eq!(value["children"][0]["children"][0]["lines"][0], "Text");
}

#[test]
fn paragraphs_end_at_anchor_and_attribute_lines() {
    let document = load(
        "== Widgets\n\nBody text\n[[_next]]\n=== Next\n\nIntro\n[source,bash]\n----\n$ curl\n----\n",
        LoadOptions::new(),
    );

    assert_eq!(
        section_ids(&document),
        vec!["_widgets".to_string(), "_next".to_string()]
    );
    let next = document.find_by_id("_next").unwrap();
    let kinds: Vec<_> = document
        .children(next)
        .iter()
        .map(|id| document.node(*id).kind)
        .collect();
    assert_eq!(kinds, vec![NodeKind::Paragraph, NodeKind::Listing]);
    let listing = document.children(next)[1];
    assert_eq!(document.node(listing).attributes.positional(1), Some("bash"));
}

#[test]
fn include_processors_push_text_in_place() {
    let options = LoadOptions::new().with_extensions(Extensions::new().include_processor(Greeting));
    let document = load(
        "== Visitors\n\ninclude::greet:Ada[]\n\ninclude::greet:[]\n\ninclude::other.adoc[]\n",
        options,
    );

    assert_eq!(
        section_ids(&document),
        vec!["_visitors".to_string(), "_hello_ada".to_string()]
    );
    let hello = document.find_by_id("_hello_ada").unwrap();
    assert_eq!(document.node(hello).level, 2);
    assert_eq!(document.node(hello).line, Some(3));
    let raw = document.children(hello)[1];
    assert_eq!(document.node(raw).kind, NodeKind::BlockMacro);

    let errors: Vec<_> = document
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "include::greet: failed: no one to greet");
    assert_eq!(errors[0].cursor.as_ref().map(|c| c.line), Some(5));
}

#[test]
fn block_metadata_before_a_processed_macro_does_not_leak() {
    let options = LoadOptions::new().with_extensions(Extensions::new().block_macro(Echo));
    let document = load(
        "== Section\n\n[[lost]]\n.Lost title\necho::hello[]\n\nAfter\n",
        options,
    );

    assert!(document.find_by_id("lost").is_none());
    let section = document.sections()[0];
    let children: Vec<_> = document
        .children(section)
        .iter()
        .map(|id| document.node(*id))
        .collect();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|node| node.id.is_none() && node.title.is_none()));
    assert_eq!(children[1].lines, vec!["After".to_string()]);
}
