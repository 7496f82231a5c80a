pub mod assemble;
pub mod compose;
pub mod diff;
pub mod error;
pub mod fs;
pub mod include;
pub mod operation;
pub mod preprocess;
pub mod render;
pub mod resolver;
pub mod selector;
pub mod splice;
pub mod title;

pub use assemble::{
    assemble, extensions, render_output, AssembleOptions, AssembleOutcome, AssembleRequest,
};
pub use compose::{compose, parse_fragment, Composition};
pub use error::{AssembleError, ExitCode, ResolveError};
pub use include::SnippetIncludeProcessor;
pub use operation::{compose_operation_section, snippets_dir, OperationBlockMacro, OperationRequest};
pub use opdoc_config::{BuildSystem, OutputFormat};
pub use preprocess::DefaultAttributesPreprocessor;
pub use render::{anchor_id, render_section, RenderedSnippet};
pub use resolver::resolve_snippets_dir;
pub use selector::{select, Snippet};
pub use splice::splice;
pub use title::{default_title, title_attribute, title_for};
