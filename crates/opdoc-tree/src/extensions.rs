//! Extension points: block macro processors, include processors and
//! preprocessors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::attributes::AttributeList;
use crate::diagnostics::Cursor;
use crate::document::{Document, NodeId};

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A block macro line (`name::target[attributes]`) handed to its processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroInvocation {
    pub name: String,
    pub target: String,
    pub attributes: AttributeList,
    /// Node the macro appears under; processors attach their output here.
    pub parent: NodeId,
    pub cursor: Cursor,
}

pub trait BlockMacroProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// Mutate `document` in place. Processors never hand a node back to the
    /// parser; anything they produce is appended under `invocation.parent`.
    fn process(
        &self,
        invocation: &MacroInvocation,
        document: &mut Document,
    ) -> Result<(), ExtensionError>;
}

/// Runs after the header is read and before the body is parsed.
pub trait Preprocessor: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, document: &mut Document) -> Result<(), ExtensionError>;
}

/// Supplies replacement text for `include::<target>[]` lines whose target it
/// handles. The text is parsed as if it had been written in place.
pub trait IncludeProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn handles(&self, target: &str) -> bool;

    fn process(
        &self,
        invocation: &MacroInvocation,
        document: &mut Document,
    ) -> Result<String, ExtensionError>;
}

#[derive(Clone, Default)]
pub struct Extensions {
    block_macros: BTreeMap<String, Arc<dyn BlockMacroProcessor>>,
    include_processors: Vec<Arc<dyn IncludeProcessor>>,
    preprocessors: Vec<Arc<dyn Preprocessor>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_macro<P>(mut self, processor: P) -> Self
    where
        P: BlockMacroProcessor + 'static,
    {
        self.register_block_macro(Arc::new(processor));
        self
    }

    pub fn include_processor<P>(mut self, processor: P) -> Self
    where
        P: IncludeProcessor + 'static,
    {
        self.include_processors.push(Arc::new(processor));
        self
    }

    pub fn preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: Preprocessor + 'static,
    {
        self.preprocessors.push(Arc::new(preprocessor));
        self
    }

    /// Register a processor, replacing any previous one with the same name.
    pub fn register_block_macro(&mut self, processor: Arc<dyn BlockMacroProcessor>) {
        self.block_macros
            .insert(processor.name().to_string(), processor);
    }

    pub fn find_block_macro(&self, name: &str) -> Option<Arc<dyn BlockMacroProcessor>> {
        self.block_macros.get(name).cloned()
    }

    /// First registered include processor that handles `target`.
    pub fn find_include(&self, target: &str) -> Option<Arc<dyn IncludeProcessor>> {
        self.include_processors
            .iter()
            .find(|processor| processor.handles(target))
            .cloned()
    }

    pub fn preprocessors(&self) -> &[Arc<dyn Preprocessor>] {
        &self.preprocessors
    }

    pub fn is_empty(&self) -> bool {
        self.block_macros.is_empty()
            && self.include_processors.is_empty()
            && self.preprocessors.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("block_macros", &self.block_macros.keys().collect::<Vec<_>>())
            .field(
                "include_processors",
                &self
                    .include_processors
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "preprocessors",
                &self
                    .preprocessors
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
