use opdoc_config::BuildSystem;
use opdoc_tree::{Document, ExtensionError, Preprocessor};

use crate::resolver::resolve_snippets_dir;

/// Supplies the `snippets` attribute from the build layout when neither the
/// caller nor the document header set it.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAttributesPreprocessor {
    build_system: BuildSystem,
}

impl DefaultAttributesPreprocessor {
    pub fn new(build_system: BuildSystem) -> Self {
        Self { build_system }
    }
}

impl Preprocessor for DefaultAttributesPreprocessor {
    fn name(&self) -> &str {
        "default-attributes"
    }

    fn process(&self, document: &mut Document) -> Result<(), ExtensionError> {
        let attributes = document.attributes();
        if attributes.contains("snippets") || attributes.is_locked("snippets") {
            return Ok(());
        }

        let dir = resolve_snippets_dir(self.build_system, attributes)
            .map_err(|err| ExtensionError::Failed(err.to_string()))?;
        document
            .attributes_mut()
            .set_default("snippets", dir.display().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opdoc_tree::{load, Extensions, LoadOptions};

    fn options(build_system: BuildSystem) -> LoadOptions {
        LoadOptions::new().with_extensions(
            Extensions::new().preprocessor(DefaultAttributesPreprocessor::new(build_system)),
        )
    }

    #[test]
    fn sets_snippets_when_absent() {
        let document = load(
            "Body\n",
            options(BuildSystem::Gradle).with_attribute("projectdir", "/project"),
        );
        assert_eq!(
            document.attribute("snippets"),
            Some("/project/build/generated-snippets")
        );
    }

    #[test]
    fn keeps_api_and_header_values() {
        let api = load(
            "Body\n",
            options(BuildSystem::Gradle)
                .with_attribute("projectdir", "/project")
                .with_attribute("snippets", "custom"),
        );
        assert_eq!(api.attribute("snippets"), Some("custom"));

        let header = load(
            "= Doc\n:snippets: from-header\n\nBody\n",
            options(BuildSystem::Gradle).with_attribute("projectdir", "/project"),
        );
        assert_eq!(header.attribute("snippets"), Some("from-header"));
    }

    #[test]
    fn resolution_failure_is_a_warning() {
        let document = load("Body\n", options(BuildSystem::Gradle));
        let warnings: Vec<_> = document.warnings().map(|w| w.message.clone()).collect();
        assert_eq!(
            warnings,
            vec!["default-attributes preprocessor failed: projectdir attribute not found".to_string()]
        );
        assert_eq!(document.attribute("snippets"), None);
    }
}
