use std::path::{Component, Path, PathBuf};

use opdoc_config::BuildSystem;
use opdoc_tree::Attributes;
use tracing::debug;

use crate::error::ResolveError;

const MAVEN_SNIPPETS: &str = "target/generated-snippets";
const GRADLE_SNIPPETS: &str = "build/generated-snippets";

/// Default snippets directory for the given build layout.
///
/// Maven yields a path relative to `docdir` pointing at
/// `target/generated-snippets` beside the nearest `pom.xml`; Gradle yields
/// `build/generated-snippets` beneath the project directory. `Auto` picks
/// Maven when a `pom.xml` is found at or above `docdir`.
pub fn resolve_snippets_dir(
    build_system: BuildSystem,
    attributes: &Attributes,
) -> Result<PathBuf, ResolveError> {
    let resolved = match build_system {
        BuildSystem::Maven => maven_snippets_dir(attributes),
        BuildSystem::Gradle => gradle_snippets_dir(attributes),
        BuildSystem::Auto => {
            let has_pom = attributes
                .get("docdir")
                .map(|docdir| find_pom_dir(Path::new(docdir)).is_some())
                .unwrap_or(false);
            if has_pom {
                maven_snippets_dir(attributes)
            } else {
                gradle_snippets_dir(attributes)
            }
        }
    }?;
    debug!(%build_system, dir = %resolved.display(), "resolved snippets directory");
    Ok(resolved)
}

fn maven_snippets_dir(attributes: &Attributes) -> Result<PathBuf, ResolveError> {
    let docdir = Path::new(attributes.get("docdir").ok_or(ResolveError::MissingDocdir)?);
    let pom_dir = find_pom_dir(docdir).ok_or_else(|| ResolveError::PomNotFound {
        docdir: docdir.to_path_buf(),
    })?;
    Ok(relative_to(docdir, pom_dir).join(MAVEN_SNIPPETS))
}

fn gradle_snippets_dir(attributes: &Attributes) -> Result<PathBuf, ResolveError> {
    let projectdir = attributes
        .get("gradle-projectdir")
        .or_else(|| attributes.get("projectdir"))
        .ok_or(ResolveError::MissingProjectdir)?;
    Ok(Path::new(projectdir).join(GRADLE_SNIPPETS))
}

fn find_pom_dir(docdir: &Path) -> Option<&Path> {
    docdir
        .ancestors()
        .find(|dir| dir.join("pom.xml").is_file())
}

/// Path leading from `from` up to its ancestor `ancestor`, e.g. `../..`.
fn relative_to(from: &Path, ancestor: &Path) -> PathBuf {
    let depth = from
        .strip_prefix(ancestor)
        .map(|rest| {
            rest.components()
                .filter(|component| matches!(component, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    (0..depth).map(|_| Component::ParentDir).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn attributes(entries: &[(&str, &str)]) -> Attributes {
        let mut attributes = Attributes::new();
        for (name, value) in entries {
            attributes.set(*name, *value);
        }
        attributes
    }

    #[test]
    fn maven_path_is_relative_to_docdir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        let docdir = dir.path().join("src/main/asciidoc");
        let docdir = docdir.display().to_string();

        let resolved = resolve_snippets_dir(
            BuildSystem::Maven,
            &attributes(&[("docdir", docdir.as_str())]),
        )
        .unwrap();
        assert!(resolved.is_relative());
        assert_eq!(resolved, PathBuf::from("../../../target/generated-snippets"));
    }

    #[test]
    fn maven_requires_pom_and_docdir() {
        let dir = tempdir().unwrap();
        let docdir = dir.path().join("src/main/asciidoc");
        let docdir_value = docdir.display().to_string();
        let err = resolve_snippets_dir(
            BuildSystem::Maven,
            &attributes(&[("docdir", docdir_value.as_str())]),
        )
        .unwrap_err();
        assert_eq!(err, ResolveError::PomNotFound { docdir });

        let err = resolve_snippets_dir(BuildSystem::Maven, &Attributes::new()).unwrap_err();
        assert_eq!(err.to_string(), "docdir attribute not found");
    }

    #[test]
    fn gradle_uses_projectdir() {
        let resolved = resolve_snippets_dir(
            BuildSystem::Gradle,
            &attributes(&[("projectdir", "project/dir")]),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("project/dir/build/generated-snippets"));

        let resolved = resolve_snippets_dir(
            BuildSystem::Gradle,
            &attributes(&[("projectdir", "ignored"), ("gradle-projectdir", "gradle/dir")]),
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("gradle/dir/build/generated-snippets"));

        let err = resolve_snippets_dir(BuildSystem::Gradle, &Attributes::new()).unwrap_err();
        assert_eq!(err, ResolveError::MissingProjectdir);
    }

    #[test]
    fn auto_detects_maven_layout() {
        let dir = tempdir().unwrap();
        let docdir = dir.path().join("docs");
        fs::create_dir_all(&docdir).unwrap();
        let docdir = docdir.display().to_string();

        let gradle = resolve_snippets_dir(
            BuildSystem::Auto,
            &attributes(&[("docdir", docdir.as_str()), ("projectdir", "/project")]),
        )
        .unwrap();
        assert_eq!(gradle, PathBuf::from("/project/build/generated-snippets"));

        fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        let maven = resolve_snippets_dir(
            BuildSystem::Auto,
            &attributes(&[("docdir", docdir.as_str()), ("projectdir", "/project")]),
        )
        .unwrap();
        assert_eq!(maven, PathBuf::from("../target/generated-snippets"));
    }
}
