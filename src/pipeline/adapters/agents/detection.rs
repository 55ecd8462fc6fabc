//! Test framework detection from marker files.

use std::path::Path;

/// A framework and the command that runs its tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestFramework {
    /// Framework name.
    pub name: &'static str,
    /// Files whose presence at the root identifies the framework.
    pub markers: &'static [&'static str],
    /// Command run from the root.
    pub command: &'static str,
}

/// Frameworks in detection order; the first match wins.
pub const KNOWN_FRAMEWORKS: &[TestFramework] = &[
    TestFramework {
        name: "pytest",
        markers: &["pytest.ini", "pyproject.toml", "setup.cfg", "conftest.py"],
        command: "python -m pytest",
    },
    TestFramework {
        name: "jest",
        markers: &["package.json", "jest.config.js", "jest.config.ts"],
        command: "npm test",
    },
    TestFramework {
        name: "go_test",
        markers: &["go.mod"],
        command: "go test ./...",
    },
    TestFramework {
        name: "maven",
        markers: &["pom.xml"],
        command: "mvn test",
    },
    TestFramework {
        name: "gradle",
        markers: &["build.gradle", "build.gradle.kts"],
        command: "./gradlew test",
    },
    TestFramework {
        name: "rust",
        markers: &["Cargo.toml"],
        command: "cargo test",
    },
    TestFramework {
        name: "phpunit",
        markers: &["phpunit.xml", "composer.json"],
        command: "./vendor/bin/phpunit",
    },
];

/// Fallback for bare `test_*.py` files with no marker.
const UNITTEST: TestFramework = TestFramework {
    name: "unittest",
    markers: &[],
    command: "python -m unittest discover",
};

/// Detects how to run a repository's tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestDetector;

impl TestDetector {
    /// Returns the framework for the tree at `root`, if any.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from inspecting the root.
    pub async fn detect(self, root: &Path) -> std::io::Result<Option<TestFramework>> {
        for framework in KNOWN_FRAMEWORKS {
            for marker in framework.markers {
                if tokio::fs::try_exists(root.join(marker)).await? {
                    return Ok(Some(*framework));
                }
            }
        }

        let mut entries = tokio::fs::read_dir(root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let is_python_test = name
                .to_str()
                .is_some_and(|file| file.starts_with("test_") && file.ends_with(".py"));
            if is_python_test {
                return Ok(Some(UNITTEST));
            }
        }
        Ok(None)
    }
}
