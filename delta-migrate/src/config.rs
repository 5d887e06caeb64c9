//! Migration configuration (`delta.toml`).
//!
//! ```toml
//! [generator]
//! comment_out_unsafe = true
//! helper_functions = true
//! quote_all_identifiers = false
//!
//! [[renames]]
//! old = "username"
//! new = "user_name"
//! scope = "column"
//! table = "users"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::change::RenameHint;
use crate::error::{MigrateResult, MigrationError};

/// Top-level migration configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    /// DDL generation settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Operator-declared renames, applied to every comparison.
    #[serde(default)]
    pub renames: Vec<RenameHint>,
}

impl MigrateConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> MigrateResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|source| MigrationError::Config { source })?;
        tracing::debug!(renames = config.renames.len(), "loaded migration config");
        Ok(config)
    }

    /// Add a rename hint.
    pub fn rename(mut self, hint: RenameHint) -> Self {
        self.renames.push(hint);
        self
    }

    /// Replace the generator settings.
    pub fn generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }
}

/// DDL generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Emit unsafe statements commented out, with their safety note.
    #[serde(default = "default_true")]
    pub comment_out_unsafe: bool,

    /// Create helper functions that defaults depend on.
    #[serde(default = "default_true")]
    pub helper_functions: bool,

    /// Quote every identifier, not only those that require it.
    #[serde(default)]
    pub quote_all_identifiers: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            comment_out_unsafe: true,
            helper_functions: true,
            quote_all_identifiers: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl GeneratorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether unsafe statements are commented out.
    pub fn comment_out_unsafe(mut self, enabled: bool) -> Self {
        self.comment_out_unsafe = enabled;
        self
    }

    /// Set whether helper functions are generated.
    pub fn helper_functions(mut self, enabled: bool) -> Self {
        self.helper_functions = enabled;
        self
    }

    /// Set whether all identifiers are quoted.
    pub fn quote_all_identifiers(mut self, enabled: bool) -> Self {
        self.quote_all_identifiers = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::RenameScope;

    #[test]
    fn test_defaults() {
        let config = MigrateConfig::from_str("").unwrap();
        assert_eq!(config, MigrateConfig::default());
        assert!(config.generator.comment_out_unsafe);
        assert!(config.generator.helper_functions);
        assert!(!config.generator.quote_all_identifiers);
    }

    #[test]
    fn test_parse_full() {
        let config = MigrateConfig::from_str(
            r#"
            [generator]
            comment_out_unsafe = false
            quote_all_identifiers = true

            [[renames]]
            old = "users"
            new = "accounts"
            scope = "table"

            [[renames]]
            old = "username"
            new = "user_name"
            scope = "column"
            table = "accounts"
            "#,
        )
        .unwrap();

        assert!(!config.generator.comment_out_unsafe);
        assert!(config.generator.helper_functions);
        assert!(config.generator.quote_all_identifiers);
        assert_eq!(config.renames.len(), 2);
        assert_eq!(config.renames[0], RenameHint::table("users", "accounts"));
        assert_eq!(config.renames[1].scope, RenameScope::Column);
        assert_eq!(config.renames[1].table.as_deref(), Some("accounts"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = MigrateConfig::from_str("[generator]\ncolour = true\n").unwrap_err();
        assert!(matches!(err, MigrationError::Config { .. }));

        let err = MigrateConfig::from_str("[[renames]]\nold = \"a\"\nnew = \"b\"\nscope = \"view\"\n")
            .unwrap_err();
        assert!(matches!(err, MigrationError::Config { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = MigrateConfig::from_file("/nonexistent/delta.toml").unwrap_err();
        match err {
            MigrationError::Io { path, .. } => assert!(path.ends_with("delta.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builders() {
        let config = MigrateConfig::default()
            .generator(GeneratorConfig::new().comment_out_unsafe(false).helper_functions(false))
            .rename(RenameHint::column("a", "b"));
        assert!(!config.generator.comment_out_unsafe);
        assert!(!config.generator.helper_functions);
        assert_eq!(config.renames.len(), 1);
    }
}
