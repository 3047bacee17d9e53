//! Templates written by `docpack init`.

/// Template for a project-level `.docpack.toml`.
pub fn local_template() -> String {
    String::from(
        r#"# docpack project configuration.
# Settings here override ~/.docpack.toml. Uncomment to change a default.

# Stop looking for configuration in parent directories.
# root = true

[repack]
# Token budget per repacked chunk.
# max_tokens = 2000
# Tokenizer encoding: cl100k_base, o200k_base, p50k_base, p50k_edit, r50k_base.
# encoding = "cl100k_base"
# Chunk group to repack.
# group = "pages"

[resolve]
# Maximum nesting while resolving document content.
# max_depth = 64
"#,
    )
}

/// Template for the global `~/.docpack.toml`.
pub fn global_template() -> String {
    String::from(
        r#"# docpack global configuration.
# Project .docpack.toml files take precedence over these settings.

[repack]
# max_tokens = 2000
# encoding = "cl100k_base"
# group = "pages"

[resolve]
# max_depth = 64
"#,
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::parse_config_str;

    #[test]
    fn test_templates_parse() {
        for template in [local_template(), global_template()] {
            let config = parse_config_str(&template, Path::new("template.toml")).unwrap();
            assert!(config.root.is_none());
            let repack = config.repack.unwrap();
            assert!(repack.max_tokens.is_none());
        }
    }
}
