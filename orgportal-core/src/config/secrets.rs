use super::ConfigError;

/// Resolves the reference inside a `${...}` placeholder.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError>;
}

/// Default resolver: environment variables and files.
///
/// - `${VAR_NAME}` and `${env:VAR_NAME}` read an environment variable
/// - `${file:/path/to/secret}` reads a file (trimmed)
pub struct DefaultSecretResolver;

impl SecretResolver for DefaultSecretResolver {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
        let reference = reference.trim();
        if let Some(path) = reference.strip_prefix("file:") {
            let path = path.trim();
            return std::fs::read_to_string(path)
                .map(|s| s.trim().to_string())
                .map_err(|e| ConfigError::Load(format!("secret file '{path}': {e}")));
        }
        let var = reference.strip_prefix("env:").unwrap_or(reference).trim();
        std::env::var(var).map_err(|_| ConfigError::NotFound(format!("env:{var}")))
    }
}

/// Replace every `${...}` placeholder in `value`.
pub fn resolve_placeholders(
    value: &str,
    resolver: &dyn SecretResolver,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("unclosed placeholder in: {value}")))?;
        out.push_str(&resolver.resolve(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl SecretResolver for Fixed {
        fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
            Ok(format!("<{reference}>"))
        }
    }

    #[test]
    fn replaces_every_placeholder() {
        let out = resolve_placeholders("postgres://${user}:${pass}@db", &Fixed).unwrap();
        assert_eq!(out, "postgres://<user>:<pass>@db");
    }

    #[test]
    fn resolved_values_are_not_rescanned() {
        struct Nested;
        impl SecretResolver for Nested {
            fn resolve(&self, _: &str) -> Result<String, ConfigError> {
                Ok("${again}".into())
            }
        }
        assert_eq!(resolve_placeholders("${x}", &Nested).unwrap(), "${again}");
    }

    #[test]
    fn unclosed_placeholder_is_an_error() {
        assert!(resolve_placeholders("${UNCLOSED", &Fixed).is_err());
    }
}
