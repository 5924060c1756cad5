use async_trait::async_trait;
use std::path::PathBuf;
use std::str::FromStr;

/// A single way of retrieving a schema definition.
///
/// The resolver holds an ordered list of fetchers and tries them in turn.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    /// Short name used in logs and in `SchemaUnavailableError`.
    fn variant(&self) -> String;

    /// Retrieve the schema definition document (Avro JSON) for `schema_id`.
    async fn fetch(&self, schema_id: &str) -> anyhow::Result<String>;
}

/// A configured schema retrieval variant.
///
/// Parsed from the `--schema-versions` list:
///
/// - `grpc` - the Pub/Sub API `GetSchema` call
/// - `64.0` or `v64.0` - the REST event schema endpoint of that API version
/// - `file:<dir>` - `<dir>/<schema_id>.avsc` or `.json` on local disk
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaVariant {
    Grpc,
    Rest(String),
    File(PathBuf),
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVariant::Grpc => write!(f, "grpc"),
            SchemaVariant::Rest(version) => write!(f, "rest v{version}"),
            SchemaVariant::File(dir) => write!(f, "file {}", dir.display()),
        }
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("grpc") {
            return Ok(SchemaVariant::Grpc);
        }
        if let Some(dir) = s.strip_prefix("file:") {
            if dir.is_empty() {
                return Err("file schema variant needs a directory: file:<dir>".to_string());
            }
            return Ok(SchemaVariant::File(PathBuf::from(dir)));
        }

        let version = s.strip_prefix('v').unwrap_or(s);
        let valid = !version.is_empty()
            && version.split('.').all(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())
            });
        if !valid {
            return Err(format!(
                "Invalid schema variant '{s}': expected 'grpc', an API version like '64.0', or 'file:<dir>'"
            ));
        }
        Ok(SchemaVariant::Rest(version.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!("grpc".parse::<SchemaVariant>().unwrap(), SchemaVariant::Grpc);
        assert_eq!(
            "64.0".parse::<SchemaVariant>().unwrap(),
            SchemaVariant::Rest("64.0".to_string())
        );
        assert_eq!(
            "v59.0".parse::<SchemaVariant>().unwrap(),
            SchemaVariant::Rest("59.0".to_string())
        );
        assert_eq!(
            "file:./schemas".parse::<SchemaVariant>().unwrap(),
            SchemaVariant::File(PathBuf::from("./schemas"))
        );
    }

    #[test]
    fn test_parse_invalid_variants() {
        assert!("".parse::<SchemaVariant>().is_err());
        assert!("file:".parse::<SchemaVariant>().is_err());
        assert!("64.x".parse::<SchemaVariant>().is_err());
        assert!("http".parse::<SchemaVariant>().is_err());
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(SchemaVariant::Grpc.to_string(), "grpc");
        assert_eq!(
            SchemaVariant::Rest("61.0".to_string()).to_string(),
            "rest v61.0"
        );
    }
}
