use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: Option<String>,
    pub repository: String,
    pub tag: String,
}

#[derive(Debug)]
pub enum ParseError {
    MissingRepository,
    MissingTag,
    InvalidFormat(String),
    DigestNotAllowed,
}

impl std::error::Error for ParseError {}
impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::DigestNotAllowed => write!(f, "digest references are not allowed"),
            ParseError::MissingRepository => write!(f, "repository is missing"),
            ParseError::MissingTag => write!(f, "tag is missing"),
            ParseError::InvalidFormat(image) => write!(f, "invalid image format: {}", image),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.registry {
            Some(registry) => write!(f, "{}/{}:{}", registry, self.repository, self.tag),
            None => write!(f, "{}:{}", self.repository, self.tag),
        }
    }
}

impl ImageReference {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        // digest-pinned references would make the update check meaningless
        if s.contains('@') {
            return Err(ParseError::DigestNotAllowed);
        }

        // Must contain a tag (colon after last slash)
        let (without_tag, tag) = if let Some(pos) = s.rfind(':') {
            let last_slash = s.rfind('/').unwrap_or(0);
            if pos > last_slash {
                (&s[..pos], Some(s[pos + 1..].to_string()))
            } else {
                (s, None)
            }
        } else {
            (s, None)
        };
        let tag = tag.ok_or(ParseError::MissingTag)?;

        if without_tag.is_empty() {
            return Err(ParseError::MissingRepository);
        }

        // A first path component containing '.' or ':' (or "localhost") is a
        // registry hostname; everything else belongs to the repository, which
        // the runtime resolves against its default registry.
        let (registry, repository) = match without_tag.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                if rest.is_empty() {
                    return Err(ParseError::InvalidFormat(s.to_string()));
                }
                (Some(first.to_string()), rest.to_string())
            }
            _ => (None, without_tag.to_string()),
        };

        Ok(Self {
            registry,
            repository,
            tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_registry() {
        let reference = ImageReference::parse("registry.example.com/team/app:1.2.3")
            .expect("Parsing should succeed");
        assert_eq!(reference.registry.as_deref(), Some("registry.example.com"));
        assert_eq!(reference.repository, "team/app");
        assert_eq!(reference.tag, "1.2.3");
    }

    #[test]
    fn test_parse_without_registry() {
        let reference = ImageReference::parse("user/app:latest").expect("Parsing should succeed");
        assert_eq!(reference.registry, None);
        assert_eq!(reference.repository, "user/app");
        assert_eq!(reference.tag, "latest");
    }

    #[test]
    fn test_parse_bare_repository() {
        let reference = ImageReference::parse("nginx:1.27").expect("Parsing should succeed");
        assert_eq!(reference.registry, None);
        assert_eq!(reference.repository, "nginx");
        assert_eq!(reference.tag, "1.27");
    }

    #[test]
    fn test_parse_registry_with_port() {
        let reference =
            ImageReference::parse("localhost:5000/app:dev").expect("Parsing should succeed");
        assert_eq!(reference.registry.as_deref(), Some("localhost:5000"));
        assert_eq!(reference.repository, "app");
        assert_eq!(reference.tag, "dev");
    }

    #[test]
    fn test_parse_rejects_digest_reference() {
        let result = ImageReference::parse("nginx@sha256:abc123");
        assert!(matches!(result, Err(ParseError::DigestNotAllowed)));
    }

    #[test]
    fn test_parse_rejects_missing_tag() {
        let result = ImageReference::parse("registry.example.com/team/app");
        assert!(matches!(result, Err(ParseError::MissingTag)));
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["registry.example.com/team/app:1.2.3", "nginx:1.27"] {
            let reference = ImageReference::parse(input).expect("Parsing should succeed");
            assert_eq!(reference.to_string(), input);
        }
    }
}
