//! Parsing of `$ref` values.

use std::fmt;

use crate::error::ResolveError;

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Parsed form of a `$ref` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `#/definitions/<name>` within the current document.
    Local { name: String },
    /// A file path or URL, optionally followed by `#/definitions/<name>`.
    External { path: String, anchor: Option<String> },
}

impl Reference {
    /// Parse a raw `$ref` string found in the document at `location`.
    ///
    /// Only the `definitions` collection is addressable by a fragment;
    /// any other JSON Pointer is rejected.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidReference` for empty references and
    /// fragments that don't name a single definition.
    pub fn parse(raw: &str, location: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidReference {
            location: location.to_string(),
            reference: raw.to_string(),
        };

        let (path, fragment) = match raw.find('#') {
            Some(idx) => (&raw[..idx], Some(&raw[idx..])),
            None => (raw, None),
        };

        let anchor = match fragment {
            None => None,
            // A bare "#" on an external path means the whole document
            Some("#") if !path.is_empty() => None,
            Some(frag) => Some(parse_definition_name(frag).ok_or_else(invalid)?),
        };

        if path.is_empty() {
            return anchor.map(|name| Reference::Local { name }).ok_or_else(invalid);
        }

        Ok(Reference::External {
            path: path.to_string(),
            anchor,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Local { name } => write!(f, "{}{}", DEFINITIONS_PREFIX, escape(name)),
            Reference::External { path, anchor } => {
                write!(f, "{}", path)?;
                if let Some(name) = anchor {
                    write!(f, "{}{}", DEFINITIONS_PREFIX, escape(name))?;
                }
                Ok(())
            }
        }
    }
}

/// Extract `<name>` from `#/definitions/<name>`, undoing JSON Pointer escapes.
fn parse_definition_name(fragment: &str) -> Option<String> {
    let name = fragment.strip_prefix(DEFINITIONS_PREFIX)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
    Some(name.replace("~1", "/").replace("~0", "~"))
}

fn escape(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Reference, ResolveError> {
        Reference::parse(raw, "main.json")
    }

    #[test]
    fn parse_local_anchor() {
        assert_eq!(
            parse("#/definitions/Foo").unwrap(),
            Reference::Local { name: "Foo".into() }
        );
    }

    #[test]
    fn parse_local_anchor_unescapes_pointer() {
        assert_eq!(
            parse("#/definitions/a~1b~0c").unwrap(),
            Reference::Local {
                name: "a/b~c".into()
            }
        );
    }

    #[test]
    fn parse_external_path() {
        assert_eq!(
            parse("./nested/folder/x.json").unwrap(),
            Reference::External {
                path: "./nested/folder/x.json".into(),
                anchor: None
            }
        );
    }

    #[test]
    fn parse_external_url() {
        assert_eq!(
            parse("https://example.com/schemas/a.json").unwrap(),
            Reference::External {
                path: "https://example.com/schemas/a.json".into(),
                anchor: None
            }
        );
    }

    #[test]
    fn parse_external_with_anchor() {
        assert_eq!(
            parse("common.json#/definitions/Address").unwrap(),
            Reference::External {
                path: "common.json".into(),
                anchor: Some("Address".into())
            }
        );
    }

    #[test]
    fn parse_external_with_empty_fragment() {
        assert_eq!(
            parse("common.json#").unwrap(),
            Reference::External {
                path: "common.json".into(),
                anchor: None
            }
        );
    }

    #[test]
    fn parse_rejects_unsupported_pointers() {
        for raw in [
            "",
            "#",
            "#/$defs/Foo",
            "#/properties/a",
            "#/definitions/",
            "#/definitions/Foo/properties/a",
            "other.json#/properties/a",
        ] {
            assert!(
                matches!(parse(raw), Err(ResolveError::InvalidReference { .. })),
                "expected {:?} to be rejected",
                raw
            );
        }
    }

    #[test]
    fn display_round_trips_escapes() {
        let reference = Reference::Local {
            name: "a/b".into(),
        };
        assert_eq!(reference.to_string(), "#/definitions/a~1b");
    }
}
