use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const WILDCARD: &str = "*";

/// Value half of a path element: a concrete name or the wildcard marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Wildcard,
    Literal(String),
}

/// One `key=value` step of a resource address, e.g. `stack=*` or `transport=TRANSPORT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathElement {
    pub key: String,
    pub value: Segment,
}

/// Address of a resource: the ordered elements from the subsystem root down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    elements: Vec<PathElement>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathParseError {
    #[error("Path element '{0}' is not of the form key=value")]
    MissingSeparator(String),

    #[error("Path element '{0}' has an empty key or value")]
    EmptyPart(String),
}

impl PathElement {
    pub fn literal(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Segment::Literal(name.into()),
        }
    }

    pub fn wildcard(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Segment::Wildcard,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.value, Segment::Wildcard)
    }

    /// The literal name, or `None` for a wildcard element.
    pub fn name(&self) -> Option<&str> {
        match &self.value {
            Segment::Literal(name) => Some(name),
            Segment::Wildcard => None,
        }
    }

    /// Whether `self`, used as a pattern, accepts `concrete` at the same position.
    ///
    /// Keys must be equal. A wildcard accepts any value; a literal only accepts
    /// the identical literal.
    pub fn matches(&self, concrete: &PathElement) -> bool {
        if self.key != concrete.key {
            return false;
        }
        match self.value {
            Segment::Wildcard => true,
            Segment::Literal(_) => self.value == concrete.value,
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Segment::Wildcard => write!(f, "{}={}", self.key, WILDCARD),
            Segment::Literal(name) => write!(f, "{}={}", self.key, name),
        }
    }
}

impl FromStr for PathElement {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| PathParseError::MissingSeparator(s.to_string()))?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            return Err(PathParseError::EmptyPart(s.to_string()));
        }

        if value == WILDCARD {
            Ok(PathElement::wildcard(key))
        } else {
            Ok(PathElement::literal(key, value))
        }
    }
}

impl Serialize for PathElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl ResourcePath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// A new path with `element` appended; `self` is left as is.
    pub fn append(&self, element: PathElement) -> Self {
        let mut elements = self.elements.clone();
        elements.push(element);
        Self { elements }
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// True when no element is a wildcard, i.e. the path addresses exactly one resource.
    pub fn is_concrete(&self) -> bool {
        self.elements.iter().all(|element| !element.is_wildcard())
    }

    /// Whether this path, used as a pattern, addresses `concrete`.
    pub fn matches(&self, concrete: &ResourcePath) -> bool {
        matches(self, concrete)
    }
}

/// Two paths match iff they have equal length and each element of
/// `wildcard_path` accepts the element of `concrete_path` at the same position.
pub fn matches(wildcard_path: &ResourcePath, concrete_path: &ResourcePath) -> bool {
    wildcard_path.len() == concrete_path.len()
        && wildcard_path
            .elements
            .iter()
            .zip(&concrete_path.elements)
            .all(|(pattern, concrete)| pattern.matches(concrete))
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return write!(f, "/");
        }
        for element in &self.elements {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

impl FromStr for ResourcePath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let elements = s
            .trim()
            .split('/')
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<PathElement>, _>>()?;
        Ok(Self { elements })
    }
}

impl From<Vec<PathElement>> for ResourcePath {
    fn from(elements: Vec<PathElement>) -> Self {
        Self::new(elements)
    }
}

impl Serialize for ResourcePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourcePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ResourcePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_element_parse_and_display() {
        let element: PathElement = "stack=*".parse().unwrap();
        assert!(element.is_wildcard());
        assert_eq!(element.to_string(), "stack=*");

        let element: PathElement = "transport=TRANSPORT".parse().unwrap();
        assert_eq!(element.name(), Some("TRANSPORT"));
    }

    #[test]
    fn test_element_parse_errors() {
        assert_eq!(
            "transport".parse::<PathElement>(),
            Err(PathParseError::MissingSeparator("transport".to_string()))
        );
        assert!("=tcp".parse::<PathElement>().is_err());
        assert!("transport=".parse::<PathElement>().is_err());
    }

    #[test]
    fn test_wildcard_matches_any_single_name() {
        let pattern = PathElement::wildcard("transport");
        assert!(pattern.matches(&PathElement::literal("transport", "tcp")));
        assert!(pattern.matches(&PathElement::literal("transport", "udp")));
        assert!(!pattern.matches(&PathElement::literal("protocol", "tcp")));
    }

    #[test]
    fn test_literal_matches_only_itself() {
        let pattern = PathElement::literal("relay", "RELAY");
        assert!(pattern.matches(&PathElement::literal("relay", "RELAY")));
        assert!(!pattern.matches(&PathElement::literal("relay", "other")));
        assert!(!pattern.matches(&PathElement::wildcard("relay")));
    }

    #[test]
    fn test_path_matching() {
        let pattern = path("subsystem=cluster-transport/stack=*/transport=TRANSPORT");
        assert!(matches(&pattern, &path("subsystem=cluster-transport/stack=udp/transport=TRANSPORT")));
        assert!(matches(&pattern, &path("/subsystem=cluster-transport/stack=tcp/transport=TRANSPORT")));
        assert!(!matches(&pattern, &path("subsystem=cluster-transport/stack=udp")));
        assert!(!matches(&pattern, &path("subsystem=other/stack=udp/transport=TRANSPORT")));
        assert!(matches(&ResourcePath::empty(), &ResourcePath::empty()));
    }

    #[test]
    fn test_path_display_round_trip() {
        let p = ResourcePath::empty()
            .append(PathElement::literal("subsystem", "cluster-transport"))
            .append(PathElement::wildcard("stack"));
        assert_eq!(p.to_string(), "/subsystem=cluster-transport/stack=*");
        assert_eq!(path(&p.to_string()), p);
        assert_eq!(ResourcePath::empty().to_string(), "/");
        assert!(!p.is_concrete());
    }
}
