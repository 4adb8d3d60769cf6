//! Dot-path addressing over a [`ConfigTree`]

use super::error::ConfigError;
use super::value::{ensure_finite, ConfigTree, ConfigValue};

/// Separator between key path segments
pub const SEPARATOR: char = '.';

/// Outcome of walking a key path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a ConfigValue),
    NotFound,
}

impl<'a> Lookup<'a> {
    pub fn found(self) -> Option<&'a ConfigValue> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// Split a key path, rejecting empty paths and empty segments
pub fn split_key_path(key_path: &str) -> Result<Vec<&str>, ConfigError> {
    let segments: Vec<&str> = key_path.split(SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidKeyPath(key_path.to_string()));
    }
    Ok(segments)
}

/// Walk the tree level by level; stops at the first missing key or non-table node
pub fn lookup<'a>(tree: &'a ConfigTree, key_path: &str) -> Lookup<'a> {
    let Ok(segments) = split_key_path(key_path) else {
        return Lookup::NotFound;
    };
    let Some((last, parents)) = segments.split_last() else {
        return Lookup::NotFound;
    };

    let mut current = tree;
    for segment in parents {
        match current.get(*segment) {
            Some(ConfigValue::Table(child)) => current = child,
            _ => return Lookup::NotFound,
        }
    }

    match current.get(*last) {
        Some(value) => Lookup::Found(value),
        None => Lookup::NotFound,
    }
}

/// Assign `value` at `key_path`, creating missing intermediate tables.
///
/// Fails without touching the tree when an existing intermediate is not a
/// table, or when `value` holds a non-finite float.
pub fn assign(
    tree: &mut ConfigTree,
    key_path: &str,
    value: ConfigValue,
) -> Result<(), ConfigError> {
    let segments = split_key_path(key_path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(ConfigError::InvalidKeyPath(key_path.to_string()));
    };
    ensure_finite(&value, key_path)?;
    check_parents(tree, key_path, parents)?;

    let mut current = tree;
    for (depth, segment) in parents.iter().enumerate() {
        let slot = current
            .entry((*segment).to_string())
            .or_insert_with(|| ConfigValue::Table(ConfigTree::new()));
        current = match slot {
            ConfigValue::Table(child) => child,
            _ => return Err(not_a_table(key_path, &parents[..=depth])),
        };
    }

    current.insert((*last).to_string(), value);
    Ok(())
}

/// Read-only pass over the existing part of the path, so a blocked path is
/// reported before any table is created
fn check_parents(tree: &ConfigTree, key_path: &str, parents: &[&str]) -> Result<(), ConfigError> {
    let mut current = tree;
    for (depth, segment) in parents.iter().enumerate() {
        match current.get(*segment) {
            Some(ConfigValue::Table(child)) => current = child,
            Some(_) => return Err(not_a_table(key_path, &parents[..=depth])),
            None => break,
        }
    }
    Ok(())
}

fn not_a_table(key_path: &str, prefix: &[&str]) -> ConfigError {
    ConfigError::NotATable {
        key_path: key_path.to_string(),
        segment: prefix.join(SEPARATOR.to_string().as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigTree {
        let mut tree = ConfigTree::new();
        assign(&mut tree, "server.port", 8765.into()).unwrap();
        assign(&mut tree, "server.host", "0.0.0.0".into()).unwrap();
        tree
    }

    #[test]
    fn test_lookup_found() {
        let tree = sample();
        assert_eq!(
            lookup(&tree, "server.port"),
            Lookup::Found(&ConfigValue::Integer(8765))
        );
        assert!(lookup(&tree, "server").found().unwrap().is_table());
    }

    #[test]
    fn test_lookup_missing() {
        let tree = sample();
        assert_eq!(lookup(&tree, "server.nonexistent"), Lookup::NotFound);
        assert_eq!(lookup(&tree, "nope.port"), Lookup::NotFound);
    }

    #[test]
    fn test_lookup_through_scalar() {
        let tree = sample();
        assert_eq!(lookup(&tree, "server.port.value"), Lookup::NotFound);
    }

    #[test]
    fn test_lookup_malformed_path() {
        let tree = sample();
        assert_eq!(lookup(&tree, ""), Lookup::NotFound);
        assert_eq!(lookup(&tree, "server..port"), Lookup::NotFound);
    }

    #[test]
    fn test_assign_auto_vivifies() {
        let mut tree = ConfigTree::new();
        assign(&mut tree, "newcat.newkey", 42.into()).unwrap();

        let newcat = tree["newcat"].as_table().unwrap();
        assert_eq!(newcat["newkey"], ConfigValue::Integer(42));
    }

    #[test]
    fn test_assign_through_scalar_is_rejected() {
        let mut tree = sample();
        let before = tree.clone();

        let err = assign(&mut tree, "server.port.value", 1.into()).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::NotATable { ref segment, .. } if segment == "server.port"
        ));
        assert_eq!(tree, before);
        assert_eq!(lookup(&tree, "server.port").found(), Some(&ConfigValue::Integer(8765)));
    }

    #[test]
    fn test_assign_blocked_deep_path_creates_nothing() {
        let mut tree = sample();
        let before = tree.clone();

        assert!(assign(&mut tree, "server.host.a.b", 1.into()).is_err());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_assign_rejects_non_finite_float() {
        let mut tree = ConfigTree::new();
        let err = assign(&mut tree, "processing.scale_bias", f64::INFINITY.into()).unwrap_err();

        assert!(matches!(err, ConfigError::NonFiniteFloat { .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_assign_rejects_empty_segment() {
        let mut tree = ConfigTree::new();
        assert!(matches!(
            assign(&mut tree, "a..b", 1.into()),
            Err(ConfigError::InvalidKeyPath(_))
        ));
        assert!(assign(&mut tree, "", 1.into()).is_err());
        assert!(tree.is_empty());
    }
}
