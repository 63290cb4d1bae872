use std::collections::{HashMap, hash_map::Entry};

use log::debug;

use crate::Error;

/// Resolves parameter names to their one based ordinals.
///
/// Built once from the declared labels. Labels which are missing or empty are skipped, so the
/// corresponding parameters can only be addressed by ordinal. If a label is declared more than
/// once, the first declaration wins. Lookups are case sensitive.
///
/// Once closed, every lookup fails with [`Error::StatementClosed`].
///
/// ```
/// use engine_driver::{Error, parameter::ParameterNameMap};
///
/// let mut names = ParameterNameMap::new([Some("@p0"), Some(""), Some("@p2")]);
/// assert_eq!(3, names.resolve("@p2").unwrap());
/// assert!(matches!(names.resolve("@p1"), Err(Error::ParameterNotFound { .. })));
///
/// names.close();
/// assert!(matches!(names.resolve("@p2"), Err(Error::StatementClosed)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParameterNameMap {
    /// `None` once closed.
    names: Option<HashMap<String, u16>>,
}

impl ParameterNameMap {
    pub fn new<'a>(labels: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut names = HashMap::new();
        for (index, label) in labels.into_iter().enumerate() {
            let Some(label) = label.filter(|label| !label.is_empty()) else {
                continue;
            };
            let Ok(ordinal) = u16::try_from(index + 1) else {
                debug!("Parameter '{label}' exceeds the maximum number of parameters. Skipped.");
                continue;
            };
            match names.entry(label.to_owned()) {
                Entry::Vacant(entry) => {
                    entry.insert(ordinal);
                }
                Entry::Occupied(entry) => {
                    debug!(
                        "Parameter name '{label}' is declared for ordinals {} and {ordinal}. \
                        Resolving it to the first one.",
                        entry.get()
                    );
                }
            }
        }
        Self { names: Some(names) }
    }

    /// One based ordinal of the parameter called `name`.
    pub fn resolve(&self, name: &str) -> Result<u16, Error> {
        let names = self.names.as_ref().ok_or(Error::StatementClosed)?;
        names
            .get(name)
            .copied()
            .ok_or_else(|| Error::ParameterNotFound {
                name: name.to_owned(),
            })
    }

    /// Clears the map. Irreversible.
    pub fn close(&mut self) {
        self.names = None;
    }

    pub fn is_closed(&self) -> bool {
        self.names.is_none()
    }

    /// Number of names which can be resolved. `0` once closed.
    pub fn len(&self) -> usize {
        self.names.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::Error;

    use super::ParameterNameMap;

    #[test_case("@p0", 1; "first")]
    #[test_case("@p2", 3; "after blank label")]
    fn resolve_declared_name(name: &str, expected: u16) {
        let names = ParameterNameMap::new([Some("@p0"), Some(""), Some("@p2")]);
        assert_eq!(expected, names.resolve(name).unwrap());
    }

    #[test_case(""; "blank")]
    #[test_case("@p1"; "skipped position")]
    #[test_case("@P0"; "case differs")]
    fn unknown_name(name: &str) {
        let names = ParameterNameMap::new([Some("@p0"), Some(""), Some("@p2")]);
        match names.resolve(name) {
            Err(Error::ParameterNotFound { name: reported }) => assert_eq!(name, reported),
            other => panic!("Expected parameter not found, got {other:?}"),
        }
    }

    #[test]
    fn missing_labels_are_skipped() {
        let names = ParameterNameMap::new([None, Some("@b")]);
        assert_eq!(1, names.len());
        assert_eq!(2, names.resolve("@b").unwrap());
    }

    #[test]
    fn first_duplicate_wins() {
        let names = ParameterNameMap::new([Some("@a"), Some("@a")]);
        assert_eq!(1, names.resolve("@a").unwrap());
    }

    #[test]
    fn closed_map_reports_closed_statement() {
        let mut names = ParameterNameMap::new([Some("@a")]);

        names.close();
        names.close();

        assert!(names.is_closed());
        assert!(matches!(names.resolve("@a"), Err(Error::StatementClosed)));
        assert!(matches!(names.resolve("@b"), Err(Error::StatementClosed)));
    }
}
