use serde::{Deserialize, Serialize};

/// Description attached to every locally generated item.
pub const PLACEHOLDER_DESCRIPTION: &str = "Doesn't matter";

/// The atomic unit of output.
///
/// Items are leaves: they reference nothing and are never mutated after a
/// producer creates them. Ownership moves from the producer, through the
/// shared channel, to whoever drains the stream.
///
/// The wire names (`ID`, `Name`, `Description`) are fixed and case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Description")]
    description: String,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Builds the `index`-th item of `source`.
    ///
    /// The identifier is scoped by the source (`"<source>_<index>"`) so items
    /// from different producers never collide.
    pub fn for_source(source: &str, index: usize) -> Self {
        Self {
            id: format!("{source}_{index}"),
            name: format!("Name_{index}"),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the source prefix of the identifier, if it has one.
    pub fn source(&self) -> Option<&str> {
        self.id.rsplit_once('_').map(|(source, _)| source)
    }
}
