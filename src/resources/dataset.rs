use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{Error, Result},
    resources::{Modification, RelativeId},
};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Id(pub String);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Name(pub String);

/// A dataset document as the server returns it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub external_id: Option<String>,
    pub name: Name,
    pub description: Option<String>,
    pub version: String,
    pub key_attribute_names: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: Modification,
    pub last_modified: Modification,
    pub relative_id: RelativeId,
}

impl Dataset {
    pub fn id(&self) -> Id {
        Id(self.relative_id.resource_id().to_owned())
    }
}

/// A dataset addressed through a project's path (for example
/// `projects/1/recordPairs`) rather than by its own id. Alias paths support
/// the refresh action but not direct lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetAlias(pub RelativeId);

/// The output dataset a project materializes its results into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedDataset {
    pub url: Url,
    pub name: Name,
    pub key_attribute_names: Vec<String>,
    pub description: Option<String>,
}

impl UnifiedDataset {
    pub(crate) fn from_body(url: Url, body: UnifiedDatasetBody) -> Self {
        UnifiedDataset {
            url,
            name: body.name,
            key_attribute_names: body.key_attribute_names,
            description: body.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UnifiedDatasetBody {
    pub name: Name,
    pub key_attribute_names: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Id(Id),
    Name(Name),
}

impl From<Id> for Identifier {
    fn from(id: Id) -> Self {
        Identifier::Id(id)
    }
}

impl From<Name> for Identifier {
    fn from(name: Name) -> Self {
        Identifier::Name(name)
    }
}

impl<'a> From<&'a Dataset> for Identifier {
    fn from(dataset: &Dataset) -> Self {
        Identifier::Id(dataset.id())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        if string.is_empty() {
            Err(Error::BadDatasetIdentifier {
                identifier: string.into(),
            })
        } else if string.chars().all(|c| c.is_ascii_digit()) {
            Ok(Identifier::Id(Id(string.into())))
        } else {
            Ok(Identifier::Name(Name(string.into())))
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(
            formatter,
            "{}",
            match self {
                Identifier::Id(id) => &id.0,
                Identifier::Name(name) => &name.0,
            }
        )
    }
}
