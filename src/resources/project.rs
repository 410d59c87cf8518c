use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{
    error::{Error, Result},
    resources::{dataset::Name as DatasetName, Modification, RelativeId},
};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Id(pub String);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Name(pub String);

/// A project document as the server returns it. What a project can do is
/// decided by its `kind`; see the `mastering` and `categorization` modules.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub external_id: Option<String>,
    pub name: Name,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    /// Name of the project's output dataset; absent until the project has
    /// been set up far enough to create one.
    pub unified_dataset_name: Option<DatasetName>,
    pub created: Modification,
    pub last_modified: Modification,
    pub relative_id: RelativeId,
}

impl Project {
    pub fn id(&self) -> Id {
        Id(self.relative_id.resource_id().to_owned())
    }
}

#[derive(Debug, Clone, SerializeDisplay, DeserializeFromStr, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    Dedup,
    Categorization,
    SchemaMappingRecommendations,
    GoldenRecords,
    Unknown(Box<str>),
}

impl FromStr for ProjectKind {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        Ok(match string {
            "DEDUP" => ProjectKind::Dedup,
            "CATEGORIZATION" => ProjectKind::Categorization,
            "SCHEMA_MAPPING_RECOMMENDATIONS" => ProjectKind::SchemaMappingRecommendations,
            "GOLDEN_RECORDS" => ProjectKind::GoldenRecords,
            value => ProjectKind::Unknown(value.into()),
        })
    }
}

impl Display for ProjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}",
            match self {
                ProjectKind::Dedup => "DEDUP",
                ProjectKind::Categorization => "CATEGORIZATION",
                ProjectKind::SchemaMappingRecommendations => "SCHEMA_MAPPING_RECOMMENDATIONS",
                ProjectKind::GoldenRecords => "GOLDEN_RECORDS",
                ProjectKind::Unknown(value) => value.as_ref(),
            }
        )
    }
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

impl<'a> From<&'a Project> for Identifier {
    fn from(project: &Project) -> Self {
        Identifier::Id(project.id())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        if string.is_empty() {
            Err(Error::BadProjectIdentifier {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_kind_roundtrips() {
        for (label, kind) in [
            ("DEDUP", ProjectKind::Dedup),
            ("CATEGORIZATION", ProjectKind::Categorization),
            (
                "SCHEMA_MAPPING_RECOMMENDATIONS",
                ProjectKind::SchemaMappingRecommendations,
            ),
            ("GOLDEN_RECORDS", ProjectKind::GoldenRecords),
        ] {
            let parsed: ProjectKind = serde_json::from_value(json!(label)).unwrap();
            assert_eq!(parsed, kind);
            assert_eq!(serde_json::to_value(&parsed).unwrap(), json!(label));
        }
    }

    #[test]
    fn unknown_project_kind_roundtrips() {
        let parsed: ProjectKind = serde_json::from_value(json!("SUPPLIER_MASTERING")).unwrap();
        assert_eq!(parsed, ProjectKind::Unknown("SUPPLIER_MASTERING".into()));
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!("SUPPLIER_MASTERING")
        );
    }

    #[test]
    fn project_parses_from_server_document() {
        let project: Project = serde_json::from_value(json!({
            "id": "unify://unified-data/v1/projects/1",
            "externalId": "suppliers-dedup",
            "name": "Supplier Mastering",
            "description": "Deduplicate supplier records",
            "type": "DEDUP",
            "unifiedDatasetName": "Unified Suppliers",
            "created": {
                "username": "admin",
                "time": "2018-09-10T16:06:20.636Z",
                "version": "400"
            },
            "lastModified": {
                "username": "admin",
                "time": "2018-09-10T16:06:22.851Z",
                "version": "405"
            },
            "relativeId": "projects/1"
        }))
        .unwrap();
        assert_eq!(project.kind, ProjectKind::Dedup);
        assert_eq!(project.id(), Id("1".to_owned()));
        assert_eq!(
            project.unified_dataset_name,
            Some(DatasetName("Unified Suppliers".to_owned()))
        );
    }

    #[test]
    fn identifier_parses_digits_as_id_and_text_as_name() {
        assert_eq!(
            "1".parse::<Identifier>().unwrap(),
            Identifier::Id(Id("1".to_owned()))
        );
        assert_eq!(
            "Supplier Mastering".parse::<Identifier>().unwrap(),
            Identifier::Name(Name("Supplier Mastering".to_owned()))
        );
        assert!(matches!(
            "".parse::<Identifier>(),
            Err(Error::BadProjectIdentifier { .. })
        ));
    }
}
