//! Capabilities of mastering (dedup) projects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    resources::{
        dataset::{DatasetAlias, Name as DatasetName},
        machine_learning::MachineLearningModel,
        project::{Project, ProjectKind},
        RelativeId,
    },
};

pub(crate) fn require_dedup(project: &Project) -> Result<()> {
    if project.kind == ProjectKind::Dedup {
        Ok(())
    } else {
        Err(Error::WrongProjectKind {
            project: project.name.0.clone(),
            expected: ProjectKind::Dedup,
            actual: project.kind.clone(),
        })
    }
}

/// Dataset of candidate record pairs awaiting match labels.
pub fn record_pairs(project: &Project) -> Result<DatasetAlias> {
    require_dedup(project)?;
    Ok(DatasetAlias(project.relative_id.join("recordPairs")))
}

/// Pairs whose labels would most improve the pair-matching model.
pub fn high_impact_pairs(project: &Project) -> Result<DatasetAlias> {
    require_dedup(project)?;
    Ok(DatasetAlias(project.relative_id.join("highImpactPairs")))
}

/// Clusters of records the project currently considers the same entity.
pub fn record_clusters(project: &Project) -> Result<DatasetAlias> {
    require_dedup(project)?;
    Ok(DatasetAlias(project.relative_id.join("recordClusters")))
}

/// The model that scores candidate pairs as matches or non-matches.
pub fn pair_matching_model(project: &Project) -> Result<MachineLearningModel> {
    require_dedup(project)?;
    Ok(MachineLearningModel {
        relative_id: project.relative_id.join("recordPairsWithPredictions/model"),
    })
}

/// The model that bins records into candidate groups before pair generation.
pub fn binning_model(project: &Project) -> Result<MachineLearningModel> {
    require_dedup(project)?;
    Ok(MachineLearningModel {
        relative_id: project.relative_id.join("binningModel"),
    })
}

// The server does not serve the cluster datasets below at project-scoped
// paths; their canonical names are derived from the unified dataset's name
// and looked up with `Client::get_dataset`.
// TODO drop these helpers once the server exposes the datasets under the
// project path.

pub fn published_clusters_name(unified_dataset: &DatasetName) -> DatasetName {
    DatasetName(format!("{}_dedup_published_clusters", unified_dataset.0))
}

pub fn record_clusters_with_data_name(unified_dataset: &DatasetName) -> DatasetName {
    DatasetName(format!("{}_dedup_clusters_with_data", unified_dataset.0))
}

pub fn published_clusters_with_data_name(unified_dataset: &DatasetName) -> DatasetName {
    DatasetName(format!(
        "{}_dedup_published_clusters_with_data",
        unified_dataset.0
    ))
}

/// Estimated candidate and generated pair counts, per pair-generation clause
/// and in total. The server reports counts as strings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedPairCounts {
    pub is_up_to_date: bool,
    pub total_estimate: PairCountEstimate,
    pub clause_estimates: HashMap<String, PairCountEstimate>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PairCountEstimate {
    pub candidate_pair_count: String,
    pub generated_pair_count: String,
}

/// Retention settings for published cluster versions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublishedClustersConfiguration {
    pub relative_id: RelativeId,
    /// ISO-8601 duration, e.g. `"P4D"`.
    pub versions_time_to_live: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{project::Name, Modification};
    use serde_json::json;

    fn stamp() -> Modification {
        Modification {
            username: "admin".to_owned(),
            time: "2018-09-10T16:06:20.636Z".parse().unwrap(),
            version: "405".to_owned(),
        }
    }

    fn project(kind: ProjectKind) -> Project {
        Project {
            external_id: None,
            name: Name("Supplier Mastering".to_owned()),
            description: None,
            kind,
            unified_dataset_name: Some(DatasetName("Unified Suppliers".to_owned())),
            created: stamp(),
            last_modified: stamp(),
            relative_id: RelativeId("projects/1".to_owned()),
        }
    }

    #[test]
    fn alias_paths_extend_the_project_path() {
        let project = project(ProjectKind::Dedup);
        assert_eq!(record_pairs(&project).unwrap().0 .0, "projects/1/recordPairs");
        assert_eq!(
            high_impact_pairs(&project).unwrap().0 .0,
            "projects/1/highImpactPairs"
        );
        assert_eq!(
            record_clusters(&project).unwrap().0 .0,
            "projects/1/recordClusters"
        );
    }

    #[test]
    fn model_paths_extend_the_project_path() {
        let project = project(ProjectKind::Dedup);
        assert_eq!(
            pair_matching_model(&project).unwrap().relative_id.0,
            "projects/1/recordPairsWithPredictions/model"
        );
        assert_eq!(
            binning_model(&project).unwrap().relative_id.0,
            "projects/1/binningModel"
        );
    }

    #[test]
    fn capabilities_reject_non_dedup_projects() {
        let project = project(ProjectKind::Categorization);
        match record_pairs(&project) {
            Err(Error::WrongProjectKind {
                expected, actual, ..
            }) => {
                assert_eq!(expected, ProjectKind::Dedup);
                assert_eq!(actual, ProjectKind::Categorization);
            }
            other => panic!("expected WrongProjectKind, got {other:?}"),
        }
    }

    #[test]
    fn cluster_dataset_names_derive_from_the_unified_dataset() {
        let unified = DatasetName("Unified Suppliers".to_owned());
        assert_eq!(
            published_clusters_name(&unified).0,
            "Unified Suppliers_dedup_published_clusters"
        );
        assert_eq!(
            record_clusters_with_data_name(&unified).0,
            "Unified Suppliers_dedup_clusters_with_data"
        );
        assert_eq!(
            published_clusters_with_data_name(&unified).0,
            "Unified Suppliers_dedup_published_clusters_with_data"
        );
    }

    #[test]
    fn estimated_pair_counts_parse_from_server_document() {
        let estimate: EstimatedPairCounts = serde_json::from_value(json!({
            "isUpToDate": true,
            "totalEstimate": {
                "candidatePairCount": "200",
                "generatedPairCount": "100"
            },
            "clauseEstimates": {
                "Clause1": {
                    "candidatePairCount": "120",
                    "generatedPairCount": "60"
                },
                "Clause2": {
                    "candidatePairCount": "80",
                    "generatedPairCount": "40"
                }
            }
        }))
        .unwrap();
        assert!(estimate.is_up_to_date);
        assert_eq!(estimate.total_estimate.candidate_pair_count, "200");
        assert_eq!(
            estimate.clause_estimates["Clause2"].generated_pair_count,
            "40"
        );
    }
}
