//! Capabilities of categorization projects.

use crate::{
    error::{Error, Result},
    resources::{
        machine_learning::MachineLearningModel,
        project::{Project, ProjectKind},
    },
};

pub(crate) fn require_categorization(project: &Project) -> Result<()> {
    if project.kind == ProjectKind::Categorization {
        Ok(())
    } else {
        Err(Error::WrongProjectKind {
            project: project.name.0.clone(),
            expected: ProjectKind::Categorization,
            actual: project.kind.clone(),
        })
    }
}

/// The model that assigns unified records to taxonomy categories.
pub fn model(project: &Project) -> Result<MachineLearningModel> {
    require_categorization(project)?;
    Ok(MachineLearningModel {
        relative_id: project.relative_id.join("categorizations/model"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{project::Name, Modification, RelativeId};

    fn project(kind: ProjectKind) -> Project {
        Project {
            external_id: None,
            name: Name("Part Categorization".to_owned()),
            description: None,
            kind,
            unified_dataset_name: None,
            created: stamp(),
            last_modified: stamp(),
            relative_id: RelativeId("projects/2".to_owned()),
        }
    }

    fn stamp() -> Modification {
        Modification {
            username: "admin".to_owned(),
            time: "2018-09-10T16:06:20.636Z".parse().unwrap(),
            version: "405".to_owned(),
        }
    }

    #[test]
    fn model_path_extends_the_project_path() {
        let project = project(ProjectKind::Categorization);
        assert_eq!(
            model(&project).unwrap().relative_id.0,
            "projects/2/categorizations/model"
        );
    }

    #[test]
    fn model_rejects_non_categorization_projects() {
        assert!(matches!(
            model(&project(ProjectKind::Dedup)),
            Err(Error::WrongProjectKind { .. })
        ));
    }
}
