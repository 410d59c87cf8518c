use crate::resources::RelativeId;

/// Handle to a trainable model the server hosts under a project's path.
/// Models carry no state of their own; use [`crate::Client::train`] and
/// [`crate::Client::predict`] to drive them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineLearningModel {
    pub relative_id: RelativeId,
}
