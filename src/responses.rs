//! JSON bodies returned by the API.

use serde::Serialize;

use crate::models::motion::Motion;
use crate::models::threshold::{self, Evaluation};
use crate::models::vote::Tally;

/// Error response for API endpoints.
#[derive(Serialize, Debug, Clone)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// List wrapper for collection endpoints.
#[derive(Serialize, Debug, Clone)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: Serialize> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        ListResponse { items, total }
    }
}

/// Motion with its current threshold evaluation.
#[derive(Serialize, Debug, Clone)]
pub struct MotionResponse {
    #[serde(flatten)]
    pub motion: Motion,
    pub evaluation: Evaluation,
}

impl From<Motion> for MotionResponse {
    fn from(motion: Motion) -> Self {
        let evaluation = threshold::evaluate(&motion.tally, motion.threshold);
        MotionResponse { motion, evaluation }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct TallyResponse {
    pub motion_id: String,
    pub tally: Tally,
}

#[derive(Serialize, Debug, Clone)]
pub struct DeletedResponse {
    pub id: String,
    pub removed: usize,
}
