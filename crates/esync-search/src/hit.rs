use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub filename: String,
    pub filepath: String,
    pub similarity: Option<f32>,
}
