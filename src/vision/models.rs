//! Pest detection results.

use serde::{Deserialize, Serialize};

/// Description returned by the vision model, or the degraded fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Pest located on the image. `box_2d` is `[ymin, xmin, ymax, xmax]`
/// normalised to 1000.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedPest {
    pub box_2d: [f64; 4],
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Localization {
    pub detected_objects: Vec<LocatedPest>,
    pub summary: Vec<LabelCount>,
}

impl Localization {
    pub fn new(detected_objects: Vec<LocatedPest>) -> Self {
        let mut summary: Vec<LabelCount> = Vec::new();
        for pest in &detected_objects {
            match summary.iter_mut().find(|c| c.label == pest.label) {
                Some(count) => count.count += 1,
                None => summary.push(LabelCount {
                    label: pest.label.clone(),
                    count: 1,
                }),
            }
        }
        Self {
            detected_objects,
            summary,
        }
    }
}
