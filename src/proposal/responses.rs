//! Response DTOs for proposal generation.

use std::collections::BTreeMap;

use serde::Serialize;

use super::models::{MaterialLine, Proposal, ProposalPricing};

/// Generated proposal data, ready for the document adapter
#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub success: bool,
    pub proposal_number: String,
    pub template: String,
    pub file_name: String,
    pub placeholders: BTreeMap<String, String>,
    pub pricing: ProposalPricing,
    pub materials: Vec<MaterialLine>,
    pub inspection_images: Vec<String>,
}

impl From<Proposal> for ProposalResponse {
    fn from(proposal: Proposal) -> Self {
        Self {
            success: true,
            proposal_number: proposal.number,
            template: format!("{}.docx", proposal.template_name),
            file_name: proposal.file_name,
            placeholders: proposal.placeholders,
            pricing: proposal.pricing,
            materials: proposal.materials,
            inspection_images: proposal.inspection_images,
        }
    }
}
