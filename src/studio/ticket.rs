use crate::llm::GenerationError;
use crate::types::{HistoryItem, PromptRequest};

/// Identity of one submitted generation and the request it froze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    id: u64,
    request: PromptRequest,
}

impl GenerationTicket {
    pub(crate) fn new(id: u64, request: PromptRequest) -> Self {
        Self { id, request }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &PromptRequest {
        &self.request
    }

    pub fn into_request(self) -> PromptRequest {
        self.request
    }
}

/// How a completed generation was applied to the studio
#[derive(Debug)]
pub enum Completion {
    /// Success, prepended to history
    Stored(HistoryItem),
    /// Provider failure, shown as the result
    Failed(GenerationError),
    /// A newer generation superseded this one; nothing changed
    Stale,
}
