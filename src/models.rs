use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_CHARS: usize = 1024;
pub const MAX_CONTEXT_CHARS: usize = 2048;
pub const MAX_SESSION_ID_CHARS: usize = 128;
pub const MAX_RESPONSE_CHARS: usize = 4096;

// POST /chat body
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Check field lengths (counted in chars), returning the first violation.
    pub fn validate(&self) -> Result<(), String> {
        let message_len = self.message.chars().count();
        if message_len == 0 {
            return Err("message must not be empty".to_string());
        }
        if message_len > MAX_MESSAGE_CHARS {
            return Err(format!("message must be at most {MAX_MESSAGE_CHARS} characters"));
        }
        if let Some(context) = &self.context {
            if context.chars().count() > MAX_CONTEXT_CHARS {
                return Err(format!("context must be at most {MAX_CONTEXT_CHARS} characters"));
            }
        }
        if let Some(session_id) = &self.session_id {
            if session_id.chars().count() > MAX_SESSION_ID_CHARS {
                return Err(format!(
                    "session_id must be at most {MAX_SESSION_ID_CHARS} characters"
                ));
            }
        }
        Ok(())
    }
}

// POST /chat success body
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
    pub offline: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub offline: bool,
}
