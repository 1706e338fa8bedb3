use televault_remote::RemoteTransport;
use tracing::{info, warn};

use crate::types::DeleteOutcome;

/// Removes sent documents from the channel. Never touches the local index.
#[derive(Debug, Default, Clone, Copy)]
pub struct Deleter;

impl Deleter {
    pub fn new() -> Self {
        Self
    }

    pub async fn delete(
        &self,
        transport: &dyn RemoteTransport,
        chat_target: &str,
        message_handle: &str,
    ) -> DeleteOutcome {
        if message_handle.is_empty() {
            return DeleteOutcome::Failed("no remote message to delete".into());
        }

        match transport.delete_message(chat_target, message_handle).await {
            Ok(()) => {
                info!(message = %message_handle, "remote message deleted");
                DeleteOutcome::Succeeded
            }
            Err(e) => {
                warn!(message = %message_handle, error = %e, "remote delete failed");
                DeleteOutcome::Failed(e.to_string())
            }
        }
    }
}
