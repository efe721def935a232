//! Response status handling for the engine client.

use crate::error::InferenceError;

/// Return the response unchanged on success, or [`InferenceError::Api`] with
/// the status and body otherwise.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    if !resp.status().is_success() {
        return Err(InferenceError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}
