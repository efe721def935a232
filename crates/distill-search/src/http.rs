//! Response status handling shared by search and page fetches.

use crate::error::FetchError;

/// Return the response unchanged on success, or [`FetchError::Api`] with the
/// status and body otherwise.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    if !resp.status().is_success() {
        return Err(FetchError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16) -> reqwest::Response {
        reqwest::Response::from(::http::Response::builder().status(status).body("denied").unwrap())
    }

    #[tokio::test]
    async fn forbidden_is_api_error() {
        let err = check_response(mock_response(403)).await.unwrap_err();
        assert!(matches!(err, FetchError::Api { status: 403, ref message } if message == "denied"));
    }

    #[tokio::test]
    async fn ok_passes() {
        assert!(check_response(mock_response(200)).await.is_ok());
    }
}
