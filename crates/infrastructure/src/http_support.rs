use jitgate_core::{AppError, AppResult};
use reqwest::{Response, StatusCode};
use url::Url;

/// Ensures a base URL ends with a slash so relative joins keep its path.
pub(crate) fn normalize_base_url(raw: &str, name: &str) -> AppResult<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };

    Url::parse(with_slash.as_str())
        .map_err(|error| AppError::Validation(format!("invalid {name} '{raw}': {error}")))
}

/// Joins a relative path onto a normalized base URL.
pub(crate) fn join(base: &Url, path: &str) -> AppResult<Url> {
    base.join(path)
        .map_err(|error| AppError::Internal(format!("failed to build URL for '{path}': {error}")))
}

/// Appends path segments onto a normalized base URL, escaping each one.
///
/// Empty and dot segments are refused so a caller-supplied value can never
/// address a different endpoint.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> AppResult<Url> {
    if let Some(segment) = segments
        .iter()
        .find(|segment| matches!(segment.trim(), "" | "." | ".."))
    {
        return Err(AppError::Validation(format!(
            "invalid URL path segment '{segment}'"
        )));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| AppError::Internal(format!("base URL '{base}' cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Maps a transport failure to an external-service error.
pub(crate) fn transport_error(context: &str, error: reqwest::Error) -> AppError {
    AppError::ExternalService {
        status: None,
        message: format!("{context}: {error}"),
    }
}

/// Passes successful responses through and classifies failures.
///
/// `404` maps to `NotFound` and `409` to `Conflict`; every other failure
/// carries the remote status and body.
pub(crate) async fn check_response(response: Response, context: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
    let message = format!("{context}: {body}");

    Err(match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::ExternalService {
            status: Some(status.as_u16()),
            message,
        },
    })
}

/// Decodes a JSON body into `T`.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: Response,
    context: &str,
) -> AppResult<T> {
    let status = response.status().as_u16();
    response
        .json::<T>()
        .await
        .map_err(|error| AppError::ExternalService {
            status: Some(status),
            message: format!("{context}: malformed response body: {error}"),
        })
}
