//! Conversion between [`ApiRequest`] descriptions and reqwest.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::trace;

use twimbol_core::error::{Error, InvalidInputError, TransportError};
use twimbol_core::{
    AccessToken, ApiRequest, ApiResponse, ApiUrl, MultipartField, MultipartValue, RequestBody,
    Result,
};

/// Classifies a reqwest failure. Only called when no response was received
/// or the body could not be read.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let message = err.to_string();
    let error = if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_connect() {
        TransportError::Connection { message }
    } else if err.is_body() || err.is_decode() {
        TransportError::Body { message }
    } else {
        TransportError::Http { message }
    };
    Error::Transport(error)
}

/// Builds a transmittable request, attaching `token` as a bearer credential.
///
/// The body is rebuilt on every call so a retry carries the same payload.
pub(crate) fn build_request(
    http: &reqwest::Client,
    base_url: &ApiUrl,
    request: &ApiRequest,
    token: Option<&AccessToken>,
) -> Result<reqwest::RequestBuilder> {
    let url = base_url.join(request.path());
    let mut headers = request.headers().clone();

    if let Some(token) = token {
        let value = HeaderValue::from_str(&token.bearer()).map_err(|e| InvalidInputError::Header {
            name: AUTHORIZATION.to_string(),
            reason: e.to_string(),
        })?;
        headers.insert(AUTHORIZATION, value);
    }

    let mut builder = http.request(request.method().clone(), &url);
    if !request.query_pairs().is_empty() {
        builder = builder.query(request.query_pairs());
    }

    builder = match request.request_body() {
        RequestBody::Empty => builder.headers(headers),
        RequestBody::Json(value) => builder.headers(headers).json(value),
        RequestBody::Form(pairs) => builder.headers(headers).form(pairs),
        RequestBody::Multipart(fields) => {
            // The boundary parameter must come from the form itself.
            headers.remove(CONTENT_TYPE);
            builder.headers(headers).multipart(multipart_form(fields)?)
        }
    };

    Ok(builder)
}

fn multipart_form(fields: &[MultipartField]) -> Result<Form> {
    let mut form = Form::new();
    for field in fields {
        form = match &field.value {
            MultipartValue::Text(text) => form.text(field.name.clone(), text.clone()),
            MultipartValue::File {
                bytes,
                file_name,
                mime,
            } => {
                let mut part = Part::bytes(bytes.to_vec());
                if let Some(file_name) = file_name {
                    part = part.file_name(file_name.clone());
                }
                if let Some(mime) = mime {
                    part = part.mime_str(mime).map_err(|e| InvalidInputError::Other {
                        message: format!("invalid MIME type '{mime}' for '{}': {e}", field.name),
                    })?;
                }
                form.part(field.name.clone(), part)
            }
        };
    }
    Ok(form)
}

/// Sends a request and buffers the response. Every status is `Ok`.
pub(crate) async fn send(builder: reqwest::RequestBuilder) -> Result<ApiResponse> {
    let response = builder.send().await.map_err(transport_error)?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(transport_error)?;
    trace!(status = %status, len = body.len(), "response received");
    Ok(ApiResponse::new(status, headers, body))
}
