use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, Url};
use tracing::debug;

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::{build_headers, ACCEPT_EVENT_STREAM, ACCEPT_JSON};
use crate::payload::{ChatCompletion, ChatRequest};
use crate::sse::DataLineParser;
use crate::url::join_endpoint;

/// Tokens of one streaming response, in the order the server sent them.
///
/// The stream yields at most one `Err`, after which it ends.
pub type TokenStream = BoxStream<'static, Result<String, ChatApiError>>;

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamResult {
    pub tokens: Vec<String>,
}

impl StreamResult {
    pub fn text(&self) -> String {
        self.tokens.concat()
    }
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub fn stream_endpoint(&self) -> String {
        join_endpoint(&self.config.base_url, &self.config.stream_path)
    }

    pub fn complete_endpoint(&self) -> String {
        join_endpoint(&self.config.base_url, &self.config.complete_path)
    }

    pub fn build_headers(&self, accept: &str) -> Result<HeaderMap, ChatApiError> {
        let headers = build_headers(&self.config, accept);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_stream_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        self.build_request(&self.stream_endpoint(), ACCEPT_EVENT_STREAM, request)
    }

    pub fn build_complete_request(
        &self,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        self.build_request(&self.complete_endpoint(), ACCEPT_JSON, request)
    }

    fn build_request(
        &self,
        endpoint: &str,
        accept: &str,
        request: &ChatRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        validate_request_payload_shape(request)?;

        let url = Url::parse(endpoint)
            .map_err(|error| ChatApiError::InvalidBaseUrl(format!("{endpoint}: {error}")))?;
        let headers = self.build_headers(accept)?;
        Ok(self.http.post(url).headers(headers).json(request))
    }

    async fn send_checked(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<Response, ChatApiError> {
        let response = builder.send().await.map_err(ChatApiError::from)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ChatApiError::Status(status, parse_error_message(status, &body)))
    }

    /// Open the streaming endpoint and return its tokens as they arrive.
    ///
    /// Non-2xx statuses and declared-empty bodies fail before any token is
    /// produced; transport errors mid-body surface as the stream's last item.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<TokenStream, ChatApiError> {
        let endpoint = self.stream_endpoint();
        debug!(%endpoint, messages = request.messages.len(), "opening chat stream");

        let response = self.send_checked(self.build_stream_request(request)?).await?;
        if response.content_length() == Some(0) {
            return Err(ChatApiError::EmptyBody);
        }

        Ok(tokens_from_chunks(response.bytes_stream()))
    }

    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatRequest,
        mut on_token: F,
    ) -> Result<usize, ChatApiError>
    where
        F: FnMut(&str),
    {
        let mut tokens = self.open_stream(request).await?;
        let mut count = 0;

        while let Some(token) = tokens.next().await {
            let token = token?;
            on_token(&token);
            count += 1;
        }

        Ok(count)
    }

    pub async fn stream(&self, request: &ChatRequest) -> Result<StreamResult, ChatApiError> {
        let mut tokens = Vec::new();
        self.stream_with_handler(request, |token| tokens.push(token.to_owned()))
            .await?;

        Ok(StreamResult { tokens })
    }

    /// Call the single-response endpoint and return the assistant message.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ChatApiError> {
        let endpoint = self.complete_endpoint();
        debug!(%endpoint, messages = request.messages.len(), "requesting chat completion");

        let response = self
            .send_checked(self.build_complete_request(request)?)
            .await?;
        let body = response.text().await.map_err(ChatApiError::from)?;
        let completion = serde_json::from_str::<ChatCompletion>(&body)
            .map_err(|error| ChatApiError::MalformedResponse(format!("{error}: {body}")))?;

        Ok(completion.message)
    }
}

struct ChunkState<S> {
    chunks: Pin<Box<S>>,
    parser: DataLineParser,
    pending: VecDeque<String>,
    received_bytes: usize,
    done: bool,
}

/// Turn a body of raw byte chunks into a [`TokenStream`].
///
/// A body that closes without a single byte is reported as
/// [`ChatApiError::EmptyBody`].
pub fn tokens_from_chunks<S, B, E>(chunks: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<ChatApiError> + Send,
{
    let state = ChunkState {
        chunks: Box::pin(chunks),
        parser: DataLineParser::default(),
        pending: VecDeque::new(),
        received_bytes: 0,
        done: false,
    };

    let tokens = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(token) = state.pending.pop_front() {
                return Some((Ok(token), state));
            }
            if state.done {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let chunk = chunk.as_ref();
                    state.received_bytes += chunk.len();
                    let tokens = state.parser.feed(chunk);
                    state.pending.extend(tokens);
                }
                Some(Err(error)) => {
                    state.done = true;
                    return Some((Err(error.into()), state));
                }
                None => {
                    state.done = true;
                    if state.received_bytes == 0 {
                        return Some((Err(ChatApiError::EmptyBody), state));
                    }
                    let trailing = state.parser.finish();
                    state.pending.extend(trailing);
                }
            }
        }
    });

    Box::pin(tokens)
}

fn validate_request_payload_shape(request: &ChatRequest) -> Result<(), ChatApiError> {
    if request.messages.is_empty() {
        return Err(ChatApiError::InvalidRequestPayload(
            "'messages' must contain at least one message".to_string(),
        ));
    }

    if let Some(index) = request
        .messages
        .iter()
        .position(|message| message.role.trim().is_empty())
    {
        return Err(ChatApiError::InvalidRequestPayload(format!(
            "message {index} has an empty role"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use futures_util::stream::{self, StreamExt};

    use super::{tokens_from_chunks, validate_request_payload_shape};
    use crate::error::ChatApiError;
    use crate::payload::{ChatRequest, ChatRequestMessage};

    fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, ChatApiError>> {
        parts
            .iter()
            .map(|part| Ok(part.as_bytes().to_vec()))
            .collect()
    }

    async fn collect(parts: Vec<Result<Vec<u8>, ChatApiError>>) -> Vec<Result<String, String>> {
        tokens_from_chunks(stream::iter(parts))
            .map(|item| item.map_err(|error| error.to_string()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn tokens_are_emitted_in_line_order_across_chunks() {
        let tokens = collect(chunks(&["data: Based \ndata: o", "n \n", "data: your \n"])).await;

        assert_eq!(
            tokens,
            vec![
                Ok("Based ".to_string()),
                Ok("on ".to_string()),
                Ok("your ".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_flushed_at_close() {
        let tokens = collect(chunks(&["data: one\n", "data: two"])).await;

        assert_eq!(tokens, vec![Ok("one".to_string()), Ok("two".to_string())]);
    }

    #[tokio::test]
    async fn empty_body_is_reported_as_error() {
        let tokens = collect(Vec::new()).await;

        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0], Err(message) if message.contains("no body")));
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream_after_delivered_tokens() {
        let mut parts = chunks(&["data: partial\n"]);
        parts.push(Err(ChatApiError::MalformedResponse("reset".to_string())));
        parts.push(Ok(b"data: never\n".to_vec()));

        let tokens = collect(parts).await;

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Ok("partial".to_string()));
        assert!(matches!(&tokens[1], Err(message) if message.contains("reset")));
    }

    #[test]
    fn request_validation_rejects_empty_history() {
        let error = validate_request_payload_shape(&ChatRequest::new(Vec::new(), None))
            .expect_err("empty history must be rejected");
        assert!(matches!(error, ChatApiError::InvalidRequestPayload(_)));
    }

    #[test]
    fn request_validation_rejects_blank_role() {
        let request = ChatRequest::new(vec![ChatRequestMessage::new(" ", "hi")], None);
        assert!(validate_request_payload_shape(&request).is_err());
    }
}
