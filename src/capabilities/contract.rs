//! Typed tool contract: handler signature, response writer and invocation plumbing.
use std::{
    fmt,
    future::Future,
    marker::PhantomData,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
};

use rmcp::service::{Peer, RoleServer};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::descriptor::{
    JsonObject, MetaValue, ToolDescriptor, INVOKED_META_KEY, INVOKING_META_KEY,
    OUTPUT_TEMPLATE_META_KEY,
};
use crate::lib::errors::HandlerError;

/// Boxed future returned by type-erased tool handlers.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolResult, HandlerError>> + Send>>;

/// Whether structured payloads are mirrored into a text segment.
///
/// Some clients drop results that carry structured content without any text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuredTextPolicy {
    #[default]
    EchoJson,
    StructuredOnly,
}

impl StructuredTextPolicy {
    pub fn from_echo(echo: bool) -> Self {
        if echo {
            Self::EchoJson
        } else {
            Self::StructuredOnly
        }
    }
}

/// Cancellation view handed to every handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    request: CancellationToken,
    shutdown: CancellationToken,
}

impl ToolContext {
    pub fn new(request: CancellationToken, shutdown: CancellationToken) -> Self {
        Self { request, shutdown }
    }

    /// Context that is only cancelled when the caller cancels the returned tokens.
    pub fn detached() -> Self {
        Self::new(CancellationToken::new(), CancellationToken::new())
    }

    /// True once the request was cancelled or the process began shutting down.
    pub fn is_cancelled(&self) -> bool {
        self.request.is_cancelled() || self.shutdown.is_cancelled()
    }

    /// Resolves on request cancellation or process shutdown, whichever comes first.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.request.cancelled() => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}

/// Opaque handle to the protocol session that issued a call.
#[derive(Clone, Default)]
pub struct Session {
    peer: Option<Peer<RoleServer>>,
}

impl Session {
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Self { peer: Some(peer) }
    }

    /// Session without a connected peer (tests and offline invocation).
    pub fn detached() -> Self {
        Self { peer: None }
    }

    pub fn peer(&self) -> Option<&Peer<RoleServer>> {
        self.peer.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.peer.is_some())
            .finish()
    }
}

/// Decoded, strongly-typed arguments of a single call.
#[derive(Debug, Clone)]
pub struct ToolRequest<I> {
    invocation_id: Uuid,
    args: I,
}

impl<I> ToolRequest<I> {
    pub fn new(invocation_id: Uuid, args: I) -> Self {
        Self {
            invocation_id,
            args,
        }
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn args(&self) -> &I {
        &self.args
    }

    pub fn into_args(self) -> I {
        self.args
    }
}

/// Result of one invocation after the handler returned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolResult {
    structured: Option<Value>,
    content: Vec<String>,
    is_error: bool,
}

impl ToolResult {
    pub fn structured(&self) -> Option<&Value> {
        self.structured.as_ref()
    }

    /// Text segments in the order they were appended.
    pub fn text_segments(&self) -> &[String] {
        &self.content
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn into_parts(self) -> (Option<Value>, Vec<String>, bool) {
        (self.structured, self.content, self.is_error)
    }
}

struct ResponseState<O> {
    structured: Option<O>,
    texts: Vec<String>,
    is_error: bool,
}

/// Collects the structured payload, text segments and error flag of a call.
///
/// Clones share the same buffer, so a handler may pass the writer to spawned
/// tasks; segments keep the order in which `append_text` was called.
pub struct ToolResponseWriter<O> {
    state: Arc<Mutex<ResponseState<O>>>,
}

impl<O> Clone for ToolResponseWriter<O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<O> Default for ToolResponseWriter<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> ToolResponseWriter<O> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ResponseState {
                structured: None,
                texts: Vec::new(),
                is_error: false,
            })),
        }
    }

    /// Set the machine-readable payload. Calling this twice is a handler bug.
    pub fn set_structured(&self, output: O) {
        let replaced = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.structured.replace(output).is_some()
        };
        debug_assert!(!replaced, "set_structured called more than once");
    }

    /// Flag the result as a domain error. Adds no text on its own.
    pub fn set_error(&self, is_error: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.is_error = is_error;
    }

    pub fn append_text(&self, text: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.texts.push(text.into());
    }
}

impl<O: Serialize> ToolResponseWriter<O> {
    /// Drain the buffer into a `ToolResult`.
    ///
    /// Serialization failures of the payload become a domain error with an
    /// explanatory text segment instead of a protocol failure.
    pub fn finish(&self, policy: StructuredTextPolicy) -> ToolResult {
        let (structured, texts, is_error) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (
                state.structured.take(),
                std::mem::take(&mut state.texts),
                state.is_error,
            )
        };

        let mut result = ToolResult {
            structured: None,
            content: texts,
            is_error,
        };
        let Some(output) = structured else {
            return result;
        };

        match serde_json::to_value(&output) {
            Ok(value) => {
                if policy == StructuredTextPolicy::EchoJson && result.content.is_empty() {
                    result.content.push(value.to_string());
                }
                result.structured = Some(value);
            }
            Err(err) => {
                result.is_error = true;
                result
                    .content
                    .push(format!("error serializing structured output: {err}"));
            }
        }
        result
    }
}

/// Everything the host hands to a tool for one call.
#[derive(Debug)]
pub struct ToolInvocation {
    pub context: ToolContext,
    pub session: Session,
    pub invocation_id: Uuid,
    pub arguments: JsonObject,
    pub text_policy: StructuredTextPolicy,
}

impl ToolInvocation {
    pub fn new(context: ToolContext, session: Session, arguments: JsonObject) -> Self {
        Self {
            context,
            session,
            invocation_id: Uuid::new_v4(),
            arguments,
            text_policy: StructuredTextPolicy::default(),
        }
    }

    pub fn with_text_policy(mut self, policy: StructuredTextPolicy) -> Self {
        self.text_policy = policy;
        self
    }
}

/// Type-erased tool as stored in the registry.
pub trait ToolHandler: Send + Sync + 'static {
    fn descriptor(&self) -> &ToolDescriptor;

    fn invoke(&self, invocation: ToolInvocation) -> ToolFuture;
}

/// A tool bound to a typed async handler.
pub struct TypedTool<I, O, F> {
    descriptor: ToolDescriptor,
    handler: Arc<F>,
    _types: PhantomData<fn(I) -> O>,
}

/// Declare a tool whose input and output schemas come from `I` and `O`.
pub fn tool_with_output<I, O, F, Fut>(name: impl Into<String>, handler: F) -> TypedTool<I, O, F>
where
    I: DeserializeOwned + JsonSchema + Send + 'static,
    O: Serialize + JsonSchema + Send + 'static,
    F: Fn(ToolContext, Session, ToolResponseWriter<O>, ToolRequest<I>) -> Fut
        + Send
        + Sync
        + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    TypedTool {
        descriptor: ToolDescriptor {
            name: name.into(),
            title: None,
            description: None,
            input_schema: schema_object::<I>(),
            output_schema: schema_object::<O>(),
            meta: Default::default(),
        },
        handler: Arc::new(handler),
        _types: PhantomData,
    }
}

impl<I, O, F> TypedTool<I, O, F> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = Some(description.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.descriptor.title = Some(title.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.descriptor.meta.insert(key.into(), value.into());
        self
    }

    /// Render the output with the registered resource at `uri`.
    pub fn output_template(self, uri: impl Into<String>) -> Self {
        self.meta(OUTPUT_TEMPLATE_META_KEY, uri.into())
    }

    pub fn invoking_message(self, message: impl Into<String>) -> Self {
        self.meta(INVOKING_META_KEY, message.into())
    }

    pub fn invoked_message(self, message: impl Into<String>) -> Self {
        self.meta(INVOKED_META_KEY, message.into())
    }
}

impl<I, O, F, Fut> ToolHandler for TypedTool<I, O, F>
where
    I: DeserializeOwned + JsonSchema + Send + 'static,
    O: Serialize + JsonSchema + Send + 'static,
    F: Fn(ToolContext, Session, ToolResponseWriter<O>, ToolRequest<I>) -> Fut
        + Send
        + Sync
        + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn invoke(&self, invocation: ToolInvocation) -> ToolFuture {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            let ToolInvocation {
                context,
                session,
                invocation_id,
                arguments,
                text_policy,
            } = invocation;
            let args: I = serde_json::from_value(Value::Object(arguments))
                .map_err(HandlerError::InvalidArguments)?;
            let writer = ToolResponseWriter::<O>::new();
            (*handler)(
                context,
                session,
                writer.clone(),
                ToolRequest::new(invocation_id, args),
            )
            .await?;
            Ok(writer.finish(text_policy))
        })
    }
}

fn schema_object<T: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    }
}
