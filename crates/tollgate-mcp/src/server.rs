use std::sync::Arc;

use http::{HeaderMap, request::Parts};
use rmcp::{
    ErrorData, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, JsonObject, ListToolsResult, Meta,
        PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use tollgate_core::{HttpError, ServiceError, ToolRegistry};
use tollgate_x402::{
    PAYMENT_META_KEY, PAYMENT_RESPONSE_META_KEY, PaymentGate, PaymentPayload, PaymentRequiredBody, X_PAYMENT, challenge,
    decode_payment_header,
};

const DEFAULT_INSTRUCTIONS: &str = "Tollgate exposes third-party APIs as tools. Tool names are \
     `<service>_<operation>`; every tool returns a JSON document as text.";

/// MCP handler dispatching tool calls to the registry
#[derive(Clone)]
pub struct McpServer {
    registry: ToolRegistry,
    instructions: Arc<str>,
    payment: Option<Arc<PaymentGate>>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, instructions: Option<String>) -> Self {
        Self {
            registry,
            instructions: instructions.unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()).into(),
            payment: None,
        }
    }

    /// Charge for tools whose REST path is priced
    #[must_use]
    pub fn with_payment(mut self, payment: Option<Arc<PaymentGate>>) -> Self {
        self.payment = payment;
        self
    }

    /// Every registered tool in MCP form
    pub fn tools(&self) -> Vec<Tool> {
        self.registry
            .tools()
            .into_iter()
            .map(|tool| Tool::new(tool.name, tool.description, Arc::new(tool.input_schema)))
            .collect()
    }

    /// Run a tool by qualified name
    ///
    /// Unknown tools are protocol errors. Failures inside the tool (bad
    /// arguments, upstream errors) are returned as error results so the
    /// agent can read and react to them.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult, ErrorData> {
        let arguments = arguments.map_or(serde_json::Value::Null, serde_json::Value::Object);

        match self.registry.call(name, arguments).await {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value)
                    .map_err(|e| ErrorData::internal_error(format!("failed to encode tool result: {e}"), None))?;

                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(ServiceError::UnknownTool(tool)) => {
                tracing::warn!(tool = %tool, "unknown MCP tool");
                Err(ErrorData::invalid_params(format!("unknown tool: {tool}"), None))
            }
            Err(e) => {
                tracing::error!(tool = %name, error = ?e, "MCP tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.client_message())]))
            }
        }
    }
}

impl McpServer {
    /// Run a tool, charging for it when its REST path is priced
    ///
    /// The payment travels in `_meta["x402/payment"]` as a JSON payload,
    /// or in an `X-PAYMENT` header on the HTTP request. Missing or rejected
    /// payments are JSON-RPC errors with code 402 carrying the challenge.
    /// Error results are not settled.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        meta: &Meta,
        headers: Option<&HeaderMap>,
    ) -> Result<CallToolResult, ErrorData> {
        let Some(gate) = &self.payment else {
            return self.dispatch(name, arguments).await;
        };

        let Some(path) = self
            .registry
            .resolve(name)
            .map(|(service, operation)| format!("/api/{}/{operation}", service.name()))
        else {
            return self.dispatch(name, arguments).await;
        };

        let Some(route) = gate.price(&path) else {
            return self.dispatch(name, arguments).await;
        };

        let empty = HeaderMap::new();
        let requirements = gate.requirements(route, gate.resource_url(headers.unwrap_or(&empty), &path));

        let payload = match meta.0.get(PAYMENT_META_KEY) {
            Some(value) => serde_json::from_value::<PaymentPayload>(value.clone()).ok(),
            None => match headers.and_then(|h| h.get(&X_PAYMENT)) {
                Some(header) => decode_payment_header(header.as_bytes()),
                None => {
                    tracing::debug!(tool = %name, "payment required");
                    return Err(payment_error(challenge(
                        requirements,
                        "Payment required in _meta \"x402/payment\" or X-PAYMENT header",
                        None,
                    )));
                }
            },
        };

        let Some(payload) = payload else {
            return Err(payment_error(challenge(requirements, "Invalid payment payload format", None)));
        };

        let payment = gate.verify(requirements, payload).await.map_err(payment_error)?;

        let mut result = self.dispatch(name, arguments).await?;

        if result.is_error == Some(true) {
            return Ok(result);
        }

        let settlement = gate.settle(payment).await.map_err(payment_error)?;
        let settlement = serde_json::to_value(&settlement)
            .map_err(|e| ErrorData::internal_error(format!("failed to encode settlement: {e}"), None))?;

        result
            .meta
            .get_or_insert_with(Meta::new)
            .0
            .insert(PAYMENT_RESPONSE_META_KEY.to_string(), settlement);

        Ok(result)
    }
}

fn payment_error(body: PaymentRequiredBody) -> ErrorData {
    let data = serde_json::to_value(&body).ok();
    ErrorData::new(ErrorCode(402), body.error, data)
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(self.instructions.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "tollgate".to_string(),
                title: Some("Tollgate".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let headers = context.extensions.get::<Parts>().map(|parts| &parts.headers);
        self.call(&request.name, request.arguments, &context.meta, headers).await
    }
}
