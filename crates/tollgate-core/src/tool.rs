use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, ServiceError};

/// Description of one operation exposed as an MCP tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    /// Operation name within its service (e.g. `search`)
    pub name: String,
    /// Human-readable description shown to agents
    pub description: String,
    /// JSON schema of the tool arguments
    pub input_schema: Map<String, Value>,
}

impl ToolSpec {
    /// Build a tool spec whose input schema is derived from a request type
    pub fn new<T: JsonSchema>(name: &str, description: &str) -> Self {
        let schema = schemars::schema_for!(T);
        let mut input_schema = match serde_json::to_value(&schema) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        // Agents only need the object schema itself
        input_schema.remove("$schema");
        input_schema
            .entry("type")
            .or_insert_with(|| Value::String("object".to_string()));

        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// A service whose operations can be invoked as tools
///
/// Implemented once per service; both the MCP server and the REST tool
/// listing go through this trait, while REST handlers call the same client
/// methods directly.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Service name, used as the tool name prefix
    fn name(&self) -> &str;

    /// Operations exposed by this service
    fn tools(&self) -> Vec<ToolSpec>;

    /// Invoke an operation with JSON arguments
    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value>;
}

/// Tool entry with its fully qualified name
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredTool {
    /// Qualified name (`service_operation`)
    pub name: String,
    /// Owning service
    pub service: String,
    pub description: String,
    pub input_schema: Map<String, Value>,
}

/// All tool services enabled in this process
#[derive(Clone, Default)]
pub struct ToolRegistry {
    services: Vec<Arc<dyn ToolService>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service to the registry
    pub fn register(&mut self, service: Arc<dyn ToolService>) {
        tracing::debug!(service = service.name(), "registering tool service");
        self.services.push(service);
    }

    /// Names of the registered services in registration order
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Every tool of every service, qualified with its service name
    pub fn tools(&self) -> Vec<RegisteredTool> {
        self.services
            .iter()
            .flat_map(|service| {
                service.tools().into_iter().map(|spec| RegisteredTool {
                    name: qualified_name(service.name(), &spec.name),
                    service: service.name().to_string(),
                    description: spec.description,
                    input_schema: spec.input_schema,
                })
            })
            .collect()
    }

    /// Resolve a qualified tool name to its service and operation
    pub fn resolve<'a>(&self, name: &'a str) -> Option<(Arc<dyn ToolService>, &'a str)> {
        self.services.iter().find_map(|service| {
            let operation = name.strip_prefix(service.name())?.strip_prefix('_')?;
            service
                .tools()
                .iter()
                .any(|spec| spec.name == operation)
                .then(|| (Arc::clone(service), operation))
        })
    }

    /// Call a tool by qualified name
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let (service, operation) = self
            .resolve(name)
            .ok_or_else(|| ServiceError::UnknownTool(name.to_string()))?;

        tracing::debug!(service = service.name(), tool = operation, "calling tool");

        service.call_tool(operation, arguments).await
    }
}

/// Join a service name and operation into a tool name
pub fn qualified_name(service: &str, operation: &str) -> String {
    format!("{service}_{operation}")
}

/// Serialize a tool result into JSON
pub fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ServiceError::Client(format!("failed to encode tool result: {e}")))
}
