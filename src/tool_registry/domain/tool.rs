//! Tool descriptor value object and `tools/list` result parsing.

use super::ToolRegistryDomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata for a tool exposed by a tool server.
///
/// Serialized with the wire field name `inputSchema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "inputSchema", alias = "input_schema", default = "empty_schema")]
    input_schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(Map::new())
}

impl ToolDescriptor {
    /// Creates a tool descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyToolName`] when the name is
    /// blank.
    pub fn new(name: impl Into<String>, input_schema: Value) -> Result<Self, ToolRegistryDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(ToolRegistryDomainError::EmptyToolName);
        }

        Ok(Self {
            name: normalized_name,
            description: None,
            input_schema,
        })
    }

    /// Sets the description. Blank descriptions are dropped.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let normalized = description.into().trim().to_owned();
        self.description = (!normalized.is_empty()).then_some(normalized);
        self
    }

    /// Builds a descriptor from one entry of a `tools/list` result.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyToolName`] when the entry has
    /// no usable `name`.
    pub fn from_wire(entry: &Value) -> Result<Self, ToolRegistryDomainError> {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ToolRegistryDomainError::EmptyToolName)?;
        let schema = entry
            .get("inputSchema")
            .or_else(|| entry.get("input_schema"))
            .cloned()
            .unwrap_or_else(empty_schema);
        let descriptor = Self::new(name, schema)?;

        Ok(match entry.get("description").and_then(Value::as_str) {
            Some(description) => descriptor.with_description(description),
            None => descriptor,
        })
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the input JSON schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }
}

/// Outcome of parsing a `tools/list` result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolList {
    tools: Vec<ToolDescriptor>,
    skipped: usize,
}

impl ToolList {
    /// Parses a `tools/list` result.
    ///
    /// Accepts either a bare array or an object with a `tools` array. Entries
    /// without a name are skipped and counted.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::MalformedToolList`] when the result
    /// has neither shape.
    pub fn from_result(result: &Value) -> Result<Self, ToolRegistryDomainError> {
        let entries = match result {
            Value::Array(entries) => entries,
            Value::Object(fields) => match fields.get("tools") {
                Some(Value::Array(entries)) => entries,
                _ => return Err(ToolRegistryDomainError::MalformedToolList),
            },
            _ => return Err(ToolRegistryDomainError::MalformedToolList),
        };

        let mut list = Self::default();
        for entry in entries {
            match ToolDescriptor::from_wire(entry) {
                Ok(descriptor) => list.tools.push(descriptor),
                Err(_) => list.skipped += 1,
            }
        }
        Ok(list)
    }

    /// Returns the parsed descriptors.
    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Returns the number of skipped nameless entries.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consumes the list, returning the descriptors.
    #[must_use]
    pub fn into_tools(self) -> Vec<ToolDescriptor> {
        self.tools
    }
}
