//! Tool System
//!
//! Tool descriptors advertised to the model, and the contract every external
//! tool provider (calendar, reminders, ...) implements.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// One node of a parameter schema tree. Children are boxed so the type can
/// describe nested arrays and objects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterProperty {
    /// JSON Schema type (string, integer, number, boolean, object, array)
    #[serde(rename = "type")]
    pub property_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Allowed values
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    /// Element schema for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterProperty>>,

    /// Member schemas for objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ParameterProperty>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ParameterProperty {
    fn typed(property_type: &str, description: impl Into<String>) -> Self {
        Self {
            property_type: property_type.into(),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::typed("string", description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::typed("integer", description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::typed("number", description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::typed("boolean", description)
    }

    pub fn array(description: impl Into<String>, items: Self) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array", description)
        }
    }

    pub fn object(description: impl Into<String>, properties: BTreeMap<String, Self>) -> Self {
        Self {
            properties: Some(properties),
            ..Self::typed("object", description)
        }
    }

    #[must_use]
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Root parameter schema of a tool (always an object)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,

    #[serde(default)]
    pub properties: BTreeMap<String, ParameterProperty>,

    #[serde(default)]
    pub required: BTreeSet<String>,

    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: bool,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".into(),
            properties: BTreeMap::new(),
            required: BTreeSet::new(),
            additional_properties: false,
        }
    }
}

/// Tool definition (for LLM function calling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    pub parameters: ParameterSchema,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::default(),
        }
    }

    /// Add an optional parameter
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, property: ParameterProperty) -> Self {
        self.parameters.properties.insert(name.into(), property);
        self
    }

    /// Add a required parameter
    #[must_use]
    pub fn required_param(mut self, name: impl Into<String>, property: ParameterProperty) -> Self {
        let name = name.into();
        self.parameters.required.insert(name.clone());
        self.parameters.properties.insert(name, property);
        self
    }

    /// JSON Schema embedded in vendor requests
    pub fn to_json_schema(&self) -> Value {
        serde_json::to_value(&self.parameters).unwrap_or_else(|_| {
            serde_json::json!({"type": "object", "properties": {}})
        })
    }
}

/// Output of a provider-side tool invocation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    pub message: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ToolOutput {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// External tool provider - implement to plug a backend into the agent
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider group name (e.g. "calendar", "reminders")
    fn name(&self) -> &str;

    /// Prepare the backend (permissions, connections)
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Tools this provider owns
    async fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// Invoke one tool. Business failures should come back as
    /// `ToolOutput { is_error: true }`; `Err` is reserved for provider faults.
    async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolOutput>;
}
