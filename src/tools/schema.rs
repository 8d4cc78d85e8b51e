//! Tool names, descriptions and input schemas.

use serde_json::{Value, json};

pub const SAVE: &str = "save_conversation";
pub const LIST: &str = "list_conversations";
pub const GET: &str = "get_conversation";
pub const SEARCH: &str = "search_conversations";
pub const UPDATE: &str = "update_conversation";
pub const DELETE: &str = "delete_conversation";

/// Name, description and JSON schema of one tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Name used in `tools/call`.
    pub name: &'static str,

    /// One-line description shown to clients.
    pub description: &'static str,

    /// JSON schema of the `arguments` object.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// The `tools/list` entry for this tool.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

fn messages_schema() -> Value {
    json!({
        "type": "array",
        "description": "Messages in conversation order",
        "items": {
            "type": "object",
            "properties": {
                "role": {"type": "string", "enum": ["user", "assistant", "system"]},
                "content": {"type": "string"},
                "timestamp": {"type": "string", "description": "RFC 3339 timestamp"}
            },
            "required": ["role", "content"]
        }
    })
}

fn storage_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["local", "remote"],
        "description": "Storage backend; defaults to the configured one"
    })
}

fn tags_schema(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "string"}, "description": description})
}

/// Every tool the server exposes, sorted by name.
#[must_use]
pub fn all_tools() -> Vec<ToolDescriptor> {
    let mut tools = vec![
        ToolDescriptor {
            name: SAVE,
            description: "Save a conversation thread for later retrieval",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Conversation title"},
                    "messages": messages_schema(),
                    "id": {"type": "string", "description": "Explicit id; generated when omitted"},
                    "sourceApp": {"type": "string", "description": "Application the conversation came from"},
                    "tags": tags_schema("Tags to attach"),
                    "summary": {"type": "string", "description": "Explicit summary; takes precedence over generateSummary"},
                    "format": {"type": "string", "enum": ["json", "markdown"]},
                    "includeMetadata": {"type": "boolean", "default": true},
                    "includeTimestamps": {"type": "boolean", "default": true},
                    "generateSummary": {"type": "boolean", "default": false, "description": "Ignored when summary is given"},
                    "generateTags": {"type": "boolean", "default": false},
                    "storage": storage_schema()
                },
                "required": ["title", "messages"]
            }),
        },
        ToolDescriptor {
            name: LIST,
            description: "List saved conversations, newest first",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "minimum": 1},
                    "storage": storage_schema()
                }
            }),
        },
        ToolDescriptor {
            name: GET,
            description: "Fetch a saved conversation by id or exact title",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "storage": storage_schema()
                }
            }),
        },
        ToolDescriptor {
            name: SEARCH,
            description: "Search saved conversations by text, title, date, source and tags",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Free text matched against title, summary and messages"},
                    "title": {"type": "string", "description": "Exact title"},
                    "titleContains": {"type": "string"},
                    "dateFrom": {"type": "string", "description": "YYYY-MM-DD or RFC 3339"},
                    "dateTo": {"type": "string", "description": "YYYY-MM-DD or RFC 3339"},
                    "sourceApp": {"type": "string"},
                    "tags": tags_schema("Tags that must all be present"),
                    "limit": {"type": "integer", "minimum": 1},
                    "includeRelevance": {"type": "boolean", "default": false},
                    "storage": storage_schema()
                }
            }),
        },
        ToolDescriptor {
            name: UPDATE,
            description: "Append messages to, or replace the messages of, a saved conversation",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string", "description": "Exact title, used when id is omitted"},
                    "messages": messages_schema(),
                    "mode": {"type": "string", "enum": ["append", "replace"], "default": "append"},
                    "deduplicate": {"type": "boolean", "default": true},
                    "newTitle": {"type": "string"},
                    "tags": tags_schema("Replacement tag list"),
                    "summary": {"type": "string", "description": "Replacement summary; takes precedence over generateSummary"},
                    "generateSummary": {"type": "boolean", "default": false, "description": "Ignored when summary is given"},
                    "storage": storage_schema()
                },
                "required": ["messages"]
            }),
        },
        ToolDescriptor {
            name: DELETE,
            description: "Delete a saved conversation by id or exact title",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "title": {"type": "string"},
                    "storage": storage_schema()
                }
            }),
        },
    ];
    tools.sort_by(|a, b| a.name.cmp(b.name));
    tools
}
