//! OpenAPI 3.0 description of the public auth endpoints and the project chat
//! resource.
//!
//! Documentation only: nothing here is used to validate requests.

use serde_json::{json, Value};

/// Build the document served at `/api/v1/docs/openapi.json`.
pub fn document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Kublade API",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": "/api/v1" }],
        "components": components(),
        "paths": paths(),
    })
}

fn components() -> Value {
    json!({
        "securitySchemes": {
            "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
        },
        "schemas": {
            "Envelope": {
                "type": "object",
                "required": ["status", "message"],
                "properties": {
                    "status": { "type": "string", "enum": ["ok", "error"] },
                    "message": { "type": "string" },
                    "data": {},
                    "error": { "$ref": "#/components/schemas/Failure" }
                }
            },
            "Failure": {
                "type": "object",
                "required": ["message", "code", "file", "line", "trace"],
                "properties": {
                    "message": { "type": "string" },
                    "code": { "type": "integer" },
                    "file": { "type": "string" },
                    "line": { "type": "integer" },
                    "trace": { "type": "array", "items": { "type": "string" } }
                }
            },
            "LoginRequest": {
                "type": "object",
                "required": ["email", "password"],
                "properties": {
                    "email": { "type": "string", "format": "email" },
                    "password": { "type": "string" }
                }
            },
            "RefreshRequest": {
                "type": "object",
                "required": ["refresh_token"],
                "properties": { "refresh_token": { "type": "string" } }
            },
            "AuthResponse": {
                "type": "object",
                "properties": {
                    "access_token": { "type": "string" },
                    "refresh_token": { "type": "string" },
                    "token_type": { "type": "string", "example": "Bearer" },
                    "expires_in": { "type": "integer" },
                    "user": { "$ref": "#/components/schemas/User" },
                    "permissions": { "type": "array", "items": { "type": "string" } }
                }
            },
            "User": {
                "type": "object",
                "properties": {
                    "id": { "type": "string", "format": "uuid" },
                    "name": { "type": "string" },
                    "email": { "type": "string" },
                    "role_id": { "type": "string", "format": "uuid", "nullable": true },
                    "permissions": { "type": "array", "items": { "type": "string" } },
                    "is_active": { "type": "boolean" },
                    "last_login_at": { "type": "string", "format": "date-time", "nullable": true },
                    "created_at": { "type": "string", "format": "date-time" },
                    "updated_at": { "type": "string", "format": "date-time" }
                }
            },
            "ChatMessage": {
                "type": "object",
                "properties": {
                    "id": { "type": "string", "format": "uuid" },
                    "project_id": { "type": "string", "format": "uuid" },
                    "user_id": { "type": "string", "format": "uuid", "nullable": true },
                    "role": { "type": "string", "enum": ["user", "assistant", "system"] },
                    "content": { "type": "string" },
                    "created_at": { "type": "string", "format": "date-time" },
                    "updated_at": { "type": "string", "format": "date-time" }
                }
            },
            "CreateChatMessage": {
                "type": "object",
                "required": ["role", "content"],
                "properties": {
                    "role": { "type": "string", "enum": ["user", "assistant", "system"] },
                    "content": { "type": "string", "maxLength": 65536 }
                }
            }
        }
    })
}

fn paths() -> Value {
    let project_id = json!({
        "name": "project_id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    });

    json!({
        "/auth/login": {
            "post": {
                "summary": "Exchange credentials for a token pair",
                "requestBody": body("LoginRequest"),
                "responses": {
                    "200": envelope_of("Logged in", "AuthResponse"),
                    "401": error("Invalid email or password"),
                    "403": error("Account is deactivated")
                }
            }
        },
        "/auth/refresh": {
            "post": {
                "summary": "Rotate a refresh token",
                "requestBody": body("RefreshRequest"),
                "responses": {
                    "200": envelope_of("Token refreshed", "AuthResponse"),
                    "401": error("Invalid or expired refresh token")
                }
            }
        },
        "/auth/logout": {
            "post": {
                "summary": "Revoke the session of a refresh token",
                "security": [{ "bearerAuth": [] }],
                "requestBody": body("RefreshRequest"),
                "responses": {
                    "200": envelope("Logged out"),
                    "400": error("Refresh token must not be empty"),
                    "401": error("Unauthorized")
                }
            }
        },
        "/auth/me": {
            "get": {
                "summary": "The authenticated user and their permissions",
                "security": [{ "bearerAuth": [] }],
                "responses": {
                    "200": envelope("Authenticated user"),
                    "401": error("Unauthorized")
                }
            }
        },
        "/projects/{project_id}/chat": {
            "parameters": [project_id],
            "get": {
                "summary": "List a project's chat messages, oldest first",
                "description": "Requires `ui.projects.{project_id}.chat`.",
                "security": [{ "bearerAuth": [] }],
                "responses": {
                    "200": envelope_of_array("Chat messages", "ChatMessage"),
                    "401": error("Unauthorized"),
                    "404": error("Project not found")
                }
            },
            "post": {
                "summary": "Append a message to a project's chat",
                "description": "Requires `ui.projects.{project_id}.chat`.",
                "security": [{ "bearerAuth": [] }],
                "requestBody": body("CreateChatMessage"),
                "responses": {
                    "201": envelope_of("Chat message created", "ChatMessage"),
                    "400": error("Validation failed"),
                    "401": error("Unauthorized"),
                    "404": error("Project not found")
                }
            }
        }
    })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": schema_ref(schema) } }
    })
}

fn envelope(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema_ref("Envelope") } }
    })
}

fn envelope_with(description: &str, data: Value) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "allOf": [
                        schema_ref("Envelope"),
                        { "type": "object", "properties": { "data": data } }
                    ]
                }
            }
        }
    })
}

fn envelope_of(description: &str, schema: &str) -> Value {
    envelope_with(description, schema_ref(schema))
}

fn envelope_of_array(description: &str, schema: &str) -> Value {
    envelope_with(description, json!({ "type": "array", "items": schema_ref(schema) }))
}

fn error(description: &str) -> Value {
    envelope(description)
}
