//! Tool definitions advertised by `tools/list`.

use serde_json::{Value, json};

pub const STATUS: &str = "devilbox_status";
pub const START: &str = "devilbox_start";
pub const STOP: &str = "devilbox_stop";
pub const RESTART: &str = "devilbox_restart";
pub const LOGS: &str = "devilbox_logs";
pub const EXEC: &str = "devilbox_exec";
pub const VHOSTS: &str = "devilbox_vhosts";
pub const CONFIG: &str = "devilbox_config";
pub const DATABASES: &str = "devilbox_databases";
pub const HEALTH: &str = "devilbox_health";

/// Every tool name, in advertised order.
pub const TOOL_NAMES: &[&str] = &[
    STATUS, START, STOP, RESTART, LOGS, EXEC, VHOSTS, CONFIG, DATABASES, HEALTH,
];

pub const DEFAULT_LOG_LINES: u64 = 100;

pub fn is_known_tool(name: &str) -> bool {
    TOOL_NAMES.iter().any(|t| *t == name)
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn services_argument(verb: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "services": {
                "type": "array",
                "items": { "type": "string" },
                "description": format!(
                    "Optional: specific services to {verb} (php, httpd, mysql, pgsql, redis, memcd, mongo). If omitted, {verb}s all."
                )
            }
        }
    })
}

/// JSON Schema definitions for every tool.
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": STATUS,
            "description": "Get status of all Devilbox services (running/stopped)",
            "inputSchema": no_arguments()
        }),
        json!({
            "name": START,
            "description": "Start Devilbox services. Can start all services or specific ones.",
            "inputSchema": services_argument("start")
        }),
        json!({
            "name": STOP,
            "description": "Stop Devilbox services. Can stop all services or specific ones.",
            "inputSchema": services_argument("stop")
        }),
        json!({
            "name": RESTART,
            "description": "Restart Devilbox services. Useful after configuration changes.",
            "inputSchema": services_argument("restart")
        }),
        json!({
            "name": LOGS,
            "description": "View recent logs from a Devilbox container",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "service": {
                        "type": "string",
                        "description": "Service name (php, httpd, mysql, pgsql, redis, memcd, mongo, bind)"
                    },
                    "lines": {
                        "type": "integer",
                        "description": "Number of recent log lines to show (default: 100)",
                        "default": DEFAULT_LOG_LINES
                    }
                },
                "required": ["service"]
            }
        }),
        json!({
            "name": EXEC,
            "description": "Execute a command inside a Devilbox container",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "service": {
                        "type": "string",
                        "description": "Service name (php, httpd, mysql, pgsql, etc.)"
                    },
                    "command": {
                        "type": "string",
                        "description": "Command to execute (run with sh -c inside the container)"
                    }
                },
                "required": ["service", "command"]
            }
        }),
        json!({
            "name": VHOSTS,
            "description": "List all virtual hosts (projects) in Devilbox",
            "inputSchema": no_arguments()
        }),
        json!({
            "name": CONFIG,
            "description": "Get or update Devilbox configuration (.env file)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["get", "set"],
                        "description": "Action: get (read config) or set (update config)"
                    },
                    "key": {
                        "type": "string",
                        "description": "Configuration key (e.g., PHP_SERVER, MYSQL_SERVER)"
                    },
                    "value": {
                        "type": "string",
                        "description": "Value to set (only for action=set)"
                    }
                },
                "required": ["action"]
            }
        }),
        json!({
            "name": DATABASES,
            "description": "List databases in MySQL or PostgreSQL",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["mysql", "pgsql"],
                        "description": "Database type",
                        "default": "mysql"
                    }
                }
            }
        }),
        json!({
            "name": HEALTH,
            "description": "Check Devilbox health - service connectivity, disk space, container status",
            "inputSchema": no_arguments()
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_match_names() {
        let defs = tool_definitions();
        let names: Vec<_> = defs.iter().filter_map(|d| d["name"].as_str()).collect();
        assert_eq!(names, TOOL_NAMES);
        for def in &defs {
            assert_eq!(def["inputSchema"]["type"], "object");
            assert!(def["description"].as_str().is_some_and(|d| !d.is_empty()));
        }
    }

    #[test]
    fn required_arguments_are_declared() {
        let defs = tool_definitions();
        let required = |name: &str| -> Vec<String> {
            defs.iter()
                .find(|d| d["name"] == name)
                .and_then(|d| d["inputSchema"]["required"].as_array().cloned())
                .unwrap_or_default()
                .into_iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        };
        assert_eq!(required(LOGS), ["service"]);
        assert_eq!(required(EXEC), ["service", "command"]);
        assert_eq!(required(CONFIG), ["action"]);
        assert!(required(STATUS).is_empty());
    }

    #[test]
    fn known_tools() {
        assert!(is_known_tool("devilbox_logs"));
        assert!(!is_known_tool("devilbox_nuke"));
    }
}
