//! Request payloads and target subjects built from the parsed command line

use event_agent_core::{GatewayContext, NodeIdentity};
use serde_json::{json, Map, Value};

use crate::{Command, DialplanAction};

/// `<prefix>.node.<node>` when a node is named, `<prefix>.api` otherwise
pub fn target_subject(prefix: &str, node: Option<&str>) -> String {
    match node {
        Some(node) => GatewayContext::new(NodeIdentity::new(node), prefix).node_subject(),
        None => format!("{}.api", prefix),
    }
}

/// Subject tailed by `events [pattern]`; event names map the way agents publish them
pub fn events_subject(prefix: &str, pattern: &str) -> String {
    GatewayContext::new(NodeIdentity::new("cli"), prefix).event_subject(pattern)
}

/// JSON request for a command, or `None` for commands that do not send one
pub fn build_payload(command: &Command, node: Option<&str>, fire_and_forget: bool) -> Option<Value> {
    let mut body = Map::new();

    match command {
        Command::Status { log_level } => {
            body.insert("command".into(), json!("agent.status"));
            if let Some(level) = log_level {
                body.insert("log_level".into(), json!(level));
            }
        }
        Command::Originate {
            endpoint,
            extension,
            context,
        } => {
            body.insert("command".into(), json!("originate"));
            body.insert("endpoint".into(), json!(endpoint));
            body.insert("extension".into(), json!(extension));
            if let Some(context) = context {
                body.insert("context".into(), json!(context));
            }
        }
        Command::Hangup { uuid, cause } => {
            body.insert("command".into(), json!("hangup"));
            body.insert("uuid".into(), json!(uuid));
            if let Some(cause) = cause {
                body.insert("cause".into(), json!(cause));
            }
        }
        Command::Api { command, args } => {
            body.insert("command".into(), json!(command));
            if !args.is_empty() {
                body.insert("args".into(), json!(args.join(" ")));
            }
        }
        Command::Dialplan { action } => match action {
            DialplanAction::Enable => {
                body.insert("command".into(), json!("dialplan.enable"));
            }
            DialplanAction::Disable => {
                body.insert("command".into(), json!("dialplan.disable"));
            }
            DialplanAction::Status => {
                body.insert("command".into(), json!("dialplan.status"));
            }
            DialplanAction::Audio { mode, music_class } => {
                body.insert("command".into(), json!("dialplan.audio"));
                body.insert("mode".into(), json!(mode));
                if let Some(class) = music_class {
                    body.insert("music_class".into(), json!(class));
                }
            }
            DialplanAction::Autoanswer { enabled } => {
                body.insert("command".into(), json!("dialplan.autoanswer"));
                body.insert("enabled".into(), json!(enabled));
            }
        },
        Command::Events { .. } => return None,
    }

    if let Some(node) = node {
        body.insert("node_id".into(), json!(NodeIdentity::new(node).as_str()));
    }
    if fire_and_forget {
        body.insert("async".into(), json!(true));
    }
    Some(Value::Object(body))
}
