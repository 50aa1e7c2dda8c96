use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, NO_ARG_COMMANDS, PRESETS_COMMAND, PRESET_COMMAND, SET_COMMAND,
    SINGLE_PATH_COMMANDS,
};

/// One parsed line of panel console input.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.command_args.insert(key.to_string(), value);
        self
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args.get(key).and_then(Value::as_str)
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_path_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
        Err(_) => arg.trim().to_string(),
    }
}

fn is_field_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Splits `key=value` or `key value`. The value may be empty.
fn parse_assignment(arg: &str, allow_space: bool) -> Option<(String, String)> {
    let trimmed = arg.trim();
    let (key, value) = match trimmed.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None if allow_space => match trimmed.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (trimmed, ""),
        },
        None => return None,
    };
    if !is_field_key(key) {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn set_intent(raw: &str, key: String, value: String) -> Intent {
    Intent::new(SET_COMMAND.action, raw)
        .with_arg("key", Value::String(key))
        .with_arg("value", Value::String(value))
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if command == PRESET_COMMAND.command {
                return Intent::new(PRESET_COMMAND.action, text)
                    .with_arg("name", Value::String(arg.to_string()));
            }

            if command == PRESETS_COMMAND.command {
                let refresh = arg.eq_ignore_ascii_case("refresh");
                return Intent::new(PRESETS_COMMAND.action, text)
                    .with_arg("refresh", Value::Bool(refresh));
            }

            if command == SET_COMMAND.command {
                return match parse_assignment(arg, true) {
                    Some((key, value)) => set_intent(text, key, value),
                    None => Intent::new("usage", text)
                        .with_arg("command", Value::String(command)),
                };
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                return Intent::new(action, text)
                    .with_arg("path", Value::String(parse_single_path_arg(arg)));
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            return Intent::new("unknown", text)
                .with_arg("command", Value::String(command))
                .with_arg("arg", Value::String(arg.to_string()));
        }
    }

    if let Some((key, value)) = parse_assignment(raw_trimmed, false) {
        return set_intent(text, key, value);
    }

    Intent::new("unknown", text).with_arg("arg", Value::String(raw_trimmed.to_string()))
}
