#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "photo",
        action: "select_photo",
    },
    CommandSpec {
        command: "preview",
        action: "preview",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "download",
        action: "download",
    },
    CommandSpec {
        command: "show",
        action: "show",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const PRESET_COMMAND: CommandSpec = CommandSpec {
    command: "preset",
    action: "apply_preset",
};

pub(crate) const PRESETS_COMMAND: CommandSpec = CommandSpec {
    command: "presets",
    action: "list_presets",
};

pub(crate) const SET_COMMAND: CommandSpec = CommandSpec {
    command: "set",
    action: "set_field",
};

pub const PANEL_HELP_COMMANDS: &[&str] = &[
    "/presets [refresh]",
    "/preset <name>",
    "/set <key> <value>",
    "<key>=<value>",
    "/reset",
    "/show",
    "/photo [path]",
    "/generate",
    "/download",
    "/preview [path]",
    "/status",
    "/help",
    "/quit",
];
