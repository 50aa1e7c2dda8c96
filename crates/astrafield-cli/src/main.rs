use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use astrafield_contracts::console::{parse_intent, Intent, PANEL_HELP_COMMANDS};
use astrafield_contracts::params::{find_field, parse_field_input, FieldGroup, ParamSet, FIELD_SPECS};
use astrafield_engine::{
    GenerateOutcome, HttpTransport, PanelConfig, PanelController, ReqwestTransport,
};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

const PREVIEW_FILE_NAME: &str = "astrafield-preview.html";

#[derive(Debug, Parser)]
#[command(name = "astrafield", version, about = "AstraField cover generator control panel")]
struct Cli {
    #[command(flatten)]
    panel: PanelArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct PanelArgs {
    /// Backend origin; `/api` is appended to every request.
    #[arg(long, global = true)]
    server: Option<String>,
    /// Directory that receives downloads and previews.
    #[arg(long, global = true)]
    out: Option<PathBuf>,
    /// Append session events to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive control panel.
    Panel,
    /// List preset names served by the backend.
    Presets,
    /// Generate once and download the result.
    Generate(GenerateArgs),
    /// List every generation parameter with its default and slider range.
    Params,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    preset: Option<String>,
    /// Override one parameter, e.g. `--set grid_n=24`. Repeatable.
    #[arg(long = "set", value_parser = parse_key_value)]
    set: Vec<(String, String)>,
    #[arg(long)]
    photo: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("astrafield error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Params => {
            print_field_table();
            Ok(0)
        }
        Command::Panel => {
            run_panel(open_panel(&cli.panel)?)?;
            Ok(0)
        }
        Command::Presets => run_presets(open_panel(&cli.panel)?),
        Command::Generate(args) => run_generate(open_panel(&cli.panel)?, args),
    }
}

fn open_panel(args: &PanelArgs) -> Result<PanelController<ReqwestTransport>> {
    let config = PanelConfig::resolve(args.server.clone(), args.out.clone(), args.events.clone())?;
    let session_id = Uuid::new_v4().to_string();
    PanelController::connect(&config, &session_id)
}

fn run_presets<T: HttpTransport>(mut panel: PanelController<T>) -> Result<i32> {
    if panel.load_preset_names().is_none() {
        eprintln!(
            "Preset catalog unavailable at {}; only the default preset is offered.",
            panel.client().origin()
        );
    }
    for name in panel.preset_choices() {
        println!("{name}");
    }
    Ok(0)
}

fn run_generate<T: HttpTransport>(mut panel: PanelController<T>, args: GenerateArgs) -> Result<i32> {
    if let Some(preset) = args.preset.as_deref() {
        if panel.apply_preset(preset).is_none() {
            eprintln!("Preset '{preset}' was not applied; continuing with current parameters.");
        }
    }
    for (key, raw) in &args.set {
        match parse_field_input(key, raw) {
            Ok(value) => panel.set_field(key, value),
            Err(message) => bail!("invalid value for {key}: {message}"),
        }
    }
    for note in advisory_notes(panel.params()) {
        eprintln!("note: {note}");
    }
    if let Some(photo) = args.photo {
        panel.select_photo(photo);
    }

    match panel.generate() {
        GenerateOutcome::Generated => {
            print_generated(&panel);
            if let Some(path) = panel.download()? {
                println!("Saved {}", path.display());
            }
            Ok(0)
        }
        GenerateOutcome::Failed(_) | GenerateOutcome::Rejected => Ok(1),
    }
}

fn run_panel<T: HttpTransport>(mut panel: PanelController<T>) -> Result<()> {
    match panel.load_preset_names() {
        Some(names) => println!("Loaded {} presets.", names.len()),
        None => println!("Preset catalog unavailable; using built-in defaults."),
    }
    println!("AstraField panel started. Type /help for commands.");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        let marker = if panel.is_loading() { "…" } else { ">" };
        print!("[{}] {marker} ", panel.selected_preset());
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        if intent.action == "quit" {
            break;
        }
        handle_intent(&mut panel, &intent)?;
    }
    Ok(())
}

fn handle_intent<T: HttpTransport>(panel: &mut PanelController<T>, intent: &Intent) -> Result<()> {
    match intent.action.as_str() {
        "noop" => {}
        "help" => {
            println!("Commands: {}", PANEL_HELP_COMMANDS.join(" "));
        }
        "list_presets" => {
            let refresh = intent
                .command_args
                .get("refresh")
                .and_then(|value| value.as_bool())
                .unwrap_or(false);
            let loaded = if refresh {
                panel.refresh_presets()
            } else if panel.preset_names().is_empty() {
                panel.load_preset_names()
            } else {
                Some(panel.preset_names().to_vec())
            };
            if loaded.is_none() {
                println!("Preset catalog unavailable.");
            }
            for name in panel.preset_choices() {
                let marker = if name == panel.selected_preset() { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        "apply_preset" => {
            let name = intent.arg_str("name").unwrap_or("").trim();
            if name.is_empty() {
                println!("/preset requires a name");
                return Ok(());
            }
            match panel.apply_preset(name) {
                Some(changed) if changed.is_empty() => {
                    println!("Preset {name} applied (no changes)");
                }
                Some(changed) => {
                    println!("Preset {name} applied: {}", changed.join(", "));
                }
                None => println!("Preset {name} selected; parameters unchanged"),
            }
        }
        "set_field" => {
            let key = intent.arg_str("key").unwrap_or("");
            let raw = intent.arg_str("value").unwrap_or("");
            match parse_field_input(key, raw) {
                Ok(value) => {
                    panel.set_field(key, value);
                    if let Some(value) = panel.params().get(key) {
                        println!("{key} = {value}");
                        if let Some(note) = find_field(key).and_then(|spec| spec.advisory_note(value)) {
                            println!("note: {note}");
                        }
                    }
                }
                Err(message) => println!("Invalid value for {key}: {message}"),
            }
        }
        "usage" => println!("/set requires <key> <value>"),
        "reset" => {
            panel.reset_params();
            println!("Parameters reset to defaults");
        }
        "show" => print_params(panel.params()),
        "select_photo" => match intent.arg_str("path").filter(|path| !path.is_empty()) {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    println!("Warning: {} does not exist yet", path.display());
                }
                panel.select_photo(&path);
                println!("Photo set to {}", path.display());
            }
            None => {
                panel.clear_photo();
                println!("Photo cleared");
            }
        },
        "generate" => {
            println!("Generating…");
            if panel.generate() == GenerateOutcome::Generated {
                print_generated(panel);
            }
        }
        "download" => match panel.download() {
            Ok(Some(path)) => println!("Saved {}", path.display()),
            Ok(None) => println!("Nothing to download yet"),
            Err(err) => println!("Download failed: {err:#}"),
        },
        "preview" => {
            let path = intent
                .arg_str("path")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| panel.download_dir().join(PREVIEW_FILE_NAME));
            match panel.render_preview_html(&path) {
                Ok(Some(path)) => println!("Preview written to {}", path.display()),
                Ok(None) => println!("Generate an image first"),
                Err(err) => println!("Preview failed: {err:#}"),
            }
        }
        "status" => match panel.server_status() {
            Ok(status) => println!(
                "{} {}",
                panel.client().origin(),
                serde_json::to_string(&status)?
            ),
            Err(err) => println!("Server unreachable: {err:#}"),
        },
        "unknown" => match intent.arg_str("command") {
            Some(command) => println!("Unknown command: /{command}"),
            None => println!("Not a command. Type /help, or set a field with key=value."),
        },
        other => println!("Unhandled action: {other}"),
    }
    Ok(())
}

fn print_generated<T: HttpTransport>(panel: &PanelController<T>) {
    let Some(image) = panel.image() else {
        return;
    };
    let size = match image.preview() {
        Ok(info) => format!("{} {}x{}", info.format, info.width, info.height),
        Err(err) => format!("undecodable: {err:#}"),
    };
    println!(
        "Generated {} ({size}, {} bytes, sha256 {})",
        image.id(),
        image.bytes().len(),
        image.short_digest()
    );
}

fn print_params(params: &ParamSet) {
    for group in FieldGroup::ALL {
        println!("{}", group.title());
        for spec in FIELD_SPECS.iter().filter(|spec| spec.group == group) {
            if let Some(value) = params.get(spec.key) {
                println!("  {:<16} {value}", spec.key);
            }
        }
    }
    let extra: Vec<(&str, String)> = params
        .iter()
        .filter(|(key, _)| find_field(key).is_none())
        .map(|(key, value)| (key, value.to_string()))
        .collect();
    if !extra.is_empty() {
        println!("Other");
        for (key, value) in extra {
            println!("  {key:<16} {value}");
        }
    }
    for note in advisory_notes(params) {
        println!("note: {note}");
    }
}

fn advisory_notes(params: &ParamSet) -> Vec<String> {
    params
        .iter()
        .filter_map(|(key, value)| find_field(key).and_then(|spec| spec.advisory_note(value)))
        .collect()
}

fn print_field_table() {
    for group in FieldGroup::ALL {
        println!("{}", group.title());
        for spec in FIELD_SPECS.iter().filter(|spec| spec.group == group) {
            let range = spec
                .range
                .map(|range| format!("{}..{} step {}", range.min, range.max, range.step))
                .unwrap_or_default();
            println!(
                "  {:<16} {:<18} {:<10} {range}",
                spec.key,
                spec.label,
                spec.default.to_value().to_string()
            );
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected key=value, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use anyhow::anyhow;
    use astrafield_contracts::console::parse_intent;
    use astrafield_contracts::events::EventWriter;
    use astrafield_contracts::params::{ParamSet, ParamValue};
    use astrafield_engine::transport::{HttpReply, MultipartPayload};
    use astrafield_engine::{ApiClient, HttpTransport, PanelController, StderrNotifier};
    use clap::Parser;

    use super::{
        advisory_notes, handle_intent, parse_key_value, Cli, Command, PREVIEW_FILE_NAME,
    };

    /// Answers every POST with the same image bytes; GETs fail.
    struct CannedImage;

    impl HttpTransport for CannedImage {
        fn get(&self, url: &str) -> anyhow::Result<HttpReply> {
            Err(anyhow!("GET {url} failed: offline"))
        }

        fn post_multipart(&self, _url: &str, _payload: &MultipartPayload) -> anyhow::Result<HttpReply> {
            Ok(HttpReply {
                status: 200,
                content_type: Some("image/png".to_string()),
                body: b"cover-bytes".to_vec(),
            })
        }
    }

    fn panel_writing_to(dir: &Path) -> PanelController<CannedImage> {
        PanelController::new(
            ApiClient::new(CannedImage, "http://panel.test"),
            Box::new(StderrNotifier),
            EventWriter::disabled("cli-test"),
            dir,
        )
    }

    #[test]
    fn failed_download_and_preview_keep_the_session() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blocked = temp.path().join("blocked");
        fs::write(&blocked, b"not a directory")?;
        let mut panel = panel_writing_to(&blocked);

        handle_intent(&mut panel, &parse_intent("/generate"))?;
        assert!(panel.image().is_some());

        handle_intent(&mut panel, &parse_intent("/download"))?;
        handle_intent(&mut panel, &parse_intent("/preview"))?;
        assert!(panel.image().is_some());
        assert_eq!(fs::read(&blocked)?, b"not a directory");
        Ok(())
    }

    #[test]
    fn download_and_preview_write_into_out_dir() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut panel = panel_writing_to(temp.path());

        handle_intent(&mut panel, &parse_intent("/download"))?;
        assert!(!temp.path().join("astrafield-cover.png").exists());

        handle_intent(&mut panel, &parse_intent("/generate"))?;
        handle_intent(&mut panel, &parse_intent("/download"))?;
        handle_intent(&mut panel, &parse_intent("/preview"))?;
        assert_eq!(fs::read(temp.path().join("astrafield-cover.png"))?, b"cover-bytes");
        assert!(temp.path().join(PREVIEW_FILE_NAME).exists());
        Ok(())
    }

    #[test]
    fn parse_key_value_splits_on_first_equals() {
        assert_eq!(
            parse_key_value("tone_hi=#ff00aa"),
            Ok(("tone_hi".to_string(), "#ff00aa".to_string()))
        );
        assert_eq!(
            parse_key_value("seed="),
            Ok(("seed".to_string(), String::new()))
        );
        assert_eq!(
            parse_key_value("note=a=b"),
            Ok(("note".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("grid_n").is_err());
        assert!(parse_key_value("=4").is_err());
    }

    #[test]
    fn generate_args_collect_repeated_sets() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "astrafield",
            "--server",
            "http://localhost:9000",
            "generate",
            "--preset",
            "warm-dusk",
            "--set",
            "grid_n=24",
            "--set",
            "use_dots=on",
        ])?;
        assert_eq!(cli.panel.server.as_deref(), Some("http://localhost:9000"));
        let Command::Generate(args) = cli.command else {
            anyhow::bail!("expected generate subcommand");
        };
        assert_eq!(args.preset.as_deref(), Some("warm-dusk"));
        assert_eq!(
            args.set,
            vec![
                ("grid_n".to_string(), "24".to_string()),
                ("use_dots".to_string(), "on".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn global_flags_follow_subcommand() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["astrafield", "panel", "--out", "covers"])?;
        assert!(matches!(cli.command, Command::Panel));
        assert_eq!(cli.panel.out, Some("covers".into()));
        Ok(())
    }

    #[test]
    fn advisory_notes_flag_only_out_of_range_values() {
        let params = ParamSet::default()
            .with_field("size", ParamValue::Number(4096.0))
            .with_field("grid_n", ParamValue::Number(500.0));
        assert_eq!(
            advisory_notes(&params),
            vec!["size = 4096 is outside the slider range 512..2048".to_string()]
        );
        assert!(advisory_notes(&ParamSet::default()).is_empty());
    }
}
