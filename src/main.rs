// mind-loom: interactive mind-map editor shell
// Build with: cargo build --bin mind-loom

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command as CliCommand};
use env_logger::Env;
use log::warn;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};

use mind_loom::persistence::settings::EditorSettings;
use mind_loom::persistence::store::DirectoryStore;
use mind_loom::session::{EditingSurface, EditorSession};
use mind_loom::shell::{self, ShellReply};

/// Caption and name prompts answered on the terminal. Ctrl-C or Ctrl-D cancels.
struct ReadlineSurface {
    editor: Option<DefaultEditor>,
}

impl ReadlineSurface {
    fn new() -> Self {
        let editor = match DefaultEditor::new() {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("prompts disabled, failed to initialize editor: {}", e);
                None
            }
        };
        Self { editor }
    }

    fn read(&mut self, prompt: &str, initial: &str) -> Option<String> {
        let editor = self.editor.as_mut()?;
        match editor.readline_with_initial(prompt, (initial, "")) {
            Ok(line) => Some(line.trim().to_string()),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(e) => {
                eprintln!("readline error: {}", e);
                None
            }
        }
    }
}

impl EditingSurface for ReadlineSurface {
    fn insert_text(&mut self, current: &str) -> Option<String> { self.read("caption: ", current) }

    fn prompt(&mut self, message: &str, default: &str) -> Option<String> {
        self.read(&format!("{}: ", message), default)
    }
}

fn print_reply(reply: &ShellReply) {
    if let ShellReply::Continue(msg) = reply
        && !msg.is_empty()
    {
        println!("{}", msg);
    }
}

fn warn_unsaved(session: &EditorSession) {
    if let Some(manager) = session.manager()
        && manager.is_modified()
    {
        eprintln!("map {} has unsaved changes", manager.get_map_name());
    }
}

fn main() {
    let matches = CliCommand::new("mind-loom")
        .about("Mind-Loom: edit mind maps from the terminal with undo/redo")
        .arg(
            Arg::new("storage_dir")
                .long("storage-dir")
                .value_name("DIR")
                .help("Local map storage directory (overrides settings)"),
        )
        .arg(Arg::new("map").long("map").value_name("NAME").help("Open a stored map on start"))
        .arg(
            Arg::new("eval")
                .short('e')
                .long("eval")
                .value_name("LINES")
                .help("Run ';'-separated shell lines and exit"),
        )
        .arg(Arg::new("quiet").short('q').long("quiet").action(ArgAction::SetTrue).help("Suppress banner/help text"))
        .get_matches();

    let mut settings = match EditorSettings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to load settings, using defaults: {}", e);
            EditorSettings::default()
        }
    };
    if let Some(dir) = matches.get_one::<String>("storage_dir") {
        settings.storage_override = Some(PathBuf::from(dir));
    }
    let eval = matches.get_one::<String>("eval").cloned();
    let quiet = matches.get_flag("quiet");

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_filter.clone())).init();

    let store = DirectoryStore::from_settings(&settings);
    let storage_dir = store.dir().to_path_buf();
    let mut session = EditorSession::new(Box::new(store), Box::new(ReadlineSurface::new()), settings);

    if let Some(name) = matches.get_one::<String>("map") {
        match shell::execute_line(&mut session, &format!("open {}", name)) {
            Ok(reply) => print_reply(&reply),
            Err(e) => {
                eprintln!("cannot open {}: {}", name, e);
                std::process::exit(2);
            }
        }
    }

    // One-off eval mode
    if let Some(lines) = eval {
        for line in lines.split(';') {
            match shell::execute_line(&mut session, line) {
                Ok(ShellReply::Quit) => break,
                Ok(reply) => print_reply(&reply),
                Err(e) => {
                    eprintln!("{}: {}", line.trim(), e);
                    std::process::exit(3);
                }
            }
        }
        warn_unsaved(&session);
        return;
    }

    // Interactive mode with history
    let mut rl: Editor<(), DefaultHistory> = match Editor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("failed to initialize editor: {}", e);
            std::process::exit(1);
        }
    };
    let hist_path = EditorSettings::settings_dir().join("mind_loom_history.txt");
    let _ = std::fs::create_dir_all(EditorSettings::settings_dir());
    let _ = rl.load_history(&hist_path);

    if !quiet {
        eprintln!(
            "Mind-Loom shell. Maps are stored in {}.\nType help for commands, quit to exit. History saved at {}.\n",
            storage_dir.display(),
            hist_path.display()
        );
    }

    loop {
        let prompt = match session.title() {
            Some(title) => format!("{}> ", title),
            None => "mind-loom> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() { continue; }
                rl.add_history_entry(input).ok();
                match shell::execute_line(&mut session, input) {
                    Ok(ShellReply::Quit) => break,
                    Ok(reply) => print_reply(&reply),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => { // Ctrl-C
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => { // Ctrl-D
                break;
            }
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }

    warn_unsaved(&session);
    let _ = rl.save_history(&hist_path);
}
