//! craftdeck - interactive launcher CLI

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use craftdeck::fetch::Progress;
use craftdeck::launcher::{self, InstallProgress};
use craftdeck::selection::{self, SelectionContext};
use craftdeck::server::{self, ServerLayout, ServerSpec};
use craftdeck::{
    Endpoints, ExternalInstaller, Fetcher, GameInstaller, Launcher, LauncherConfig, ModCatalogEntry,
    ModLibrary, Paths, ServerRecord, ServerRegistry,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "craftdeck")]
#[command(about = "Game launcher - manage local servers and download mods")]
struct Cli {
    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Directory holding settings.json, servers_list.json and servers/
    #[arg(long)]
    home: Option<PathBuf>,
}

/// Line-oriented prompt over stdin. `None` means stdin closed.
struct Input {
    lines: std::io::StdinLock<'static>,
}

impl Input {
    fn new() -> Self {
        Self {
            lines: std::io::stdin().lock(),
        }
    }

    fn prompt(&mut self, label: &str) -> Option<String> {
        print!("{label}");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match self.lines.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    /// Prompt with a default used when the answer is blank.
    fn prompt_or(&mut self, label: &str, default: &str) -> Option<String> {
        let answer = self.prompt(&format!("{label} [{default}]: "))?;
        Some(if answer.is_empty() { default.to_string() } else { answer })
    }
}

struct App {
    paths: Paths,
    config: LauncherConfig,
    fetcher: Fetcher,
    registry: ServerRegistry,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut paths = Paths::resolve();
    if let Some(home) = cli.home {
        paths.base_dir = home;
    }
    if let Err(e) = paths.ensure_dirs() {
        eprintln!("Error: failed to prepare directories: {}", e);
        std::process::exit(1);
    }

    let fetcher = match Fetcher::new(Endpoints::default()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match LauncherConfig::load(&paths.settings_file()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: {} (using defaults)", e);
            LauncherConfig::default()
        }
    };

    let registry = ServerRegistry::open(&paths);
    let mut app = App {
        paths,
        config,
        fetcher,
        registry,
    };
    let mut input = Input::new();

    loop {
        println!();
        println!("craftdeck");
        println!("1: List versions");
        println!("2: Launch version");
        println!("3: Settings");
        println!("4: List servers");
        println!("5: Create managed server");
        println!("6: Manage server");
        println!("7: Delete server");
        println!("8: Add external server");
        println!("9: Mods");
        println!("0: Exit");
        let Some(choice) = input.prompt("> ") else {
            break;
        };
        match choice.as_str() {
            "1" => {
                show_versions(&app);
            }
            "2" => launch_version(&app, &mut input),
            "3" => edit_settings(&mut app, &mut input),
            "4" => {
                list_servers(&app);
            }
            "5" => create_server(&app, &mut input),
            "6" => manage_server(&app, &mut input),
            "7" => delete_server(&app, &mut input),
            "8" => add_external_server(&app, &mut input),
            "9" => mods_menu(&app, &mut input),
            "0" => break,
            _ => println!("Invalid choice"),
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(e: impl std::fmt::Display) {
    println!("Error: {}", e);
}

fn print_progress(p: Progress) {
    match p {
        Progress::Percent(n) => print!("\r{n}% downloaded"),
        Progress::Bytes(n) => print!("\r{n} bytes downloaded"),
    }
    let _ = std::io::stdout().flush();
}

fn show_versions(app: &App) -> Vec<String> {
    let versions = launcher::list_versions(&app.fetcher, &app.paths);
    println!("Available versions:");
    for (i, v) in versions.iter().enumerate() {
        println!("{}: {}", i, v);
    }
    versions
}

fn launch_version(app: &App, input: &mut Input) {
    let versions = show_versions(app);
    let Some(answer) = input.prompt("Version number: ") else { return };
    let version = match selection::parse_number(&answer).and_then(|i| selection::pick(&versions, i)) {
        Ok(v) => v.clone(),
        Err(e) => return report(e),
    };
    let Some(username) = input.prompt("Player name (Enter for random): ") else { return };

    let external = ExternalInstaller::from_config(&app.config);
    let installer = external.as_ref().map(|i| i as &dyn GameInstaller);
    let session = Launcher::new(installer, &app.paths, &app.config);
    println!("Installing {}...", version);
    let mut progress = |p: InstallProgress| match p {
        InstallProgress::Status(s) => println!("Status: {s}"),
        InstallProgress::Step { current, max } => println!("Progress: {current}/{max}"),
    };
    match session.launch(&version, &username, &mut progress) {
        Ok(status) => println!("Game exited ({})", status),
        Err(e) => report(e),
    }
}

fn edit_settings(app: &mut App, input: &mut Input) {
    println!("Java: {}", if app.config.java_path.is_empty() { "(PATH)" } else { app.config.java_path.as_str() });
    println!("RAM:  {} MB", app.config.ram_mb);
    let Some(ram) = input.prompt("RAM (MB, Enter to keep): ") else { return };
    if !ram.is_empty() {
        match ram.parse() {
            Ok(mb) => app.config.ram_mb = mb,
            Err(_) => return println!("Invalid RAM value: {}", ram),
        }
    }
    let Some(java) = input.prompt("Java path (Enter to keep): ") else { return };
    if !java.is_empty() {
        app.config.java_path = java;
    }
    match app.config.save(&app.paths.settings_file()) {
        Ok(()) => println!("Settings saved"),
        Err(e) => report(e),
    }
}

/// Print the registry; returns false when there is nothing to pick from.
fn list_servers(app: &App) -> bool {
    let servers = match app.registry.load() {
        Ok(s) => s,
        Err(e) => {
            report(e);
            return false;
        }
    };
    if servers.is_empty() {
        println!("No servers");
        return false;
    }
    for (i, s) in servers.iter().enumerate() {
        println!("{}: {}", i, s);
    }
    true
}

fn pick_server(app: &App, input: &mut Input, label: &str) -> Option<usize> {
    if !list_servers(app) {
        return None;
    }
    let answer = input.prompt(label)?;
    match selection::parse_number(&answer) {
        Ok(i) => Some(i),
        Err(e) => {
            report(e);
            None
        }
    }
}

fn create_server(app: &App, input: &mut Input) {
    let Some(name) = input.prompt("New server name: ") else { return };
    let mut spec = ServerSpec::new(&name);
    let Some(port) = input.prompt_or("Port", &spec.port) else { return };
    let Some(version) = input.prompt_or("Version", &spec.version) else { return };
    let Some(core) = input.prompt_or("Core (Paper/Purpur/Vanilla)", &spec.core) else { return };
    spec.port = port;
    spec.version = version;
    spec.core = core;
    spec.java = app.config.java().to_string();

    println!("Downloading server jar...");
    let result = server::create(&app.paths, &app.registry, &app.fetcher, &spec, &mut print_progress);
    println!();
    match result {
        Ok(record) => println!("Server {} created ({})", record.name, record.address),
        Err(e) => report(e),
    }
}

fn manage_server(app: &App, input: &mut Input) {
    let Some(index) = pick_server(app, input, "Select server: ") else { return };
    let record = match app.registry.select(index) {
        Ok(r) => r,
        Err(e) => return report(e),
    };
    if !record.managed {
        println!("Server is not managed locally");
        return;
    }
    let layout = ServerLayout::for_server(&app.paths, &record.name);

    loop {
        println!();
        println!("Managing '{}'", record.name);
        println!("1: Toggle EULA");
        println!("2: Toggle online mode");
        println!("3: Start server");
        println!("4: Stop server");
        println!("0: Back");
        let Some(choice) = input.prompt("> ") else { return };
        match choice.as_str() {
            "1" => match layout.toggle_eula() {
                Ok(v) => println!("eula={}", v),
                Err(e) => report(e),
            },
            "2" => match layout.toggle_online_mode() {
                Ok(v) => println!("online-mode={}", v),
                Err(e) => report(e),
            },
            "3" => match layout.start() {
                Ok(pid) => println!("Server starting (pid {})", pid),
                Err(e) => report(e),
            },
            "4" => println!("Stop the server from its console or your task manager"),
            "0" => break,
            _ => println!("Invalid choice"),
        }
    }
}

fn delete_server(app: &App, input: &mut Input) {
    let Some(index) = pick_server(app, input, "Select server to delete: ") else { return };
    match server::delete(&app.paths, &app.registry, index) {
        Ok(record) => println!("Server {} deleted", record.name),
        Err(e) => report(e),
    }
}

fn add_external_server(app: &App, input: &mut Input) {
    let Some(name) = input.prompt("Server name: ") else { return };
    let Some(address) = input.prompt("Address (host:port): ") else { return };
    if name.is_empty() || address.is_empty() {
        return println!("Name and address are required");
    }
    match app.registry.add(ServerRecord::external(&name, &address)) {
        Ok(()) => println!("Server {} added", name),
        Err(e) => report(e),
    }
}

fn print_mods(entries: &[ModCatalogEntry]) {
    for (i, m) in entries.iter().enumerate() {
        let description: String = m.description.chars().take(60).collect();
        println!("{}. {} - {}...", i + 1, m.title, description);
    }
}

fn mods_menu(app: &App, input: &mut Input) {
    let library = ModLibrary::open(&app.fetcher, &app.paths);
    let mut last: SelectionContext<ModCatalogEntry> = SelectionContext::new();

    loop {
        println!();
        println!("Mods");
        println!("1. Featured mods");
        println!("2. Search");
        println!("3. Download by number");
        println!("4. Open mods folder");
        println!("5. Delete all mods");
        println!("0. Back");
        let Some(choice) = input.prompt("> ") else { return };
        match choice.as_str() {
            "1" => match library.list_featured() {
                Ok(hits) => {
                    println!("Featured mods:");
                    print_mods(last.remember(hits));
                }
                Err(e) => report(e),
            },
            "2" => {
                let Some(query) = input.prompt("Search: ") else { return };
                match library.search(&query) {
                    Ok(hits) => {
                        if hits.is_empty() {
                            println!("No mods found");
                        } else {
                            println!("Results for '{}':", query);
                        }
                        print_mods(last.remember(hits));
                    }
                    Err(e) => report(e),
                }
            }
            "3" => {
                let len = last.items().map_or(0, <[_]>::len);
                if len == 0 {
                    println!("List or search mods first");
                    continue;
                }
                let Some(answer) = input.prompt(&format!("Pick a number (1-{}): ", len)) else { return };
                let entry = match selection::parse_number(&answer).and_then(|n| last.select(n)) {
                    Ok(entry) => entry.clone(),
                    Err(e) => {
                        report(e);
                        continue;
                    }
                };
                println!("Downloading {}...", entry.title);
                let result = library.download(&entry.id, &mut print_progress);
                println!();
                match result {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => report(e),
                }
            }
            "4" => {
                if let Err(e) = launcher::open_folder(library.mods_dir()) {
                    report(e);
                }
            }
            "5" => {
                let Some(confirm) = input.prompt("Delete all mods? (y/N): ") else { return };
                if confirm.eq_ignore_ascii_case("y") {
                    match library.delete_all() {
                        Ok(n) => println!("Mods deleted: {}", n),
                        Err(e) => report(e),
                    }
                }
            }
            "0" => break,
            _ => println!("Invalid choice"),
        }
    }
}
