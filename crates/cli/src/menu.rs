//! Numbered interactive settings menu.

use std::io::{self, BufRead, Write};

use facefinder_core::settings::Settings;
use facefinder_core::shared::constants::PROJECT_NAME;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Training,
    Fps,
    ModifyInputFile,
    ShowResult,
    SaveDetection,
    SaveSettings,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "0" => Some(Command::Start),
            "1" => Some(Command::Training),
            "2" => Some(Command::Fps),
            "3" => Some(Command::ModifyInputFile),
            "4" => Some(Command::ShowResult),
            "5" => Some(Command::SaveDetection),
            "6" => Some(Command::SaveSettings),
            "7" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// How the user left the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    Start(Settings),
    Quit,
}

pub fn render(settings: &Settings) -> String {
    let border = "#".repeat(PROJECT_NAME.len() + 4);
    [
        border.clone(),
        format!("# {PROJECT_NAME} #"),
        border,
        String::new(),
        "0. Start".to_string(),
        format!("1. Training\t\t\t[{}]", settings.training),
        format!("2. Fps\t\t\t\t[{}]", settings.fps),
        format!("3. Modify input file\t\t[{}]", settings.video_name),
        format!("4. Show result\t\t\t[{}]", settings.show),
        format!("5. Save detection\t\t[{}]", settings.save_detection),
        "6. Save settings".to_string(),
        "7. Quit (no save)".to_string(),
        String::new(),
    ]
    .join("\n")
}

/// Flips the boolean setting a toggle command refers to. Returns `false`
/// for commands that are not toggles.
pub fn toggle(settings: &mut Settings, command: Command) -> bool {
    let field = match command {
        Command::Training => &mut settings.training,
        Command::ShowResult => &mut settings.show,
        Command::SaveDetection => &mut settings.save_detection,
        _ => return false,
    };
    *field = !*field;
    true
}

pub fn parse_fps(input: &str) -> Result<u32, String> {
    match input.trim().parse::<u32>() {
        Ok(0) => Err("fps must be at least 1".to_string()),
        Ok(fps) => Ok(fps),
        Err(_) => Err(format!("not a positive integer: {:?}", input.trim())),
    }
}

/// Runs the menu until Start or Quit. End of input counts as Quit.
///
/// `save` is called for "Save settings"; a failure is reported and the
/// menu keeps going.
pub fn run_menu<R, W, S>(
    mut settings: Settings,
    input: &mut R,
    out: &mut W,
    mut save: S,
) -> io::Result<MenuOutcome>
where
    R: BufRead,
    W: Write,
    S: FnMut(&Settings) -> Result<(), Box<dyn std::error::Error>>,
{
    loop {
        writeln!(out, "{}", render(&settings))?;
        let Some(line) = prompt(input, out, "choice: ")? else {
            return Ok(MenuOutcome::Quit);
        };
        let Some(command) = Command::parse(&line) else {
            writeln!(out, "Unknown choice {:?}", line.trim())?;
            continue;
        };

        match command {
            Command::Start => return Ok(MenuOutcome::Start(settings)),
            Command::Quit => return Ok(MenuOutcome::Quit),
            Command::Fps => {
                let Some(line) = prompt(input, out, "Enter fps: ")? else {
                    return Ok(MenuOutcome::Quit);
                };
                match parse_fps(&line) {
                    Ok(fps) => settings.fps = fps,
                    Err(e) => writeln!(out, "{e}")?,
                }
            }
            Command::ModifyInputFile => {
                writeln!(out, "File must be in the video directory")?;
                let Some(line) = prompt(input, out, "File name: ")? else {
                    return Ok(MenuOutcome::Quit);
                };
                let name = line.trim();
                if name.is_empty() {
                    writeln!(out, "File name is empty, keeping {}", settings.video_name)?;
                } else {
                    settings.video_name = name.to_string();
                }
            }
            Command::SaveSettings => match save(&settings) {
                Ok(()) => writeln!(out, "Settings saved")?,
                Err(e) => writeln!(out, "Could not save settings: {e}")?,
            },
            Command::Training | Command::ShowResult | Command::SaveDetection => {
                toggle(&mut settings, command);
            }
        }
    }
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    text: &str,
) -> io::Result<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
