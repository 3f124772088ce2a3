use bracket_terminal::prelude::VirtualKeyCode;
use std::{
    collections::VecDeque,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

/// One frame's worth of scripted input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptStep {
    Key(VirtualKeyCode),
    /// A frame with no input.
    Idle,
    /// A line typed into the companion chat and sent.
    Chat(String),
}

/// Replays a playtest script one step per frame.
///
/// Each non-comment line is either a run of key characters or, when it
/// starts with `>`, a chat message.
pub struct ScriptedInput {
    steps: VecDeque<ScriptStep>,
}

impl ScriptedInput {
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut steps = VecDeque::new();

        for line in reader.lines() {
            let line = line?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }

            if let Some(message) = trimmed_line.strip_prefix('>') {
                steps.push_back(ScriptStep::Chat(message.trim().to_string()));
                continue;
            }

            for char_code in trimmed_line.chars() {
                match char_to_step(char_code) {
                    Some(step) => steps.push_back(step),
                    None => log::warn!("unknown key in script: {char_code:?}"),
                }
            }
        }

        Ok(Self { steps })
    }

    pub fn next_step(&mut self) -> Option<ScriptStep> {
        self.steps.pop_front()
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }
}

fn char_to_step(c: char) -> Option<ScriptStep> {
    let key = match c {
        'w' | 'W' | 'k' | 'K' => VirtualKeyCode::Up,
        'a' | 'A' | 'h' | 'H' => VirtualKeyCode::Left,
        's' | 'S' | 'j' | 'J' => VirtualKeyCode::Down,
        'd' | 'D' | 'l' | 'L' => VirtualKeyCode::Right,
        'f' | 'F' | '_' => VirtualKeyCode::Space, // fire
        'p' | 'P' => VirtualKeyCode::P,
        'n' | 'N' => VirtualKeyCode::F1, // skip to next stage
        'e' | 'E' => VirtualKeyCode::Return,
        'o' | 'O' => VirtualKeyCode::F6, // play again
        '2' => VirtualKeyCode::F2,
        '3' => VirtualKeyCode::F3,
        '4' => VirtualKeyCode::F4,
        '5' => VirtualKeyCode::F5,
        'q' | 'Q' | '\x1B' => VirtualKeyCode::Escape,
        '.' => return Some(ScriptStep::Idle),
        _ => return None,
    };
    Some(ScriptStep::Key(key))
}
