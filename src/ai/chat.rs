//! Conversation with the companion.
//!
//! The reply generator sits behind [`ChatResponder`]; the game ships an offline
//! responder and never talks to the network itself.

use thiserror::Error;

use super::Mood;

const SYSTEM_PROMPT: &str = "You are Budy, a helpful AI companion in a space shooter game. \
You're friendly, encouraging, and provide gameplay tips. Keep responses short. \
Respond according to your current mood but always stay on the player's side.";
const GREETING: &str = "Hello friend! Ready for some alien hunting? Ask me anything about the game or just chat!";
const MOOD_TAG: &str = "[Current mood:";
const MAX_TRANSCRIPT: usize = 50;
const MAX_HISTORY: usize = 40;
/// System prompt and greeting stay at the head of the history.
const PINNED_TURNS: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Please enter a message!")]
    EmptyMessage,
    #[error("{0}")]
    Backend(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    Player,
    Companion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
    pub is_error: bool,
}

/// Snapshot of the game appended to every prompt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameContext {
    pub health: i32,
    pub max_health: i32,
    pub game_over: bool,
    pub boss_level: bool,
    pub mood: Mood,
}

impl GameContext {
    pub fn describe(&self) -> String {
        format!(
            "Player health: {}/{}. Game over: {}. Level 3 (boss level): {}. Budy mood: {}.",
            self.health,
            self.max_health,
            self.game_over,
            self.boss_level,
            self.mood.as_str()
        )
    }
}

pub trait ChatResponder {
    fn respond(
        &mut self,
        history: &[ChatTurn],
        prompt: &str,
        context: &GameContext,
    ) -> Result<String, ChatError>;
}

/// Canned replies keyed on the companion's mood and the player's health.
#[derive(Default)]
pub struct OfflineResponder {
    counter: usize,
}

impl ChatResponder for OfflineResponder {
    fn respond(
        &mut self,
        _history: &[ChatTurn],
        _prompt: &str,
        context: &GameContext,
    ) -> Result<String, ChatError> {
        let lines: &[&str] = if context.game_over {
            &["That was a wild ride. Let's go again!"]
        } else {
            match context.mood {
                Mood::Aggressive => &[
                    "Locked on! Let's blast them together!",
                    "I'll fire at anything that gets close!",
                ],
                Mood::Scared => &[
                    "That's a lot of danger out there... stay behind me!",
                    "Keep moving, they can't hit what they can't catch!",
                ],
                Mood::Supportive => &[
                    "Hold still, I'm coming to heal you!",
                    "Stay close, I've got your back.",
                ],
                Mood::Calm => &[
                    "All quiet on my scopes. Nice flying!",
                    "We make a great team.",
                ],
            }
        };
        let line = lines[self.counter % lines.len()];
        self.counter = self.counter.wrapping_add(1);
        if context.boss_level && !context.game_over {
            Ok(format!("{line} Aim for the legs first!"))
        } else {
            Ok(line.to_string())
        }
    }
}

/// What the caller should feed to the companion's keyword scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatExchange {
    pub player_text: String,
    pub reply: Result<String, ChatError>,
}

pub struct ChatSession<R: ChatResponder> {
    responder: R,
    history: Vec<ChatTurn>,
    transcript: Vec<ChatLine>,
}

impl<R: ChatResponder> ChatSession<R> {
    pub fn new(responder: R) -> Self {
        let mut session = Self {
            responder,
            history: Vec::new(),
            transcript: Vec::new(),
        };
        session.clear();
        session
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.history.push(ChatTurn {
            role: Role::User,
            text: SYSTEM_PROMPT.to_string(),
        });
        self.history.push(ChatTurn {
            role: Role::Model,
            text: GREETING.to_string(),
        });
        self.transcript.clear();
        self.push_line(Speaker::Companion, GREETING.to_string(), false);
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Sends one player line. Empty input is rejected before anything is
    /// recorded; a responder failure becomes a red companion line and leaves
    /// the history without a reply.
    pub fn send(&mut self, message: &str, context: &GameContext) -> ChatExchange {
        let clean = strip_mood_tag(message);
        if clean.is_empty() {
            return ChatExchange {
                player_text: String::new(),
                reply: Err(ChatError::EmptyMessage),
            };
        }
        self.push_line(Speaker::Player, clean.to_string(), false);
        let prompt = format!("{clean}\n\nGame context: {}", context.describe());
        self.history.push(ChatTurn {
            role: Role::User,
            text: prompt.clone(),
        });
        let reply = self.responder.respond(&self.history, &prompt, context);
        match &reply {
            Ok(text) => {
                self.history.push(ChatTurn {
                    role: Role::Model,
                    text: text.clone(),
                });
                self.push_line(Speaker::Companion, text.clone(), false);
            }
            Err(err) => {
                log::warn!("companion chat failed: {err}");
                self.push_line(
                    Speaker::Companion,
                    format!("Sorry, I'm having trouble connecting right now. Error: {err}"),
                    true,
                );
            }
        }
        self.trim_history();
        ChatExchange {
            player_text: clean.to_string(),
            reply,
        }
    }

    fn trim_history(&mut self) {
        if self.history.len() > MAX_HISTORY {
            let overflow = self.history.len() - MAX_HISTORY;
            self.history.drain(PINNED_TURNS..PINNED_TURNS + overflow);
        }
    }

    fn push_line(&mut self, speaker: Speaker, text: String, is_error: bool) {
        self.transcript.push(ChatLine {
            speaker,
            text,
            is_error,
        });
        if self.transcript.len() > MAX_TRANSCRIPT {
            let overflow = self.transcript.len() - MAX_TRANSCRIPT;
            self.transcript.drain(..overflow);
        }
    }
}

fn strip_mood_tag(message: &str) -> &str {
    match message.find(MOOD_TAG) {
        Some(idx) => message[..idx].trim(),
        None => message.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl ChatResponder for Unreachable {
        fn respond(
            &mut self,
            _history: &[ChatTurn],
            _prompt: &str,
            _context: &GameContext,
        ) -> Result<String, ChatError> {
            Err(ChatError::Backend("connection refused".into()))
        }
    }

    struct Echo;

    impl ChatResponder for Echo {
        fn respond(
            &mut self,
            _history: &[ChatTurn],
            prompt: &str,
            _context: &GameContext,
        ) -> Result<String, ChatError> {
            Ok(prompt.to_string())
        }
    }

    fn context() -> GameContext {
        GameContext {
            health: 3,
            max_health: 5,
            game_over: false,
            boss_level: true,
            mood: Mood::Scared,
        }
    }

    #[test]
    fn prompt_carries_game_context_without_mood_tag() {
        let mut session = ChatSession::new(Echo);
        let exchange = session.send("hello there [Current mood: Calm]", &context());
        assert_eq!(exchange.player_text, "hello there");
        assert_eq!(
            exchange.reply.unwrap(),
            "hello there\n\nGame context: Player health: 3/5. Game over: false. \
             Level 3 (boss level): true. Budy mood: Scared."
        );
    }

    #[test]
    fn empty_message_is_rejected_without_touching_history() {
        let mut session = ChatSession::new(Echo);
        let before = session.history().len();
        let exchange = session.send("   ", &context());
        assert_eq!(exchange.reply, Err(ChatError::EmptyMessage));
        assert_eq!(session.history().len(), before);
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn backend_failure_becomes_error_line() {
        let mut session = ChatSession::new(Unreachable);
        let exchange = session.send("attack!", &context());
        assert!(exchange.reply.is_err());
        let last = session.transcript().last().unwrap();
        assert!(last.is_error);
        assert_eq!(
            last.text,
            "Sorry, I'm having trouble connecting right now. Error: connection refused"
        );
        assert_eq!(session.history().last().unwrap().role, Role::User);
    }

    #[test]
    fn offline_replies_follow_mood() {
        let mut responder = OfflineResponder::default();
        let mut ctx = context();
        ctx.boss_level = false;
        ctx.mood = Mood::Aggressive;
        let reply = responder.respond(&[], "", &ctx).unwrap();
        assert_eq!(super::super::mood_from_chat(&reply), Some(Mood::Aggressive));
    }

    #[test]
    fn transcript_is_capped() {
        let mut session = ChatSession::new(Echo);
        for idx in 0..40 {
            session.send(&format!("line {idx}"), &context());
        }
        assert_eq!(session.transcript().len(), MAX_TRANSCRIPT);
        assert_eq!(session.transcript().last().unwrap().speaker, Speaker::Companion);
    }

    #[test]
    fn history_drops_old_turns_but_keeps_prompt_and_greeting() {
        let mut session = ChatSession::new(Echo);
        for idx in 0..60 {
            session.send(&format!("line {idx}"), &context());
        }
        let history = session.history();
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history[0].text, SYSTEM_PROMPT);
        assert_eq!(history[1].text, GREETING);
        assert!(history[2].text.starts_with("line 41\n"));
        assert!(history.last().unwrap().text.starts_with("line 59\n"));
    }
}
