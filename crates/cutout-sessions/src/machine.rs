//! The conversation as a pure function of `(state, input)`.
//!
//! No I/O happens here: the caller supplies the current template list and
//! carries out the returned [`Effect`].

use std::num::NonZeroU32;

use crate::types::{SessionState, Stage};

/// One inbound event, stripped of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Text(&'a str),
    Image,
}

/// What the caller must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Reply(Reply),
    /// Compose the submitted photo with this selection.
    Compose {
        template_name: String,
        max_height: NonZeroU32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Welcome { templates: Vec<String> },
    TemplateChosen { name: String },
    InvalidTemplate { count: usize },
    HeightSet { height: u32 },
    InvalidHeight { limit: u32 },
    Templates { templates: Vec<String> },
    Status(SessionState),
    Help,
    ImageNotExpected { stage: Stage },
    Unrecognized { stage: Stage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted height in pixels.
    pub max_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Templates,
    Status,
    Unknown,
}

/// Advance `state` by one input.
///
/// `templates` is the ordered list shown to the user; a numeric reply `n`
/// selects `templates[n - 1]`.
pub fn transition(
    state: &SessionState,
    input: Input<'_>,
    templates: &[String],
    limits: &Limits,
) -> (SessionState, Effect) {
    let text = match input {
        Input::Image => return on_image(state),
        Input::Text(text) => text,
    };

    if let Some(cmd) = parse_command(text) {
        let reply = match cmd {
            Command::Start => {
                let next = SessionState {
                    stage: Stage::AwaitingTemplate,
                    template_name: None,
                    max_height: None,
                };
                let reply = Reply::Welcome {
                    templates: templates.to_vec(),
                };
                return (next, Effect::Reply(reply));
            }
            Command::Help => Reply::Help,
            Command::Templates => Reply::Templates {
                templates: templates.to_vec(),
            },
            Command::Status => Reply::Status(state.clone()),
            Command::Unknown => Reply::Unrecognized { stage: state.stage },
        };
        return (state.clone(), Effect::Reply(reply));
    }

    match state.stage {
        Stage::AwaitingTemplate => match parse_number(text) {
            Some(n) if n >= 1 && (n as u64) <= templates.len() as u64 => {
                let name = templates[(n - 1) as usize].clone();
                let next = SessionState {
                    stage: Stage::AwaitingHeight,
                    template_name: Some(name.clone()),
                    max_height: None,
                };
                (next, Effect::Reply(Reply::TemplateChosen { name }))
            }
            _ => (
                state.clone(),
                Effect::Reply(Reply::InvalidTemplate {
                    count: templates.len(),
                }),
            ),
        },
        Stage::AwaitingHeight => {
            let height = parse_number(text.trim().trim_end_matches("px"))
                .filter(|h| *h >= 1 && *h <= i64::from(limits.max_height))
                .and_then(|h| u32::try_from(h).ok());
            match height {
                Some(height) => {
                    let next = SessionState {
                        stage: Stage::Ready,
                        template_name: state.template_name.clone(),
                        max_height: Some(height),
                    };
                    (next, Effect::Reply(Reply::HeightSet { height }))
                }
                None => (
                    state.clone(),
                    Effect::Reply(Reply::InvalidHeight {
                        limit: limits.max_height,
                    }),
                ),
            }
        }
        Stage::None | Stage::Ready => (
            state.clone(),
            Effect::Reply(Reply::Unrecognized { stage: state.stage }),
        ),
    }
}

fn on_image(state: &SessionState) -> (SessionState, Effect) {
    let selection = match (&state.stage, &state.template_name, state.max_height) {
        (Stage::Ready, Some(name), Some(h)) => NonZeroU32::new(h).map(|h| (name.clone(), h)),
        _ => None,
    };

    let effect = match selection {
        Some((template_name, max_height)) => Effect::Compose {
            template_name,
            max_height,
        },
        // A ready row without a usable selection is treated as never started.
        None if state.stage == Stage::Ready => Effect::Reply(Reply::ImageNotExpected {
            stage: Stage::None,
        }),
        None => Effect::Reply(Reply::ImageNotExpected { stage: state.stage }),
    };
    (state.clone(), effect)
}

/// Recognise `/cmd`, `/cmd@botname` and `/cmd payload`.
fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    let cmd = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "templates" => Command::Templates,
        "status" => Command::Status,
        _ => Command::Unknown,
    };
    Some(cmd)
}

fn parse_number(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

impl Reply {
    /// Human-readable message for this reply.
    pub fn render(&self) -> String {
        match self {
            Reply::Welcome { templates } if templates.is_empty() => {
                "👋 Welcome! No templates are available right now. Please try again later."
                    .to_string()
            }
            Reply::Welcome { templates } => format!(
                "👋 Welcome! Choose a template by replying with its number:\n{}",
                numbered(templates)
            ),
            Reply::TemplateChosen { name } => format!(
                "✅ Template set to {name}.\nNow reply with the product height in pixels (e.g. 1100)."
            ),
            Reply::InvalidTemplate { count: 0 } => {
                "❌ No templates are available. Send /start to refresh the list.".to_string()
            }
            Reply::InvalidTemplate { count } => {
                format!("❌ Please reply with a template number between 1 and {count}.")
            }
            Reply::HeightSet { height } => format!(
                "✅ Max height set to {height}px.\nSend a product photo and I'll place it on the template."
            ),
            Reply::InvalidHeight { limit } => {
                format!("❌ Please reply with a whole number of pixels between 1 and {limit}.")
            }
            Reply::Templates { templates } if templates.is_empty() => {
                "🖼 No templates available.".to_string()
            }
            Reply::Templates { templates } => {
                format!("🖼 Available templates:\n{}", numbered(templates))
            }
            Reply::Status(state) => format!(
                "Stage: {}\nTemplate: {}\nMax height: {}",
                state.stage.as_str().replace('_', " "),
                state.template_name.as_deref().unwrap_or("-"),
                state
                    .max_height
                    .map(|h| format!("{h}px"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Reply::Help => "Send /start, pick a template by number, reply with the product \
                height in pixels, then send product photos.\n\
                /templates lists templates, /status shows your current selection."
                .to_string(),
            Reply::ImageNotExpected { stage } => format!("📷 Not yet. {}", next_step(*stage)),
            Reply::Unrecognized { stage } => format!("❓ I didn't get that. {}", next_step(*stage)),
        }
    }
}

fn next_step(stage: Stage) -> &'static str {
    match stage {
        Stage::None => "Send /start to choose a template.",
        Stage::AwaitingTemplate => "Reply with the number of a template.",
        Stage::AwaitingHeight => "Reply with the product height in pixels.",
        Stage::Ready => "Send a product photo, or /start to change the template.",
    }
}

fn numbered(templates: &[String]) -> String {
    templates
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {name}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
