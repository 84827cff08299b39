//! Rules-table advisor and the trait real backends implement.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::action::ActionSuggestion;
use crate::context::{AssistantContext, ChatMode};
use crate::store::ReportKind;

/// Boxed future returned by advisor backends.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Targets proposed when the user asks for a cleanup.
pub const SUGGESTED_CLEAN_TARGETS: [&str; 3] = ["temp", "browser-cache-chrome", "browser-cache-edge"];

/// Text and optional action produced for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorReply {
    /// Reply text shown to the user.
    pub text: String,
    /// Action proposed alongside the text.
    pub action: Option<ActionSuggestion>,
}

impl AdvisorReply {
    /// Create a reply without an action.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }

    /// Attach a suggested action.
    pub fn with_action(mut self, action: ActionSuggestion) -> Self {
        self.action = Some(action);
        self
    }

    /// Sentinel returned when a backend fails or times out.
    pub fn unavailable() -> Self {
        Self::new("The assistant is unavailable right now. Please try again in a moment.")
    }
}

/// A conversational backend.
pub trait Advisor: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Produce a reply. Backends report failure with [`AdvisorReply::unavailable`].
    fn reply<'a>(&'a self, message: &'a str, ctx: &'a AssistantContext) -> BoxFuture<'a, AdvisorReply>;
}

/// What a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Salutations.
    Greeting,
    /// Asks for a scan.
    Analyze,
    /// Asks to delete or free space.
    Clean,
    /// Asks for a plan or recommendations.
    Plan,
    /// Asks about earlier reports.
    History,
    /// Complains about speed.
    Performance,
    /// Anything else.
    Fallback,
}

/// Keyword sets, checked in order; the first match wins.
const RULES: &[(Intent, &[&str])] = &[
    (Intent::Greeting, &["hello", "hey there", "good morning", "good evening", "greetings"]),
    (Intent::Analyze, &["analyze", "analyse", "scan", "search", "junk"]),
    (Intent::Clean, &["clean", "delete", "optimize", "remove", "free up"]),
    (Intent::Plan, &["plan", "recommend", "suggest"]),
    (Intent::History, &["history", "last report", "previous", "when did i"]),
    (Intent::Performance, &["slow", "performance", "lag", "frozen"]),
];

impl Intent {
    /// Classify a message by case-insensitive substring match.
    pub fn detect(message: &str) -> Self {
        let message = message.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| message.contains(k)))
            .map_or(Intent::Fallback, |(intent, _)| *intent)
    }
}

/// Deterministic advisor driven by [`Intent::detect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedAdvisor;

impl ScriptedAdvisor {
    /// Create the advisor.
    pub fn new() -> Self {
        Self
    }

    /// Build the reply for a message.
    pub fn respond(&self, message: &str, ctx: &AssistantContext) -> AdvisorReply {
        let m = &ctx.metrics;
        match Intent::detect(message) {
            Intent::Greeting => {
                let mut text = format!(
                    "Hello! I'm looking at your system in {} mode.\n\n\
                     Current status:\n- CPU: {}%\n- RAM: {}%\n- Disk: {}%\n\n\
                     Shall we look for junk files, or is there something specific you need?",
                    ctx.mode.title(),
                    m.cpu_load,
                    m.ram_used,
                    m.disk_used
                );
                if m.disk_used > 90 {
                    text.push_str("\n\nWarning: your disk is nearly full. I recommend an analysis right away.");
                    return AdvisorReply::new(text).with_action(ActionSuggestion::analyze(
                        "Start urgent analysis",
                        "Disk critical (>90%)",
                    ));
                }
                if ctx.mode == ChatMode::Optimization {
                    text.push_str("\n\nIn optimization mode I can suggest closing heavy processes or clearing deep caches.");
                }
                AdvisorReply::new(text)
            }
            Intent::Analyze => AdvisorReply::new(
                "I can analyze temporary files, browser caches (Chrome/Edge) and system logs.\n\n\
                 This is safe and never touches your personal documents. Shall I go ahead?",
            )
            .with_action(ActionSuggestion::analyze(
                "Start analysis",
                "Scan the system for junk files",
            )),
            Intent::Clean => {
                let recoverable = ctx.recoverable_mb();
                if recoverable > 0.0 {
                    AdvisorReply::new(format!(
                        "According to the last analysis we can recover {recoverable} MB.\n\n\
                         That covers:\n- Temporary files\n- Chrome/Edge cache\n\n\
                         Shall I run the cleanup now?"
                    ))
                    .with_action(ActionSuggestion::clean(
                        SUGGESTED_CLEAN_TARGETS,
                        "Run cleanup",
                        format!("Free about {recoverable} MB"),
                    ))
                } else {
                    AdvisorReply::new(
                        "To clean safely I first need a recent analysis to find what can be \
                         removed without risk. Want me to run one?",
                    )
                    .with_action(ActionSuggestion::analyze("Analyze first", "Find junk files"))
                }
            }
            Intent::Plan => {
                if ctx.mode == ChatMode::Optimization {
                    AdvisorReply::new(
                        "Suggested optimization plan:\n\n\
                         1. Disk cleanup: find and remove temporary files (can be done now).\n\
                         2. Startup apps: review what launches at login.\n\
                         3. Free RAM: close idle browser tabs.\n\n\
                         Start with step 1?",
                    )
                    .with_action(ActionSuggestion::analyze("Begin cleanup", "Step 1 of the plan"))
                } else {
                    AdvisorReply::new(
                        "To build a plan for you I need your goal. Do you want to free disk \
                         space or improve responsiveness?",
                    )
                }
            }
            Intent::History => match ctx.reports.first() {
                Some(last) => {
                    let day = last.timestamp.format("%Y-%m-%d");
                    let text = match last.kind {
                        ReportKind::Cleanup => format!(
                            "Last report ({day}):\n\n- Freed {} MB\n- Items deleted: {}",
                            last.stats.freed_mb, last.stats.files_deleted
                        ),
                        ReportKind::Analysis => format!(
                            "Last report ({day}):\n\n- Recoverable: {} MB\n- Files found: {}",
                            last.stats.recoverable_mb, last.stats.file_count
                        ),
                    };
                    AdvisorReply::new(text)
                }
                None => AdvisorReply::new(
                    "I have no record of previous cleanups. Would you like to run the first analysis now?",
                )
                .with_action(ActionSuggestion::analyze("Start analysis", "First scan")),
            },
            Intent::Performance => {
                if m.ram_used > 80 {
                    AdvisorReply::new(format!(
                        "Your RAM is at {}%, which is high.\n\n\
                         Suggestion: close heavy applications such as browsers with many tabs.\n\
                         I can also clear caches to take some load off.",
                        m.ram_used
                    ))
                } else {
                    AdvisorReply::new(
                        "Resource usage looks normal (CPU and RAM are stable). Clearing \
                         temporary files often helps when things feel sluggish.",
                    )
                    .with_action(ActionSuggestion::analyze(
                        "Clear temporary files",
                        "Improve system responsiveness",
                    ))
                }
            }
            Intent::Fallback => {
                if ctx.mode == ChatMode::Hardware {
                    AdvisorReply::new(format!(
                        "In hardware mode I can give you details about CPU, RAM and disk.\n\n\
                         - CPU: {}%\n- RAM: {}%\n- Free disk: {} GB\n\n\
                         Need more technical detail?",
                        m.cpu_load, m.ram_used, m.disk_free_gb
                    ))
                } else {
                    AdvisorReply::new(
                        "Understood. Would you like to analyze the system, optimize performance \
                         or check your hardware status?",
                    )
                    .with_action(ActionSuggestion::analyze("View system status", "Quick analysis"))
                }
            }
        }
    }

    /// Opening line for a new conversation.
    pub fn greeting(&self, ctx: &AssistantContext) -> String {
        let m = &ctx.metrics;
        let mut greeting = format!("Hi. I'm ready to help in {} mode.", ctx.mode.title());
        let recoverable = ctx.recoverable_mb();

        if m.disk_used > 90 {
            greeting.push_str(&format!(
                " Attention: your disk is at {}%. I suggest freeing space urgently.",
                m.disk_used
            ));
        } else if recoverable > 1000.0 {
            greeting.push_str(&format!(
                " The last analysis found {recoverable} MB recoverable. Shall we proceed?"
            ));
        } else {
            greeting.push_str(&format!(
                " Your system looks stable (CPU: {}%, RAM: {}%). How can I help today?",
                m.cpu_load, m.ram_used
            ));
        }
        greeting
    }
}

impl Advisor for ScriptedAdvisor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn reply<'a>(&'a self, message: &'a str, ctx: &'a AssistantContext) -> BoxFuture<'a, AdvisorReply> {
        Box::pin(async move { self.respond(message, ctx) })
    }
}
