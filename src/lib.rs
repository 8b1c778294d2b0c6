//! An embeddable floating chat widget.
//!
//! The widget renders a bubble trigger and a chat panel onto a host
//! [`Surface`], keeps the conversation log, formats bot replies with a small
//! markdown dialect and relays user messages to a JSON chat endpoint.

// Public modules
pub mod config;
pub mod conversation;
pub mod error;
pub mod i18n;
pub mod listeners;
pub mod markdown;
pub mod surface;
pub mod transport;
pub mod view;
pub mod widget;

mod observability;

// Re-exports
pub use config::{Position, ThemeKind, WidgetArgs, WidgetConfig, WidgetOptions};
pub use conversation::{Message, NodeId, RenderMode, Sender};
pub use error::{Error, Result};
pub use i18n::{Suggestion, Translation};
pub use listeners::WidgetEvent;
pub use observability::register_biometrics;
pub use surface::{MemorySurface, ScrollMetrics, Surface};
pub use transport::{ChatRequest, HttpTransport, Outcome, Transport};
pub use widget::{Key, KeyOutcome, Modifiers, Widget, WidgetBuilder};
