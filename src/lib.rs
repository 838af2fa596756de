//! Reword: a floating "rewrite this" button for editable fields
//!
//! The crate is the page-side core of the extension. It recognizes editable
//! surfaces, shows a single overlay next to the focused (or hovered) one,
//! reads the text to rewrite, sends it to a chat-completion service, and
//! writes the reply back in place. The browser itself sits behind the
//! [`dom::Dom`] trait; a host forwards page events into a [`ContentScript`]
//! and runs its event loop.

#![forbid(unsafe_code)]

pub mod action;
pub mod constants;
pub mod content_script;
pub mod control;
pub mod dom;
pub mod error;
pub mod logging;
pub mod messages;
pub mod overlay;
pub mod position;
pub mod resolver;
pub mod rewrite;
pub mod settings;
pub mod store;
pub mod surface;
pub mod text_access;
pub mod timers;
pub mod types;

pub use content_script::{ContentScript, PageEvent};
pub use control::FloatingButton;
pub use dom::{Dom, MemoryDom, NodeId};
pub use error::{RemoteCallError, ValidationError, WriteBackError};
pub use messages::{Ack, RuntimeMessage};
pub use rewrite::{OpenRouterClient, Rewriter};
pub use settings::{DomainOverrides, EffectiveSettings, GlobalSettings, PartialSettings};
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
