//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the content script, providing a single source of truth for constant values.

/// Markers used to recognize third-party rich-text editors
pub mod markers {
    /// ARIA role carried by comment editors
    pub const TEXTBOX_ROLE: &str = "textbox";

    /// Attribute used by editors to tag their test identifier
    pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

    /// Test identifiers of recognized comment editors
    pub const COMMENT_EDITOR_TEST_IDS: &[&str] = &[
        "ak-editor-textarea",
        "comment-editor-textarea",
    ];

    /// Class names placed on the comment editor node itself
    pub const RICH_TEXT_MARKER_CLASSES: &[&str] = &["ak-editor-content-area"];

    /// Class names placed on an editor's outer root container
    pub const EDITOR_ROOT_CLASSES: &[&str] = &["akEditor", "ak-editor-root"];

    /// Class name of the editor's actual content-editable region
    pub const CONTENT_REGION_CLASS: &str = "ProseMirror";
}

/// Standard form element constants
pub mod elements {
    /// Tag name of single-line inputs (uppercase, as the DOM reports it)
    pub const INPUT_TAG: &str = "INPUT";

    /// Tag name of multi-line text areas
    pub const TEXTAREA_TAG: &str = "TEXTAREA";

    /// Input `type` values that hold free text
    pub const TEXT_INPUT_TYPES: &[&str] = &["", "text", "search", "email", "url", "tel"];
}

/// Overlay container constants
pub mod overlay {
    /// DOM id of the floating container
    pub const CONTAINER_ID: &str = "reword-floating-button";

    /// Inline style applied to the container on creation
    pub const CONTAINER_STYLE: &str = "position: absolute; z-index: 10000; pointer-events: auto;";

    /// Accessible label of the action button
    pub const BUTTON_LABEL: &str = "Reword text";
}

/// Timing constants (milliseconds)
pub mod timing {
    /// Quiet period after the last keystroke before repositioning
    pub const ANCHOR_INPUT_DEBOUNCE_MS: u64 = 100;

    /// Wait before checking what the pointer moved onto after leaving the anchor
    pub const HOVER_CHECK_DELAY_MS: u64 = 50;

    /// How long Success/Error is displayed before returning to Default
    pub const VISUAL_RESET_DELAY_MS: u64 = 2000;
}

/// Remote rewrite service constants
pub mod remote {
    /// OpenRouter chat-completions endpoint
    pub const API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

    /// Model used for every rewrite
    pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324:free";

    /// Value of the `X-Title` header identifying this client
    pub const CLIENT_TITLE: &str = "Reword Extension";

    /// Build-time fallback API key
    pub const FALLBACK_API_KEY: Option<&str> = option_env!("OPEN_ROUTER_API");
}

/// User-visible notices
pub mod notices {
    pub const MISSING_API_KEY: &str =
        "Please set your OpenRouter API key in the extension settings first.";

    pub const EMPTY_OPERAND: &str = "Please select some text to rephrase.";

    pub const REMOTE_FAILURE: &str =
        "Error rephrasing text. Please check your API key and try again.";

    pub const FRAGMENT_CHANGED: &str =
        "The selected text changed while it was being rephrased. Please select it and try again.";
}

/// Settings storage constants
pub mod storage {
    /// Key of the global settings record
    pub const SETTINGS_KEY: &str = "rewordSettings";

    /// Key of the hostname → partial settings record
    pub const OVERRIDES_KEY: &str = "rewordDomainOverrides";

    /// Application directory under the platform config dir
    pub const APP_DIR: &str = "reword";

    /// Storage file name
    pub const FILENAME: &str = "storage.json";
}
