//! In-app browser chrome options
//!
//! Pass-through values handed to the browser port on logout. Nothing in the
//! session lifecycle reads them.

use serde::{Deserialize, Serialize};

/// Android custom-tab transition animation names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserAnimations {
    /// Enter animation of the opening tab
    pub start_enter: String,
    /// Exit animation of the app as the tab opens
    pub start_exit: String,
    /// Enter animation of the app as the tab closes
    pub end_enter: String,
    /// Exit animation of the closing tab
    pub end_exit: String,
}

impl Default for BrowserAnimations {
    fn default() -> Self {
        Self {
            start_enter: "slide_in_right".to_string(),
            start_exit: "slide_out_left".to_string(),
            end_enter: "slide_in_left".to_string(),
            end_exit: "slide_out_right".to_string(),
        }
    }
}

/// Browser chrome configuration (iOS and Android options side by side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InAppBrowserConfig {
    // iOS
    /// Label style of the dismiss button
    pub dismiss_button_style: String,
    /// Toolbar background color
    pub preferred_bar_tint_color: String,
    /// Toolbar control color
    pub preferred_control_tint_color: String,
    /// Open in reader mode when available
    pub reader_mode: bool,
    /// Animate presentation
    pub animated: bool,
    /// Modal presentation style name
    pub modal_presentation_style: String,
    /// Modal transition style name
    pub modal_transition_style: String,
    /// Present modally
    pub modal_enabled: bool,
    /// Collapse the toolbar on scroll
    pub enable_bar_collapsing: bool,
    // Android
    /// Show the page title
    pub show_title: bool,
    /// Hide the URL bar on scroll
    pub enable_url_bar_hiding: bool,
    /// Offer the default share action
    pub enable_default_share: bool,
    /// Close the tab once it redirects
    pub force_close_on_redirection: bool,
    /// Custom-tab animations
    pub animations: BrowserAnimations,
}

impl Default for InAppBrowserConfig {
    fn default() -> Self {
        Self {
            dismiss_button_style: "cancel".to_string(),
            preferred_bar_tint_color: "#453AA4".to_string(),
            preferred_control_tint_color: "white".to_string(),
            reader_mode: false,
            animated: true,
            modal_presentation_style: "fullScreen".to_string(),
            modal_transition_style: "coverVertical".to_string(),
            modal_enabled: true,
            enable_bar_collapsing: false,
            show_title: true,
            enable_url_bar_hiding: true,
            enable_default_share: true,
            force_close_on_redirection: true,
            animations: BrowserAnimations::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for browser config.
    use super::*;

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let config: InAppBrowserConfig =
            serde_json::from_str(r##"{"preferredBarTintColor": "#000000", "readerMode": true}"##)
                .unwrap();

        assert_eq!(config.preferred_bar_tint_color, "#000000");
        assert!(config.reader_mode);
        assert_eq!(config.dismiss_button_style, "cancel");
        assert_eq!(config.animations.start_enter, "slide_in_right");
        assert!(config.force_close_on_redirection);
    }
}
