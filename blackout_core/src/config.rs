// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Site markup contract, concealment classes, and scan timing.
//!
//! Everything site-specific lives here as data. The classifier and the
//! controller only ever read these structs, so adapting to a markup change is
//! a matter of building a different [`MarkupConfig`].

use crate::time::Duration;

/// The structural markers a timeline page exposes.
///
/// Container markers are matched against [`test_id_attribute`](Self::test_id_attribute).
/// Post wrappers are `<article>` elements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkupConfig {
    /// Attribute holding the test markers (e.g. `data-testid`).
    pub test_id_attribute: &'static str,
    /// Marker of a photo container.
    pub photo_container: &'static str,
    /// Marker of a video container.
    pub video_container: &'static str,
    /// Marker of an avatar wrapper.
    pub avatar: &'static str,
    /// Marker of the primary content column.
    pub primary_column: &'static str,
    /// `role` value of button wrappers whose images are icons.
    pub button_role: &'static str,
    /// Alt-text keywords that mark an image as a profile picture.
    pub profile_alt_keywords: &'static [&'static str],
    /// Alt-text keyword that keeps a plain article image out of the
    /// candidate set.
    pub article_alt_exclusion: &'static str,
    /// Class carried by fixed-size profile thumbnails.
    pub thumbnail_class: &'static str,
    /// Inline-style sizes that identify a thumbnail carrying
    /// [`thumbnail_class`](Self::thumbnail_class).
    pub thumbnail_sizes: &'static [&'static str],
    /// Images whose rendered width and height are both at or below this
    /// size, in logical pixels, are icons.
    pub icon_max_size: f64,
}

impl MarkupConfig {
    /// Markers used by the X (formerly Twitter) web timeline.
    #[must_use]
    pub const fn x_timeline() -> Self {
        Self {
            test_id_attribute: "data-testid",
            photo_container: "tweetPhoto",
            video_container: "videoComponent",
            avatar: "UserAvatar",
            primary_column: "primaryColumn",
            button_role: "button",
            profile_alt_keywords: &["profile", "avatar"],
            article_alt_exclusion: "profile",
            thumbnail_class: "css-175oi2r",
            thumbnail_sizes: &["32px", "40px"],
            icon_max_size: 48.0,
        }
    }
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self::x_timeline()
    }
}

/// Class names and labels used to express concealment state.
///
/// Appearance is owned by an external stylesheet; the engine only toggles
/// these classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcealStyle {
    /// Class marking a concealed media element.
    pub concealed_class: &'static str,
    /// Class marking a revealed media element.
    pub revealed_class: &'static str,
    /// Class of a video cover overlay.
    pub overlay_class: &'static str,
    /// Class added to an overlay once it has been dismissed.
    pub overlay_revealed_class: &'static str,
    /// Text shown on a video cover overlay.
    pub overlay_label: &'static str,
}

impl ConcealStyle {
    /// The class names shipped with the blackout stylesheet.
    #[must_use]
    pub const fn blackout() -> Self {
        Self {
            concealed_class: "timeline-image-blackout",
            revealed_class: "timeline-image-revealed",
            overlay_class: "video-blackout-overlay",
            overlay_revealed_class: "revealed",
            overlay_label: "\u{1f3a5} Click to reveal video",
        }
    }
}

impl Default for ConcealStyle {
    fn default() -> Self {
        Self::blackout()
    }
}

/// Configuration for the [`ScanScheduler`](crate::scan::ScanScheduler).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanConfig {
    /// Site markup contract.
    pub markup: MarkupConfig,
    /// Concealment class names.
    pub style: ConcealStyle,
    /// Trailing delay before a mutation-triggered rescan.
    pub mutation_debounce: Duration,
    /// Trailing delay before a scroll-triggered rescan.
    pub scroll_debounce: Duration,
}

impl ScanConfig {
    /// Default configuration for a streaming timeline.
    #[must_use]
    pub const fn timeline() -> Self {
        Self {
            markup: MarkupConfig::x_timeline(),
            style: ConcealStyle::blackout(),
            mutation_debounce: Duration::from_millis(100),
            scroll_debounce: Duration::from_millis(200),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::timeline()
    }
}
