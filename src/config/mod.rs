//! Configuration for strata.
//!
//! Handles layout geometry, builder defaults and logging settings.

mod settings;

pub use settings::{
    DateSettings, LayoutSettings, LoggingSettings, RedactionSettings, Settings, SettingsError,
};
