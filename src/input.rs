//! Keyboard control loop.
//!
//! A static binding table maps each tuning key to an (increment, decrement)
//! character pair; the bindings are fixed at startup and never change. One
//! character may drive several keys at once — the focal-length and
//! optical-center pairs adjust both eyes together, which keeps the default
//! left-tied-right calibration in lockstep while the per-eye keys remain
//! independently settable through the store.
//!
//! `q` requests shutdown, `p` dumps the full parameter set, unrecognized
//! keys are ignored. Adjustments step by ±10; a crop margin driven below
//! zero is clamped and the (once-per-excursion) notice is logged here.

use crate::params::{ParamKey, ParamStore, ADJUST_STEP};

pub const QUIT_KEY: char = 'q';
pub const DUMP_KEY: char = 'p';

/// One tuning key with its increment/decrement trigger characters.
pub struct KeyBinding {
    pub key: ParamKey,
    pub increment: char,
    pub decrement: char,
}

/// The fixed binding table.
#[rustfmt::skip]
pub const BINDINGS: &[KeyBinding] = &[
    KeyBinding { key: ParamKey::FxLeft, increment: 'f', decrement: 's' },
    KeyBinding { key: ParamKey::FxRight, increment: 'f', decrement: 's' },
    KeyBinding { key: ParamKey::FyLeft, increment: 'e', decrement: 'd' },
    KeyBinding { key: ParamKey::FyRight, increment: 'e', decrement: 'd' },
    KeyBinding { key: ParamKey::CxLeft, increment: 'l', decrement: 'j' },
    KeyBinding { key: ParamKey::CxRight, increment: 'l', decrement: 'j' },
    KeyBinding { key: ParamKey::CyLeft, increment: 'k', decrement: 'i' },
    KeyBinding { key: ParamKey::CyRight, increment: 'k', decrement: 'i' },
    KeyBinding { key: ParamKey::PostOffsetY, increment: 'o', decrement: 'u' },
    KeyBinding { key: ParamKey::PostOffsetX, increment: 'm', decrement: 'n' },
    KeyBinding { key: ParamKey::PreOffsetX, increment: '.', decrement: ',' },
    KeyBinding { key: ParamKey::PreOffsetY, increment: 'h', decrement: ';' },
    KeyBinding { key: ParamKey::CropLeft, increment: 'z', decrement: 'x' },
    KeyBinding { key: ParamKey::CropTop, increment: 'w', decrement: 'r' },
    KeyBinding { key: ParamKey::CropRight, increment: 'c', decrement: 'v' },
    KeyBinding { key: ParamKey::CropBottom, increment: 'a', decrement: 'g' },
];

/// What a key press asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    /// Shut the pipeline down.
    Quit,
    /// The parameter dump was logged.
    Dump,
    /// Tuning keys were adjusted; `notices` counts freshly reported clamps.
    Adjusted { keys: usize, notices: usize },
    /// Not a bound key.
    Ignored,
}

/// React to a single key press.
pub fn handle_key(store: &ParamStore, key: char) -> ControlAction {
    if key == QUIT_KEY {
        return ControlAction::Quit;
    }
    if key == DUMP_KEY {
        log_param_dump(store);
        return ControlAction::Dump;
    }

    let mut touched = 0usize;
    let mut notices = 0usize;
    for binding in BINDINGS {
        let delta = if key == binding.increment {
            ADJUST_STEP
        } else if key == binding.decrement {
            -ADJUST_STEP
        } else {
            continue;
        };

        let outcome = store.adjust(binding.key, delta);
        touched += 1;
        if outcome.notice {
            notices += 1;
            log::warn!(
                "{} would go below zero; held at 0",
                binding.key.name()
            );
        }
    }

    if touched == 0 {
        ControlAction::Ignored
    } else {
        ControlAction::Adjusted {
            keys: touched,
            notices,
        }
    }
}

/// Log every parameter on one line, in declaration order.
pub fn log_param_dump(store: &ParamStore) {
    let rendered = store
        .dump()
        .into_iter()
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect::<Vec<_>>()
        .join(", ");
    log::info!("parameters: {}", rendered);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
