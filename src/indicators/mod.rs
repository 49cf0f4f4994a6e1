// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the signal
// engine. Functions return `Option<T>` (or, for the oscillator, explicitly
// sized series) so callers are forced to handle insufficient-data and
// numerical-edge-case scenarios; nothing in this module panics on bad input.

pub mod atr;
pub mod kvo;
pub mod levels;
pub mod pivot;
