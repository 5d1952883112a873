//! Colour palettes for rule definitions.

use tessera_types::Rgb;

use crate::error::RuleError;

/// Check that a palette has exactly one colour per state.
///
/// # Errors
///
/// Returns [`RuleError::PaletteLength`] when the lengths differ.
pub fn validate(colours: &[Rgb], n_states: u16) -> Result<(), RuleError> {
    let expected = usize::from(n_states);
    if colours.len() == expected {
        Ok(())
    } else {
        Err(RuleError::PaletteLength {
            expected,
            actual: colours.len(),
        })
    }
}

/// The palette used when a rule does not provide one.
///
/// Two-state rules get black and white. Larger rules get black for the
/// background followed by a red-to-yellow ramp whose green channel climbs
/// in steps of `255 / (n_states - 2)`.
pub fn default_palette(n_states: u16) -> Vec<Rgb> {
    if n_states <= 2 {
        return vec![Rgb::BLACK, Rgb::WHITE];
    }
    let step = 255_u16 / n_states.saturating_sub(2);
    let ramp = (0..n_states.saturating_sub(1)).map(|i| {
        let green = u8::try_from(step.saturating_mul(i)).unwrap_or(u8::MAX);
        Rgb::new(255, green, 0)
    });
    std::iter::once(Rgb::BLACK).chain(ramp).collect()
}
