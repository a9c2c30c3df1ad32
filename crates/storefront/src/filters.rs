//! Askama filters shared by the storefront templates.

use std::borrow::Borrow;
use std::fmt::Display;

/// Highest rating a review can give.
const MAX_STARS: usize = 5;

/// Render an average rating as five stars, rounded to the nearest whole star.
///
/// Usage in templates: `{{ product.rating|stars }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn stars(rating: impl Borrow<f32>, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(star_string(*rating.borrow()))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn star_string(rating: f32) -> String {
    let filled = (rating.clamp(0.0, MAX_STARS as f32).round() as usize).min(MAX_STARS);
    let mut out = "\u{2605}".repeat(filled);
    out.push_str(&"\u{2606}".repeat(MAX_STARS - filled));
    out
}

/// The year shown in the footer.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Short content hash of the stylesheet, set by `build.rs`.
///
/// Empty when the stylesheet could not be hashed; the layout then links the
/// unhashed file.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("STOREFRONT_CSS_HASH"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_string_rounds_and_clamps() {
        assert_eq!(star_string(4.5), "\u{2605}\u{2605}\u{2605}\u{2605}\u{2605}");
        assert_eq!(star_string(3.2), "\u{2605}\u{2605}\u{2605}\u{2606}\u{2606}");
        assert_eq!(star_string(0.0), "\u{2606}".repeat(5));
        assert_eq!(star_string(9.0).chars().count(), 5);
        assert_eq!(star_string(-1.0), "\u{2606}".repeat(5));
    }
}
