//! Profile image pool.
//!
//! Users pick (or are assigned) one of nine bundled avatars, `P1.png`
//! through `P9.png`, served under `/profile/`.

use rand::seq::IndexedRandom;

/// Available profile image filenames.
pub const PROFILE_IMAGES: [&str; 9] = [
    "P1.png", "P2.png", "P3.png", "P4.png", "P5.png", "P6.png", "P7.png", "P8.png", "P9.png",
];

/// URL path prefix for profile images.
const PROFILE_PATH: &str = "/profile/";

/// Returns a uniformly random profile image filename.
#[must_use]
pub fn random_profile_image() -> &'static str {
    PROFILE_IMAGES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(PROFILE_IMAGES[0])
}

/// Returns the URL path for a profile image, e.g. `/profile/P3.png`.
#[inline]
#[must_use]
pub fn profile_image_url(filename: &str) -> String {
    format!("{PROFILE_PATH}{filename}")
}

/// Returns every profile image filename.
#[inline]
#[must_use]
pub fn all_profile_images() -> Vec<&'static str> {
    PROFILE_IMAGES.to_vec()
}
