//! Viewport rectangle and the position mini-language
//!
//! A position token is either a literal `[x, y]` pair or a name wrapped in
//! double underscores (`"__center__"`, `"__rdleft__"`, ...).

use glam::Vec2;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pattern::BuildError;

/// Axis-aligned rectangle in screen space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Rectangle of `size` centered on `center`
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self::new(center.x - size.x / 2.0, center.y - size.y / 2.0, size.x, size.y)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Inclusive point containment
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// Strict overlap test (touching edges do not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }

    /// Grow the rectangle by `margin` on every side
    pub fn inflate(&self, margin: f32) -> Self {
        Self::new(
            self.left - margin,
            self.top - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// One of the nine named anchor points
    pub fn anchor(&self, name: &str) -> Option<Vec2> {
        let (l, t, r, b) = (self.left, self.top, self.right(), self.bottom());
        let c = self.center();
        let p = match name {
            "center" => c,
            "topleft" => Vec2::new(l, t),
            "topright" => Vec2::new(r, t),
            "bottomleft" => Vec2::new(l, b),
            "bottomright" => Vec2::new(r, b),
            "midtop" => Vec2::new(c.x, t),
            "midbottom" => Vec2::new(c.x, b),
            "midleft" => Vec2::new(l, c.y),
            "midright" => Vec2::new(r, c.y),
            _ => return None,
        };
        Some(p)
    }

    /// Finite with non-negative extent
    pub fn is_valid(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// One of the seven random placement modes; None for an unknown mode or
    /// a degenerate rectangle
    pub fn random_point(&self, mode: &str, rng: &mut dyn RngCore) -> Option<Vec2> {
        if !self.is_valid() {
            return None;
        }
        let rx = rng.random_range(self.left..=self.right());
        let ry = rng.random_range(self.top..=self.bottom());
        let c = self.center();
        let p = match mode {
            "random" => Vec2::new(rx, ry),
            "rdleft" => Vec2::new(self.left, ry),
            "rdright" => Vec2::new(self.right(), ry),
            "rdtop" => Vec2::new(rx, self.top),
            "rdbottom" => Vec2::new(rx, self.bottom()),
            "rdmidx" => Vec2::new(c.x, ry),
            "rdmidy" => Vec2::new(rx, c.y),
            _ => return None,
        };
        Some(p)
    }
}

/// Strip the `__name__` delimiters, lowercasing the name
pub(crate) fn symbolic_name(token: &str) -> Option<String> {
    let inner = token.strip_prefix("__")?.strip_suffix("__")?;
    if inner.is_empty() {
        return None;
    }
    Some(inner.to_lowercase())
}

/// Read a literal numeric `[x, y]` pair
pub fn literal_pair(value: &Value) -> Option<Vec2> {
    match value.as_array()?.as_slice() {
        [x, y] => Some(Vec2::new(x.as_f64()? as f32, y.as_f64()? as f32)),
        _ => None,
    }
}

/// Resolve a position token against the viewport
pub fn resolve_position(
    token: &Value,
    viewport: &Rect,
    rng: &mut dyn RngCore,
) -> Result<Vec2, BuildError> {
    let bad = || BuildError::BadCoordinate(token.to_string());
    match token {
        Value::Array(_) => literal_pair(token).ok_or_else(bad),
        Value::String(s) => {
            let name = symbolic_name(s).ok_or_else(bad)?;
            viewport
                .anchor(&name)
                .or_else(|| viewport.random_point(&name, rng))
                .ok_or_else(bad)
        }
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use serde_json::json;

    const RANDOM_MODES: [&str; 7] = [
        "random", "rdleft", "rdright", "rdtop", "rdbottom", "rdmidx", "rdmidy",
    ];

    fn viewport() -> Rect {
        Rect::from_size(100.0, 80.0)
    }

    #[test]
    fn test_anchor_center() {
        let mut rng = Pcg32::seed_from_u64(1);
        let p = resolve_position(&json!("__center__"), &viewport(), &mut rng).unwrap();
        assert_eq!(p, Vec2::new(50.0, 40.0));
    }

    #[test]
    fn test_all_anchors() {
        let vp = viewport();
        assert_eq!(vp.anchor("topleft"), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(vp.anchor("bottomright"), Some(Vec2::new(100.0, 80.0)));
        assert_eq!(vp.anchor("midtop"), Some(Vec2::new(50.0, 0.0)));
        assert_eq!(vp.anchor("midleft"), Some(Vec2::new(0.0, 40.0)));
        assert_eq!(vp.anchor("midright"), Some(Vec2::new(100.0, 40.0)));
        assert_eq!(vp.anchor("middle"), None);
    }

    #[test]
    fn test_literal_pair() {
        let mut rng = Pcg32::seed_from_u64(1);
        let p = resolve_position(&json!([5, 7]), &viewport(), &mut rng).unwrap();
        assert_eq!(p, Vec2::new(5.0, 7.0));
        let p = resolve_position(&json!([2.5, -1]), &viewport(), &mut rng).unwrap();
        assert_eq!(p, Vec2::new(2.5, -1.0));
    }

    #[test]
    fn test_symbolic_names_are_case_insensitive() {
        let mut rng = Pcg32::seed_from_u64(1);
        let p = resolve_position(&json!("__TopRight__"), &viewport(), &mut rng).unwrap();
        assert_eq!(p, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_malformed_tokens() {
        let mut rng = Pcg32::seed_from_u64(1);
        for token in [
            json!([1]),
            json!([1, 2, 3]),
            json!(["a", 2]),
            json!("center"),
            json!("__nowhere__"),
            json!("____"),
            json!(12),
            json!({"x": 1}),
        ] {
            let err = resolve_position(&token, &viewport(), &mut rng).unwrap_err();
            assert!(matches!(err, BuildError::BadCoordinate(_)), "{token}");
        }
    }

    #[test]
    fn test_random_modes_stay_in_region() {
        let vp = viewport();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..1000 {
            for mode in RANDOM_MODES {
                let p = vp.random_point(mode, &mut rng).unwrap();
                assert!(vp.contains(p), "{mode} produced {p}");
                match mode {
                    "rdleft" => assert_eq!(p.x, 0.0),
                    "rdright" => assert_eq!(p.x, 100.0),
                    "rdtop" => assert_eq!(p.y, 0.0),
                    "rdbottom" => assert_eq!(p.y, 80.0),
                    "rdmidx" => assert_eq!(p.x, 50.0),
                    "rdmidy" => assert_eq!(p.y, 40.0),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_random_point_on_degenerate_rect() {
        let mut rng = Pcg32::seed_from_u64(3);
        let flipped = Rect::from_size(-10.0, 80.0);
        assert_eq!(flipped.random_point("random", &mut rng), None);
        let err = resolve_position(&json!("__random__"), &flipped, &mut rng).unwrap_err();
        assert!(matches!(err, BuildError::BadCoordinate(_)));

        let nan = Rect::from_size(f32::NAN, 80.0);
        assert_eq!(nan.random_point("rdleft", &mut rng), None);

        let point = Rect::from_size(0.0, 0.0);
        assert_eq!(point.random_point("random", &mut rng), Some(Vec2::ZERO));
    }

    #[test]
    fn test_overlap_and_inflate() {
        let a = Rect::centered(Vec2::new(10.0, 10.0), Vec2::splat(4.0));
        let b = Rect::centered(Vec2::new(13.0, 10.0), Vec2::splat(4.0));
        let c = Rect::centered(Vec2::new(14.0, 10.0), Vec2::splat(4.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(viewport().inflate(5.0).contains(Vec2::new(-5.0, 85.0)));
    }

    proptest! {
        #[test]
        fn prop_random_point_in_offset_viewport(
            seed in any::<u64>(),
            left in -500.0f32..500.0,
            top in -500.0f32..500.0,
            w in 1.0f32..2000.0,
            h in 1.0f32..2000.0,
            mode in 0usize..7,
        ) {
            let vp = Rect::new(left, top, w, h);
            let mut rng = Pcg32::seed_from_u64(seed);
            let p = vp.random_point(RANDOM_MODES[mode], &mut rng).unwrap();
            prop_assert!(vp.contains(p));
        }
    }
}
