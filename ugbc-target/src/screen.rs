/// One row of the screen-mode table.
///
/// Targets expose their own static slice of these; `BITMAP ENABLE(...)`
/// resolves to the highest-`score` entry that satisfies the requested
/// width/height/colors, the same "best fit" pattern a chipset module would
/// use to pick a concrete VIC-II/6847 mode for an abstract request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenMode {
    pub id: &'static str,
    pub bitmap: bool,
    pub width: u16,
    pub height: u16,
    pub colors: u16,
    pub description: &'static str,
    pub score: u8,
}

/// Picks the best-scoring mode whose width/height/colors each meet or
/// exceed the request. Returns `None` when no registered mode qualifies.
pub fn resolve_mode(
    modes: &[ScreenMode],
    min_width: u16,
    min_height: u16,
    min_colors: u16,
    bitmap: bool,
) -> Option<ScreenMode> {
    modes
        .iter()
        .filter(|m| {
            m.bitmap == bitmap
                && m.width >= min_width
                && m.height >= min_height
                && m.colors >= min_colors
        })
        .max_by_key(|m| m.score)
        .copied()
}

#[cfg(test)]
mod test {
    use super::*;

    const MODES: &[ScreenMode] = &[
        ScreenMode {
            id: "hires",
            bitmap: true,
            width: 320,
            height: 200,
            colors: 2,
            description: "hi-res monochrome bitmap",
            score: 1,
        },
        ScreenMode {
            id: "multicolor",
            bitmap: true,
            width: 160,
            height: 200,
            colors: 4,
            description: "multicolor bitmap",
            score: 2,
        },
    ];

    #[test]
    fn picks_highest_scoring_match() {
        let chosen = resolve_mode(MODES, 160, 200, 4, true).unwrap();
        assert_eq!("multicolor", chosen.id);
    }

    #[test]
    fn returns_none_when_nothing_qualifies() {
        assert!(resolve_mode(MODES, 640, 480, 16, true).is_none());
    }
}
