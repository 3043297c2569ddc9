//! Ready-made terminal palettes.

use crate::color::Color;
use crate::error::MatchError;
use crate::palette::{EntryId, Palette};

/// The 16 standard terminal colors (xterm defaults), ids `0..16`.
pub const ANSI16: [Color; 16] = [
    Color::new(0, 0, 0),
    Color::new(205, 0, 0),
    Color::new(0, 205, 0),
    Color::new(205, 205, 0),
    Color::new(0, 0, 238),
    Color::new(205, 0, 205),
    Color::new(0, 205, 205),
    Color::new(229, 229, 229),
    Color::new(127, 127, 127),
    Color::new(255, 0, 0),
    Color::new(0, 255, 0),
    Color::new(255, 255, 0),
    Color::new(92, 92, 255),
    Color::new(255, 0, 255),
    Color::new(0, 255, 255),
    Color::new(255, 255, 255),
];

/// Channel levels of the 6x6x6 cube.
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

pub fn ansi16() -> Palette {
    palette_from_static(ANSI16.iter().copied())
}

/// xterm's 256-color table: the 16 standard colors, the 6x6x6 cube
/// (indices 16-231) and 24 grays (232-255). Ids are the color indices.
pub fn xterm256() -> Palette {
    palette_from_static((0..=255u8).map(xterm_color))
}

/// Color of one xterm-256 index.
pub fn xterm_color(index: u8) -> Color {
    match index {
        0..=15 => ANSI16[index as usize],
        16..=231 => {
            let i = index - 16;
            Color::new(
                CUBE_LEVELS[(i / 36) as usize],
                CUBE_LEVELS[((i / 6) % 6) as usize],
                CUBE_LEVELS[(i % 6) as usize],
            )
        }
        232..=255 => {
            let v = 8 + (index - 232) * 10;
            Color::new(v, v, v)
        }
    }
}

fn palette_from_static(colors: impl Iterator<Item = Color>) -> Palette {
    // Ids are positions and there is at least one color, so this cannot fail.
    Palette::from_colors(colors).unwrap_or_else(|e| unreachable!("static palette: {e}"))
}

/// Shade glyphs and the fraction of the cell they cover in foreground.
pub const SHADES: [(char, f32); 4] = [('█', 1.0), ('▓', 0.75), ('▒', 0.5), ('░', 0.25)];

/// A terminal cell: a glyph drawn in `fg` over `bg`, as base palette
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphCell {
    pub glyph: char,
    pub fg: u16,
    pub bg: u16,
}

/// A palette of glyph/color combinations and the cell each id stands for.
#[derive(Debug, Clone)]
pub struct GlyphPalette {
    palette: Palette,
    cells: Vec<GlyphCell>,
}

impl GlyphPalette {
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn into_palette(self) -> Palette {
        self.palette
    }

    pub fn cells(&self) -> &[GlyphCell] {
        &self.cells
    }

    /// The cell an entry id refers to.
    pub fn cell(&self, id: EntryId) -> Option<GlyphCell> {
        self.cells.get(id.0 as usize).copied()
    }
}

/// Every shade-glyph combination over `base`.
///
/// Each base color appears once as a solid block; every ordered pair of
/// distinct base colors appears once per partial shade, with the apparent
/// color blended by the shade's coverage. Ids index [`GlyphPalette::cells`].
pub fn shade_glyphs(base: &Palette) -> Result<GlyphPalette, MatchError> {
    let colors: Vec<Color> = base.entries().iter().map(|e| e.color).collect();
    if colors.len() > u16::MAX as usize {
        return Err(MatchError::PaletteTooLarge {
            len: colors.len(),
            max: u16::MAX as usize,
        });
    }

    let mut cells = Vec::new();
    let mut blended = Vec::new();

    let (solid, partial) = SHADES.split_at(1);
    for (fg, &color) in colors.iter().enumerate() {
        cells.push(GlyphCell {
            glyph: solid[0].0,
            fg: fg as u16,
            bg: fg as u16,
        });
        blended.push(color);
    }

    for &(glyph, coverage) in partial {
        for (fg, &fg_color) in colors.iter().enumerate() {
            for (bg, &bg_color) in colors.iter().enumerate() {
                if fg == bg {
                    continue;
                }
                cells.push(GlyphCell {
                    glyph,
                    fg: fg as u16,
                    bg: bg as u16,
                });
                blended.push(blend(fg_color, bg_color, coverage));
            }
        }
    }

    let palette = Palette::from_colors(blended)?;
    Ok(GlyphPalette { palette, cells })
}

fn blend(fg: Color, bg: Color, coverage: f32) -> Color {
    let mix = |f: u8, b: u8| (f as f32 * coverage + b as f32 * (1.0 - coverage)).round() as u8;
    Color::new(mix(fg.r, bg.r), mix(fg.g, bg.g), mix(fg.b, bg.b))
}
