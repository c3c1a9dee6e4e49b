//! 5x7 bitmap glyphs for the characters a challenge can contain.
//! Bit 4 of each row is the leftmost column.

pub(crate) const GLYPH_WIDTH: u32 = 5;
pub(crate) const GLYPH_HEIGHT: u32 = 7;

type Glyph = [u8; GLYPH_HEIGHT as usize];

const ZERO: Glyph = [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110];
const ONE: Glyph = [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110];
const TWO: Glyph = [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111];
const THREE: Glyph = [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110];
const FOUR: Glyph = [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010];
const FIVE: Glyph = [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110];
const SIX: Glyph = [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110];
const SEVEN: Glyph = [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000];
const EIGHT: Glyph = [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110];
const NINE: Glyph = [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100];
const PLUS: Glyph = [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000];
const MINUS: Glyph = [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000];
const TIMES: Glyph = [0b00000, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b00000];
const DIVIDE: Glyph = [0b00000, 0b00100, 0b00000, 0b11111, 0b00000, 0b00100, 0b00000];
const EQUALS: Glyph = [0b00000, 0b00000, 0b11111, 0b00000, 0b11111, 0b00000, 0b00000];
const QUESTION: Glyph = [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100];

/// `None` for whitespace and anything outside the challenge alphabet.
pub(crate) fn glyph(ch: char) -> Option<&'static Glyph> {
    let glyph = match ch {
        '0' => &ZERO,
        '1' => &ONE,
        '2' => &TWO,
        '3' => &THREE,
        '4' => &FOUR,
        '5' => &FIVE,
        '6' => &SIX,
        '7' => &SEVEN,
        '8' => &EIGHT,
        '9' => &NINE,
        '+' => &PLUS,
        '-' => &MINUS,
        '×' => &TIMES,
        '÷' => &DIVIDE,
        '=' => &EQUALS,
        '?' => &QUESTION,
        _ => return None,
    };
    Some(glyph)
}

pub(crate) fn is_set(glyph: &Glyph, column: u32, row: u32) -> bool {
    if column >= GLYPH_WIDTH || row >= GLYPH_HEIGHT {
        return false;
    }
    glyph[row as usize] & (1 << (GLYPH_WIDTH - 1 - column)) != 0
}
