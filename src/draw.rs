//! Software rasteriser for RGBA frames: board cells, HUD text and a fitness chart.

use crate::board::CellKind;
use crate::episode::EpisodeStats;
use crate::game::Game;

pub type Rgba = (u8, u8, u8, u8);

pub const BACKGROUND: Rgba = (20, 20, 30, 255);
pub const TEXT: Rgba = (230, 240, 255, 255);

pub fn cell_color(kind: CellKind) -> Rgba {
    match kind {
        CellKind::Empty => (42, 42, 43, 255),
        CellKind::Food => (139, 247, 57, 255),
        CellKind::Wall => (20, 20, 20, 255),
        CellKind::Head => (36, 80, 240, 255),
        CellKind::Body => (24, 50, 143, 255),
    }
}

/// A borrowed RGBA8 frame buffer. Writes outside the frame are dropped.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        debug_assert!(frame.len() >= (width * height * 4) as usize);
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let idx = self.offset(x, y)?;
        let p = &self.frame[idx..idx + 4];
        Some((p[0], p[1], p[2], p[3]))
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        (idx + 3 < self.frame.len()).then_some(idx)
    }

    pub fn clear(&mut self, (r, g, b, a): Rgba) {
        for px in self.frame.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, a]);
        }
    }

    pub fn blend_pixel(&mut self, x: u32, y: u32, (r, g, b, a): Rgba) {
        let Some(idx) = self.offset(x, y) else {
            return;
        };
        let ar = a as u16;
        let iar = (255 - a) as u16;
        for (i, c) in [r, g, b].into_iter().enumerate() {
            let dst = self.frame[idx + i] as u16;
            self.frame[idx + i] = ((c as u16 * ar + dst * iar) / 255) as u8;
        }
        self.frame[idx + 3] = 255;
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, col: Rgba) {
        let x2 = x.saturating_add(w).min(self.width);
        let y2 = y.saturating_add(h).min(self.height);
        for py in y..y2 {
            for px in x..x2 {
                self.blend_pixel(px, py, col);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: u32, y: u32, w: u32, h: u32, col: Rgba) {
        if w == 0 || h == 0 {
            return;
        }
        let x2 = x + w - 1;
        let y2 = y + h - 1;
        for px in x..=x2 {
            self.blend_pixel(px, y, col);
            self.blend_pixel(px, y2, col);
        }
        for py in y..=y2 {
            self.blend_pixel(x, py, col);
            self.blend_pixel(x2, py, col);
        }
    }

    /// Draws one glyph and returns the horizontal advance.
    pub fn draw_char(&mut self, ch: char, x: u32, y: u32, scale: u32, col: Rgba) -> u32 {
        if let Some(rows) = glyph_5x7(ch) {
            for (ry, row) in rows.iter().enumerate() {
                for rx in 0..5u32 {
                    if (row >> (4 - rx)) & 1 == 1 {
                        self.fill_rect(x + rx * scale, y + ry as u32 * scale, scale, scale, col);
                    }
                }
            }
        }
        6 * scale
    }

    pub fn draw_text(&mut self, text: &str, x: u32, y: u32, scale: u32, col: Rgba) {
        let mut cx = x;
        for ch in text.chars() {
            cx += self.draw_char(ch, cx, y, scale, col);
        }
    }

    /// Bars for the most recent values that fit, scaled between the series min and max.
    pub fn draw_chart(&mut self, x: u32, y: u32, w: u32, h: u32, data: &[f32]) {
        self.stroke_rect(x, y, w, h, (200, 200, 200, 120));
        if data.is_empty() || w < 4 || h < 3 {
            return;
        }
        let bars = data.len().min((w as usize - 2) / 2).max(1);
        let shown = &data[data.len() - bars..];
        let lo = shown.iter().copied().fold(f32::INFINITY, f32::min).min(0.0);
        let hi = shown.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let span = (hi - lo).max(f32::EPSILON);
        let bar_w = ((w - 2) / bars as u32).max(2);
        let inner = h - 2;
        for (i, &v) in shown.iter().enumerate() {
            let bh = (((v - lo) / span) * inner as f32).round() as u32;
            let bx = x + 1 + i as u32 * bar_w;
            let by = y + 1 + inner - bh.min(inner);
            self.fill_rect(bx, by, bar_w - 1, bh.min(inner), (120, 180, 255, 160));
        }
    }
}

/// Paints every board cell as a `cell_px` square in the top-left corner.
pub fn draw_game(canvas: &mut Canvas<'_>, game: &Game, cell_px: u32) {
    for cell in game.board().cells() {
        let (x, y) = (cell.pos.x as u32, cell.pos.y as u32);
        canvas.fill_rect(x * cell_px, y * cell_px, cell_px, cell_px, cell_color(cell.kind));
    }
}

pub fn draw_hud(canvas: &mut Canvas<'_>, stats: &EpisodeStats, x: u32, y: u32) {
    canvas.fill_rect(x, y, 220, 64, (0, 0, 0, 140));
    canvas.draw_text(&format!("FOOD: {}", stats.food_eaten), x + 8, y + 6, 2, TEXT);
    canvas.draw_text(&format!("STEPS: {}", stats.steps), x + 8, y + 24, 2, TEXT);
    let alert: Rgba = (255, 100, 100, 255);
    let (status, col) = if stats.won {
        ("BOARD FULL".to_string(), alert)
    } else if stats.died {
        ("GAME OVER".to_string(), alert)
    } else if let Some(energy) = stats.energy {
        (format!("ENERGY: {energy}"), TEXT)
    } else {
        return;
    };
    canvas.draw_text(&status, x + 8, y + 42, 2, col);
}

fn glyph_5x7(ch: char) -> Option<[u8; 7]> {
    Some(match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b11110, 0b10001, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'H' => [0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001, 0b10001],
        'I' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b10010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        ' ' => [0; 7],
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_cells_land_on_their_squares() {
        let game = Game::new(6, 6, 2, 0).unwrap();
        let cell_px = 4;
        let (w, h) = (6 * cell_px, 6 * cell_px);
        let mut frame = vec![0u8; (w * h * 4) as usize];
        let mut canvas = Canvas::new(&mut frame, w, h);
        canvas.clear(BACKGROUND);
        draw_game(&mut canvas, &game, cell_px);

        let head = game.head_pos();
        let px = |p: u32| p * cell_px + 1;
        assert_eq!(
            canvas.pixel(px(head.x as u32), px(head.y as u32)),
            Some(cell_color(CellKind::Head))
        );
        assert_eq!(canvas.pixel(1, 1), Some(cell_color(CellKind::Wall)));
        let food = game.food_pos();
        assert_eq!(
            canvas.pixel(px(food.x as u32), px(food.y as u32)),
            Some(cell_color(CellKind::Food))
        );
    }

    #[test]
    fn drawing_off_the_edge_is_clipped() {
        let mut frame = vec![0u8; 10 * 10 * 4];
        let mut canvas = Canvas::new(&mut frame, 10, 10);
        canvas.draw_text("GAME OVER 123", 4, 6, 3, TEXT);
        canvas.fill_rect(8, 8, 100, 100, (255, 0, 0, 255));
        assert_eq!(canvas.pixel(9, 9), Some((255, 0, 0, 255)));
        assert_eq!(canvas.pixel(10, 9), None);
    }

    #[test]
    fn chart_handles_negative_history() {
        let mut frame = vec![0u8; 40 * 20 * 4];
        let mut canvas = Canvas::new(&mut frame, 40, 20);
        canvas.draw_chart(0, 0, 40, 20, &[-50.0, -20.0, 10.0, 80.0]);
        // tallest bar reaches the top of the chart interior
        assert_ne!(canvas.pixel(1 + 3 * 9 + 1, 1), Some((0, 0, 0, 0)));
    }
}
