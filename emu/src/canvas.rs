//! Character-cell drawing surface behind the graphics service calls.
//!
//! The canvas is never flushed mid-run: draw calls mutate an in-memory
//! grid, and the whole frame is rendered as one ANSI string when the
//! program finishes.

pub const MAX_WIDTH: usize = 80;
pub const MAX_HEIGHT: usize = 24;
pub const DEFAULT_WIDTH: usize = 40;
pub const DEFAULT_HEIGHT: usize = 12;

const DEFAULT_FG: u8 = 7;
const DEFAULT_BG: u8 = 0;

#[derive(Debug, Clone, Copy)]
struct Cell {
    ch: u8,
    fg: u8,
    bg: u8,
}

impl Cell {
    fn blank() -> Self {
        Self {
            ch: b' ',
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
        }
    }
}

#[derive(Debug)]
pub struct Canvas {
    width: usize,
    height: usize,
    fg: u8,
    bg: u8,
    cells: Vec<Cell>,
}

impl Canvas {
    /// Default surface used when a draw call arrives before an explicit
    /// `canvas` resize.
    pub fn new() -> Self {
        Self::sized(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Explicit resize. Zero selects the default dimension; anything
    /// larger than the terminal limits is clamped.
    pub fn sized(width: usize, height: usize) -> Self {
        let width = if width < 1 {
            DEFAULT_WIDTH
        } else {
            width.min(MAX_WIDTH)
        };
        let height = if height < 1 {
            // the resize default is shorter than the implicit surface
            10
        } else {
            height.min(MAX_HEIGHT)
        };
        Self {
            width,
            height,
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            cells: vec![Cell::blank(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::blank());
    }

    pub fn set_colors(&mut self, fg: u8, bg: u8) {
        self.fg = fg & 7;
        self.bg = bg & 7;
    }

    pub fn reset_colors(&mut self) {
        self.fg = DEFAULT_FG;
        self.bg = DEFAULT_BG;
    }

    /// Writes one cell with the current colors. Out-of-range
    /// coordinates are ignored, NUL draws a space.
    pub fn plot(&mut self, x: usize, y: usize, ch: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let ch = if ch == 0 { b' ' } else { ch };
        self.cells[y * self.width + x] = Cell {
            ch,
            fg: self.fg,
            bg: self.bg,
        };
    }

    /// Horizontal or vertical line. Diagonals are not supported and
    /// draw nothing.
    pub fn line(&mut self, x1: usize, y1: usize, x2: usize, y2: usize, ch: u8) {
        let ch = if ch == 0 { b'*' } else { ch };
        if y1 == y2 {
            let (lo, hi) = (x1.min(x2), x1.max(x2));
            for x in lo..=hi {
                self.plot(x, y1, ch);
            }
        } else if x1 == x2 {
            let (lo, hi) = (y1.min(y2), y1.max(y2));
            for y in lo..=hi {
                self.plot(x1, y, ch);
            }
        }
    }

    /// Rectangle outline with `+` corners, filled with spaces.
    pub fn rect(&mut self, x: usize, y: usize, w: usize, h: usize) {
        if w < 2 || h < 2 {
            return;
        }
        for dy in 0..h {
            for dx in 0..w {
                let edge_x = dx == 0 || dx == w - 1;
                let edge_y = dy == 0 || dy == h - 1;
                let ch = match (edge_x, edge_y) {
                    (true, true) => b'+',
                    (false, true) => b'-',
                    (true, false) => b'|',
                    (false, false) => b' ',
                };
                self.plot(x + dx, y + dy, ch);
            }
        }
    }

    /// One frame as ANSI text. Color escapes are emitted only when the
    /// attributes change from the previous cell of the row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for y in 0..self.height {
            let mut current: Option<(u8, u8)> = None;
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                if current != Some((cell.fg, cell.bg)) {
                    out.push_str(&format!("\x1b[3{};4{}m", cell.fg, cell.bg));
                    current = Some((cell.fg, cell.bg));
                }
                out.push(cell.ch as char);
            }
            out.push_str("\x1b[0m\n");
        }
        out
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
