use std::io::{self, stdout, Stdout, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, SetForegroundColor},
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use shared::game_state::{
    GameState, GAME_HEIGHT, GAME_WIDTH, LEFT_PADDLE_X, MIDLINE_X, PADDLE_REACH, RIGHT_PADDLE_X,
};

pub trait Screen: Send + 'static {
    fn draw(&mut self, state: &GameState) -> io::Result<()>;

    /// shows `message` above the seconds left before play resumes.
    fn countdown(&mut self, message: &str, remaining: u32) -> io::Result<()>;
}

/// draws the field centered in the terminal.
pub struct TerminalScreen<W> {
    out: W,
    left: u16,
    top: u16,
}

impl TerminalScreen<Stdout> {
    pub fn new() -> io::Result<Self> {
        let (columns, rows) = terminal::size()?;
        Ok(Self::with_origin(
            stdout(),
            columns.saturating_sub(GAME_WIDTH as u16) / 2,
            rows.saturating_sub(GAME_HEIGHT as u16) / 2,
        ))
    }
}

impl<W: Write> TerminalScreen<W> {
    pub fn with_origin(out: W, left: u16, top: u16) -> Self {
        Self { out, left, top }
    }

    fn print_rows(&mut self, left: u16, top: u16, rows: &[String]) -> io::Result<()> {
        for (offset, row) in (0..).zip(rows) {
            queue!(self.out, MoveTo(left, top + offset), Print(row))?;
        }
        Ok(())
    }
}

impl<W: Write + Send + 'static> Screen for TerminalScreen<W> {
    fn draw(&mut self, state: &GameState) -> io::Result<()> {
        let rows = field_rows(state);
        self.print_rows(self.left, self.top, &rows)?;
        self.out.flush()
    }

    fn countdown(&mut self, message: &str, remaining: u32) -> io::Result<()> {
        let rows = popup_rows(message, remaining);
        let width = rows.first().map_or(0, |row| row.chars().count()) as u16;
        let left = self.left + (GAME_WIDTH as u16).saturating_sub(width) / 2;
        let top = self.top + (GAME_HEIGHT as u16).saturating_sub(rows.len() as u16) / 2;
        queue!(self.out, SetForegroundColor(Color::Yellow))?;
        self.print_rows(left, top, &rows)?;
        queue!(self.out, SetForegroundColor(Color::Reset))?;
        self.out.flush()
    }
}

/// the field as text, one string per row: a border, a center line, both scores, both paddles
/// and the ball.
pub fn field_rows(state: &GameState) -> Vec<String> {
    let width = GAME_WIDTH as usize;
    let midline = MIDLINE_X as usize;
    let mut rows = (0..GAME_HEIGHT)
        .map(|y| {
            let mut row = vec![' '; width];
            if y == 0 || y == GAME_HEIGHT - 1 {
                row.fill('-');
            } else {
                row[0] = '|';
                row[width - 1] = '|';
                row[midline] = ':';
                for (x, paddle) in [
                    (LEFT_PADDLE_X, state.left_paddle),
                    (RIGHT_PADDLE_X, state.right_paddle),
                ] {
                    if (y - paddle).abs() <= PADDLE_REACH {
                        row[x as usize] = '|';
                    }
                }
            }
            row
        })
        .collect::<Vec<_>>();

    write_text(&mut rows[1], midline - 3, &format!("{:>2}", state.left_score));
    write_text(&mut rows[1], midline + 2, &state.right_score.to_string());

    let ball = state.ball;
    if ball.in_field() && (1..GAME_WIDTH - 1).contains(&ball.x) {
        rows[ball.y as usize][ball.x as usize] = 'o';
    }
    rows.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// a boxed message with the seconds left centered beneath it.
pub fn popup_rows(message: &str, remaining: u32) -> Vec<String> {
    let inner = message.chars().count() + 2;
    let border = format!("+{}+", "-".repeat(inner));
    vec![
        border.clone(),
        format!("| {message} |"),
        format!("|{:^inner$}|", remaining),
        border,
    ]
}

fn write_text(row: &mut [char], start: usize, text: &str) {
    for (cell, c) in row.iter_mut().skip(start).zip(text.chars()) {
        *cell = c;
    }
}

/// raw mode and the alternate screen for as long as it lives.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            Clear(ClearType::All),
            cursor::Hide,
            MoveTo(0, 0)
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show);
        let _ = disable_raw_mode();
    }
}
