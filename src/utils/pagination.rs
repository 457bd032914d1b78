use crate::utils::error::{AppError, AppResult};
use crossterm::terminal::size;
use std::io::IsTerminal;

/// Listings taller than this share of the terminal go through the pager
const PAGE_FRACTION: (usize, usize) = (2, 3);

fn terminal_rows() -> Option<usize> {
    if !std::io::stdout().is_terminal() {
        return None;
    }
    size().ok().map(|(_, rows)| rows as usize)
}

fn exceeds_screen(content: &str, rows: usize) -> bool {
    content.lines().count() > rows * PAGE_FRACTION.0 / PAGE_FRACTION.1
}

/// Print `content`, paging it with `minus` when it would scroll off an
/// interactive terminal. Redirected output is always printed as is.
pub fn print_paged(content: &str) -> AppResult<()> {
    match terminal_rows() {
        Some(rows) if exceeds_screen(content, rows) => page(content),
        _ => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn page(content: &str) -> AppResult<()> {
    let pager = minus::Pager::new();
    pager
        .push_str(content)
        .map_err(|e| AppError::System(format!("Failed to fill pager: {}", e)))?;

    match minus::page_all(pager) {
        // Quitting the pager early is not an error.
        Err(e) if e.to_string().to_lowercase().contains("abort") => Ok(()),
        Err(e) => Err(AppError::System(format!("Pager failed: {}", e))),
        Ok(()) => Ok(()),
    }
}
