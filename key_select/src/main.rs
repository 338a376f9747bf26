//! Interactive menu: feed packed finger samples by hand and watch the
//! controller react.

use std::io::{self, BufRead, Write};

use key_select::{FingerState, Highlight, KeyGrid, SelectionController};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║             Finger-Gesture Key Selection Menu            ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let Some(grid) = pick_grid(&mut input) else { return };
    let mut ctl = SelectionController::new(grid);
    print_grid(&ctl);

    loop {
        print_ops_menu();
        let Some(line) = read_line(&mut input, "Sample or command: ") else {
            println!();
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "n" | "none" => report(&mut ctl, None),
            "c" => {
                ctl.clear_selection();
                println!("  Selection cleared.");
            }
            "g" => print_grid(&ctl),
            "q" | "quit" => {
                println!("\nGoodbye!\n");
                break;
            }
            packed => match packed.parse::<FingerState>() {
                Ok(sample) => report(&mut ctl, Some(sample)),
                Err(e)     => println!("  ⚠  {}", e),
            },
        }
        println!();
    }
}

fn report(ctl: &mut SelectionController, sample: Option<FingerState>) {
    let tick = ctl.tick(sample);
    if tick.actions.is_empty() {
        println!("  (no action)");
    }
    for action in &tick.actions {
        println!("  → {}", action.label());
    }
    let s = ctl.state();
    println!("  {}", tick.status);
    println!(
        "  column={}  row={}  text=\"{}\"",
        s.selected_column.map_or("-".to_string(), |c| c.to_string()),
        s.selected_row.map_or("-".to_string(), |r| r.to_string()),
        s.typed_text,
    );
}

fn print_ops_menu() {
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  1_0_0_0  Sample as index_middle_pinky_thumb            │");
    println!("  │  n        No hand visible       g. Show grid            │");
    println!("  │  c        Clear selection       q. Quit                 │");
    println!("  └─────────────────────────────────────────────────────────┘");
}

/// `None` once input runs out.
fn pick_grid(input: &mut impl BufRead) -> Option<KeyGrid> {
    loop {
        let line = read_line(input, "  Layout (rows split by '/', '_' = empty; default QWERTY): ")?;
        let line = line.trim();
        if line.is_empty() {
            break Some(KeyGrid::qwerty());
        }
        match line.parse::<KeyGrid>() {
            Ok(g)  => break Some(g),
            Err(e) => println!("  ⚠  {}", e),
        }
    }
}

fn print_grid(ctl: &SelectionController) {
    for (r, row) in ctl.grid().rows().enumerate() {
        let cells: Vec<String> = row.iter().enumerate()
            .map(|(c, cell)| {
                let ch = cell.unwrap_or(' ');
                match ctl.highlight(r, c) {
                    Highlight::Cell => format!("[{}]", ch),
                    Highlight::None => format!(" {} ", ch),
                    _               => format!("({})", ch),
                }
            })
            .collect();
        println!("    {}", cells.join(""));
    }
}

/// One line of input, or `None` at end of input or on a read error.
fn read_line(input: &mut impl BufRead, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_)          => Some(buf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_ends_at_eof() {
        let mut input = io::Cursor::new("1_0_0_0\n\n");
        assert_eq!(read_line(&mut input, "").as_deref(), Some("1_0_0_0\n"));
        assert_eq!(read_line(&mut input, "").as_deref(), Some("\n"));
        assert_eq!(read_line(&mut input, ""), None);
    }

    #[test]
    fn pick_grid_gives_up_on_empty_input() {
        let mut input = io::Cursor::new("");
        assert_eq!(pick_grid(&mut input), None);
    }

    #[test]
    fn pick_grid_retries_bad_layout_then_stops_at_eof() {
        let mut input = io::Cursor::new("/\n");
        assert_eq!(pick_grid(&mut input), None);
    }

    #[test]
    fn pick_grid_blank_line_is_qwerty() {
        let mut input = io::Cursor::new("\n");
        assert_eq!(pick_grid(&mut input), Some(KeyGrid::qwerty()));
    }
}
