//! The front-panel register display.

use std::io::Write;

use atty::Stream;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use cpu::ProcessorStatus;

fn color_choice() -> ColorChoice {
    if atty::is(Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn flag_char(name: char, set: bool) -> char {
    if set {
        name
    } else {
        '-'
    }
}

/// Prints the machine state the way a front panel would show it:
/// registers, flags, the program counter and the whole address stack
/// with the active slot marked.
pub fn print_front_panel(status: &ProcessorStatus) {
    let mut out = StandardStream::stderr(color_choice());
    let mut heading = ColorSpec::new();
    heading.set_fg(Some(Color::Cyan)).set_bold(true);

    let _ = out.set_color(&heading);
    let _ = writeln!(out, "-- front panel --------------------------------");
    let _ = out.reset();
    let _ = writeln!(
        out,
        "A={:02x}  B={:02x} C={:02x} D={:02x} E={:02x}  H={:02x} L={:02x}   flags {}{}{}{}",
        status.a,
        status.b,
        status.c,
        status.d,
        status.e,
        status.h,
        status.l,
        flag_char('C', status.flags.carry),
        flag_char('Z', status.flags.zero),
        flag_char('S', status.flags.sign),
        flag_char('P', status.flags.parity),
    );
    let _ = writeln!(
        out,
        "state {:?}, last instruction {}",
        status.state, status.instruction
    );
    for (slot, address) in status.stack.iter().enumerate() {
        let active = slot == usize::from(status.stack_pointer);
        if active {
            let _ = out.set_color(ColorSpec::new().set_bold(true));
        }
        let _ = writeln!(
            out,
            "  stack[{slot}] = {address}{}",
            if active { "  <- PC" } else { "" }
        );
        if active {
            let _ = out.reset();
        }
    }
}
