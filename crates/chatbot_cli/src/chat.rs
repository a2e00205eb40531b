use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chatbot_core::Matcher;

pub const WELCOME: &str = "Welcome to the College Chatbot! Type 'exit' to stop.";
pub const PROMPT: &str = "You: ";
pub const GOODBYE: &str = "Chatbot: Goodbye!";

fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Prompt/answer loop. Ends on `exit` (any case) or end of input.
pub fn run_loop<R: BufRead, W: Write>(matcher: &Matcher, input: R, out: &mut W) -> Result<()> {
    writeln!(out, "{WELCOME}")?;
    let mut lines = input.lines();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            writeln!(out, "{GOODBYE}")?;
            return Ok(());
        };
        let line = line.context("read input line")?;

        if is_exit(&line) {
            writeln!(out, "{GOODBYE}")?;
            return Ok(());
        }

        let response = matcher.respond(&line)?;
        writeln!(out, "Chatbot: {response}")?;
    }
}
