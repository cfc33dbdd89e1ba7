use std::io::{BufRead, Write};

use crate::{
    error::AppResult,
    services::recommendations::{DEFAULT_RECOMMENDATIONS, MAX_RECOMMENDATIONS},
};

/// Where the session's watch history comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSource {
    /// Pick positions from the displayed top of the catalog
    Manual,
    /// Import titles from the watch list file
    File,
    /// File import followed by manual selection
    Merge,
}

pub fn parse_menu_choice(input: &str) -> Option<WatchSource> {
    match input.trim() {
        "1" => Some(WatchSource::Manual),
        "2" => Some(WatchSource::File),
        "3" => Some(WatchSource::Merge),
        _ => None,
    }
}

/// Any answer starting with `y` (or Cyrillic `д`) counts as yes
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.starts_with('y') || answer.starts_with('д')
}

/// Requested recommendation count, or the default when the input is not
/// a number in `1..=30`
pub fn parse_recommendation_count(input: &str) -> usize {
    match input.trim().parse::<usize>() {
        Ok(value) if (1..=MAX_RECOMMENDATIONS).contains(&value) => value,
        _ => DEFAULT_RECOMMENDATIONS,
    }
}

/// Line-oriented console over any reader/writer pair
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn say(&mut self, line: impl AsRef<str>) -> AppResult<()> {
        writeln!(self.writer, "{}", line.as_ref())?;
        Ok(())
    }

    /// Prints `prompt` and reads one line; `None` once input is exhausted
    pub fn ask(&mut self, prompt: &str) -> AppResult<Option<String>> {
        write!(self.writer, "{}", prompt)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn confirm(&mut self, prompt: &str) -> AppResult<bool> {
        Ok(self
            .ask(&format!("{} (y/n): ", prompt))?
            .is_some_and(|answer| is_affirmative(&answer)))
    }

    pub fn ask_recommendation_count(&mut self) -> AppResult<usize> {
        let answer = self.ask(&format!(
            "How many recommendations to show (default {})? ",
            DEFAULT_RECOMMENDATIONS
        ))?;
        Ok(answer
            .map(|a| parse_recommendation_count(&a))
            .unwrap_or(DEFAULT_RECOMMENDATIONS))
    }
}
