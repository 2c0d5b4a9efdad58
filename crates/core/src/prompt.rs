//! Interactive confirmation and menu input.
//!
//! Every destructive or skippable step asks through [`Confirm`], so pipelines can be
//! driven by scripted answers in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

/// Question/answer capability used by confirmation gates and menus.
pub trait Confirm {
    /// Ask a yes/no question. Only an explicit `y`/`Y` counts as yes.
    fn confirm(&self, question: &str) -> bool {
        self.read_line(&format!("{question} [y/N]"))
            .map(|answer| is_affirmative(&answer))
            .unwrap_or(false)
    }

    /// Print `prompt` and read one line of input. `None` on end of input.
    fn read_line(&self, prompt: &str) -> Option<String>;
}

/// `true` only when the first typed character is `y` or `Y`.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim_start().chars().next(), Some('y') | Some('Y'))
}

/// Console prompts over stdin/stdout.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn read_line(&self, prompt: &str) -> Option<String> {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{prompt}");
        let _ = stdout.flush();
        drop(stdout);

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Answers yes to every confirmation; menus get no input.
#[derive(Debug, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _question: &str) -> bool {
        true
    }

    fn read_line(&self, _prompt: &str) -> Option<String> {
        None
    }
}

/// Replays a fixed list of answers in order and records the prompts it was shown.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or(0)
    }
}

impl Confirm for ScriptedConfirm {
    fn read_line(&self, prompt: &str) -> Option<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answers.lock().ok().and_then(|mut a| a.pop_front())
    }
}
