// Interactive input helpers

use std::io::{self, BufRead, Write};

/// Read one line from stdin. EOF (Ctrl-D) and read errors come back as an
/// empty string so the caller's empty-means-exit/default rules apply
/// uniformly.
pub fn ask(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => line.trim().to_string(),
        Err(_) => String::new(),
    }
}
