use std::io::{self, BufRead, Write};

/// Asks a yes/no question on the terminal.
pub fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let stdin = io::stdin();
    confirm_with(&mut stdin.lock(), &mut io::stdout(), prompt, default)
}

/// Keeps asking until the answer is `y`, `n`, or empty with a default.
/// End of input counts as an empty answer, or a no without a default.
pub fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: Option<bool>,
) -> io::Result<bool> {
    let mut line = String::new();

    loop {
        line.clear();

        match default {
            Some(true) => write!(output, "{} (Y/n): ", prompt)?,
            Some(false) | None => write!(output, "{} (y/N): ", prompt)?,
        }
        output.flush()?;

        if input.read_line(&mut line)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match line.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => {
                if let Some(default) = default {
                    return Ok(default);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(answers: &str, default: Option<bool>) -> (bool, String) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let answer = confirm_with(&mut input, &mut output, "Create it?", default).unwrap();
        (answer, String::from_utf8(output).unwrap())
    }

    #[test]
    fn empty_answer_takes_the_default() {
        let (answer, output) = ask("\n", Some(true));
        assert!(answer);
        assert_eq!(output, "Create it? (Y/n): ");
    }

    #[test]
    fn asks_again_until_the_answer_is_valid() {
        let (answer, output) = ask("maybe\n\nn\n", None);
        assert!(!answer);
        assert_eq!(output.matches("(y/N)").count(), 3);
    }

    #[test]
    fn closed_input_without_default_is_no() {
        assert!(!ask("", None).0);
    }
}
