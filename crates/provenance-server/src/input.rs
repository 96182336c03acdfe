//! Interactive text entry for `predict`
//!
//! A text spans one or more lines and ends at the first blank line, so
//! whole articles can be pasted. `quit` or `exit` on the first line ends
//! the session, as does end of input.

use tokio::io::{self, AsyncBufRead, Lines};

/// One step of the interactive loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Text(String),
    Quit,
}

fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
}

/// Read the next text; blank lines before it are skipped
pub async fn read_text<R>(lines: &mut Lines<R>) -> io::Result<Prompt>
where
    R: AsyncBufRead + Unpin,
{
    let mut collected: Vec<String> = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if collected.is_empty() {
            if trimmed.is_empty() {
                continue;
            }
            if is_quit(trimmed) {
                return Ok(Prompt::Quit);
            }
        } else if trimmed.is_empty() {
            break;
        }
        collected.push(line);
    }

    if collected.is_empty() {
        Ok(Prompt::Quit)
    } else {
        Ok(Prompt::Text(collected.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn lines(input: &'static str) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(input.as_bytes()).lines()
    }

    #[tokio::test]
    async fn test_paragraph_ends_at_blank_line() {
        let mut input = lines("\n\nFirst line\nsecond line\n\nNext text\n");

        assert_eq!(
            read_text(&mut input).await.unwrap(),
            Prompt::Text("First line\nsecond line".to_string())
        );
        assert_eq!(
            read_text(&mut input).await.unwrap(),
            Prompt::Text("Next text".to_string())
        );
        assert_eq!(read_text(&mut input).await.unwrap(), Prompt::Quit);
    }

    #[tokio::test]
    async fn test_quit_only_on_first_line() {
        let mut input = lines("Some text\nexit\n\nQUIT\nnever read\n");

        assert_eq!(
            read_text(&mut input).await.unwrap(),
            Prompt::Text("Some text\nexit".to_string())
        );
        assert_eq!(read_text(&mut input).await.unwrap(), Prompt::Quit);
    }

    #[tokio::test]
    async fn test_empty_input_quits() {
        let mut input = lines("   \n\n");
        assert_eq!(read_text(&mut input).await.unwrap(), Prompt::Quit);
    }
}
