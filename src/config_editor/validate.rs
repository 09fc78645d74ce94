//! Structural validation for nginx-style configuration content.

/// Check that content looks like a well-formed nginx-style configuration
/// before it is written over the live file: `#` comments, quoted arguments,
/// `;`-terminated directives and balanced `{}` blocks. This refuses
/// obviously broken files; it does not model the full nginx grammar.
pub fn is_valid_conf(content: &str) -> bool {
    let mut depth: u32 = 0;
    let mut in_comment = false;
    let mut quote: Option<char> = None;
    // Set when a directive has started but not yet been terminated by
    // ';' or a block open.
    let mut in_directive = false;

    for ch in content.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }

        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '#' => in_comment = true,
            '\'' | '"' => {
                quote = Some(ch);
                in_directive = true;
            }
            '{' => {
                depth += 1;
                in_directive = false;
            }
            '}' => {
                // A block close with a dangling directive means a missing ';'.
                if in_directive || depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            ';' => in_directive = false,
            c if c.is_whitespace() => {}
            _ => in_directive = true,
        }
    }

    depth == 0 && quote.is_none() && !in_directive
}
