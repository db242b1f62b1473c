/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with an explicit variable lookup.
pub fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let placeholder = &rest[open..];
        let Some(close) = placeholder.find('}') else {
            // Unterminated: the remainder is literal text.
            out.push_str(placeholder);
            return out;
        };
        let name = &placeholder[2..close];
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(&placeholder[..=close]),
        }
        rest = &placeholder[close + 1..];
    }

    out.push_str(rest);
    out
}
