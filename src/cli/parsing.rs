//! CLI parsing helpers for clap value parsers.

/// Accept `NAME=VALUE` pairs with a non-empty name free of whitespace.
pub(super) fn parse_env_pair(s: &str) -> Result<String, String> {
    let Some((name, _)) = s.split_once('=') else {
        return Err(format!("'{s}' is not of the form NAME=VALUE"));
    };
    if name.is_empty() {
        return Err(format!("'{s}' has an empty variable name"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("variable name '{name}' contains whitespace"));
    }
    Ok(s.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PATH=/usr/bin", true)]
    #[case("EMPTY=", true)]
    #[case("A=b=c", true)]
    #[case("=value", false)]
    #[case("NOVALUE", false)]
    #[case("BAD NAME=1", false)]
    fn env_pairs_need_a_name(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(parse_env_pair(input).is_ok(), ok, "input {input}");
    }
}
