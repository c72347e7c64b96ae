//! Tool URI grammar: `tool::<server>::<tool>` (§4.F, GLOSSARY).

use crate::error::{Error, Result};

/// Parse a tool URI into its `(server, tool)` parts. Both parts must be
/// non-empty and must not themselves contain `::`.
pub fn parse_tool_uri(uri: &str) -> Result<(&str, &str)> {
    let mut parts = uri.splitn(4, "::");
    let prefix = parts.next().unwrap_or("");
    let server = parts.next().unwrap_or("");
    let tool = parts.next().unwrap_or("");
    let trailing = parts.next();

    if prefix != "tool" || server.is_empty() || tool.is_empty() || trailing.is_some() || tool.contains("::") {
        return Err(Error::ToolUriParse(uri.to_string()));
    }

    Ok((server, tool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_uri() {
        assert_eq!(parse_tool_uri("tool::mail::send").unwrap(), ("mail", "send"));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(parse_tool_uri("mail::send").is_err());
    }

    #[test]
    fn rejects_missing_tool_part() {
        assert!(parse_tool_uri("tool::mail").is_err());
    }

    #[test]
    fn rejects_empty_server() {
        assert!(parse_tool_uri("tool::::send").is_err());
    }

    #[test]
    fn rejects_trailing_segments() {
        assert!(parse_tool_uri("tool::mail::send::extra").is_err());
    }
}
