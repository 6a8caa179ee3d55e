//! Parsers for session listing output

use encoding_rs::Encoding;
use std::borrow::Cow;
use termtally_config::ReaderFormat;
use termtally_host_api::{SessionListing, SessionRecord, SessionState};
use tracing::{debug, warn};

/// Printed by `quser` (on stdout or stderr) when a host has no sessions
pub const NO_USERS_MARKER: &str = "No users exist for *";

/// Whether command output says the host has no sessions
pub fn reports_no_users(stdout: &str, stderr: &str) -> bool {
    stdout.contains(NO_USERS_MARKER) || stderr.contains(NO_USERS_MARKER)
}

/// Decode raw command output; undecodable bytes become U+FFFD
pub fn decode_output<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Cow<'a, str> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        warn!(encoding = encoding.name(), "Command output contained undecodable bytes");
    }
    text
}

/// Parse output in the given format
pub fn parse_output(format: ReaderFormat, output: &str) -> SessionListing {
    match format {
        ReaderFormat::Quser => parse_quser(output),
        ReaderFormat::Who => parse_who(output),
    }
}

/// Parse a `quser` table.
///
/// ```text
///  USERNAME              SESSIONNAME        ID  STATE   IDLE TIME  LOGON TIME
/// >alice                 rdp-tcp#3           2  Active          .  10/19/2026 9:00 AM
///  bob                                       3  Disc         1:05  10/19/2026 8:00 AM
/// ```
///
/// The first line is a (possibly localized) header. Disconnected sessions
/// have no session name, so the id is the first all-digit token in the
/// second or third column.
pub fn parse_quser(output: &str) -> SessionListing {
    let mut listing = SessionListing::default();

    if output.contains(NO_USERS_MARKER) {
        return listing;
    }

    for line in output.lines().filter(|l| !l.trim().is_empty()).skip(1) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let id_index = [1, 2]
            .into_iter()
            .find(|&i| tokens.get(i).is_some_and(|t| is_session_number(t)));

        let Some(id_index) = id_index else {
            warn!(line = %line.trim(), "Skipping quser row without numeric session id");
            listing.malformed_lines += 1;
            continue;
        };
        let Some(state) = tokens.get(id_index + 1) else {
            warn!(line = %line.trim(), "Skipping quser row without state");
            listing.malformed_lines += 1;
            continue;
        };

        let username = tokens[0].trim_start_matches('>');
        if username.is_empty() {
            warn!(line = %line.trim(), "Skipping quser row without username");
            listing.malformed_lines += 1;
            continue;
        }

        listing.records.push(SessionRecord::new(
            tokens[id_index],
            username,
            SessionState::parse(state),
        ));
    }

    debug!(
        sessions = listing.records.len(),
        malformed = listing.malformed_lines,
        "Parsed quser output"
    );
    listing
}

/// Parse a `who` listing; the terminal line is the session id
pub fn parse_who(output: &str) -> SessionListing {
    let mut listing = SessionListing::default();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(user), Some(tty)) => {
                listing.records.push(SessionRecord::active(tty, user));
            }
            _ => {
                warn!(line = %line.trim(), "Skipping malformed who row");
                listing.malformed_lines += 1;
            }
        }
    }

    debug!(
        sessions = listing.records.len(),
        malformed = listing.malformed_lines,
        "Parsed who output"
    );
    listing
}

fn is_session_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUSER_OUTPUT: &str = " USERNAME              SESSIONNAME        ID  STATE   IDLE TIME  LOGON TIME
>alice                 rdp-tcp#3           2  Active          .  10/19/2026 9:00 AM
 bob                                       3  Disc         1:05  10/19/2026 8:00 AM
 carol                 console             1  Active       none  10/18/2026 7:15 PM
";

    #[test]
    fn quser_table() {
        let listing = parse_quser(QUSER_OUTPUT);
        assert_eq!(listing.malformed_lines, 0);
        assert_eq!(listing.records.len(), 3);

        let alice = &listing.records[0];
        assert_eq!(alice.username.as_str(), "alice");
        assert_eq!(alice.session_id.as_str(), "2");
        assert_eq!(alice.state, SessionState::Active);

        let bob = &listing.records[1];
        assert_eq!(bob.username.as_str(), "bob");
        assert_eq!(bob.session_id.as_str(), "3");
        assert_eq!(bob.state, SessionState::Disconnected);
    }

    #[test]
    fn quser_skips_system_rows() {
        let output = " USERNAME  SESSIONNAME  ID  STATE
 services  services  Disc
 dave  rdp-tcp#9  7  Active  .  10/19/2026 9:30 AM
";
        let listing = parse_quser(output);
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].username.as_str(), "dave");
        assert_eq!(listing.malformed_lines, 1);
    }

    #[test]
    fn quser_localized_header_is_skipped() {
        let output = " ПОЛЬЗОВАТЕЛЬ  СЕАНС  ID  СТАТУС
 ivan  rdp-tcp#1  4  Active  .  19.10.2026 9:00
";
        let listing = parse_quser(output);
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].session_id.as_str(), "4");
    }

    #[test]
    fn quser_no_users() {
        let listing = parse_quser("No users exist for *\n");
        assert!(listing.is_empty());
        assert_eq!(listing.malformed_lines, 0);
        assert!(reports_no_users("", "No users exist for *"));
        assert!(!reports_no_users("USERNAME", ""));
    }

    #[test]
    fn garbage_is_empty_with_warnings() {
        let listing = parse_quser("header\n???\n\u{fffd}\u{fffd}\n");
        assert!(listing.is_empty());
        assert_eq!(listing.malformed_lines, 2);
    }

    #[test]
    fn who_listing() {
        let output = "alice    pts/0        2026-10-19 09:00 (10.0.0.5)
bob      tty1         2026-10-19 08:12
lonely
";
        let listing = parse_output(ReaderFormat::Who, output);
        assert_eq!(listing.records.len(), 2);
        assert_eq!(listing.records[0].session_id.as_str(), "pts/0");
        assert_eq!(listing.records[1].username.as_str(), "bob");
        assert_eq!(listing.malformed_lines, 1);
    }

    #[test]
    fn quser_oem_names_stay_distinct() {
        let table = " USERNAME  SESSIONNAME  ID  STATE  IDLE TIME  LOGON TIME
>иван  rdp-tcp#1  2  Active  .  19.10.2026 9:00
 петр  rdp-tcp#2  3  Active  .  19.10.2026 9:05
";
        let (bytes, _, unmappable) = encoding_rs::IBM866.encode(table);
        assert!(!unmappable);
        assert!(bytes.windows(4).any(|w| w == [0xA8, 0xA2, 0xA0, 0xAD]));

        let text = decode_output(ReaderFormat::Quser.default_encoding(), &bytes);
        let listing = parse_quser(&text);
        let names: Vec<&str> = listing.records.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["иван", "петр"]);
    }

    #[test]
    fn utf8_decode_replaces_invalid_bytes() {
        let text = decode_output(encoding_rs::UTF_8, b"alice pts/0\n\xff\xfe tty1\n");
        let listing = parse_who(&text);
        assert_eq!(listing.records.len(), 2);
        assert_eq!(listing.records[1].username.as_str(), "\u{fffd}\u{fffd}");
    }
}
