// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caption parser: turns the free text sent alongside a document into job
// options.
//
//   "2 on"   -> 2 copies, long-edge duplex
//   "3 off"  -> 3 copies, single-sided
//   "2"      -> 2 copies, default duplex
//   "on"     -> 1 copy, duplex
//
// Tokens are whitespace separated, matched case-insensitively and may come in
// any order.  Anything unrecognised is ignored.  When a kind of token appears
// more than once the last one wins.

use crate::types::{DuplexMode, JobDefaults, JobOptions};

/// Words that switch duplex on.
const DUPLEX_ON: &[&str] = &["on", "true", "yes"];

/// Words that switch duplex off.
const DUPLEX_OFF: &[&str] = &["off", "false", "no"];

/// Parse a caption into job options. Never fails.
pub fn parse_caption(caption: Option<&str>, defaults: &JobDefaults) -> JobOptions {
    let mut options = JobOptions::from_defaults(defaults);
    let Some(text) = caption else {
        return options;
    };

    let max_copies = defaults.max_copies.max(1);
    for token in text.split_whitespace() {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            // Digit strings too long for u64 are still "a lot of copies".
            let requested = token.parse::<u64>().unwrap_or(u64::MAX);
            options.copies = requested.clamp(1, u64::from(max_copies)) as u32;
            continue;
        }

        let lower = token.to_ascii_lowercase();
        if DUPLEX_ON.contains(&lower.as_str()) {
            options.duplex = DuplexMode::LongEdge;
        } else if DUPLEX_OFF.contains(&lower.as_str()) {
            options.duplex = DuplexMode::Off;
        }
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn defaults(duplex: DuplexMode) -> JobDefaults {
        JobDefaults {
            duplex,
            ..JobDefaults::default()
        }
    }

    fn parse(text: &str, defaults: &JobDefaults) -> (u32, DuplexMode) {
        let options = parse_caption(Some(text), defaults);
        (options.copies, options.duplex)
    }

    #[test]
    fn copies_and_duplex_in_either_order() {
        let d = defaults(DuplexMode::Off);
        assert_eq!(parse("2 on", &d), (2, DuplexMode::LongEdge));
        assert_eq!(parse("on 2", &d), (2, DuplexMode::LongEdge));
        assert_eq!(parse("3 off", &defaults(DuplexMode::LongEdge)), (3, DuplexMode::Off));
    }

    #[test]
    fn duplex_word_alone_means_one_copy() {
        let d = defaults(DuplexMode::LongEdge);
        assert_eq!(parse("off", &d), (1, DuplexMode::Off));
        assert_eq!(parse("ON", &defaults(DuplexMode::Off)), (1, DuplexMode::LongEdge));
    }

    #[test]
    fn number_alone_keeps_default_duplex() {
        assert_eq!(parse("5", &defaults(DuplexMode::Off)), (5, DuplexMode::Off));
        assert_eq!(parse("5", &defaults(DuplexMode::LongEdge)), (5, DuplexMode::LongEdge));
    }

    #[test]
    fn empty_or_missing_caption_gives_defaults() {
        let d = JobDefaults {
            duplex: DuplexMode::LongEdge,
            ..JobDefaults::default()
        };
        let expected = JobOptions::from_defaults(&d);
        assert_eq!(parse_caption(None, &d), expected);
        assert_eq!(parse_caption(Some(""), &d), expected);
        assert_eq!(parse_caption(Some("   \t\n"), &d), expected);
    }

    #[test]
    fn unrecognised_tokens_are_ignored() {
        let d = defaults(DuplexMode::Off);
        assert_eq!(parse("please print 2 copies on", &d), (2, DuplexMode::LongEdge));
        assert_eq!(parse("-3 +4 2.5 ciao", &d), (1, DuplexMode::Off));
    }

    #[test]
    fn last_token_of_each_kind_wins() {
        let d = defaults(DuplexMode::Off);
        assert_eq!(parse("2 3", &d), (3, DuplexMode::Off));
        assert_eq!(parse("on off", &d), (1, DuplexMode::Off));
        assert_eq!(parse("off 4 on 7", &d), (7, DuplexMode::LongEdge));
    }

    #[test]
    fn synonyms_are_accepted() {
        let d = defaults(DuplexMode::Off);
        assert_eq!(parse("yes", &d).1, DuplexMode::LongEdge);
        assert_eq!(parse("TRUE", &d).1, DuplexMode::LongEdge);
        assert_eq!(parse("no", &defaults(DuplexMode::LongEdge)).1, DuplexMode::Off);
    }

    #[test]
    fn copies_are_clamped() {
        let d = JobDefaults {
            max_copies: 10,
            ..JobDefaults::default()
        };
        assert_eq!(parse("0", &d).0, 1);
        assert_eq!(parse("11", &d).0, 10);
        assert_eq!(parse("99999999999999999999999", &d).0, 10);
    }

    #[test]
    fn media_and_scaling_always_come_from_defaults() {
        let d = JobDefaults {
            media: crate::types::MediaSize::Letter,
            ..JobDefaults::default()
        };
        let options = parse_caption(Some("2 on a4"), &d);
        assert_eq!(options.media, crate::types::MediaSize::Letter);
        assert_eq!(options.scaling, d.scaling);
    }

    #[test]
    fn parsing_is_deterministic() {
        let d = JobDefaults::default();
        for caption in ["", "2 on", "off", "5", "x 9 y off"] {
            assert_eq!(parse_caption(Some(caption), &d), parse_caption(Some(caption), &d));
        }
    }
}
